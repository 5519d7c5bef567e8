// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::BTreeMap;

use kernelscript_core::{Address, AddressMap};

use crate::app::{App, Artifact};
use crate::config::Config;
use crate::error::AclError;
use crate::identifier::{AppIdentifier, AppRef};

/// Snapshot of a kernel-rooted organization: its installed apps and their artifacts.
#[derive(Clone, Debug)]
pub struct Organization {
    kernel: Address,
    name: Option<String>,
    kernel_app: String,
    acl_app: String,
    apps: BTreeMap<AppRef, App>,
    artifacts: AddressMap<Artifact>,
}

impl Organization {
    pub fn new(kernel: Address, config: &Config) -> Self {
        Self {
            kernel,
            name: None,
            kernel_app: config.kernel_app.clone(),
            acl_app: config.acl_app.clone(),
            apps: BTreeMap::new(),
            artifacts: AddressMap::new(),
        }
    }

    /// Address of the kernel, which is also the organization's address.
    pub fn kernel(&self) -> Address {
        self.kernel
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    /// Returns `true` if the organization opened at `nesting_index` is addressed by the given
    /// DAO prefix, which can be its name, its kernel address or that nesting index.
    pub fn matches(&self, prefix: &str, nesting_index: usize) -> bool {
        if self.name.as_deref() == Some(prefix) {
            return true;
        }

        if let Ok(address) = prefix.parse::<Address>() {
            return address == self.kernel;
        }

        prefix
            .parse::<usize>()
            .map(|index| index == nesting_index)
            .unwrap_or(false)
    }

    /// All apps in identifier order.
    pub fn apps(&self) -> impl Iterator<Item = (&AppRef, &App)> {
        self.apps.iter()
    }

    pub fn app(&self, key: &AppRef) -> Option<&App> {
        self.apps.get(key)
    }

    pub fn app_mut(&mut self, key: &AppRef) -> Option<&mut App> {
        self.apps.get_mut(key)
    }

    /// Look up an app, failing with `NotFound` if it is not installed.
    pub fn resolve(&self, key: &AppRef) -> Result<&App, AclError> {
        self.apps
            .get(key)
            .ok_or_else(|| AclError::not_found("app", key))
    }

    /// Identifier of the app installed at the given address.
    pub fn key_of(&self, address: &Address) -> Option<&AppRef> {
        self.apps
            .iter()
            .find(|(_, app)| app.address == *address)
            .map(|(key, _)| key)
    }

    /// Register an app under an identifier which must not be in use yet.
    pub fn insert_app(&mut self, key: AppRef, app: App) -> Result<(), AclError> {
        if self.apps.contains_key(&key) {
            return Err(AclError::Invalid(format!(
                "identifier {key} is already in use"
            )));
        }

        self.apps.insert(key, app);
        Ok(())
    }

    pub fn artifact(&self, code_address: &Address) -> Option<&Artifact> {
        self.artifacts.get(code_address)
    }

    /// Cache an artifact for an implementation address. The first artifact cached for an
    /// address is kept, returns `false` if one was present already.
    pub fn insert_artifact(&mut self, code_address: Address, artifact: Artifact) -> bool {
        if self.artifacts.has(&code_address) {
            return false;
        }

        self.artifacts.entry(code_address).or_insert(artifact);
        true
    }

    /// Artifact (and with it the binary interface) of an installed app.
    pub fn abi(&self, app: &App) -> Result<&Artifact, AclError> {
        self.artifacts
            .get(&app.code_address)
            .ok_or_else(|| AclError::not_found("artifact for app", app.repo_name()))
    }

    pub fn kernel_app(&self) -> Result<&App, AclError> {
        self.resolve(&AppIdentifier::new(self.kernel_app.clone(), None, 0).into())
    }

    /// Address of the access control list all permission actions are sent to, the first
    /// installed instance of the acl app.
    pub fn acl(&self) -> Result<Address, AclError> {
        self.apps
            .iter()
            .find(|(key, _)| {
                matches!(key, AppRef::Indexed(_))
                    && key.name() == self.acl_app
                    && key.registry().is_none()
            })
            .map(|(_, app)| app.address)
            .ok_or_else(|| AclError::not_found("app", &self.acl_app))
    }
}

#[cfg(test)]
mod tests {
    use kernelscript_core::Address;

    use crate::app::App;
    use crate::config::Config;
    use crate::error::AclError;
    use crate::identifier::{AppIdentifier, AppRef, LabeledAppIdentifier};

    use super::Organization;

    fn app(byte: u8, name: &str) -> App {
        App::new(
            Address::from_bytes([byte; 20]),
            Address::from_bytes([byte + 100; 20]),
            name,
            "aragonpm.eth",
            None,
            None,
        )
    }

    #[test]
    fn matches_prefixes() {
        let kernel = Address::from_bytes([1; 20]);
        let mut organization = Organization::new(kernel, &Config::default());
        organization.set_name("parent");

        assert!(organization.matches("parent", 2));
        assert!(organization.matches(&kernel.to_string(), 2));
        assert!(organization.matches("2", 2));
        assert!(!organization.matches("child", 2));
        assert!(!organization.matches("0", 2));
    }

    #[test]
    fn insert_apps() {
        let mut organization = Organization::new(Address::from_bytes([1; 20]), &Config::default());

        let voting: AppRef = AppIdentifier::new("voting", None, 0).into();
        organization.insert_app(voting.clone(), app(2, "voting")).unwrap();
        organization
            .insert_app(
                LabeledAppIdentifier::new("voting", None, "new").into(),
                app(3, "voting"),
            )
            .unwrap();

        assert_eq!(organization.apps().count(), 2);

        assert!(matches!(
            organization.insert_app(voting.clone(), app(4, "voting")),
            Err(AclError::Invalid(_))
        ));
        assert_eq!(organization.key_of(&Address::from_bytes([2; 20])), Some(&voting));
    }

    #[test]
    fn missing_acl_and_artifacts() {
        let organization = Organization::new(Address::from_bytes([1; 20]), &Config::default());
        assert_eq!(
            organization.acl(),
            Err(AclError::NotFound {
                what: "app",
                name: "acl".into()
            })
        );
        assert!(matches!(
            organization.abi(&app(2, "voting")),
            Err(AclError::NotFound { .. })
        ));
    }
}
