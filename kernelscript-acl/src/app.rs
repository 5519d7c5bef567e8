// SPDX-License-Identifier: MIT OR Apache-2.0

//! Installed applications, their artifacts and permission state.
use std::collections::BTreeMap;
use std::fmt;

use alloy_primitives::B256;
use kernelscript_core::{Address, AddressSet, RoleHash, namehash};
use serde::{Deserialize, Serialize};

/// Location of a content-addressed artifact, e.g. `ipfs:QmVgHqK...`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContentLocator(String);

impl ContentLocator {
    pub fn new(locator: impl Into<String>) -> Self {
        Self(locator.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Role declared by an application artifact.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleDeclaration {
    /// Human-readable description, e.g. "Transfer assets".
    pub name: String,
    /// Role constant name, e.g. `TRANSFER_ROLE`.
    pub id: String,
    #[serde(default)]
    pub params: Vec<String>,
    /// Hash under which the role is stored on-chain.
    pub bytes: RoleHash,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionDeclaration {
    pub sig: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

/// Build artifact published with every version of an application.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub app_name: String,
    #[serde(default)]
    pub roles: Vec<RoleDeclaration>,
    #[serde(default)]
    pub functions: Vec<FunctionDeclaration>,
    /// Binary interface of the implementation contract.
    #[serde(default)]
    pub abi: serde_json::Value,
}

impl Artifact {
    /// Look up a declared role by its constant name or hash.
    pub fn role(&self, role: &RoleHash) -> Option<&RoleDeclaration> {
        self.roles.iter().find(|declared| declared.bytes == *role)
    }
}

/// On-chain state of one role as reported by the indexer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleRecord {
    pub role_hash: RoleHash,
    pub manager: Option<Address>,
    #[serde(default)]
    pub grantees: Vec<Address>,
}

/// Raw installed-application record of an organization.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppRecord {
    pub address: Address,
    /// Implementation (logic) contract the proxy delegates to.
    pub code_address: Address,
    pub name: String,
    /// Full registry name, e.g. `aragonpm.eth` or `open.aragonpm.eth`.
    pub registry: String,
    pub content_locator: Option<ContentLocator>,
    /// Artifact shipped with the record, when the indexer has it at hand.
    pub artifact: Option<Artifact>,
    #[serde(default)]
    pub roles: Vec<RoleRecord>,
}

/// Latest published version of an application repository.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoVersion {
    pub code_address: Address,
    pub content_locator: ContentLocator,
}

/// Permission state of a role.
///
/// A role without manager has never been created on-chain, its grantees are only meaningful
/// once a manager exists.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub manager: Option<Address>,
    pub grantees: AddressSet,
}

impl Role {
    pub fn is_created(&self) -> bool {
        self.manager.is_some()
    }
}

pub type PermissionMap = BTreeMap<RoleHash, Role>;

/// Application proxy installed in an organization.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct App {
    pub address: Address,
    pub code_address: Address,
    pub content_locator: Option<ContentLocator>,
    pub name: String,
    pub registry: String,
    pub permissions: PermissionMap,
}

impl App {
    /// Create an app with every declared role seeded as not created.
    pub fn new(
        address: Address,
        code_address: Address,
        name: impl Into<String>,
        registry: impl Into<String>,
        content_locator: Option<ContentLocator>,
        artifact: Option<&Artifact>,
    ) -> Self {
        let permissions = artifact
            .map(|artifact| {
                artifact
                    .roles
                    .iter()
                    .map(|role| (role.bytes, Role::default()))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            address,
            code_address,
            content_locator,
            name: name.into(),
            registry: registry.into(),
            permissions,
        }
    }

    /// Overlay on-chain role state. Roles unknown to the artifact are added.
    pub fn apply_role_records(&mut self, records: &[RoleRecord]) {
        for record in records {
            let role = self.permissions.entry(record.role_hash).or_default();
            role.manager = record.manager.filter(|manager| !manager.is_zero());
            role.grantees = record.grantees.iter().copied().collect();
        }
    }

    /// Repository name, e.g. `voting.aragonpm.eth`.
    pub fn repo_name(&self) -> String {
        format!("{}.{}", self.name, self.registry)
    }

    /// Id the kernel registers this app's implementation under.
    pub fn app_id(&self) -> B256 {
        namehash(&self.repo_name())
    }
}
