// SPDX-License-Identifier: MIT OR Apache-2.0

//! Builds organization snapshots from raw installed-app records.
use std::collections::{BTreeMap, BTreeSet, HashMap};

use futures_util::stream::{self, StreamExt};
use kernelscript_core::{Address, predict};
use tracing::{debug, warn};

use crate::app::{App, AppRecord, Artifact, ContentLocator};
use crate::config::Config;
use crate::error::AclError;
use crate::identifier::AppIdentifier;
use crate::organization::Organization;
use crate::traits::DataSource;

pub struct AppCacheBuilder<'a, S> {
    source: &'a S,
    config: &'a Config,
}

impl<'a, S> AppCacheBuilder<'a, S>
where
    S: DataSource,
{
    pub fn new(source: &'a S, config: &'a Config) -> Self {
        Self { source, config }
    }

    /// Fetch the app records of the organization rooted at `kernel` and build its snapshot.
    pub async fn build(&self, kernel: Address) -> Result<Organization, AclError> {
        let records = self
            .source
            .fetch_organization_apps(kernel)
            .await
            .map_err(AclError::unavailable)?;

        self.build_from_records(kernel, records).await
    }

    /// Build an organization snapshot from already fetched records.
    ///
    /// Artifacts are taken from the records where present and fetched otherwise, once per
    /// implementation address and distinct locator. Records are sorted into installation order
    /// by replaying the kernel's contract creations, then every app receives an identifier with
    /// a per-name index.
    pub async fn build_from_records(
        &self,
        kernel: Address,
        records: Vec<AppRecord>,
    ) -> Result<Organization, AclError> {
        let mut organization = Organization::new(kernel, self.config);

        for record in &records {
            if let Some(artifact) = &record.artifact {
                organization.insert_artifact(record.code_address, artifact.clone());
            }
        }

        let mut locators = BTreeSet::new();
        let mut requested = BTreeSet::new();
        for record in &records {
            if organization.artifact(&record.code_address).is_some()
                || requested.contains(&record.code_address)
            {
                continue;
            }

            match &record.content_locator {
                Some(locator) => {
                    requested.insert(record.code_address);
                    locators.insert(locator.clone());
                }
                None => warn!(
                    app = %record.address,
                    "app record has neither an artifact nor a content locator"
                ),
            }
        }

        let fetched = self.fetch_artifacts(locators).await;
        for record in &records {
            if let Some(artifact) = record
                .content_locator
                .as_ref()
                .and_then(|locator| fetched.get(locator))
            {
                organization.insert_artifact(record.code_address, artifact.clone());
            }
        }

        let mut counters: HashMap<(String, Option<String>), u32> = HashMap::new();
        for record in self.installation_order(records)? {
            let registry = self.config.short_registry(&record.registry);

            let index = if record.name == self.config.kernel_app {
                0
            } else {
                let counter = counters
                    .entry((record.name.clone(), registry.clone()))
                    .or_insert(self.config.initial_index);
                let index = *counter;
                *counter += 1;
                index
            };

            let artifact = organization.artifact(&record.code_address);
            if artifact.is_none() {
                warn!(
                    app = %record.address,
                    name = %record.name,
                    "artifact unavailable, only on-chain permissions are known"
                );
            }

            let mut app = App::new(
                record.address,
                record.code_address,
                record.name.clone(),
                record.registry,
                record.content_locator,
                artifact,
            );
            app.apply_role_records(&record.roles);

            let key = AppIdentifier::new(record.name, registry, index);
            debug!(app = %key, address = %app.address, "cached app");
            organization.insert_app(key.into(), app)?;
        }

        Ok(organization)
    }

    /// Fetch artifacts concurrently. Failed fetches are logged and left out.
    async fn fetch_artifacts(
        &self,
        locators: BTreeSet<ContentLocator>,
    ) -> HashMap<ContentLocator, Artifact> {
        if locators.is_empty() {
            return HashMap::new();
        }

        debug!(count = locators.len(), "fetch artifacts");
        stream::iter(locators)
            .map(|locator| async move {
                let result = self.source.fetch_artifact(&locator).await;
                (locator, result)
            })
            .buffer_unordered(self.config.max_concurrent_fetches.max(1))
            .filter_map(|(locator, result)| async move {
                match result {
                    Ok(artifact) => Some((locator, artifact)),
                    Err(err) => {
                        warn!(%locator, %err, "could not fetch artifact");
                        None
                    }
                }
            })
            .collect()
            .await
    }

    /// Sort records into the order their proxies were created by the kernel.
    ///
    /// The kernel comes first, followed by the records found at the addresses the kernel
    /// produced with nonces `1..=N`. Records not recovered this way are appended in address
    /// order.
    fn installation_order(&self, records: Vec<AppRecord>) -> Result<Vec<AppRecord>, AclError> {
        let total = records.len();
        let mut by_address: BTreeMap<Address, AppRecord> = BTreeMap::new();
        let mut kernel = None;

        for record in records {
            if record.name == self.config.kernel_app && kernel.is_none() {
                kernel = Some(record);
            } else {
                by_address.insert(record.address, record);
            }
        }

        let kernel = kernel.ok_or_else(|| AclError::not_found("app", &self.config.kernel_app))?;
        let creator = kernel.address;
        let mut ordered = Vec::with_capacity(total);
        ordered.push(kernel);

        for nonce in 1..=total as u64 {
            if by_address.is_empty() {
                break;
            }

            if let Some(record) = by_address.remove(&predict(&creator, nonce)) {
                ordered.push(record);
            }
        }

        for (address, record) in by_address {
            warn!(app = %address, name = %record.name, "app was not created by the kernel");
            ordered.push(record);
        }

        Ok(ordered)
    }
}
