// SPDX-License-Identifier: MIT OR Apache-2.0

use std::error::Error;

use kernelscript_core::Address;

use crate::app::{AppRecord, Artifact, ContentLocator, RepoVersion};

/// External provider of organization and chain data (indexer, content-addressed storage and
/// RPC node).
///
/// Implementations decide about caching and retries, failures are reported as
/// [`AclError::Unavailable`](crate::AclError::Unavailable) by the callers.
pub trait DataSource {
    type Error: Error;

    /// Returns the raw records of all apps installed in the organization rooted at `kernel`.
    fn fetch_organization_apps(
        &self,
        kernel: Address,
    ) -> impl Future<Output = Result<Vec<AppRecord>, Self::Error>>;

    /// Fetches and decodes the artifact stored under the given locator.
    fn fetch_artifact(
        &self,
        locator: &ContentLocator,
    ) -> impl Future<Output = Result<Artifact, Self::Error>>;

    /// Returns the latest version published in the repository `<name>.<registry>`.
    fn fetch_repo(
        &self,
        name: &str,
        registry: &str,
    ) -> impl Future<Output = Result<RepoVersion, Self::Error>>;

    /// Returns the number of transactions (contract creations for contracts) sent from an
    /// address.
    fn transaction_count(&self, address: Address)
    -> impl Future<Output = Result<u64, Self::Error>>;
}
