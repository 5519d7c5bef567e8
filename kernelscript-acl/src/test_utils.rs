// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory data source and organization fixtures for tests.
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use kernelscript_core::{Address, RoleHash, predict};
use thiserror::Error;

use crate::app::{
    App, AppRecord, Artifact, ContentLocator, RepoVersion, RoleDeclaration, RoleRecord,
};
use crate::config::Config;
use crate::identifier::AppIdentifier;
use crate::organization::Organization;
use crate::traits::DataSource;

pub const TRANSFER_ROLE: &str = "TRANSFER_ROLE";
pub const CREATE_PAYMENTS_ROLE: &str = "CREATE_PAYMENTS_ROLE";
pub const CREATE_VOTES_ROLE: &str = "CREATE_VOTES_ROLE";
pub const CREATE_PERMISSIONS_ROLE: &str = "CREATE_PERMISSIONS_ROLE";
pub const APP_MANAGER_ROLE: &str = "APP_MANAGER_ROLE";
pub const EXECUTE_ROLE: &str = "EXECUTE_ROLE";

pub const KERNEL: Address = Address::from_bytes([0x4b; 20]);
pub const KERNEL_CODE: Address = Address::from_bytes([0xc0; 20]);
pub const ACL_CODE: Address = Address::from_bytes([0xc1; 20]);
pub const FINANCE_CODE: Address = Address::from_bytes([0xc2; 20]);
pub const VOTING_CODE: Address = Address::from_bytes([0xc3; 20]);
pub const AGENT_CODE: Address = Address::from_bytes([0xc4; 20]);

/// Nonce of the kernel once the fixture organization is installed.
pub const KERNEL_NONCE: u64 = 5;

#[derive(Debug, Error)]
pub enum MemorySourceError {
    #[error("no {0} stored")]
    Missing(String),
}

/// [`DataSource`] answering from in-memory tables and counting the requests it serves.
#[derive(Debug, Default)]
pub struct MemorySource {
    organizations: HashMap<Address, Vec<AppRecord>>,
    artifacts: HashMap<ContentLocator, Artifact>,
    repos: HashMap<String, RepoVersion>,
    transaction_counts: HashMap<Address, u64>,
    artifact_fetches: AtomicUsize,
    transaction_count_reads: AtomicUsize,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_organization(mut self, kernel: Address, records: Vec<AppRecord>) -> Self {
        self.organizations.insert(kernel, records);
        self
    }

    pub fn with_artifact(mut self, locator: &str, artifact: Artifact) -> Self {
        self.artifacts.insert(ContentLocator::new(locator), artifact);
        self
    }

    pub fn with_repo(mut self, repo: &str, code_address: Address, locator: &str) -> Self {
        self.repos.insert(
            repo.to_string(),
            RepoVersion {
                code_address,
                content_locator: ContentLocator::new(locator),
            },
        );
        self
    }

    pub fn with_transaction_count(mut self, address: Address, count: u64) -> Self {
        self.transaction_counts.insert(address, count);
        self
    }

    /// Number of artifacts fetched so far.
    pub fn artifact_fetches(&self) -> usize {
        self.artifact_fetches.load(Ordering::SeqCst)
    }

    pub fn transaction_count_reads(&self) -> usize {
        self.transaction_count_reads.load(Ordering::SeqCst)
    }
}

impl DataSource for MemorySource {
    type Error = MemorySourceError;

    async fn fetch_organization_apps(
        &self,
        kernel: Address,
    ) -> Result<Vec<AppRecord>, Self::Error> {
        self.organizations
            .get(&kernel)
            .cloned()
            .ok_or_else(|| MemorySourceError::Missing(format!("organization {kernel}")))
    }

    async fn fetch_artifact(&self, locator: &ContentLocator) -> Result<Artifact, Self::Error> {
        self.artifact_fetches.fetch_add(1, Ordering::SeqCst);
        self.artifacts
            .get(locator)
            .cloned()
            .ok_or_else(|| MemorySourceError::Missing(format!("artifact {locator}")))
    }

    async fn fetch_repo(&self, name: &str, registry: &str) -> Result<RepoVersion, Self::Error> {
        let repo = format!("{name}.{registry}");
        self.repos
            .get(&repo)
            .cloned()
            .ok_or_else(|| MemorySourceError::Missing(format!("repository {repo}")))
    }

    async fn transaction_count(&self, address: Address) -> Result<u64, Self::Error> {
        self.transaction_count_reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.transaction_counts.get(&address).copied().unwrap_or_default())
    }
}

pub fn artifact(app_name: &str, roles: &[&str]) -> Artifact {
    Artifact {
        app_name: app_name.to_string(),
        roles: roles
            .iter()
            .map(|role| RoleDeclaration {
                name: role.to_lowercase().replace('_', " "),
                id: role.to_string(),
                params: Vec::new(),
                bytes: RoleHash::from_name(role),
            })
            .collect(),
        functions: Vec::new(),
        abi: serde_json::Value::Array(Vec::new()),
    }
}

pub fn kernel_artifact() -> Artifact {
    artifact("kernel", &[APP_MANAGER_ROLE])
}

pub fn acl_artifact() -> Artifact {
    artifact("acl", &[CREATE_PERMISSIONS_ROLE])
}

pub fn finance_artifact() -> Artifact {
    artifact("finance", &[TRANSFER_ROLE, CREATE_PAYMENTS_ROLE])
}

pub fn voting_artifact() -> Artifact {
    artifact("voting", &[CREATE_VOTES_ROLE])
}

pub fn agent_artifact() -> Artifact {
    artifact("agent", &[EXECUTE_ROLE, TRANSFER_ROLE])
}

fn record(
    address: Address,
    code_address: Address,
    name: &str,
    content_locator: Option<&str>,
    artifact: Option<Artifact>,
) -> AppRecord {
    AppRecord {
        address,
        code_address,
        name: name.to_string(),
        registry: "aragonpm.eth".to_string(),
        content_locator: content_locator.map(ContentLocator::new),
        artifact,
        roles: Vec::new(),
    }
}

/// Raw records of an organization with the apps kernel, acl, finance and two votings.
///
/// Apps live at the addresses the kernel created them at (nonces 1 to 4) and are listed out
/// of installation order. Kernel and acl ship their artifacts inline, the others only carry a
/// locator, both votings share one implementation.
pub fn organization_records(kernel: Address) -> Vec<AppRecord> {
    let mut acl = record(
        predict(&kernel, 1),
        ACL_CODE,
        "acl",
        None,
        Some(acl_artifact()),
    );
    acl.roles.push(RoleRecord {
        role_hash: RoleHash::from_name(CREATE_PERMISSIONS_ROLE),
        manager: Some(kernel),
        grantees: vec![kernel],
    });

    vec![
        record(
            predict(&kernel, 4),
            VOTING_CODE,
            "voting",
            Some("ipfs:voting"),
            None,
        ),
        record(
            predict(&kernel, 2),
            FINANCE_CODE,
            "finance",
            Some("ipfs:finance"),
            None,
        ),
        acl,
        record(
            predict(&kernel, 3),
            VOTING_CODE,
            "voting",
            Some("ipfs:voting"),
            None,
        ),
        record(kernel, KERNEL_CODE, "kernel", None, Some(kernel_artifact())),
    ]
}

/// Data source serving the fixture organization at [`KERNEL`] and the `agent` repository.
pub fn source() -> MemorySource {
    MemorySource::new()
        .with_organization(KERNEL, organization_records(KERNEL))
        .with_artifact("ipfs:finance", finance_artifact())
        .with_artifact("ipfs:voting", voting_artifact())
        .with_artifact("ipfs:agent", agent_artifact())
        .with_repo("agent.aragonpm.eth", AGENT_CODE, "ipfs:agent")
        .with_transaction_count(KERNEL, KERNEL_NONCE)
}

/// Organization with kernel, acl and finance, built without a data source.
pub fn organization() -> Organization {
    let config = Config::default();
    let mut organization = Organization::new(KERNEL, &config);

    let apps = [
        ("kernel", KERNEL, KERNEL_CODE, kernel_artifact()),
        ("acl", predict(&KERNEL, 1), ACL_CODE, acl_artifact()),
        ("finance", predict(&KERNEL, 2), FINANCE_CODE, finance_artifact()),
    ];

    for (name, address, code_address, artifact) in apps {
        let app = App::new(
            address,
            code_address,
            name,
            config.default_registry.clone(),
            None,
            Some(&artifact),
        );
        organization.insert_artifact(code_address, artifact);
        organization
            .insert_app(AppIdentifier::new(name, None, 0).into(), app)
            .unwrap();
    }

    organization
}

pub fn setup_logging() {
    if std::env::var("RUST_LOG").is_ok() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    }
}
