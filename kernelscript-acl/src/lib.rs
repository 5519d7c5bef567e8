// SPDX-License-Identifier: MIT OR Apache-2.0

//! Permission management for kernel-rooted organizations.
//!
//! Organizations are built from external app records by the [`AppCacheBuilder`] and opened as
//! nested scopes on a [`ContextStack`]. Script commands resolve identifiers against those
//! scopes, update the cached permission graph eagerly and return the encoded [`Action`]s which
//! make the same change on-chain. Conditional grants carry [`OracleParams`] compiled from an
//! [`Expression`].
pub mod action;
pub mod app;
mod cache;
pub mod commands;
mod config;
mod error;
pub mod expression;
pub mod identifier;
mod nonce;
mod organization;
mod permissions;
pub mod scope;
#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;
pub mod traits;

pub use action::Action;
pub use app::{App, AppRecord, Artifact, ContentLocator, RepoVersion, Role, RoleRecord};
pub use cache::AppCacheBuilder;
pub use commands::ScriptValue;
pub use config::{Config, DEFAULT_REGISTRY};
pub use error::AclError;
pub use expression::{Expression, OracleParams, Word};
pub use identifier::{AppIdentifier, AppRef, Entity, LabeledAppIdentifier};
pub use nonce::NonceTracker;
pub use organization::Organization;
pub use scope::{ContextStack, OrganizationId, ScopeGuard};
pub use traits::DataSource;
