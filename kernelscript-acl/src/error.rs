// SPDX-License-Identifier: MIT OR Apache-2.0

use kernelscript_core::{Address, AddressError, RoleHashError};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum AclError {
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("{what} {name} not found")]
    NotFound { what: &'static str, name: String },

    #[error("invalid value: {0}")]
    Invalid(String),

    #[error("grantee {grantee} already has permission {role} on app {app}")]
    AlreadyGranted {
        grantee: Address,
        app: String,
        role: String,
    },

    #[error("grantee {grantee} does not have permission {role} on app {app}")]
    NotGranted {
        grantee: Address,
        app: String,
        role: String,
    },

    #[error("permission {role} on app {app} does not exist yet and requires a manager")]
    Missing { app: String, role: String },

    #[error("external data unavailable: {0}")]
    Unavailable(String),
}

impl AclError {
    pub(crate) fn not_found(what: &'static str, name: impl ToString) -> Self {
        Self::NotFound {
            what,
            name: name.to_string(),
        }
    }

    pub(crate) fn unavailable(err: impl std::error::Error) -> Self {
        Self::Unavailable(err.to_string())
    }
}

impl From<AddressError> for AclError {
    fn from(value: AddressError) -> Self {
        Self::Invalid(value.to_string())
    }
}

impl From<RoleHashError> for AclError {
    fn from(value: RoleHashError) -> Self {
        Self::Invalid(value.to_string())
    }
}
