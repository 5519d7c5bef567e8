// SPDX-License-Identifier: MIT OR Apache-2.0

//! Script commands operating on the organizations of a [`ContextStack`].
//!
//! Commands take their arguments as [`ScriptValue`]s the way a script evaluator hands them
//! over and convert them into typed values first. Arguments of the wrong type fail with
//! [`AclError::Invalid`].
//!
//! [`ContextStack`]: crate::ContextStack
mod connect;
mod grant;
mod install;
mod revoke;

use alloy_primitives::U256;
use kernelscript_core::{Address, RoleHash};

use crate::error::AclError;
use crate::expression::OracleParams;
use crate::identifier::{Entity, parse};
use crate::scope::ContextStack;

pub use connect::connect;
pub use grant::grant;
pub use install::install;
pub use revoke::revoke;

/// Argument value passed to a command by a script.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScriptValue {
    Address(Address),
    String(String),
    Bool(bool),
    Number(U256),
    Params(OracleParams),
}

impl ScriptValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            ScriptValue::Address(_) => "address",
            ScriptValue::String(_) => "string",
            ScriptValue::Bool(_) => "bool",
            ScriptValue::Number(_) => "number",
            ScriptValue::Params(_) => "params",
        }
    }

    /// Address literal, either typed or as a `0x`-prefixed string.
    pub fn to_address(&self) -> Result<Address, AclError> {
        match self {
            ScriptValue::Address(address) => Ok(*address),
            ScriptValue::String(value) if Address::is_address(value) => Ok(value.parse()?),
            other => Err(other.invalid("an address")),
        }
    }

    /// Address or identifier of an app.
    pub fn to_entity(&self) -> Result<Entity, AclError> {
        match self {
            ScriptValue::Address(address) => Ok(Entity::Address(*address)),
            ScriptValue::String(value) => parse(value),
            other => Err(other.invalid("an address or app identifier")),
        }
    }

    /// Role name or 32-byte role hash.
    pub fn to_role(&self) -> Result<RoleHash, AclError> {
        match self {
            ScriptValue::String(value) if !value.is_empty() => Ok(RoleHash::parse(value)),
            other => Err(other.invalid("a role")),
        }
    }

    pub fn to_bool(&self) -> Result<bool, AclError> {
        match self {
            ScriptValue::Bool(value) => Ok(*value),
            other => Err(other.invalid("a boolean")),
        }
    }

    pub fn to_params(&self) -> Result<OracleParams, AclError> {
        match self {
            ScriptValue::Params(params) => Ok(params.clone()),
            other => Err(other.invalid("encoded permission params")),
        }
    }

    pub fn as_str(&self) -> Result<&str, AclError> {
        match self {
            ScriptValue::String(value) => Ok(value),
            other => Err(other.invalid("a string")),
        }
    }

    fn invalid(&self, expected: &str) -> AclError {
        AclError::Invalid(format!("expected {expected}, got {}", self.type_name()))
    }
}

impl From<Address> for ScriptValue {
    fn from(value: Address) -> Self {
        ScriptValue::Address(value)
    }
}

impl From<&str> for ScriptValue {
    fn from(value: &str) -> Self {
        ScriptValue::String(value.to_string())
    }
}

impl From<String> for ScriptValue {
    fn from(value: String) -> Self {
        ScriptValue::String(value)
    }
}

impl From<bool> for ScriptValue {
    fn from(value: bool) -> Self {
        ScriptValue::Bool(value)
    }
}

impl From<U256> for ScriptValue {
    fn from(value: U256) -> Self {
        ScriptValue::Number(value)
    }
}

impl From<u64> for ScriptValue {
    fn from(value: u64) -> Self {
        ScriptValue::Number(U256::from(value))
    }
}

impl From<OracleParams> for ScriptValue {
    fn from(value: OracleParams) -> Self {
        ScriptValue::Params(value)
    }
}

/// Resolve an entity argument to an address in the current scopes.
fn resolve_address(stack: &ContextStack, value: &ScriptValue) -> Result<Address, AclError> {
    stack.resolve_entity(&value.to_entity()?)
}
