// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fmt;
use std::str::FromStr;

use alloy_primitives::{B256, keccak256};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::serde::{deserialize_hex, serialize_hex, strip_hex_prefix};

/// Size of role hashes.
pub const ROLE_HASH_LEN: usize = 32;

/// 32-byte identifier of a permission.
///
/// Roles are usually declared by name (`TRANSFER_ROLE`) and identified on-chain by the keccak256
/// hash of that name.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoleHash(B256);

impl RoleHash {
    /// Hash a human-readable role name.
    pub fn from_name(name: &str) -> Self {
        Self(keccak256(name.as_bytes()))
    }

    /// Interpret a role given in a script.
    ///
    /// A `0x`-prefixed string of exactly 32 bytes is taken as the hash itself, anything else is
    /// a role name which gets hashed.
    pub fn parse(role: &str) -> Self {
        match role.parse::<Self>() {
            Ok(hash) => hash,
            Err(_) => Self::from_name(role),
        }
    }

    /// Create a `RoleHash` from its raw bytes representation.
    pub const fn from_bytes(bytes: [u8; ROLE_HASH_LEN]) -> Self {
        Self(B256::new(bytes))
    }

    /// Bytes of the hash.
    pub fn as_bytes(&self) -> &[u8; ROLE_HASH_LEN] {
        &self.0.0
    }

    /// Lowercase hex string with `0x` prefix.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.as_bytes()))
    }
}

impl AsRef<[u8]> for RoleHash {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl From<B256> for RoleHash {
    fn from(value: B256) -> Self {
        Self(value)
    }
}

impl From<RoleHash> for B256 {
    fn from(value: RoleHash) -> Self {
        value.0
    }
}

impl From<[u8; ROLE_HASH_LEN]> for RoleHash {
    fn from(value: [u8; ROLE_HASH_LEN]) -> Self {
        Self::from_bytes(value)
    }
}

impl TryFrom<&[u8]> for RoleHash {
    type Error = RoleHashError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        let value_len = value.len();

        let checked_value: [u8; ROLE_HASH_LEN] = value
            .try_into()
            .map_err(|_| RoleHashError::InvalidLength(value_len, ROLE_HASH_LEN))?;

        Ok(Self::from_bytes(checked_value))
    }
}

/// Parses a `0x`-prefixed hash literal. Use [`RoleHash::parse`] to also accept role names.
impl FromStr for RoleHash {
    type Err = RoleHashError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let digits = strip_hex_prefix(value).ok_or(RoleHashError::MissingPrefix)?;
        Self::try_from(hex::decode(digits)?.as_slice())
    }
}

impl fmt::Display for RoleHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for RoleHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RoleHash").field(&self.to_hex()).finish()
    }
}

impl Serialize for RoleHash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serialize_hex(self.as_bytes(), serializer)
    }
}

impl<'de> Deserialize<'de> for RoleHash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let bytes = deserialize_hex(deserializer)?;

        bytes
            .as_slice()
            .try_into()
            .map_err(|err: RoleHashError| serde::de::Error::custom(err.to_string()))
    }
}

/// Error types for `RoleHash` struct.
#[derive(Error, Debug, PartialEq)]
pub enum RoleHashError {
    /// Hash has an invalid length.
    #[error("invalid role hash length {0} bytes, expected {1} bytes")]
    InvalidLength(usize, usize),

    /// Hash string contains invalid hexadecimal characters.
    #[error("invalid hex encoding in role hash string")]
    InvalidHexEncoding(#[from] hex::FromHexError),

    /// Hash string does not start with `0x`.
    #[error("role hash string is missing the 0x prefix")]
    MissingPrefix,
}

#[cfg(test)]
mod tests {
    use super::{RoleHash, RoleHashError};

    const TRANSFER_ROLE: &str =
        "0x8502233096d909befbda0999bb8ea2f3a6be3c138b9fbf003752a4c8bce86f6c";

    #[test]
    fn hash_role_names() {
        assert_eq!(RoleHash::from_name("TRANSFER_ROLE").to_hex(), TRANSFER_ROLE);
        assert_eq!(
            RoleHash::from_name("").to_hex(),
            "0xc5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn hash_literals_are_taken_verbatim() {
        assert_eq!(RoleHash::parse(TRANSFER_ROLE), RoleHash::from_name("TRANSFER_ROLE"));
        assert_eq!(
            RoleHash::parse(&TRANSFER_ROLE.to_uppercase().replace("0X", "0x")),
            RoleHash::from_name("TRANSFER_ROLE")
        );
    }

    #[test]
    fn short_hex_strings_are_names() {
        // Not 32 bytes long, hence treated as a name.
        let role = RoleHash::parse("0x1234");
        assert_eq!(role, RoleHash::from_name("0x1234"));
        assert_eq!(
            "0x1234".parse::<RoleHash>(),
            Err(RoleHashError::InvalidLength(2, 32))
        );
    }

    #[test]
    fn serialize() {
        let role = RoleHash::from_name("TRANSFER_ROLE");
        let json = serde_json::to_string(&role).unwrap();
        assert_eq!(json, format!("\"{TRANSFER_ROLE}\""));
        let decoded: RoleHash = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, role);
    }
}
