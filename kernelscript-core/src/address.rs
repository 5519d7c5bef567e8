// SPDX-License-Identifier: MIT OR Apache-2.0

//! 20-byte account identifiers and containers keyed by them.
//!
//! Addresses are conventionally rendered in mixed case (EIP-55 checksums) but identity is
//! always decided on the raw bytes. [`AddressSet`] and [`AddressMap`] accept either typed
//! addresses or their textual form and canonicalize before touching the underlying store, so
//! two addresses differing only in case are always the same entry.
use std::collections::btree_map::{self, BTreeMap};
use std::collections::btree_set::{self, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::serde::{deserialize_hex, serialize_hex, strip_hex_prefix};

/// Size of an address in bytes.
pub const ADDRESS_LEN: usize = 20;

/// 20-byte account or contract address.
///
/// The canonical textual form is `0x` followed by 40 lowercase hex digits.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(alloy_primitives::Address);

impl Address {
    /// The zero address.
    pub const ZERO: Self = Self(alloy_primitives::Address::ZERO);

    /// Create an `Address` from its raw bytes representation.
    pub const fn from_bytes(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(alloy_primitives::Address::new(bytes))
    }

    /// Bytes of the address.
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0.0.0
    }

    /// Canonical lowercase hex string with `0x` prefix.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.as_bytes()))
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Returns `true` if the given string is a well-formed address in any letter case.
    pub fn is_address(value: &str) -> bool {
        value.parse::<Self>().is_ok()
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl From<alloy_primitives::Address> for Address {
    fn from(value: alloy_primitives::Address) -> Self {
        Self(value)
    }
}

impl From<Address> for alloy_primitives::Address {
    fn from(value: Address) -> Self {
        value.0
    }
}

impl From<[u8; ADDRESS_LEN]> for Address {
    fn from(value: [u8; ADDRESS_LEN]) -> Self {
        Self::from_bytes(value)
    }
}

impl TryFrom<&[u8]> for Address {
    type Error = AddressError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        let value_len = value.len();

        let checked_value: [u8; ADDRESS_LEN] = value
            .try_into()
            .map_err(|_| AddressError::InvalidLength(value_len, ADDRESS_LEN))?;

        Ok(Self::from_bytes(checked_value))
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let digits = strip_hex_prefix(value).ok_or(AddressError::MissingPrefix)?;
        Self::try_from(hex::decode(digits)?.as_slice())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Address").field(&self.to_hex()).finish()
    }
}

impl Serialize for Address {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serialize_hex(self.as_bytes(), serializer)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let bytes = deserialize_hex(deserializer)?;

        bytes
            .as_slice()
            .try_into()
            .map_err(|err: AddressError| serde::de::Error::custom(err.to_string()))
    }
}

/// Error types for `Address` struct.
#[derive(Error, Debug, PartialEq)]
pub enum AddressError {
    /// Address has an invalid length.
    #[error("invalid address length {0} bytes, expected {1} bytes")]
    InvalidLength(usize, usize),

    /// Address string contains invalid hexadecimal characters.
    #[error("invalid hex encoding in address string")]
    InvalidHexEncoding(#[from] hex::FromHexError),

    /// Address string does not start with `0x`.
    #[error("address string is missing the 0x prefix")]
    MissingPrefix,
}

/// Anything which can be canonicalized into an [`Address`].
pub trait AddressLike {
    fn to_address(&self) -> Result<Address, AddressError>;
}

impl AddressLike for Address {
    fn to_address(&self) -> Result<Address, AddressError> {
        Ok(*self)
    }
}

impl AddressLike for str {
    fn to_address(&self) -> Result<Address, AddressError> {
        self.parse()
    }
}

impl AddressLike for String {
    fn to_address(&self) -> Result<Address, AddressError> {
        self.parse()
    }
}

impl<T: AddressLike + ?Sized> AddressLike for &T {
    fn to_address(&self) -> Result<Address, AddressError> {
        (**self).to_address()
    }
}

/// Set of addresses with case-insensitive membership.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressSet(BTreeSet<Address>);

impl AddressSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an address, returns `true` if it was not present yet.
    pub fn insert<A: AddressLike + ?Sized>(&mut self, address: &A) -> Result<bool, AddressError> {
        Ok(self.0.insert(address.to_address()?))
    }

    /// Returns `true` if the address is in the set. Malformed addresses are never contained.
    pub fn contains<A: AddressLike + ?Sized>(&self, address: &A) -> bool {
        address
            .to_address()
            .map(|address| self.0.contains(&address))
            .unwrap_or(false)
    }

    /// Remove an address, returns `true` if it was present.
    pub fn remove<A: AddressLike + ?Sized>(&mut self, address: &A) -> bool {
        address
            .to_address()
            .map(|address| self.0.remove(&address))
            .unwrap_or(false)
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> btree_set::Iter<'_, Address> {
        self.0.iter()
    }
}

impl FromIterator<Address> for AddressSet {
    fn from_iter<I: IntoIterator<Item = Address>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for AddressSet {
    type Item = Address;
    type IntoIter = btree_set::IntoIter<Address>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a AddressSet {
    type Item = &'a Address;
    type IntoIter = btree_set::Iter<'a, Address>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Map keyed by address with case-insensitive lookups.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressMap<V>(BTreeMap<Address, V>);

impl<V> Default for AddressMap<V> {
    fn default() -> Self {
        Self(BTreeMap::new())
    }
}

impl<V> AddressMap<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get<A: AddressLike + ?Sized>(&self, address: &A) -> Option<&V> {
        address
            .to_address()
            .ok()
            .and_then(|address| self.0.get(&address))
    }

    pub fn get_mut<A: AddressLike + ?Sized>(&mut self, address: &A) -> Option<&mut V> {
        address
            .to_address()
            .ok()
            .and_then(|address| self.0.get_mut(&address))
    }

    /// Set the value for an address, returns the previous value if there was one.
    pub fn set<A: AddressLike + ?Sized>(
        &mut self,
        address: &A,
        value: V,
    ) -> Result<Option<V>, AddressError> {
        Ok(self.0.insert(address.to_address()?, value))
    }

    pub fn has<A: AddressLike + ?Sized>(&self, address: &A) -> bool {
        self.get(address).is_some()
    }

    pub fn remove<A: AddressLike + ?Sized>(&mut self, address: &A) -> Option<V> {
        address
            .to_address()
            .ok()
            .and_then(|address| self.0.remove(&address))
    }

    pub fn entry(&mut self, address: Address) -> btree_map::Entry<'_, Address, V> {
        self.0.entry(address)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, Address, V> {
        self.0.iter()
    }

    pub fn values(&self) -> btree_map::Values<'_, Address, V> {
        self.0.values()
    }
}

impl<V> FromIterator<(Address, V)> for AddressMap<V> {
    fn from_iter<I: IntoIterator<Item = (Address, V)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::{Address, AddressError, AddressMap, AddressSet};

    const MIXED_CASE: &str = "0x8401Eb5ff34cc943f096A32EF3d5113FEbE8D4Eb";

    #[test]
    fn canonical_display() {
        let address: Address = MIXED_CASE.parse().unwrap();
        assert_eq!(
            address.to_string(),
            "0x8401eb5ff34cc943f096a32ef3d5113febe8d4eb"
        );
        assert_eq!(address, MIXED_CASE.to_uppercase().replace("0X", "0x").parse().unwrap());
    }

    #[test]
    fn set_membership_ignores_case() {
        let mut set = AddressSet::new();
        assert!(set.insert(MIXED_CASE).unwrap());
        assert!(set.contains(&MIXED_CASE.to_uppercase()));
        assert!(set.contains(&MIXED_CASE.to_lowercase()));

        // Inserting the same address in another case is a no-op.
        assert!(!set.insert(&MIXED_CASE.to_lowercase()).unwrap());
        assert_eq!(set.len(), 1);

        assert!(set.remove(&MIXED_CASE.to_uppercase()));
        assert!(set.is_empty());
    }

    #[test]
    fn map_keys_ignore_case() {
        let mut map = AddressMap::new();
        map.set(MIXED_CASE, "agent").unwrap();
        assert!(map.has(&MIXED_CASE.to_uppercase()));
        assert_eq!(map.get(&MIXED_CASE.to_lowercase()), Some(&"agent"));

        let previous = map.set(&MIXED_CASE.to_lowercase(), "vault").unwrap();
        assert_eq!(previous, Some("agent"));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn malformed_addresses() {
        assert_eq!(
            "8401eb5ff34cc943f096a32ef3d5113febe8d4eb".parse::<Address>(),
            Err(AddressError::MissingPrefix)
        );
        assert_eq!(
            "0x8401eb".parse::<Address>(),
            Err(AddressError::InvalidLength(3, 20))
        );
        assert!(matches!(
            "0xnotreallyanaddress".parse::<Address>(),
            Err(AddressError::InvalidHexEncoding(_))
        ));

        let mut set = AddressSet::new();
        assert!(set.insert("agent:0").is_err());
        assert!(!set.contains("agent:0"));
    }

    #[test]
    fn serialize() {
        let address: Address = MIXED_CASE.parse().unwrap();

        let json = serde_json::to_string(&address).unwrap();
        assert_eq!(json, "\"0x8401eb5ff34cc943f096a32ef3d5113febe8d4eb\"");
        let decoded: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, address);

        let mut bytes: Vec<u8> = Vec::new();
        ciborium::ser::into_writer(&address, &mut bytes).unwrap();
        assert_eq!(bytes[0], 84);
        assert_eq!(&bytes[1..], address.as_bytes());
        let decoded: Address = ciborium::de::from_reader(&bytes[..]).unwrap();
        assert_eq!(decoded, address);
    }
}
