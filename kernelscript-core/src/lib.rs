// SPDX-License-Identifier: MIT OR Apache-2.0

//! Primitive data types shared by every layer that manages permissions of kernel-rooted
//! organizations: canonicalizing addresses, role hashes, application ids and counterfactual
//! proxy addresses.
pub mod address;
pub mod create;
pub mod namehash;
pub mod role;
mod serde;

pub use address::{ADDRESS_LEN, Address, AddressError, AddressLike, AddressMap, AddressSet};
pub use create::predict;
pub use namehash::namehash;
pub use role::{ROLE_HASH_LEN, RoleHash, RoleHashError};
