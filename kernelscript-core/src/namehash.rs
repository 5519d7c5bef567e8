// SPDX-License-Identifier: MIT OR Apache-2.0

//! ENS name hashing, used to derive application ids from repository names.
use alloy_primitives::{B256, keccak256};

/// Recursively hash a dot-separated name as specified in EIP-137.
///
/// `namehash("voting.aragonpm.eth")` is the app id under which the kernel registers every
/// instance of the `voting` repository.
pub fn namehash(name: &str) -> B256 {
    let mut node = B256::ZERO;
    if name.is_empty() {
        return node;
    }

    for label in name.rsplit('.') {
        let label_hash = keccak256(label.as_bytes());
        let mut buf = [0u8; 64];
        buf[..32].copy_from_slice(node.as_slice());
        buf[32..].copy_from_slice(label_hash.as_slice());
        node = keccak256(buf);
    }

    node
}
