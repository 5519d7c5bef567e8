// SPDX-License-Identifier: MIT OR Apache-2.0

//! Counterfactual contract addresses.
//!
//! A contract created with `CREATE` receives the address `keccak256(rlp([creator, nonce]))[12..]`.
//! Kernels deploy every application proxy that way, so the address of a not-yet-installed app
//! is known as soon as the kernel's next nonce is known.
use crate::address::Address;

/// Compute the address a contract deployed by `creator` at `nonce` will receive.
pub fn predict(creator: &Address, nonce: u64) -> Address {
    let creator: alloy_primitives::Address = (*creator).into();
    Address::from(creator.create(nonce))
}

#[cfg(test)]
mod tests {
    use crate::Address;

    use super::predict;

    #[test]
    fn known_creation_addresses() {
        let creator: Address = "0x6ac7ea33f8831ea9dcc53393aaa88b25a785dbf0".parse().unwrap();

        let expected = [
            "0xcd234a471b72ba2f1ccf0a70fcaba648a5eecd8d",
            "0x343c43a37d37dff08ae8c4a11544c718abb4fcf8",
            "0xf778b86fa74e846c4f0a1fbd1335fe81c00a0c91",
            "0xfffd933a0bc612844eaf0c6fe3e5b8e9b6c1d19c",
        ];

        for (nonce, address) in expected.iter().enumerate() {
            assert_eq!(predict(&creator, nonce as u64).to_string(), *address);
        }
    }

    #[test]
    fn multi_byte_nonces() {
        let creator: Address = "0xb20a608c624ca5003905aa834de7156c68b2e1d0".parse().unwrap();

        let expected = [
            (0x80, "0x40ef63d70dd790be41533fc53a85d043a5abe6f5"),
            (0xffff, "0x831e03eab325490cdd1370433ae70581cf444644"),
            (0x1_0000_0000, "0xa2075fe2c763393db2a7bd98c7c124633c78b424"),
        ];

        for (nonce, address) in expected {
            assert_eq!(predict(&creator, nonce).to_string(), address);
        }
    }

    #[test]
    fn prediction_is_pure() {
        let creator = Address::from_bytes([7; 20]);
        assert_eq!(predict(&creator, 42), predict(&creator, 42));
        assert_ne!(predict(&creator, 42), predict(&creator, 43));
    }
}
