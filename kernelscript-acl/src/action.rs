// SPDX-License-Identifier: MIT OR Apache-2.0

//! Encoded contract calls emitted by mutating operations.
//!
//! Actions are only described here, submitting, batching or forwarding them is up to the
//! caller.
use alloy_primitives::{B256, Bytes, U256};
use alloy_sol_types::{SolCall, sol};
use kernelscript_core::{Address, RoleHash};

use crate::expression::OracleParams;

sol! {
    function createPermission(address _entity, address _app, bytes32 _role, address _manager);
    function grantPermission(address _entity, address _app, bytes32 _role);
    function grantPermissionP(address _entity, address _app, bytes32 _role, uint256[] _params);
    function revokePermission(address _entity, address _app, bytes32 _role);
    function removePermissionManager(address _app, bytes32 _role);
    function newAppInstance(bytes32 _appId, address _appBase, bytes _initializePayload, bool _setDefault);
}

/// Call to be executed on behalf of the organization.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Action {
    pub to: Address,
    pub data: Vec<u8>,
    pub value: Option<U256>,
}

impl Action {
    fn call(to: Address, call: impl SolCall) -> Self {
        Self {
            to,
            data: call.abi_encode(),
            value: None,
        }
    }

    /// 4-byte selector of the encoded call.
    pub fn selector(&self) -> Option<[u8; 4]> {
        self.data.get(..4).and_then(|bytes| bytes.try_into().ok())
    }

    pub fn create_permission(
        acl: Address,
        entity: Address,
        app: Address,
        role: RoleHash,
        manager: Address,
    ) -> Self {
        Self::call(
            acl,
            createPermissionCall {
                _entity: entity.into(),
                _app: app.into(),
                _role: role.into(),
                _manager: manager.into(),
            },
        )
    }

    pub fn grant_permission(acl: Address, entity: Address, app: Address, role: RoleHash) -> Self {
        Self::call(
            acl,
            grantPermissionCall {
                _entity: entity.into(),
                _app: app.into(),
                _role: role.into(),
            },
        )
    }

    pub fn grant_permission_p(
        acl: Address,
        entity: Address,
        app: Address,
        role: RoleHash,
        params: &OracleParams,
    ) -> Self {
        Self::call(
            acl,
            grantPermissionPCall {
                _entity: entity.into(),
                _app: app.into(),
                _role: role.into(),
                _params: params.to_uints(),
            },
        )
    }

    pub fn revoke_permission(acl: Address, entity: Address, app: Address, role: RoleHash) -> Self {
        Self::call(
            acl,
            revokePermissionCall {
                _entity: entity.into(),
                _app: app.into(),
                _role: role.into(),
            },
        )
    }

    pub fn remove_permission_manager(acl: Address, app: Address, role: RoleHash) -> Self {
        Self::call(
            acl,
            removePermissionManagerCall {
                _app: app.into(),
                _role: role.into(),
            },
        )
    }

    pub fn new_app_instance(
        kernel: Address,
        app_id: B256,
        code_address: Address,
        initialize_payload: Vec<u8>,
    ) -> Self {
        Self::call(
            kernel,
            newAppInstanceCall {
                _appId: app_id,
                _appBase: code_address.into(),
                _initializePayload: Bytes::from(initialize_payload),
                _setDefault: false,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use alloy_sol_types::SolCall;
    use kernelscript_core::{Address, RoleHash};

    use crate::expression::{arg, or};

    use super::{Action, createPermissionCall, grantPermissionCall};

    #[test]
    fn selectors() {
        let acl = Address::from_bytes([1; 20]);
        let entity = Address::from_bytes([2; 20]);
        let app = Address::from_bytes([3; 20]);
        let role = RoleHash::from_name("TRANSFER_ROLE");

        let action = Action::grant_permission(acl, entity, app, role);
        assert_eq!(action.to, acl);
        // keccak256("grantPermission(address,address,bytes32)")[..4]
        assert_eq!(grantPermissionCall::SELECTOR, [0x0a, 0x8e, 0xd3, 0xdb]);
        assert_eq!(action.selector(), Some(grantPermissionCall::SELECTOR));
        assert_eq!(action.data.len(), 4 + 3 * 32);
        assert_eq!(&action.data[4 + 12..4 + 32], entity.as_bytes());

        // keccak256("createPermission(address,address,bytes32,address)")[..4]
        let action = Action::create_permission(acl, entity, app, role, entity);
        assert_eq!(createPermissionCall::SELECTOR, [0xbe, 0x03, 0x84, 0x78]);
        assert_eq!(action.selector(), Some(createPermissionCall::SELECTOR));
        assert_eq!(action.data.len(), 4 + 4 * 32);
    }

    #[test]
    fn parametric_grant_carries_words() {
        let params = or(arg(0).eq(1u64), arg(1).eq(2u64)).encode().unwrap();
        let action = Action::grant_permission_p(
            Address::from_bytes([1; 20]),
            Address::from_bytes([2; 20]),
            Address::from_bytes([3; 20]),
            RoleHash::from_name("TRANSFER_ROLE"),
            &params,
        );

        // Selector, three static arguments, offset, length and three words.
        assert_eq!(action.data.len(), 4 + 32 * (3 + 2 + 3));
        let last_word = &action.data[action.data.len() - 32..];
        assert_eq!(last_word, params.words()[2].as_bytes());
    }
}
