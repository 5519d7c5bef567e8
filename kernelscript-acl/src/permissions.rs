// SPDX-License-Identifier: MIT OR Apache-2.0

//! Permission graph of an organization.
//!
//! Grants and revocations are applied to the cached permission state right away, before the
//! emitted actions are executed anywhere, so later statements of a script observe their
//! effect.
use kernelscript_core::{Address, RoleHash};
use tracing::debug;

use crate::action::Action;
use crate::app::Role;
use crate::error::AclError;
use crate::expression::OracleParams;
use crate::identifier::AppRef;
use crate::organization::Organization;

impl Organization {
    /// Grant `role` on the app `key` to `grantee`.
    ///
    /// A role which was never created requires a `manager` and is created first. Non-empty
    /// `params` grant the role under the encoded condition. Creating a role and granting it
    /// with parameters in one call emits two actions.
    pub fn grant(
        &mut self,
        grantee: Address,
        key: &AppRef,
        role: &RoleHash,
        manager: Option<Address>,
        params: Option<&OracleParams>,
    ) -> Result<Vec<Action>, AclError> {
        let acl = self.acl()?;
        let (app, role_label) = self.declared_role(key, role)?;
        let params = params.filter(|params| !params.is_empty());

        let state = self.role_mut(key, role)?;
        let granted = state.grantees.contains(&grantee);
        let already_granted = || AclError::AlreadyGranted {
            grantee,
            app: key.to_string(),
            role: role_label.clone(),
        };

        // Validate every branch before touching the state.
        let create = match state.manager {
            Some(_) => {
                if granted {
                    return Err(already_granted());
                }
                None
            }
            None => {
                let manager = manager.ok_or_else(|| AclError::Missing {
                    app: key.to_string(),
                    role: role_label.clone(),
                })?;
                if params.is_some() && granted {
                    return Err(already_granted());
                }
                Some(manager)
            }
        };

        let mut actions = Vec::new();
        match create {
            Some(manager) => {
                state.manager = Some(manager);
                actions.push(Action::create_permission(acl, grantee, app, *role, manager));
                if params.is_none() {
                    state.grantees.insert(&grantee)?;
                }
            }
            None if params.is_none() => {
                state.grantees.insert(&grantee)?;
                actions.push(Action::grant_permission(acl, grantee, app, *role));
            }
            None => (),
        }

        if let Some(params) = params {
            state.grantees.insert(&grantee)?;
            actions.push(Action::grant_permission_p(acl, grantee, app, *role, params));
        }

        debug!(
            %grantee,
            app = %key,
            role = %role_label,
            actions = actions.len(),
            "granted permission"
        );
        Ok(actions)
    }

    /// Revoke `role` on the app `key` from `grantee`, optionally removing the role's manager
    /// and with it every remaining grant.
    pub fn revoke(
        &mut self,
        grantee: Address,
        key: &AppRef,
        role: &RoleHash,
        remove_manager: bool,
    ) -> Result<Vec<Action>, AclError> {
        let acl = self.acl()?;
        let (app, role_label) = self.declared_role(key, role)?;

        let state = self.role_mut(key, role)?;
        if !state.grantees.remove(&grantee) {
            return Err(AclError::NotGranted {
                grantee,
                app: key.to_string(),
                role: role_label,
            });
        }

        let mut actions = vec![Action::revoke_permission(acl, grantee, app, *role)];
        if remove_manager {
            state.manager = None;
            state.grantees.clear();
            actions.push(Action::remove_permission_manager(acl, app, *role));
        }

        debug!(
            %grantee,
            app = %key,
            role = %role_label,
            remove_manager,
            "revoked permission"
        );
        Ok(actions)
    }

    /// Address of the app and a readable name of the role, failing if the app does not
    /// declare the role.
    fn declared_role(&self, key: &AppRef, role: &RoleHash) -> Result<(Address, String), AclError> {
        let app = self.resolve(key)?;
        let declaration = self.artifact(&app.code_address).and_then(|a| a.role(role));

        if !app.permissions.contains_key(role) {
            // Without an artifact the declared roles are unknown.
            self.abi(app)?;
            return Err(AclError::Invalid(format!(
                "role {role} is not declared on app {key}"
            )));
        }

        let label = declaration
            .map(|declaration| declaration.id.clone())
            .unwrap_or_else(|| role.to_string());
        Ok((app.address, label))
    }

    fn role_mut(&mut self, key: &AppRef, role: &RoleHash) -> Result<&mut Role, AclError> {
        self.app_mut(key)
            .and_then(|app| app.permissions.get_mut(role))
            .ok_or_else(|| AclError::not_found("role", role))
    }
}

#[cfg(test)]
mod tests {
    use alloy_sol_types::SolCall;
    use kernelscript_core::{Address, RoleHash};

    use crate::AclError;
    use crate::action::{createPermissionCall, grantPermissionCall};
    use crate::expression::{and, arg, block_number, oracle};
    use crate::identifier::AppRef;
    use crate::test_utils::{CREATE_PAYMENTS_ROLE, TRANSFER_ROLE, organization};

    fn finance() -> AppRef {
        "finance:0".parse().unwrap()
    }

    #[test]
    fn grant_creates_role_then_grants() {
        let mut organization = organization();
        let role = RoleHash::from_name(TRANSFER_ROLE);
        let voting = Address::from_bytes([0xaa; 20]);
        let grantee = Address::from_bytes([0xbb; 20]);

        let actions = organization
            .grant(voting, &finance(), &role, Some(voting), None)
            .unwrap();
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].selector(), Some(createPermissionCall::SELECTOR));
        assert_eq!(actions[0].to, organization.acl().unwrap());

        let actions = organization
            .grant(grantee, &finance(), &role, None, None)
            .unwrap();
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].selector(), Some(grantPermissionCall::SELECTOR));

        let state = &organization.app(&finance()).unwrap().permissions[&role];
        assert_eq!(state.manager, Some(voting));
        assert!(state.grantees.contains(&voting));
        assert!(state.grantees.contains(&grantee));
    }

    #[test]
    fn round_trip_keeps_manager() {
        let mut organization = organization();
        let role = RoleHash::from_name(TRANSFER_ROLE);
        let grantee = Address::from_bytes([0xbb; 20]);
        let manager = Address::from_bytes([0xcc; 20]);

        organization
            .grant(grantee, &finance(), &role, Some(manager), None)
            .unwrap();
        let actions = organization
            .revoke(grantee, &finance(), &role, false)
            .unwrap();
        assert_eq!(actions.len(), 1);

        let state = &organization.app(&finance()).unwrap().permissions[&role];
        assert!(state.grantees.is_empty());
        assert_eq!(state.manager, Some(manager));
    }

    #[test]
    fn revoke_with_manager_removal() {
        let mut organization = organization();
        let role = RoleHash::from_name(TRANSFER_ROLE);
        let grantee = Address::from_bytes([0xbb; 20]);
        let other = Address::from_bytes([0xdd; 20]);

        organization
            .grant(grantee, &finance(), &role, Some(grantee), None)
            .unwrap();
        organization
            .grant(other, &finance(), &role, None, None)
            .unwrap();

        let actions = organization
            .revoke(grantee, &finance(), &role, true)
            .unwrap();
        assert_eq!(actions.len(), 2);

        let state = &organization.app(&finance()).unwrap().permissions[&role];
        assert_eq!(state.manager, None);
        assert!(state.grantees.is_empty());
    }

    #[test]
    fn duplicate_grant_and_missing_revoke_fail() {
        let mut organization = organization();
        let role = RoleHash::from_name(TRANSFER_ROLE);
        let grantee = Address::from_bytes([0xbb; 20]);

        organization
            .grant(grantee, &finance(), &role, Some(grantee), None)
            .unwrap();
        assert!(matches!(
            organization.grant(grantee, &finance(), &role, None, None),
            Err(AclError::AlreadyGranted { .. })
        ));

        let stranger = Address::from_bytes([0xee; 20]);
        assert!(matches!(
            organization.revoke(stranger, &finance(), &role, false),
            Err(AclError::NotGranted { .. })
        ));
    }

    #[test]
    fn create_requires_manager() {
        let mut organization = organization();
        let role = RoleHash::from_name(CREATE_PAYMENTS_ROLE);
        let grantee = Address::from_bytes([0xbb; 20]);

        let result = organization.grant(grantee, &finance(), &role, None, None);
        assert!(matches!(result, Err(AclError::Missing { .. })));

        // Nothing was changed by the failed call.
        let state = &organization.app(&finance()).unwrap().permissions[&role];
        assert_eq!(state.manager, None);
        assert!(state.grantees.is_empty());
    }

    #[test]
    fn create_with_params_emits_two_actions() {
        let mut organization = organization();
        let role = RoleHash::from_name(TRANSFER_ROLE);
        let grantee = Address::from_bytes([0xbb; 20]);
        let params = and(
            oracle(Address::from_bytes([0x0a; 20])),
            block_number().gt(100u64),
        )
        .encode()
        .unwrap();

        let actions = organization
            .grant(grantee, &finance(), &role, Some(grantee), Some(&params))
            .unwrap();
        assert_eq!(actions.len(), 2);
        assert_eq!(actions[0].selector(), Some(createPermissionCall::SELECTOR));
        assert_ne!(actions[1].selector(), actions[0].selector());

        // A second parametric grant for the same grantee is rejected.
        let params = arg(0).lt(10u64).encode().unwrap();
        assert!(matches!(
            organization.grant(grantee, &finance(), &role, None, Some(&params)),
            Err(AclError::AlreadyGranted { .. })
        ));
    }

    #[test]
    fn unknown_role_and_app() {
        let mut organization = organization();
        let grantee = Address::from_bytes([0xbb; 20]);

        let result = organization.grant(
            grantee,
            &finance(),
            &RoleHash::from_name("UNKNOWN_ROLE"),
            Some(grantee),
            None,
        );
        assert!(matches!(result, Err(AclError::Invalid(_))));

        let result = organization.grant(
            grantee,
            &"voting:3".parse().unwrap(),
            &RoleHash::from_name(TRANSFER_ROLE),
            Some(grantee),
            None,
        );
        assert!(matches!(result, Err(AclError::NotFound { .. })));
    }
}
