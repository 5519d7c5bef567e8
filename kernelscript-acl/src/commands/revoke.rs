// SPDX-License-Identifier: MIT OR Apache-2.0

use tracing::debug;

use crate::action::Action;
use crate::commands::{ScriptValue, resolve_address};
use crate::error::AclError;
use crate::scope::ContextStack;

/// Revoke a permission: `revoke <grantee> <app> <role> [removeManager]`.
///
/// `remove_manager` has to be a boolean when given.
pub fn revoke(
    stack: &mut ContextStack,
    grantee: &ScriptValue,
    app: &ScriptValue,
    role: &ScriptValue,
    remove_manager: Option<&ScriptValue>,
) -> Result<Vec<Action>, AclError> {
    let grantee = resolve_address(stack, grantee)?;
    let (id, key) = stack.resolve_app(&app.to_entity()?)?;
    let role = role.to_role()?;
    let remove_manager = remove_manager
        .map(ScriptValue::to_bool)
        .transpose()?
        .unwrap_or(false);

    debug!(%grantee, app = %key, %role, remove_manager, "revoke");
    stack
        .get_mut(id)
        .ok_or_else(|| AclError::not_found("organization", &key))?
        .revoke(grantee, &key, &role, remove_manager)
}
