// SPDX-License-Identifier: MIT OR Apache-2.0

use tracing::debug;

use crate::action::Action;
use crate::commands::{ScriptValue, resolve_address};
use crate::error::AclError;
use crate::scope::ContextStack;

/// Grant a permission: `grant <grantee> <app> <role> [manager] [params]`.
///
/// Grantee and manager resolve in the current scopes, the app is looked up in the
/// organization selected by its DAO prefix (the innermost one without prefix).
pub fn grant(
    stack: &mut ContextStack,
    grantee: &ScriptValue,
    app: &ScriptValue,
    role: &ScriptValue,
    manager: Option<&ScriptValue>,
    params: Option<&ScriptValue>,
) -> Result<Vec<Action>, AclError> {
    let grantee = resolve_address(stack, grantee)?;
    let (id, key) = stack.resolve_app(&app.to_entity()?)?;
    let role = role.to_role()?;
    let manager = manager
        .map(|manager| resolve_address(stack, manager))
        .transpose()?;
    let params = params.map(ScriptValue::to_params).transpose()?;

    debug!(%grantee, app = %key, %role, "grant");
    stack
        .get_mut(id)
        .ok_or_else(|| AclError::not_found("organization", &key))?
        .grant(grantee, &key, &role, manager, params.as_ref())
}
