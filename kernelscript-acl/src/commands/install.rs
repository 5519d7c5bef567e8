// SPDX-License-Identifier: MIT OR Apache-2.0

use tracing::debug;

use crate::action::Action;
use crate::app::App;
use crate::commands::ScriptValue;
use crate::config::Config;
use crate::error::AclError;
use crate::identifier::{AppRef, LabeledAppIdentifier, parse_dao_prefix};
use crate::nonce::NonceTracker;
use crate::scope::ContextStack;
use crate::traits::DataSource;

/// Install a new app instance: `install <name>[.<registry>]:<label> [payload]`.
///
/// The latest version of the app's repository is installed at the address the kernel will
/// create the proxy at. The app is registered under its labeled identifier right away so
/// later statements can refer to it.
pub async fn install<S: DataSource>(
    stack: &mut ContextStack,
    source: &S,
    config: &Config,
    nonces: &mut NonceTracker,
    identifier: &ScriptValue,
    initialize_payload: Vec<u8>,
) -> Result<Vec<Action>, AclError> {
    let (dao, rest) = parse_dao_prefix(identifier.as_str()?)?;
    let labeled: LabeledAppIdentifier = rest.parse()?;
    let key = AppRef::from(labeled.clone());

    let id = stack.select(dao)?;
    let organization = stack
        .get(id)
        .ok_or_else(|| AclError::not_found("organization", &labeled))?;
    if organization.app(&key).is_some() {
        return Err(AclError::Invalid(format!(
            "identifier {key} is already in use"
        )));
    }
    let kernel = organization.kernel();

    let registry = config.full_registry(labeled.registry.as_deref());
    let repo = source
        .fetch_repo(&labeled.name, &registry)
        .await
        .map_err(AclError::unavailable)?;

    let artifact = match organization.artifact(&repo.code_address) {
        Some(artifact) => artifact.clone(),
        None => source
            .fetch_artifact(&repo.content_locator)
            .await
            .map_err(AclError::unavailable)?,
    };

    let address = nonces.next_address(kernel, source).await?;
    let app = App::new(
        address,
        repo.code_address,
        labeled.name,
        registry,
        Some(repo.content_locator),
        Some(&artifact),
    );
    let action =
        Action::new_app_instance(kernel, app.app_id(), repo.code_address, initialize_payload);

    debug!(app = %key, %address, code = %repo.code_address, "install");
    let organization = stack
        .get_mut(id)
        .ok_or_else(|| AclError::not_found("organization", &key))?;
    organization.insert_artifact(repo.code_address, artifact);
    organization.insert_app(key, app)?;

    Ok(vec![action])
}
