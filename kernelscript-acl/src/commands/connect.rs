// SPDX-License-Identifier: MIT OR Apache-2.0

use tracing::debug;

use crate::cache::AppCacheBuilder;
use crate::commands::ScriptValue;
use crate::config::Config;
use crate::error::AclError;
use crate::scope::ContextStack;
use crate::traits::DataSource;

/// Connect to the organization at `dao` and run `body` inside its scope.
///
/// The organization is built from the data source and pushed on the stack, optionally under a
/// `name` nested identifiers can refer to it by. The scope is left again when `body` returns,
/// whether it succeeded or not.
pub async fn connect<S, T, F>(
    stack: &mut ContextStack,
    source: &S,
    config: &Config,
    dao: &ScriptValue,
    name: Option<&str>,
    body: F,
) -> Result<T, AclError>
where
    S: DataSource,
    F: AsyncFnOnce(&mut ContextStack) -> Result<T, AclError>,
{
    let kernel = dao.to_address()?;
    let mut organization = AppCacheBuilder::new(source, config).build(kernel).await?;
    if let Some(name) = name {
        organization.set_name(name);
    }

    debug!(
        %kernel,
        name,
        apps = organization.apps().count(),
        depth = stack.depth(),
        "connect"
    );

    let mut scope = stack.enter(organization);
    body(&mut *scope).await
}
