// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::HashMap;

use kernelscript_core::{Address, predict};
use tracing::debug;

use crate::error::AclError;
use crate::traits::DataSource;

/// Session-local contract creation nonces.
///
/// The nonce of a creator is read from the chain once and counted up locally afterwards, so a
/// script can mint several counterfactual addresses in a row without asking the network again.
#[derive(Clone, Debug, Default)]
pub struct NonceTracker {
    nonces: HashMap<Address, u64>,
}

impl NonceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the nonce the next contract created by `creator` will use and reserves it.
    pub async fn next_nonce<S: DataSource>(
        &mut self,
        creator: Address,
        source: &S,
    ) -> Result<u64, AclError> {
        let nonce = match self.nonces.get(&creator) {
            Some(nonce) => *nonce,
            None => {
                let nonce = source
                    .transaction_count(creator)
                    .await
                    .map_err(AclError::unavailable)?;
                debug!(%creator, nonce, "seeded creation nonce");
                nonce
            }
        };

        self.nonces.insert(creator, nonce + 1);
        Ok(nonce)
    }

    /// Reserve the next nonce of `creator` and return the address it will deploy to.
    pub async fn next_address<S: DataSource>(
        &mut self,
        creator: Address,
        source: &S,
    ) -> Result<Address, AclError> {
        let nonce = self.next_nonce(creator, source).await?;
        Ok(predict(&creator, nonce))
    }
}
