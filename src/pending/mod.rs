//! Staging store for identities that do not exist yet.
//!
//! Registration and password-reset flows need a durable-but-temporary handle
//! before the real account exists or before a risky mutation is confirmed.
//! Records are staged under an unguessable token and consumed exactly once;
//! absent, expired, and already-consumed all look identical to callers.

use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{RngCore, rngs::OsRng};
use serde::{Serialize, de::DeserializeOwned};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::store::{ChallengeStore, StoreError};

#[derive(Debug, Error)]
pub enum PendingError {
    #[error("failed to encode pending record: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to decode pending record: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("failed to generate registration token")]
    TokenGeneration,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Create a new staging token.
///
/// The raw token is only sent to the user; storage is keyed by its hash.
///
/// # Errors
///
/// Returns an error if the OS random source fails.
pub fn generate_token() -> Result<String, PendingError> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|_| PendingError::TokenGeneration)?;
    Ok(Base64UrlUnpadded::encode_string(&bytes))
}

fn storage_key(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!(
        "pending:{}",
        Base64UrlUnpadded::encode_string(&hasher.finalize())
    )
}

#[derive(Clone)]
pub struct PendingRegistrationStore {
    store: Arc<dyn ChallengeStore>,
}

impl std::fmt::Debug for PendingRegistrationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingRegistrationStore")
            .finish_non_exhaustive()
    }
}

impl PendingRegistrationStore {
    #[must_use]
    pub fn new(store: Arc<dyn ChallengeStore>) -> Self {
        Self { store }
    }

    /// Stage a record under `token` for at most `ttl`.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be serialized or stored.
    pub async fn stage<T: Serialize>(
        &self,
        token: &str,
        record: &T,
        ttl: Duration,
    ) -> Result<(), PendingError> {
        let payload = serde_json::to_string(record).map_err(PendingError::Encode)?;
        self.store.set(&storage_key(token), &payload, ttl).await?;
        Ok(())
    }

    /// Atomically take the record staged under `token`.
    ///
    /// Returns `None` for absent, expired, and already-consumed tokens alike;
    /// callers must surface all three as one "invalid or expired" outcome.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails or the payload does not decode.
    pub async fn consume<T: DeserializeOwned>(&self, token: &str) -> Result<Option<T>, PendingError> {
        let Some(payload) = self.store.get_and_delete(&storage_key(token)).await? else {
            return Ok(None);
        };
        serde_json::from_str(&payload)
            .map(Some)
            .map_err(PendingError::Decode)
    }
}
