//! Cached credential persistence.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::auth::credentials::Credentials;
use crate::auth::storage::KeyValueStore;
use crate::constants::storage::{ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, TOKEN_EXPIRY_KEY};
use crate::error::Result;

/// Maps [`Credentials`] onto three persisted keys, caching them in memory.
///
/// Performs no expiry validation; see [`crate::auth::Authenticator`].
pub struct TokenStore {
    backend: Arc<dyn KeyValueStore>,
    cached: Mutex<Credentials>,
}

impl TokenStore {
    /// Create a store over `backend` with nothing cached yet.
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self {
            backend,
            cached: Mutex::new(Credentials::default()),
        }
    }

    fn cache(&self) -> MutexGuard<'_, Credentials> {
        self.cached.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Return the in-memory credentials, reading storage only when no access
    /// token is cached.
    pub fn load(&self) -> Result<Credentials> {
        let mut cached = self.cache();
        if cached.access_token.is_none() {
            let expiry = self.backend.get(TOKEN_EXPIRY_KEY)?;
            *cached = Credentials {
                access_token: self.backend.get(ACCESS_TOKEN_KEY)?,
                refresh_token: self.backend.get(REFRESH_TOKEN_KEY)?,
                expires_at_millis: expiry.and_then(|raw| {
                    raw.parse::<i64>()
                        .map_err(|e| tracing::warn!("Ignoring unparsable token expiry {raw:?}: {e}"))
                        .ok()
                }),
            };
            tracing::debug!(
                has_access = cached.access_token.is_some(),
                has_refresh = cached.refresh_token.is_some(),
                expires_at = ?cached.expires_at_millis,
                "Loaded credentials from storage"
            );
        }
        Ok(cached.clone())
    }

    /// Persist every present field; absent fields keep their previous value
    /// both in storage and in memory.
    pub fn save(&self, credentials: &Credentials) -> Result<()> {
        let mut cached = self.cache();
        if let Some(token) = &credentials.access_token {
            self.backend.set(ACCESS_TOKEN_KEY, token)?;
            cached.access_token = Some(token.clone());
        }
        if let Some(token) = &credentials.refresh_token {
            self.backend.set(REFRESH_TOKEN_KEY, token)?;
            cached.refresh_token = Some(token.clone());
        }
        if let Some(expiry) = credentials.expires_at_millis {
            self.backend.set(TOKEN_EXPIRY_KEY, &expiry.to_string())?;
            cached.expires_at_millis = Some(expiry);
        }
        Ok(())
    }

    /// Remove all persisted keys and forget the cached credentials.
    pub fn clear(&self) -> Result<()> {
        let mut cached = self.cache();
        *cached = Credentials::default();
        for key in [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, TOKEN_EXPIRY_KEY] {
            self.backend.remove(key)?;
        }
        Ok(())
    }
}
