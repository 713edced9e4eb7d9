//! Credential and authentication-state types.

use serde::Deserialize;

use crate::error::{Error, Result};

/// OAuth credentials for the single live `Planning Center` session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// Bearer token for API calls.
    pub access_token: Option<String>,
    /// Token used to obtain a new access token.
    pub refresh_token: Option<String>,
    /// Expiry in milliseconds since the Unix epoch.
    pub expires_at_millis: Option<i64>,
}

impl Credentials {
    /// Classify these credentials at the given instant.
    pub fn state(&self, now_millis: i64) -> AuthState {
        let unexpired = self.expires_at_millis.is_some_and(|exp| now_millis < exp);
        match (&self.access_token, &self.refresh_token) {
            (Some(token), _) if unexpired => AuthState::Valid(token.clone()),
            (None, None) => AuthState::Unauthenticated,
            (_, Some(refresh)) => AuthState::ExpiredWithRefresh(refresh.clone()),
            (Some(_), None) => AuthState::ExpiredWithoutRefresh,
        }
    }

    /// True when no field is set.
    pub const fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none() && self.expires_at_millis.is_none()
    }
}

/// Authentication state derived from [`Credentials`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    /// No credentials in memory or storage.
    Unauthenticated,
    /// Access token present and not yet expired.
    Valid(String),
    /// Access token expired or absent, refresh token available.
    ExpiredWithRefresh(String),
    /// Access token expired and no refresh token.
    ExpiredWithoutRefresh,
}

/// Token endpoint response.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenExchangeResult {
    /// Newly issued access token.
    pub access_token: String,
    /// Refresh token; providers may omit it on refresh.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Server issue time, seconds since the epoch.
    pub created_at: i64,
    /// Lifetime in seconds from `created_at`.
    pub expires_in: i64,
}

impl TokenExchangeResult {
    /// Expiry derived from the server's own clock.
    ///
    /// Fails when the server's timestamps do not fit in epoch milliseconds.
    pub fn expires_at_millis(&self) -> Result<i64> {
        self.created_at
            .checked_add(self.expires_in)
            .and_then(|secs| secs.checked_mul(1000))
            .ok_or_else(|| {
                Error::parse(
                    format!(
                        "Invalid token lifetime: created_at={} expires_in={}",
                        self.created_at, self.expires_in
                    ),
                    None,
                )
            })
    }

    /// Convert into storable credentials.
    pub fn into_credentials(self) -> Result<Credentials> {
        let expires_at_millis = Some(self.expires_at_millis()?);
        Ok(Credentials {
            access_token: Some(self.access_token),
            refresh_token: self.refresh_token,
            expires_at_millis,
        })
    }
}
