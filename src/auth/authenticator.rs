//! Access-token acquisition for the `Planning Center` OAuth provider.
//!
//! [`Authenticator::get_access_token`] returns a cached token while it is
//! valid, refreshes it when it has expired, and otherwise re-initiates
//! authorization through a [`Navigator`] before failing with
//! [`Error::AuthenticationRequired`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Utc;
use oauth2::basic::BasicClient;
use oauth2::url::Url;
use oauth2::{AuthUrl, ClientId, ClientSecret, CsrfToken, RedirectUrl, Scope};
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde_json::{json, Value};
use tokio::sync::Mutex;

use crate::auth::credentials::{AuthState, TokenExchangeResult};
use crate::auth::token_store::TokenStore;
use crate::config::Config;
use crate::constants::{http, oauth};
use crate::error::{Error, Result};

/// Receives the authorize URL when the user must (re-)authorize.
///
/// Recovery happens out-of-band: the user visits the URL and the provider
/// calls back with a code for [`Authenticator::exchange_authorization_code`].
pub trait Navigator: Send + Sync {
    /// Send the user to `url`.
    fn navigate(&self, url: &Url);
}

/// Prints the authorize URL to stderr for the user to open.
#[derive(Debug, Default, Clone, Copy)]
pub struct PrintNavigator;

impl Navigator for PrintNavigator {
    fn navigate(&self, url: &Url) {
        eprintln!("Planning Center authorization required. Open this URL in a browser:\n\n  {url}\n");
    }
}

/// A built authorize redirect. Not persisted.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    /// Provider authorize URL carrying client id, redirect URI, scopes and state.
    pub url: Url,
    /// CSRF state embedded in the URL.
    pub csrf_state: CsrfToken,
}

/// Produces valid access tokens, refreshing or re-authorizing as needed.
pub struct Authenticator {
    store: Arc<TokenStore>,
    oauth: BasicClient,
    client_id: String,
    client_secret: ClientSecret,
    redirect_uri: String,
    token_url: String,
    http: Client,
    navigator: Arc<dyn Navigator>,
    refresh_lock: Mutex<()>,
    // Bumped each time the user is sent to the authorize URL.
    authorization_epoch: AtomicU64,
}

impl Authenticator {
    /// Build an authenticator for the provider described by `config`.
    pub fn new(config: &Config, store: Arc<TokenStore>, navigator: Arc<dyn Navigator>) -> Result<Self> {
        let base = config.pco_base_url.trim_end_matches('/');
        let auth_url = AuthUrl::new(format!("{base}{}", oauth::AUTHORIZE_PATH))
            .map_err(|e| Error::config(format!("Invalid authorize URL: {e}"), "Check PCO_BASE_URL"))?;
        let redirect_uri = config.redirect_uri();
        let redirect = RedirectUrl::new(redirect_uri.clone())
            .map_err(|e| Error::config(format!("Invalid redirect URI: {e}"), "Check APP_ORIGIN"))?;
        let client_secret = ClientSecret::new(config.pco_secret.clone());

        let oauth = BasicClient::new(
            ClientId::new(config.pco_app_id.clone()),
            Some(client_secret.clone()),
            auth_url,
            None,
        )
        .set_redirect_uri(redirect);

        Ok(Self {
            store,
            oauth,
            client_id: config.pco_app_id.clone(),
            client_secret,
            redirect_uri,
            token_url: format!("{base}{}", oauth::TOKEN_PATH),
            http: Client::builder()
                .timeout(StdDuration::from_secs(http::TIMEOUT_SECS))
                .build()
                .unwrap_or_default(),
            navigator,
            refresh_lock: Mutex::new(()),
            authorization_epoch: AtomicU64::new(0),
        })
    }

    /// The credential store this authenticator mutates.
    pub const fn store(&self) -> &Arc<TokenStore> {
        &self.store
    }

    /// Current authentication state, loading from storage if nothing is cached.
    pub fn state(&self) -> Result<AuthState> {
        Ok(self.store.load()?.state(Utc::now().timestamp_millis()))
    }

    /// Return a currently valid access token.
    ///
    /// A cached unexpired token is returned without any I/O. Expired tokens
    /// are refreshed once; concurrent callers wait for that refresh instead of
    /// starting their own. When no session can be recovered, authorization is
    /// re-initiated and [`Error::AuthenticationRequired`] is returned. Callers
    /// queued behind a refresh that ended in re-authorization share that
    /// navigation instead of starting another.
    pub async fn get_access_token(&self) -> Result<String> {
        if let AuthState::Valid(token) = self.state()? {
            return Ok(token);
        }

        let epoch = self.authorization_epoch.load(Ordering::Acquire);
        let _guard = self.refresh_lock.lock().await;

        // A refresh may have completed while we waited for the lock.
        match self.state()? {
            AuthState::Valid(token) => {
                tracing::debug!("Access token refreshed by a concurrent caller");
                return Ok(token);
            }
            AuthState::ExpiredWithRefresh(refresh_token) => match self.refresh(&refresh_token).await {
                Ok(token) => return Ok(token),
                Err(e) => tracing::error!("Error refreshing token: {e}"),
            },
            AuthState::Unauthenticated | AuthState::ExpiredWithoutRefresh => {
                if self.authorization_epoch.load(Ordering::Acquire) != epoch {
                    tracing::debug!("Authorization already initiated by a concurrent caller");
                    return Err(Error::AuthenticationRequired);
                }
            }
        }

        tracing::error!("No valid tokens found, authorization required");
        self.initiate_authorization()?;
        Err(Error::AuthenticationRequired)
    }

    /// Build the provider authorize URL without navigating.
    pub fn authorization_request(&self) -> AuthorizationRequest {
        let (url, csrf_state) = self
            .oauth
            .authorize_url(CsrfToken::new_random)
            .add_scopes(oauth::SCOPES.iter().map(|s| Scope::new((*s).to_string())))
            .url();
        AuthorizationRequest { url, csrf_state }
    }

    /// Drop stored credentials and send the user to the authorize URL.
    pub fn initiate_authorization(&self) -> Result<AuthorizationRequest> {
        self.store.clear()?;
        self.authorization_epoch.fetch_add(1, Ordering::AcqRel);
        let request = self.authorization_request();
        tracing::info!("Initiating Planning Center authorization");
        self.navigator.navigate(&request.url);
        Ok(request)
    }

    /// Exchange an authorization code from the provider callback for tokens.
    pub async fn exchange_authorization_code(&self, code: &str) -> Result<()> {
        tracing::debug!("Starting token exchange");
        let body = json!({
            "grant_type": "authorization_code",
            "code": code,
            "client_id": self.client_id,
            "client_secret": self.client_secret.secret(),
            "redirect_uri": self.redirect_uri,
        });

        let result = self
            .request_token(&body)
            .await
            .inspect_err(|e| tracing::error!("Token exchange failed: {e}"))?;
        self.store.save(&result.into_credentials()?)?;

        tracing::info!("Token exchange successful");
        Ok(())
    }

    /// Forget the session.
    pub fn logout(&self) -> Result<()> {
        tracing::info!("Clearing Planning Center credentials");
        self.store.clear()
    }

    async fn refresh(&self, refresh_token: &str) -> Result<String> {
        let body = json!({
            "grant_type": "refresh_token",
            "refresh_token": refresh_token,
            "client_id": self.client_id,
            "client_secret": self.client_secret.secret(),
        });

        let result = self.request_token(&body).await?;
        if result.refresh_token.is_none() {
            tracing::warn!("Refresh response omitted refresh_token; keeping the previous one");
        }
        let access_token = result.access_token.clone();
        self.store.save(&result.into_credentials()?)?;

        tracing::info!("Access token refreshed successfully");
        Ok(access_token)
    }

    async fn request_token(&self, body: &Value) -> Result<TokenExchangeResult> {
        let resp = self
            .http
            .post(&self.token_url)
            .header(ACCEPT, "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Network(format!("Token request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            let reason = status.canonical_reason().unwrap_or("Unknown status");
            return Err(Error::TokenExchange {
                status: status.as_u16(),
                body: describe_token_error(&text, reason),
            });
        }

        let result: TokenExchangeResult = resp
            .json()
            .await
            .map_err(|e| Error::parse(format!("Invalid token response: {e}"), None))?;
        result.expires_at_millis()?;
        Ok(result)
    }
}

/// Prefer the provider's OAuth `error` and `error_description`, then the raw
/// body, then the status text.
fn describe_token_error(body: &str, reason: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| match (v["error"].as_str(), v["error_description"].as_str()) {
            (Some(code), Some(description)) => Some(format!("{code}: {description}")),
            (None, Some(description)) => Some(description.to_string()),
            (Some(code), None) => Some(code.to_string()),
            (None, None) => None,
        })
        .or_else(|| (!body.trim().is_empty()).then(|| body.trim().to_string()))
        .unwrap_or_else(|| reason.to_string())
}
