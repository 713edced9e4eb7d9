//! Application configuration.
//!
//! Handles loading configuration from environment variables and .env files.

use dotenv::dotenv;
use std::env;
use std::path::PathBuf;

use crate::constants::{dashboard, oauth, storage};
use crate::error::{Error, Result};

/// Configuration for the application.
#[derive(Debug, Clone)]
pub struct Config {
    /// `Planning Center` OAuth application (client) ID
    pub pco_app_id: String,
    /// `Planning Center` OAuth client secret
    pub pco_secret: String,
    /// `Planning Center` API base URL
    pub pco_base_url: String,
    /// Origin the OAuth redirect URI is derived from
    pub app_origin: String,
    /// Where persisted credentials live
    pub token_store_path: Option<PathBuf>,
    /// `YouTube` Data API key
    pub youtube_api_key: String,
    /// `YouTube` channel to report on
    pub youtube_channel_id: String,
    /// `YouTube` Data API base URL
    pub youtube_base_url: String,
    /// Hosted attendance database REST URL
    pub attendance_db_url: String,
    /// Hosted attendance database anon key
    pub attendance_db_key: String,
    /// How many days back the dashboard reports on
    pub days_back: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pco_app_id: String::new(),
            pco_secret: String::new(),
            pco_base_url: oauth::DEFAULT_BASE_URL.to_string(),
            app_origin: oauth::DEFAULT_ORIGIN.to_string(),
            token_store_path: None,
            youtube_api_key: String::new(),
            youtube_channel_id: String::new(),
            youtube_base_url: crate::constants::youtube::DEFAULT_BASE_URL.to_string(),
            attendance_db_url: String::new(),
            attendance_db_key: String::new(),
            days_back: dashboard::DEFAULT_DAYS_BACK,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    #[allow(clippy::unnecessary_wraps)] // Returns Result for forward-compatible API
    pub fn load() -> Result<Self> {
        // Try to load .env file if present
        dotenv().ok();

        let mut config = Self::default();

        if let Ok(app_id) = env::var("PCO_APP_ID") {
            config.pco_app_id = app_id;
        }

        if let Ok(secret) = env::var("PCO_SECRET") {
            config.pco_secret = secret;
        }

        if let Ok(url) = env::var("PCO_BASE_URL") {
            config.pco_base_url = url.trim_end_matches('/').to_string();
        }

        if let Ok(origin) = env::var("APP_ORIGIN") {
            config.app_origin = origin.trim_end_matches('/').to_string();
        }

        if let Ok(key) = env::var("YOUTUBE_API_KEY") {
            config.youtube_api_key = key;
        }

        if let Ok(channel) = env::var("YOUTUBE_CHANNEL_ID") {
            config.youtube_channel_id = channel;
        }

        if let Ok(url) = env::var("ATTENDANCE_DB_URL") {
            config.attendance_db_url = url.trim_end_matches('/').to_string();
        }

        if let Ok(key) = env::var("ATTENDANCE_DB_KEY") {
            config.attendance_db_key = key;
        }

        // Days back can be configured via environment
        if let Ok(days) = env::var("DAYS_BACK") {
            config.days_back = parse_days_back(&days)?;
        }

        // Token store: env var override, or default <config dir>/church-analytics/tokens.json
        config.token_store_path = env::var("TOKEN_STORE_PATH").ok().map_or_else(
            default_token_store_path,
            |path| Some(PathBuf::from(shellexpand::tilde(&path).to_string())),
        );

        Ok(config)
    }

    /// Redirect URI registered with the OAuth provider
    pub fn redirect_uri(&self) -> String {
        format!("{}{}", self.app_origin, oauth::CALLBACK_PATH)
    }

    /// Check if `Planning Center` is configured
    pub const fn has_planning_center_credentials(&self) -> bool {
        !self.pco_app_id.is_empty() && !self.pco_secret.is_empty()
    }

    /// Check if `YouTube` is configured
    pub const fn has_youtube_credentials(&self) -> bool {
        !self.youtube_api_key.is_empty() && !self.youtube_channel_id.is_empty()
    }

    /// Check if the attendance database is configured
    pub const fn has_attendance_database(&self) -> bool {
        !self.attendance_db_url.is_empty() && !self.attendance_db_key.is_empty()
    }
}

/// Parse a reporting window length, rejecting non-positive or oversized values.
pub fn parse_days_back(value: &str) -> Result<i64> {
    let invalid = || Error::config(format!("Invalid DAYS_BACK value: {value:?}"), dashboard::DAYS_BACK_HINT);
    let days = value.trim().parse::<i64>().map_err(|_| invalid())?;
    if (1..=dashboard::MAX_DAYS_BACK).contains(&days) {
        Ok(days)
    } else {
        Err(invalid())
    }
}

fn default_token_store_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(storage::APP_DIR).join(storage::TOKEN_FILE))
}
