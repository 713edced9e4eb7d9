//! Application constants.
//!
//! Centralizes endpoint paths, storage keys and default values.

/// OAuth constants for the `Planning Center` provider.
pub mod oauth {
    /// Default provider base URL.
    pub const DEFAULT_BASE_URL: &str = "https://api.planningcenteronline.com";

    /// Authorization endpoint path (navigated to, never fetched).
    pub const AUTHORIZE_PATH: &str = "/oauth/authorize";

    /// Token endpoint path for code and refresh grants.
    pub const TOKEN_PATH: &str = "/oauth/token";

    /// Fixed scope set requested during authorization.
    pub const SCOPES: [&str; 3] = ["people", "check_ins", "services"];

    /// Callback path appended to the application origin.
    pub const CALLBACK_PATH: &str = "/auth/callback";

    /// Default application origin used to derive the redirect URI.
    pub const DEFAULT_ORIGIN: &str = "http://localhost:5173";
}

/// Persisted credential keys.
pub mod storage {
    /// Key holding the access token.
    pub const ACCESS_TOKEN_KEY: &str = "pc_access_token";

    /// Key holding the refresh token.
    pub const REFRESH_TOKEN_KEY: &str = "pc_refresh_token";

    /// Key holding the expiry in milliseconds since the epoch.
    pub const TOKEN_EXPIRY_KEY: &str = "pc_token_expiry";

    /// Directory under the user config dir for the token file.
    pub const APP_DIR: &str = "church-analytics";

    /// File name of the default token store.
    pub const TOKEN_FILE: &str = "tokens.json";
}

/// HTTP client constants.
pub mod http {
    /// Request timeout for all outbound calls, in seconds.
    pub const TIMEOUT_SECS: u64 = 30;
}

/// `YouTube` Data API constants.
pub mod youtube {
    /// Base URL of the Data API.
    pub const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";

    /// Maximum videos requested from the search endpoint.
    pub const MAX_SEARCH_RESULTS: &str = "50";

    /// Number of videos kept in the summary.
    pub const TOP_VIDEOS: usize = 5;
}

/// Attendance database constants.
pub mod attendance {
    /// Table holding weekly attendance rows.
    pub const TABLE: &str = "sunday_service_attendance";

    /// Columns selected from the attendance table.
    pub const COLUMNS: &str = "RowId,date,Adult,Okids,Oyth,Total";
}

/// Dashboard defaults.
pub mod dashboard {
    /// Default reporting window, in days.
    pub const DEFAULT_DAYS_BACK: i64 = 30;

    /// Longest accepted reporting window, in days.
    pub const MAX_DAYS_BACK: i64 = 3650;

    /// Hint shown when a reporting window is rejected.
    pub const DAYS_BACK_HINT: &str = "Set DAYS_BACK to a positive number of days";
}
