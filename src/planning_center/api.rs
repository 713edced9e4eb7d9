use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use crate::auth::Authenticator;
use crate::config::Config;
use crate::constants::http;
use crate::error::{Error, Result};
use crate::planning_center::types::{parse_events, CalendarEvent};
use crate::types::{iso_timestamp, DateRange};

/// Authenticated client for the Planning Center Online API
///
/// Every request obtains its bearer token from the shared [`Authenticator`],
/// so an expired session is refreshed (or re-authorized) transparently.
#[derive(Clone)]
pub struct PlanningCenterClient {
    base_url: String,
    client: Client,
    auth: Arc<Authenticator>,
}

impl PlanningCenterClient {
    /// Create a new Planning Center client from config
    pub fn new(config: &Config, auth: Arc<Authenticator>) -> Self {
        Self {
            base_url: config.pco_base_url.trim_end_matches('/').to_string(),
            client: Client::builder()
                .timeout(StdDuration::from_secs(http::TIMEOUT_SECS))
                .build()
                .unwrap_or_default(),
            auth,
        }
    }

    /// The authenticator supplying tokens
    pub const fn authenticator(&self) -> &Arc<Authenticator> {
        &self.auth
    }

    /// Make an authenticated GET request to `base_url + endpoint`
    ///
    /// [`Error::AuthenticationRequired`] passes through untouched so callers
    /// can tell that a re-authorization is already underway.
    pub async fn fetch_from_provider(&self, endpoint: &str) -> Result<Value> {
        let token = self.auth.get_access_token().await?;

        let url = format!("{}{}", self.base_url, endpoint);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&token)
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Error fetching from Planning Center: {e}");
                Error::Network(format!("Request to {endpoint} failed: {e}"))
            })?;

        let status = resp.status();
        if !status.is_success() {
            let status_text = status.canonical_reason().unwrap_or("Unknown status");
            tracing::error!("Planning Center returned {status} for {endpoint}");
            return Err(Error::pco_status(status_text, status.as_u16()));
        }

        resp.json()
            .await
            .map_err(|e| Error::parse(format!("Invalid JSON from {endpoint}: {e}"), None))
    }

    /// Service times starting within the range
    pub async fn service_times(&self, range: &DateRange) -> Result<Value> {
        let endpoint = format!("/services/v2/service_times?{}", range_filter("starts_at", range));
        self.fetch_from_provider(&endpoint).await
    }

    /// Check-ins created within the range
    pub async fn check_ins(&self, range: &DateRange) -> Result<Value> {
        let endpoint = format!("/check-ins/v2/check_ins?{}", range_filter("created_at", range));
        self.fetch_from_provider(&endpoint).await
    }

    /// People directory
    pub async fn people(&self) -> Result<Value> {
        self.fetch_from_provider("/people/v2/people").await
    }

    /// Calendar events starting within the range
    pub async fn events(&self, range: &DateRange) -> Result<Vec<CalendarEvent>> {
        let endpoint = format!("/calendar/v2/events?{}", range_filter("starts_at", range));
        let json = self.fetch_from_provider(&endpoint).await?;
        Ok(parse_events(&json))
    }
}

/// `where[field][gte]=..&where[field][lte]=..` query for a timestamp range
fn range_filter(field: &str, range: &DateRange) -> String {
    format!(
        "where[{field}][gte]={}&where[{field}][lte]={}",
        iso_timestamp(&range.start),
        iso_timestamp(&range.end),
    )
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

    use super::*;
    use crate::auth::{Credentials, KeyValueStore, MemoryKeyValueStore, Navigator, TokenStore};
    use chrono::{TimeZone, Utc};
    use mockito::Matcher;
    use oauth2::url::Url;

    struct NoopNavigator;

    impl Navigator for NoopNavigator {
        fn navigate(&self, _url: &Url) {}
    }

    fn client(base_url: &str, token: Option<&str>) -> PlanningCenterClient {
        let config = Config {
            pco_app_id: "app".into(),
            pco_secret: "secret".into(),
            pco_base_url: base_url.to_string(),
            ..Config::default()
        };
        let store = Arc::new(TokenStore::new(Arc::new(MemoryKeyValueStore::new()) as Arc<dyn KeyValueStore>));
        if let Some(t) = token {
            store
                .save(&Credentials {
                    access_token: Some(t.into()),
                    refresh_token: None,
                    expires_at_millis: Some(Utc::now().timestamp_millis() + 3_600_000),
                })
                .unwrap();
        }
        let auth = Arc::new(Authenticator::new(&config, store, Arc::new(NoopNavigator)).unwrap());
        PlanningCenterClient::new(&config, auth)
    }

    #[test]
    fn range_filter_formats_iso_bounds() {
        let range = DateRange::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap(),
        );
        assert_eq!(
            range_filter("starts_at", &range),
            "where[starts_at][gte]=2024-01-01T00:00:00.000Z&where[starts_at][lte]=2024-01-31T00:00:00.000Z"
        );
    }

    #[tokio::test]
    async fn sends_bearer_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/people/v2/people")
            .match_header("authorization", "Bearer tok-123")
            .with_status(200)
            .with_body(r#"{"data":[]}"#)
            .create_async()
            .await;

        let json = client(&server.url(), Some("tok-123")).people().await.unwrap();
        assert!(json["data"].as_array().unwrap().is_empty());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn non_success_is_provider_error() {
        let mut server = mockito::Server::new_async().await;
        server.mock("GET", "/people/v2/people").with_status(403).create_async().await;

        match client(&server.url(), Some("tok")).people().await {
            Err(Error::PlanningCenter { status, message, .. }) => {
                assert_eq!(status, Some(403));
                assert_eq!(message, "Forbidden");
            }
            other => panic!("expected provider error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn auth_required_is_not_masked() {
        let mut server = mockito::Server::new_async().await;
        let resource = server.mock("GET", Matcher::Any).expect(0).create_async().await;

        let err = client(&server.url(), None).people().await.unwrap_err();
        assert!(err.is_auth_required());
        resource.assert_async().await;
    }

    #[tokio::test]
    async fn events_are_filtered_by_range() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/calendar/v2/events")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("where[starts_at][gte]".into(), "2024-01-01T00:00:00.000Z".into()),
                Matcher::UrlEncoded("where[starts_at][lte]".into(), "2024-01-31T00:00:00.000Z".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"data":[{"id":"9","attributes":{"name":"Easter"}}]}"#)
            .create_async()
            .await;
        let range = DateRange::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap(),
        );

        let events = client(&server.url(), Some("tok")).events(&range).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name, "Easter");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn transport_failure_is_network_error() {
        // Nothing listens on port 9 of the loopback interface.
        let err = client("http://127.0.0.1:9", Some("tok")).people().await.unwrap_err();
        assert!(matches!(err, Error::Network(_)));
    }
}
