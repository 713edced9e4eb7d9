//! `YouTube` channel metrics via the Data API.

use std::collections::HashMap;
use std::sync::LazyLock;
use std::time::Duration as StdDuration;

use chrono::{Duration, NaiveDate};
use regex::Regex;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

use crate::config::Config;
use crate::constants::{http, youtube};
use crate::error::{Error, Result};
use crate::metrics::calculate_change;
use crate::types::{iso_timestamp, DateRange};

/// Regex matching ISO-8601 video durations like `PT1H2M3S`.
#[allow(clippy::expect_used)]
static RE_DURATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"PT(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?").expect("valid regex: RE_DURATION")
});

/// Channel summary for the reporting window.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YouTubeMetrics {
    /// Views across videos published in the window.
    pub total_views: u64,
    /// Views spread across each day of the window.
    pub views_data: Vec<DailyViews>,
    /// Most recent videos (at most five).
    pub videos: Vec<VideoSummary>,
    /// Estimated watch time, in hours.
    pub watch_time: u64,
    /// Current subscriber count.
    pub subscribers: u64,
    /// Percent change versus the previous subscriber count.
    pub subscriber_change: f64,
}

impl YouTubeMetrics {
    /// Zero-valued metrics with one empty data point per day.
    pub fn empty(range: &DateRange) -> Self {
        Self {
            total_views: 0,
            views_data: daily_views(range, 0),
            videos: Vec::new(),
            watch_time: 0,
            subscribers: 0,
            subscriber_change: 0.0,
        }
    }
}

/// Views attributed to one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyViews {
    /// Calendar day.
    pub date: NaiveDate,
    /// View count.
    pub views: u64,
}

/// One video row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSummary {
    /// Video title.
    pub title: String,
    /// View count.
    pub views: u64,
    /// Like count.
    pub likes: u64,
    /// Video length as `HH:MM:SS` or `MM:SS`.
    pub avg_watch_time: String,
}

/// API-key client for the `YouTube` Data API
#[derive(Clone)]
pub struct YouTubeClient {
    api_key: String,
    channel_id: String,
    base_url: String,
    client: Client,
}

impl YouTubeClient {
    /// Create a new client from config
    pub fn new(config: &Config) -> Self {
        Self {
            api_key: config.youtube_api_key.clone(),
            channel_id: config.youtube_channel_id.clone(),
            base_url: config.youtube_base_url.trim_end_matches('/').to_string(),
            client: Client::builder()
                .timeout(StdDuration::from_secs(http::TIMEOUT_SECS))
                .build()
                .unwrap_or_default(),
        }
    }

    /// Check if API key and channel are configured
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty() && !self.channel_id.is_empty()
    }

    async fn get(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<Value> {
        let url = format!("{}/{}", self.base_url, endpoint);
        let resp = self
            .client
            .get(&url)
            .query(&[("key", self.api_key.as_str())])
            .query(params)
            .send()
            .await
            .map_err(|e| Error::Network(format!("Request to YouTube {endpoint} failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body: Value = resp.json().await.unwrap_or(Value::Null);
            let message = body["error"]["message"]
                .as_str()
                .map_or_else(|| status.to_string(), String::from);
            tracing::error!("YouTube API error on {endpoint}: {message}");
            return Err(Error::YouTube(message));
        }

        resp.json()
            .await
            .map_err(|e| Error::parse(format!("Invalid JSON from YouTube {endpoint}: {e}"), None))
    }

    /// Fetch channel metrics for `range`.
    ///
    /// The Data API has no subscriber history, so the change is computed
    /// against `previous_subscribers` when the caller knows it.
    pub async fn fetch_metrics(&self, range: &DateRange, previous_subscribers: Option<u64>) -> Result<YouTubeMetrics> {
        if !self.is_configured() {
            return Err(Error::config(
                "YouTube API key or channel ID not configured",
                "Set YOUTUBE_API_KEY and YOUTUBE_CHANNEL_ID environment variables",
            ));
        }

        let channel = self
            .get("channels", &[("part", "statistics"), ("id", self.channel_id.as_str())])
            .await?;

        let published_after = iso_timestamp(&range.start);
        let published_before = iso_timestamp(&range.end);
        let search = self
            .get(
                "search",
                &[
                    ("part", "id,snippet"),
                    ("channelId", self.channel_id.as_str()),
                    ("order", "date"),
                    ("type", "video"),
                    ("maxResults", youtube::MAX_SEARCH_RESULTS),
                    ("publishedAfter", published_after.as_str()),
                    ("publishedBefore", published_before.as_str()),
                ],
            )
            .await?;

        let search_items = search["items"].as_array().map(|a| a.as_slice()).unwrap_or(&[]);
        let titles: HashMap<&str, &str> = search_items
            .iter()
            .filter_map(|item| Some((item["id"]["videoId"].as_str()?, item["snippet"]["title"].as_str()?)))
            .collect();
        let ids: Vec<&str> = search_items
            .iter()
            .filter_map(|item| item["id"]["videoId"].as_str())
            .collect();

        let stats = if ids.is_empty() {
            Value::Null
        } else {
            let joined = ids.join(",");
            self.get("videos", &[("part", "statistics,contentDetails"), ("id", joined.as_str())])
                .await?
        };

        let videos: Vec<VideoSummary> = stats["items"]
            .as_array()
            .map(|a| a.as_slice())
            .unwrap_or(&[])
            .iter()
            .map(|video| VideoSummary {
                title: video["id"]
                    .as_str()
                    .and_then(|id| titles.get(id))
                    .unwrap_or(&"Untitled")
                    .to_string(),
                views: count_field(&video["statistics"]["viewCount"]),
                likes: count_field(&video["statistics"]["likeCount"]),
                avg_watch_time: format_duration(video["contentDetails"]["duration"].as_str().unwrap_or("")),
            })
            .collect();

        let total_views = videos.iter().map(|v| v.views).sum();
        let subscribers = count_field(&channel["items"][0]["statistics"]["subscriberCount"]);

        Ok(YouTubeMetrics {
            total_views,
            views_data: daily_views(range, total_views),
            watch_time: watch_hours(&videos),
            videos: videos.into_iter().take(youtube::TOP_VIDEOS).collect(),
            subscribers,
            subscriber_change: subscriber_change(subscribers, previous_subscribers.unwrap_or(0)),
        })
    }
}

/// Fetch metrics, substituting [`YouTubeMetrics::empty`] on any failure so the
/// dashboard still renders.
pub async fn youtube_metrics_or_default(
    client: &YouTubeClient,
    range: &DateRange,
    previous_subscribers: Option<u64>,
) -> YouTubeMetrics {
    match client.fetch_metrics(range, previous_subscribers).await {
        Ok(metrics) => metrics,
        Err(e) => {
            tracing::warn!("Error fetching YouTube metrics: {e}");
            YouTubeMetrics::empty(range)
        }
    }
}

/// Counts arrive as decimal strings.
fn count_field(value: &Value) -> u64 {
    value
        .as_str()
        .and_then(|s| s.parse().ok())
        .or_else(|| value.as_u64())
        .unwrap_or(0)
}

#[allow(clippy::cast_precision_loss)]
fn subscriber_change(current: u64, previous: u64) -> f64 {
    calculate_change(current as f64, previous as f64)
}

#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn watch_hours(videos: &[VideoSummary]) -> u64 {
    let minutes: f64 = videos
        .iter()
        .map(|v| duration_to_minutes(&v.avg_watch_time) * v.views as f64)
        .sum();
    (minutes / 60.0).round().max(0.0) as u64
}

/// Spread `total_views` evenly over each day from start to end inclusive.
fn daily_views(range: &DateRange, total_views: u64) -> Vec<DailyViews> {
    let days = range.whole_days().max(0);
    let per_day = total_views / u64::try_from(days + 1).unwrap_or(1);
    let end = range.end_date();
    (0..=days)
        .map(|i| DailyViews {
            date: end - Duration::days(days - i),
            views: per_day,
        })
        .collect()
}

/// Format an ISO-8601 duration as `HH:MM:SS`, or `MM:SS` when under an hour.
pub fn format_duration(duration: &str) -> String {
    let Some(caps) = RE_DURATION.captures(duration) else {
        return "0:00".to_string();
    };
    let part = |i: usize| caps.get(i).map_or("", |m| m.as_str());

    let mut parts = Vec::with_capacity(3);
    if !part(1).is_empty() {
        parts.push(format!("{:0>2}", part(1)));
    }
    parts.push(format!("{:0>2}", if part(2).is_empty() { "0" } else { part(2) }));
    parts.push(format!("{:0>2}", if part(3).is_empty() { "0" } else { part(3) }));
    parts.join(":")
}

/// Minutes in a `HH:MM:SS` or `MM:SS` string.
pub fn duration_to_minutes(formatted: &str) -> f64 {
    let parts: Vec<f64> = formatted
        .split(':')
        .map(|p| p.trim().parse().unwrap_or(0.0))
        .collect();
    match parts.as_slice() {
        [h, m, s] => h * 60.0 + m + s / 60.0,
        [m, s] => m + s / 60.0,
        [m] => *m,
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic, clippy::float_cmp)]

    use super::*;
    use chrono::{TimeZone, Utc};
    use mockito::Matcher;

    fn week() -> DateRange {
        DateRange::new(
            Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 7, 0, 0, 0).unwrap(),
        )
    }

    fn client(url: &str) -> YouTubeClient {
        YouTubeClient::new(&Config {
            youtube_api_key: "key".into(),
            youtube_channel_id: "chan".into(),
            youtube_base_url: url.to_string(),
            ..Config::default()
        })
    }

    #[test]
    fn formats_iso_durations() {
        assert_eq!(format_duration("PT1H2M3S"), "01:02:03");
        assert_eq!(format_duration("PT4M5S"), "04:05");
        assert_eq!(format_duration("PT45S"), "00:45");
        assert_eq!(format_duration("PT12H"), "12:00:00");
        assert_eq!(format_duration(""), "0:00");
        assert_eq!(format_duration("garbage"), "0:00");
    }

    #[test]
    fn converts_formatted_durations_to_minutes() {
        assert!((duration_to_minutes("01:02:03") - 62.05).abs() < 1e-9);
        assert_eq!(duration_to_minutes("04:30"), 4.5);
        assert_eq!(duration_to_minutes("0:00"), 0.0);
    }

    #[test]
    fn empty_metrics_cover_every_day() {
        let empty = YouTubeMetrics::empty(&week());
        assert_eq!(empty.views_data.len(), 7);
        assert!(empty.views_data.iter().all(|d| d.views == 0));
        assert_eq!(empty.views_data[0].date, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(empty.views_data[6].date, NaiveDate::from_ymd_opt(2024, 3, 7).unwrap());
    }

    #[test]
    fn zero_previous_subscribers_reports_no_change() {
        assert_eq!(subscriber_change(1_000, 0), 0.0);
        assert_eq!(subscriber_change(110, 100), 10.0);
    }

    #[tokio::test]
    async fn aggregates_channel_and_videos() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/channels")
            .match_query(Matcher::UrlEncoded("key".into(), "key".into()))
            .with_status(200)
            .with_body(r#"{"items":[{"statistics":{"subscriberCount":"1200"}}]}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/search")
            .match_query(Matcher::UrlEncoded("channelId".into(), "chan".into()))
            .with_status(200)
            .with_body(
                r#"{"items":[
                    {"id":{"videoId":"a"},"snippet":{"title":"Sunday Service"}},
                    {"id":{"videoId":"b"},"snippet":{"title":"Youth Night"}}
                ]}"#,
            )
            .create_async()
            .await;
        server
            .mock("GET", "/videos")
            .match_query(Matcher::UrlEncoded("id".into(), "a,b".into()))
            .with_status(200)
            .with_body(
                r#"{"items":[
                    {"id":"b","statistics":{"viewCount":"140","likeCount":"9"},"contentDetails":{"duration":"PT30M"}},
                    {"id":"a","statistics":{"viewCount":"560","likeCount":"40"},"contentDetails":{"duration":"PT1H"}}
                ]}"#,
            )
            .create_async()
            .await;

        let metrics = client(&server.url()).fetch_metrics(&week(), Some(1_000)).await.unwrap();

        assert_eq!(metrics.total_views, 700);
        assert_eq!(metrics.views_data.len(), 7);
        assert_eq!(metrics.views_data[0].views, 100);
        assert_eq!(metrics.videos[0].title, "Youth Night");
        assert_eq!(metrics.videos[1].avg_watch_time, "01:00:00");
        // 140 * 30 min + 560 * 60 min = 37800 min = 630 h
        assert_eq!(metrics.watch_time, 630);
        assert_eq!(metrics.subscribers, 1_200);
        assert_eq!(metrics.subscriber_change, 20.0);
    }

    #[tokio::test]
    async fn api_error_degrades_to_default() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", Matcher::Any)
            .with_status(403)
            .with_body(r#"{"error":{"message":"quota exceeded"}}"#)
            .create_async()
            .await;
        let yt = client(&server.url());

        match yt.fetch_metrics(&week(), None).await {
            Err(Error::YouTube(msg)) => assert_eq!(msg, "quota exceeded"),
            other => panic!("expected YouTube error, got {other:?}"),
        }
        assert_eq!(youtube_metrics_or_default(&yt, &week(), None).await, YouTubeMetrics::empty(&week()));
    }

    #[tokio::test]
    async fn unconfigured_client_degrades_to_default() {
        let yt = YouTubeClient::new(&Config::default());
        assert!(!yt.is_configured());
        let metrics = youtube_metrics_or_default(&yt, &week(), None).await;
        assert_eq!(metrics.total_views, 0);
    }
}
