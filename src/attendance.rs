//! Weekly attendance records from the hosted database.
//!
//! The database exposes a PostgREST interface; rows come from the
//! `sunday_service_attendance` table.

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration as StdDuration;

use crate::config::Config;
use crate::constants::{attendance, http};
use crate::error::{Error, Result};
use crate::types::DateRange;

/// One Sunday's attendance counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    /// Database row id.
    pub row_id: i64,
    /// Service date.
    pub date: NaiveDate,
    /// Adults.
    pub adult: u32,
    /// Children.
    pub kids: u32,
    /// Youth.
    pub youth: u32,
    /// Everyone.
    pub total: u32,
}

/// Anything that can list attendance records for a date range.
#[async_trait]
pub trait AttendanceSource: Send + Sync {
    /// Records whose date falls within `range`, in any order.
    async fn fetch_attendance(&self, range: &DateRange) -> Result<Vec<AttendanceRecord>>;
}

#[derive(Debug, Deserialize)]
struct AttendanceRow {
    #[serde(rename = "RowId")]
    row_id: i64,
    date: String,
    #[serde(rename = "Adult")]
    adult: Option<u32>,
    #[serde(rename = "Okids")]
    kids: Option<u32>,
    #[serde(rename = "Oyth")]
    youth: Option<u32>,
    #[serde(rename = "Total")]
    total: Option<u32>,
}

impl AttendanceRow {
    // Null counts read as zero; the date column may carry a time suffix.
    fn into_record(self) -> Option<AttendanceRecord> {
        let day = self.date.get(..10).unwrap_or(&self.date);
        let date = NaiveDate::parse_from_str(day, "%Y-%m-%d")
            .map_err(|e| tracing::warn!("Skipping attendance row {} with date {:?}: {e}", self.row_id, self.date))
            .ok()?;
        Some(AttendanceRecord {
            row_id: self.row_id,
            date,
            adult: self.adult.unwrap_or(0),
            kids: self.kids.unwrap_or(0),
            youth: self.youth.unwrap_or(0),
            total: self.total.unwrap_or(0),
        })
    }
}

/// REST client for the hosted attendance database
#[derive(Clone)]
pub struct HostedAttendanceDb {
    base_url: String,
    api_key: String,
    client: Client,
}

impl HostedAttendanceDb {
    /// Create a client from config
    pub fn new(config: &Config) -> Self {
        Self {
            base_url: config.attendance_db_url.trim_end_matches('/').to_string(),
            api_key: config.attendance_db_key.clone(),
            client: Client::builder()
                .timeout(StdDuration::from_secs(http::TIMEOUT_SECS))
                .build()
                .unwrap_or_default(),
        }
    }

    fn is_configured(&self) -> bool {
        !self.base_url.is_empty() && !self.api_key.is_empty()
    }
}

#[async_trait]
impl AttendanceSource for HostedAttendanceDb {
    async fn fetch_attendance(&self, range: &DateRange) -> Result<Vec<AttendanceRecord>> {
        if !self.is_configured() {
            return Err(Error::config(
                "Attendance database not configured",
                "Set ATTENDANCE_DB_URL and ATTENDANCE_DB_KEY environment variables",
            ));
        }

        let url = format!("{}/rest/v1/{}", self.base_url, attendance::TABLE);
        let gte = format!("gte.{}", range.start_date().format("%Y-%m-%d"));
        let lte = format!("lte.{}", range.end_date().format("%Y-%m-%d"));

        let resp = self
            .client
            .get(&url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .query(&[
                ("select", attendance::COLUMNS),
                ("date", gte.as_str()),
                ("date", lte.as_str()),
                ("order", "date.desc"),
            ])
            .send()
            .await
            .map_err(|e| Error::Network(format!("Attendance query failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            tracing::error!("Attendance query returned {status}: {body}");
            return Err(Error::Attendance(format!("{status}: {body}")));
        }

        let rows: Vec<AttendanceRow> = resp
            .json()
            .await
            .map_err(|e| Error::parse(format!("Invalid attendance rows: {e}"), None))?;

        if rows.is_empty() {
            tracing::debug!("No attendance rows between {gte} and {lte}");
        }

        Ok(rows.into_iter().filter_map(AttendanceRow::into_record).collect())
    }
}
