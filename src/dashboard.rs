//! Dashboard composition.
//!
//! Wires the token store, authenticator and API clients together from a
//! [`Config`] and gathers one snapshot of every dashboard section.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::attendance::{AttendanceSource, HostedAttendanceDb};
use crate::auth::{Authenticator, FileKeyValueStore, KeyValueStore, MemoryKeyValueStore, Navigator, TokenStore};
use crate::config::Config;
use crate::error::Result;
use crate::metrics::{attendance_metrics, Metric};
use crate::planning_center::{CalendarEvent, PlanningCenterClient};
use crate::types::DateRange;
use crate::youtube::{youtube_metrics_or_default, YouTubeClient, YouTubeMetrics};

/// Build the token store and authenticator described by `config`.
pub fn build_authenticator(config: &Config, navigator: Arc<dyn Navigator>) -> Result<Arc<Authenticator>> {
    let backend: Arc<dyn KeyValueStore> = match &config.token_store_path {
        Some(path) => Arc::new(FileKeyValueStore::new(path.clone())),
        None => {
            tracing::warn!("No token store path available; credentials will not persist");
            Arc::new(MemoryKeyValueStore::new())
        }
    };
    let store = Arc::new(TokenStore::new(backend));
    Ok(Arc::new(Authenticator::new(config, store, navigator)?))
}

/// Everything the dashboard shows for one reporting window.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    /// Window start.
    pub range_start: DateTime<Utc>,
    /// Window end.
    pub range_end: DateTime<Utc>,
    /// Attendance cards.
    pub attendance: Vec<Metric>,
    /// Channel metrics.
    pub youtube: YouTubeMetrics,
    /// Calendar events in the window.
    pub events: Vec<CalendarEvent>,
}

/// Owns every data source behind the dashboard.
pub struct Dashboard {
    planning_center: Option<PlanningCenterClient>,
    attendance: Arc<dyn AttendanceSource>,
    youtube: YouTubeClient,
}

impl Dashboard {
    /// Assemble the dashboard from explicit parts.
    pub fn new(
        planning_center: Option<PlanningCenterClient>,
        attendance: Arc<dyn AttendanceSource>,
        youtube: YouTubeClient,
    ) -> Self {
        Self { planning_center, attendance, youtube }
    }

    /// Assemble the dashboard from configuration.
    ///
    /// `Planning Center` is only wired in when its credentials are present.
    pub fn from_config(config: &Config, navigator: Arc<dyn Navigator>) -> Result<Self> {
        let planning_center = if config.has_planning_center_credentials() {
            let auth = build_authenticator(config, navigator)?;
            Some(PlanningCenterClient::new(config, auth))
        } else {
            tracing::info!("Planning Center not configured; calendar events disabled");
            None
        };

        Ok(Self::new(
            planning_center,
            Arc::new(HostedAttendanceDb::new(config)),
            YouTubeClient::new(config),
        ))
    }

    /// Fetch all sections concurrently.
    ///
    /// `YouTube` and calendar failures degrade to empty sections, except that
    /// [`crate::error::Error::AuthenticationRequired`] is returned as-is.
    /// Attendance errors propagate.
    pub async fn snapshot(&self, range: &DateRange, previous_subscribers: Option<u64>) -> Result<DashboardSnapshot> {
        let events = async {
            match &self.planning_center {
                Some(pco) => pco.events(range).await,
                None => Ok(Vec::new()),
            }
        };

        let (attendance, youtube, events) = futures::join!(
            attendance_metrics(self.attendance.as_ref(), range),
            youtube_metrics_or_default(&self.youtube, range, previous_subscribers),
            events
        );

        let events = match events {
            Ok(events) => events,
            Err(e) if e.is_auth_required() => return Err(e),
            Err(e) => {
                tracing::warn!("Error fetching events: {e}");
                Vec::new()
            }
        };

        Ok(DashboardSnapshot {
            range_start: range.start,
            range_end: range.end,
            attendance: attendance?,
            youtube,
            events,
        })
    }
}
