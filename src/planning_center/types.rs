//! Planning Center data types.
//!
//! These types represent the data structures from the Planning Center API.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

/// A calendar event from `Planning Center` Calendar
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    /// Resource id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Start time, when the resource carries one.
    pub starts_at: Option<DateTime<Utc>>,
}

impl CalendarEvent {
    /// Parse one JSON:API resource object.
    pub fn from_resource(resource: &Value) -> Option<Self> {
        let id = resource["id"].as_str()?.to_string();
        let attrs = &resource["attributes"];
        let name = attrs["name"].as_str().unwrap_or("Untitled Event").to_string();
        let starts_at = attrs["starts_at"]
            .as_str()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|d| d.with_timezone(&Utc));
        Some(Self { id, name, starts_at })
    }
}

/// Parse the `data` array of a JSON:API list response.
pub fn parse_events(json: &Value) -> Vec<CalendarEvent> {
    json["data"]
        .as_array()
        .map(|a| a.as_slice())
        .unwrap_or(&[])
        .iter()
        .filter_map(CalendarEvent::from_resource)
        .collect()
}
