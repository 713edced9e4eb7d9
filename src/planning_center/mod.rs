//! Planning Center API integration.
//!
//! Provides the authenticated API client and the resource types it returns.

/// API client for Planning Center Online requests
pub mod api;
/// Data types representing Planning Center resources
pub mod types;

// Re-export key components
pub use api::PlanningCenterClient;
pub use types::CalendarEvent;
