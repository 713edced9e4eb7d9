//! Church analytics dashboard core.
//!
//! Collects attendance, `YouTube` and `Planning Center` data for a reporting
//! window. `Planning Center` access goes through an OAuth session that is
//! persisted, refreshed and re-authorized by [`auth::Authenticator`].

pub mod attendance;
pub mod auth;
pub mod config;
pub mod constants;
pub mod dashboard;
pub mod error;
pub mod metrics;
pub mod planning_center;
pub mod types;
pub mod youtube;
