#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::too_many_lines)]

//! Offline incident logging core: draft capture, durable local history and
//! the map pin projection, shared by the mobile shells.

pub mod app;
pub mod capabilities;
pub mod codec;
pub mod config;
pub mod connectivity;
pub mod draft;
pub mod error;
pub mod event;
pub mod model;
pub mod registry;
pub mod store;

pub use app::{spawn_connectivity_bridge, App, ViewModel};
pub use capabilities::{Capabilities, MapRegion};
pub use config::EngineConfig;
pub use connectivity::{ConnectivityMonitor, NetworkAccess};
pub use draft::{DraftController, DraftPhase, IdentifierMode};
pub use error::{AppError, AppResult, ErrorKind, StoreError, SubmitError, ValidationError};
pub use event::Event;
pub use model::{DisasterType, IncidentId, IncidentRecord, LatLon, MapPin, NetworkStatus};
pub use registry::{IncidentRegistry, RegistryChange};
pub use store::IncidentStore;
#[cfg(not(target_arch = "wasm32"))]
pub use store::SqliteIncidentStore;

pub const DEFAULT_STARTUP_RADIUS_KM: f64 = 1.0;
pub const DEFAULT_FOCUS_RADIUS_KM: f64 = 0.5;

#[must_use]
pub fn get_current_time_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

#[must_use]
pub fn format_time_ago(timestamp_ms: u64, now_ms: u64) -> String {
    if timestamp_ms > now_ms {
        // clock skew between devices; never show a negative age
        return "Just now".into();
    }

    let diff_secs = now_ms.saturating_sub(timestamp_ms) / 1000;

    if diff_secs < 5 {
        return "Just now".into();
    }
    if diff_secs < 60 {
        return format!("{diff_secs}s ago");
    }

    let diff_mins = diff_secs / 60;
    if diff_mins < 60 {
        return format!("{diff_mins}m ago");
    }

    let diff_hours = diff_mins / 60;
    if diff_hours < 24 {
        return format!("{diff_hours}h ago");
    }

    let diff_days = diff_hours / 24;
    if diff_days < 7 {
        return format!("{diff_days}d ago");
    }
    if diff_days < 30 {
        return format!("{}w ago", diff_days / 7);
    }
    if diff_days < 365 {
        return format!("{}mo ago", diff_days / 30);
    }

    format!("{}y ago", diff_days / 365)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_ago_just_now() {
        assert_eq!(format_time_ago(1000, 1000), "Just now");
        assert_eq!(format_time_ago(1000, 4999), "Just now");
    }

    #[test]
    fn time_ago_future_timestamps() {
        assert_eq!(format_time_ago(10_000_000, 0), "Just now");
    }

    #[test]
    fn time_ago_units() {
        assert_eq!(format_time_ago(0, 10_000), "10s ago");
        assert_eq!(format_time_ago(0, 300_000), "5m ago");
        assert_eq!(format_time_ago(0, 7_200_000), "2h ago");
        assert_eq!(format_time_ago(0, 3 * 86_400_000), "3d ago");
        assert_eq!(format_time_ago(0, 14 * 86_400_000), "2w ago");
        assert_eq!(format_time_ago(0, 60 * 86_400_000), "2mo ago");
        assert_eq!(format_time_ago(0, 800 * 86_400_000), "2y ago");
    }

    #[test]
    fn current_time_is_after_2020() {
        assert!(get_current_time_ms() > 1_577_836_800_000);
    }
}
