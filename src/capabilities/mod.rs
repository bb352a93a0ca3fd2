//! Capabilities the host shell provides to the engine.
//!
//! The engine never talks to a map widget, GPS or dialog directly; it calls
//! these traits and the shell implements them for its platform.

mod map;

pub use self::map::{MapRegion, MAX_LATITUDE_SPAN, MAX_LONGITUDE_SPAN};

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::CapabilityError;
use crate::model::LatLon;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PermissionStatus {
    Granted,
    Denied,
}

impl PermissionStatus {
    #[must_use]
    pub const fn is_granted(self) -> bool {
        matches!(self, Self::Granted)
    }
}

/// Map widget commands. Region-change notifications come back as
/// [`crate::event::Event::VisibleRegionChanged`].
pub trait MapSurface: Send + Sync {
    fn move_to_region(&self, region: MapRegion);
}

#[async_trait::async_trait]
pub trait LocationProvider: Send + Sync {
    /// Best effort; callers swallow errors.
    async fn last_known_location(&self) -> Result<Option<LatLon>, CapabilityError>;
}

#[async_trait::async_trait]
pub trait PermissionGate: Send + Sync {
    async fn check_status(&self) -> PermissionStatus;
    async fn request(&self) -> PermissionStatus;
}

#[async_trait::async_trait]
pub trait AlertPresenter: Send + Sync {
    async fn confirm(&self, title: &str, message: &str) -> bool;
    async fn notify(&self, title: &str, message: &str);
}

#[derive(Clone)]
pub struct Capabilities {
    pub map: Arc<dyn MapSurface>,
    pub location: Arc<dyn LocationProvider>,
    pub permissions: Arc<dyn PermissionGate>,
    pub alerts: Arc<dyn AlertPresenter>,
}
