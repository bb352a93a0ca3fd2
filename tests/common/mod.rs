#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use incident_sync::capabilities::{
    AlertPresenter, Capabilities, LocationProvider, MapRegion, MapSurface, PermissionGate,
    PermissionStatus,
};
use incident_sync::error::CapabilityError;
use incident_sync::LatLon;

/// Scripted shell standing in for the map widget, GPS and dialogs.
#[derive(Default)]
pub struct FakeShell {
    pub moves: Mutex<Vec<MapRegion>>,
    pub notifications: Mutex<Vec<(String, String)>>,
    pub confirm_answers: Mutex<VecDeque<bool>>,
    pub last_known: Mutex<Option<LatLon>>,
}

impl FakeShell {
    pub fn with_location(lat: f64, lon: f64) -> Arc<Self> {
        let shell = Self::default();
        *shell.last_known.lock().unwrap() = Some(LatLon::new(lat, lon).unwrap());
        Arc::new(shell)
    }

    pub fn capabilities(self: &Arc<Self>) -> Capabilities {
        Capabilities {
            map: Arc::clone(self) as Arc<dyn MapSurface>,
            location: Arc::clone(self) as Arc<dyn LocationProvider>,
            permissions: Arc::clone(self) as Arc<dyn PermissionGate>,
            alerts: Arc::clone(self) as Arc<dyn AlertPresenter>,
        }
    }

    pub fn answer_confirm(&self, answer: bool) {
        self.confirm_answers.lock().unwrap().push_back(answer);
    }

    pub fn notifications(&self) -> Vec<(String, String)> {
        self.notifications.lock().unwrap().clone()
    }

    pub fn moves(&self) -> Vec<MapRegion> {
        self.moves.lock().unwrap().clone()
    }
}

impl MapSurface for FakeShell {
    fn move_to_region(&self, region: MapRegion) {
        self.moves.lock().unwrap().push(region);
    }
}

#[async_trait::async_trait]
impl LocationProvider for FakeShell {
    async fn last_known_location(&self) -> Result<Option<LatLon>, CapabilityError> {
        Ok(*self.last_known.lock().unwrap())
    }
}

#[async_trait::async_trait]
impl PermissionGate for FakeShell {
    async fn check_status(&self) -> PermissionStatus {
        PermissionStatus::Granted
    }

    async fn request(&self) -> PermissionStatus {
        PermissionStatus::Granted
    }
}

#[async_trait::async_trait]
impl AlertPresenter for FakeShell {
    async fn confirm(&self, _title: &str, _message: &str) -> bool {
        self.confirm_answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(false)
    }

    async fn notify(&self, title: &str, message: &str) {
        self.notifications
            .lock()
            .unwrap()
            .push((title.to_string(), message.to_string()));
    }
}
