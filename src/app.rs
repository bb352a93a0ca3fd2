//! Presentation context.
//!
//! [`App`] owns the draft and the view state and applies [`Event`]s one at a
//! time. Anything that happens on another thread (connectivity callbacks, the
//! initial history load) reaches it either as an event or as a joined task.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::capabilities::{Capabilities, MapRegion};
use crate::codec;
use crate::config::EngineConfig;
use crate::connectivity::ConnectivityMonitor;
use crate::draft::{DraftController, DraftPhase, IdentifierMode};
use crate::error::{AppError, AppResult, ErrorKind, StoreError};
use crate::event::Event;
use crate::model::{DisasterType, IncidentId, IncidentRecord, MapPin, NetworkStatus};
use crate::registry::IncidentRegistry;
use crate::store::IncidentStore;
use crate::{format_time_ago, get_current_time_ms};

pub const LATITUDE_PLACEHOLDER: &str = "Drag Map to Select";
pub const LONGITUDE_PLACEHOLDER: &str = "...";

pub const SAVED_TITLE: &str = "Saved";
pub const SAVED_MESSAGE: &str = "Incident Logged";
pub const ERROR_TITLE: &str = "Error";
pub const DELETE_TITLE: &str = "Delete Log";
pub const DELETE_MESSAGE: &str = "Are you sure you want to delete this incident?";

// ============================================================================
// View model
// ============================================================================

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct HistoryItem {
    pub id: String,
    pub disaster_type: String,
    pub location_text: String,
    pub network_status: String,
    pub time_ago: String,
    pub timestamp_ms: u64,
}

impl HistoryItem {
    fn from_record(record: &IncidentRecord, now_ms: u64) -> Self {
        Self {
            id: record.id.to_string(),
            disaster_type: record.disaster_type.as_str().to_string(),
            location_text: codec::format_lat_lon(record.location),
            network_status: record.network_status.as_str().to_string(),
            time_ago: format_time_ago(record.timestamp.0, now_ms),
            timestamp_ms: record.timestamp.0,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DraftView {
    pub disaster_type: Option<String>,
    pub identifier: String,
    pub identifier_editable: bool,
    pub latitude_display: String,
    pub longitude_display: String,
    pub phase: DraftPhase,
    pub can_submit: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ViewModel {
    pub history: Vec<HistoryItem>,
    pub pins: Vec<MapPin>,
    pub draft: DraftView,
    pub connectivity_label: String,
    pub network_status: NetworkStatus,
    pub detail: Option<HistoryItem>,
    pub disaster_types: Vec<String>,
    pub region: Option<MapRegion>,
}

// ============================================================================
// App
// ============================================================================

type LoadTask = JoinHandle<Result<Vec<IncidentRecord>, StoreError>>;

pub struct App<S: IncidentStore + 'static> {
    config: EngineConfig,
    registry: Arc<IncidentRegistry<S>>,
    connectivity: Arc<ConnectivityMonitor>,
    draft: DraftController,
    caps: Capabilities,
    region: Option<MapRegion>,
    selected: Option<IncidentId>,
    load_task: Option<LoadTask>,
    initialized: bool,
}

impl<S: IncidentStore + 'static> App<S> {
    pub fn new(
        config: EngineConfig,
        store: Arc<S>,
        connectivity: Arc<ConnectivityMonitor>,
        caps: Capabilities,
    ) -> AppResult<Self> {
        config.validate()?;
        let registry = Arc::new(IncidentRegistry::with_change_capacity(
            store,
            config.change_channel_capacity,
        ));
        let mut draft = DraftController::new(
            config.identifier_mode,
            config.max_identifier_attempts,
            Arc::clone(&connectivity),
        );
        draft.refresh_network_status(connectivity.current_status());

        Ok(Self {
            config,
            registry,
            connectivity,
            draft,
            caps,
            region: None,
            selected: None,
            load_task: None,
            initialized: false,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<IncidentRegistry<S>> {
        &self.registry
    }

    pub fn draft(&self) -> &DraftController {
        &self.draft
    }

    pub fn selected(&self) -> Option<&IncidentId> {
        self.selected.as_ref()
    }

    /// Start-up sequence. Repeats on each call until the history load
    /// succeeds; later calls are no-ops.
    ///
    /// The history load runs as its own task while permission and location
    /// are resolved, and is joined before this returns.
    #[instrument(skip(self))]
    pub async fn initialize(&mut self) {
        if self.initialized {
            return;
        }

        let registry = Arc::clone(&self.registry);
        self.load_task = Some(tokio::spawn(async move { registry.load().await }));

        self.center_on_device().await;
        self.initialized = self.join_load().await;
    }

    async fn center_on_device(&mut self) {
        let mut permission = self.caps.permissions.check_status().await;
        if !permission.is_granted() {
            permission = self.caps.permissions.request().await;
        }
        if !permission.is_granted() {
            let err = AppError::new(ErrorKind::LocationPermissionDenied, "permission denied");
            warn!(code = err.code(), "Map stays at its default region");
            return;
        }

        match self.caps.location.last_known_location().await {
            Ok(Some(location)) => {
                let region =
                    MapRegion::from_center_and_radius(location, self.config.startup_radius_km);
                self.move_map(region);
            }
            Ok(None) => debug!("No last known location"),
            Err(e) => {
                let err = AppError::from(e);
                warn!(code = err.code(), error = %err, "Last known location unavailable");
            }
        }
    }

    /// True once history is in place.
    async fn join_load(&mut self) -> bool {
        let Some(task) = self.load_task.take() else {
            return self.registry.is_loaded();
        };
        match task.await {
            Ok(Ok(records)) => {
                debug!(count = records.len(), "Initial load joined");
                self.registry.is_loaded()
            }
            Ok(Err(e)) => {
                error!(error = %e, "Initial history load failed");
                self.report_error(AppError::from(e)).await;
                false
            }
            Err(e) => {
                error!(error = %e, "Initial history load task aborted");
                false
            }
        }
    }

    /// Applies one event. All state changes happen here.
    #[instrument(skip(self, event), fields(event = event.name()))]
    pub async fn update(&mut self, event: Event) {
        match event {
            Event::Appeared => self.initialize().await,

            Event::VisibleRegionChanged { region } => {
                self.region = Some(region);
                self.draft.set_candidate_location(region.center);
            }
            Event::ZoomIn => {
                if let Some(region) = self.region {
                    self.move_map(region.zoom_in());
                }
            }
            Event::ZoomOut => {
                if let Some(region) = self.region {
                    self.move_map(region.zoom_out());
                }
            }

            Event::NetworkStatusChanged { status } => {
                self.draft.refresh_network_status(status);
            }

            Event::DisasterTypeSelected { disaster_type } => {
                self.draft.set_type(disaster_type);
            }
            Event::IdentifierEdited { text } => {
                if self.draft.mode() == IdentifierMode::UserSupplied {
                    self.draft.set_identifier(text);
                } else {
                    debug!("Identifier is generated, ignoring edit");
                }
            }
            Event::SubmitRequested => self.submit().await,
            Event::DraftCancelled => self.draft.cancel(),

            Event::HistoryItemSelected { id } => self.select(id).await,
            Event::DetailClosed => self.close_detail(),
            Event::DeleteRequested { id } => self.delete(id).await,
        }
    }

    /// Drains `events` until every sender is dropped.
    pub async fn run(&mut self, mut events: mpsc::Receiver<Event>) {
        while let Some(event) = events.recv().await {
            self.update(event).await;
        }
        debug!("Event channel closed");
    }

    pub async fn view(&self) -> ViewModel {
        let now_ms = get_current_time_ms();
        let history = self.registry.history().await;
        let detail = self.selected.as_ref().and_then(|id| {
            history
                .iter()
                .find(|r| &r.id == id)
                .map(|r| HistoryItem::from_record(r, now_ms))
        });

        ViewModel {
            history: history
                .iter()
                .map(|r| HistoryItem::from_record(r, now_ms))
                .collect(),
            pins: self.registry.pins().await,
            draft: self.draft_view(),
            connectivity_label: self.connectivity.snapshot().label().to_string(),
            network_status: self.connectivity.current_status(),
            detail,
            disaster_types: DisasterType::ALL
                .iter()
                .map(|t| t.as_str().to_string())
                .collect(),
            region: self.region,
        }
    }

    fn draft_view(&self) -> DraftView {
        let state = self.draft.state();
        let (latitude_display, longitude_display) = match state.location {
            Some(location) => (
                codec::format_component(location.lat()),
                codec::format_component(location.lon()),
            ),
            None => (
                LATITUDE_PLACEHOLDER.to_string(),
                LONGITUDE_PLACEHOLDER.to_string(),
            ),
        };
        DraftView {
            disaster_type: state.disaster_type.map(|t| t.as_str().to_string()),
            identifier: state.identifier.clone(),
            identifier_editable: self.draft.mode() == IdentifierMode::UserSupplied,
            latitude_display,
            longitude_display,
            phase: self.draft.phase(),
            can_submit: self.draft.validate().is_ok(),
        }
    }

    async fn submit(&mut self) {
        match self.draft.submit(&self.registry).await {
            Ok(record) => {
                info!(incident_id = %record.id, "Incident logged");
                self.caps.alerts.notify(SAVED_TITLE, SAVED_MESSAGE).await;
            }
            Err(e) => {
                let err = AppError::from(e);
                if err.is_retryable() {
                    error!(error = %err, "Incident could not be saved");
                } else {
                    debug!(error = %err, "Incident rejected");
                }
                self.report_error(err).await;
            }
        }
    }

    async fn select(&mut self, id: IncidentId) {
        let Some(record) = self.registry.get(&id).await else {
            warn!(incident_id = %id, "Selected incident is not in history");
            return;
        };
        self.move_map(MapRegion::from_center_and_radius(
            record.location,
            self.config.focus_radius_km,
        ));
        self.draft.set_candidate_location(record.location);
        self.selected = Some(id);
    }

    fn close_detail(&mut self) {
        self.selected = None;
        self.draft.clear_location();
    }

    async fn delete(&mut self, id: IncidentId) {
        if !self.caps.alerts.confirm(DELETE_TITLE, DELETE_MESSAGE).await {
            debug!(incident_id = %id, "Delete declined");
            return;
        }
        if let Err(e) = self.registry.remove(&id).await {
            error!(incident_id = %id, error = %e, "Delete failed");
            self.report_error(AppError::from(e)).await;
            return;
        }
        self.close_detail();
    }

    fn move_map(&mut self, region: MapRegion) {
        self.region = Some(region);
        self.caps.map.move_to_region(region);
    }

    async fn report_error(&self, err: AppError) {
        self.caps
            .alerts
            .notify(ERROR_TITLE, &err.user_facing_message())
            .await;
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl App<crate::store::SqliteIncidentStore> {
    /// App backed by the SQLite file named in `config`.
    pub fn open(
        config: EngineConfig,
        connectivity: Arc<ConnectivityMonitor>,
        caps: Capabilities,
    ) -> AppResult<Self> {
        let store = Arc::new(crate::store::SqliteIncidentStore::new(
            config.database_path.clone(),
        ));
        Self::new(config, store, connectivity, caps)
    }
}

/// Forwards every connectivity transition into the app's event channel.
/// Ends when either side goes away.
pub fn spawn_connectivity_bridge(
    monitor: &ConnectivityMonitor,
    events: mpsc::Sender<Event>,
) -> JoinHandle<()> {
    let mut rx = monitor.subscribe();
    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let status = rx.borrow_and_update().status;
            if events
                .send(Event::NetworkStatusChanged { status })
                .await
                .is_err()
            {
                break;
            }
        }
    })
}
