use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use crate::codec;
use crate::connectivity::ConnectivityMonitor;
use crate::error::{ParseError, StoreError, SubmitError, ValidationError};
use crate::model::{
    DisasterType, IncidentId, IncidentRecord, LatLon, NetworkStatus, UnixTimeMs,
    GENERATED_ID_PREFIX, GENERATED_ID_SUFFIX_LEN,
};
use crate::registry::IncidentRegistry;
use crate::store::IncidentStore;

const ID_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Produces `SOS-` followed by four uppercase alphanumerics.
pub fn generate_identifier<R: Rng + ?Sized>(rng: &mut R) -> String {
    let suffix: String = (0..GENERATED_ID_SUFFIX_LEN)
        .map(|_| char::from(ID_CHARSET[rng.gen_range(0..ID_CHARSET.len())]))
        .collect();
    format!("{GENERATED_ID_PREFIX}{suffix}")
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierMode {
    #[default]
    Generated,
    UserSupplied,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DraftPhase {
    #[default]
    Empty,
    LocationPending,
    Ready,
    Submitting,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct DraftState {
    pub disaster_type: Option<DisasterType>,
    pub identifier: String,
    /// `None` is "not chosen yet", distinct from a chosen (0, 0).
    pub location: Option<LatLon>,
    pub network_status: NetworkStatus,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct DraftSnapshot {
    pub state: DraftState,
    pub phase: DraftPhase,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ValidatedDraft {
    pub id: IncidentId,
    pub disaster_type: DisasterType,
    pub location: LatLon,
}

/// Holds the draft in `Submitting` and puts back the pre-submit state unless
/// [`SubmitGuard::finish`] is called.
struct SubmitGuard<'a> {
    draft: &'a mut DraftController,
    restore: Option<(DraftState, DraftPhase)>,
}

impl<'a> SubmitGuard<'a> {
    fn begin(draft: &'a mut DraftController) -> Self {
        let restore = Some((draft.state.clone(), draft.phase));
        draft.phase = DraftPhase::Submitting;
        draft.publish();
        Self { draft, restore }
    }

    fn finish(&mut self) -> &mut DraftController {
        self.restore = None;
        &mut *self.draft
    }
}

impl Drop for SubmitGuard<'_> {
    fn drop(&mut self) {
        if let Some((state, phase)) = self.restore.take() {
            self.draft.state = state;
            self.draft.phase = phase;
            self.draft.publish();
        }
    }
}

/// Owns the single in-progress incident. Holds nothing from the registry.
pub struct DraftController {
    mode: IdentifierMode,
    max_identifier_attempts: u32,
    connectivity: Arc<ConnectivityMonitor>,
    rng: StdRng,
    state: DraftState,
    phase: DraftPhase,
    changes: watch::Sender<DraftSnapshot>,
}

impl DraftController {
    pub fn new(
        mode: IdentifierMode,
        max_identifier_attempts: u32,
        connectivity: Arc<ConnectivityMonitor>,
    ) -> Self {
        Self::with_rng(
            mode,
            max_identifier_attempts,
            connectivity,
            StdRng::from_entropy(),
        )
    }

    pub fn with_rng(
        mode: IdentifierMode,
        max_identifier_attempts: u32,
        connectivity: Arc<ConnectivityMonitor>,
        rng: StdRng,
    ) -> Self {
        let (changes, _rx) = watch::channel(DraftSnapshot::default());
        let mut controller = Self {
            mode,
            max_identifier_attempts: max_identifier_attempts.max(1),
            connectivity,
            rng,
            state: DraftState::default(),
            phase: DraftPhase::Empty,
            changes,
        };
        controller.reset();
        controller
    }

    pub fn mode(&self) -> IdentifierMode {
        self.mode
    }

    pub fn phase(&self) -> DraftPhase {
        self.phase
    }

    pub fn state(&self) -> &DraftState {
        &self.state
    }

    pub fn disaster_type(&self) -> Option<DisasterType> {
        self.state.disaster_type
    }

    pub fn identifier(&self) -> &str {
        &self.state.identifier
    }

    pub fn location(&self) -> Option<LatLon> {
        self.state.location
    }

    pub fn subscribe(&self) -> watch::Receiver<DraftSnapshot> {
        self.changes.subscribe()
    }

    /// Returns false if a submission is in progress.
    pub fn set_type(&mut self, disaster_type: DisasterType) -> bool {
        if !self.is_editable() {
            return false;
        }
        self.state.disaster_type = Some(disaster_type);
        self.settle();
        true
    }

    pub fn set_identifier(&mut self, text: impl Into<String>) -> bool {
        if !self.is_editable() {
            return false;
        }
        self.state.identifier = text.into();
        self.settle();
        true
    }

    /// Map-drag or device-location result. Does not validate the identifier.
    pub fn set_candidate_location(&mut self, location: LatLon) -> bool {
        if !self.is_editable() {
            return false;
        }
        self.state.location = Some(location);
        self.settle();
        true
    }

    pub fn set_candidate_location_text(&mut self, text: &str) -> Result<bool, ParseError> {
        let location = codec::parse_lat_lon(text)?;
        Ok(self.set_candidate_location(location))
    }

    pub fn clear_location(&mut self) -> bool {
        if !self.is_editable() {
            return false;
        }
        self.state.location = None;
        self.settle();
        true
    }

    /// Display-only snapshot; `submit` always re-reads the monitor.
    pub fn refresh_network_status(&mut self, status: NetworkStatus) {
        self.state.network_status = status;
        self.publish();
    }

    /// Checks identifier, then type, then location.
    pub fn validate(&self) -> Result<ValidatedDraft, ValidationError> {
        let id = match self.mode {
            IdentifierMode::Generated => IncidentId::generated(&self.state.identifier)?,
            IdentifierMode::UserSupplied => IncidentId::user_supplied(&self.state.identifier)?,
        };
        let disaster_type = self
            .state
            .disaster_type
            .ok_or(ValidationError::MissingType)?;
        let location = self
            .state
            .location
            .ok_or(ValidationError::MissingLocation)?;
        Ok(ValidatedDraft {
            id,
            disaster_type,
            location,
        })
    }

    /// Validates, stamps and commits the draft. Resets to `Empty` on success;
    /// leaves the draft as it was on any failure, or if the returned future is
    /// dropped before completing.
    #[instrument(skip(self, registry), fields(mode = ?self.mode))]
    pub async fn submit<S: IncidentStore>(
        &mut self,
        registry: &IncidentRegistry<S>,
    ) -> Result<IncidentRecord, SubmitError> {
        let validated = self.validate().map_err(|e| {
            debug!(error = %e, "Draft rejected");
            e
        })?;

        let network_status = self.connectivity.current_status();
        let mut guard = SubmitGuard::begin(self);

        let mut id = validated.id;
        let mut attempt = 1;
        loop {
            let record = IncidentRecord {
                id: id.clone(),
                disaster_type: validated.disaster_type,
                location: codec::quantize(validated.location),
                network_status,
                timestamp: UnixTimeMs::now(),
            };

            match registry.commit(record.clone()).await {
                Ok(()) => {
                    info!(incident_id = %record.id, "Incident submitted");
                    let draft = guard.finish();
                    draft.state.network_status = network_status;
                    draft.reset();
                    return Ok(record);
                }
                Err(StoreError::DuplicateId(taken))
                    if guard.draft.mode == IdentifierMode::Generated
                        && attempt < guard.draft.max_identifier_attempts =>
                {
                    warn!(taken = %taken, attempt, "Generated identifier collided, regenerating");
                    attempt += 1;
                    id = IncidentId::from_stored(generate_identifier(&mut guard.draft.rng));
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Explicit cancel; allowed from any phase.
    pub fn cancel(&mut self) {
        self.reset();
    }

    fn reset(&mut self) {
        let network_status = self.state.network_status;
        self.state = DraftState {
            network_status,
            ..DraftState::default()
        };
        if self.mode == IdentifierMode::Generated {
            self.state.identifier = generate_identifier(&mut self.rng);
        }
        self.phase = DraftPhase::Empty;
        self.publish();
    }

    fn is_editable(&self) -> bool {
        self.phase != DraftPhase::Submitting
    }

    fn settle(&mut self) {
        self.phase = match (&self.state.location, &self.state.disaster_type) {
            (Some(_), _) => DraftPhase::Ready,
            (None, Some(_)) => DraftPhase::LocationPending,
            (None, None) => DraftPhase::Empty,
        };
        self.publish();
    }

    fn publish(&self) {
        self.changes.send_replace(DraftSnapshot {
            state: self.state.clone(),
            phase: self.phase,
        });
    }
}
