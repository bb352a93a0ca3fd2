//! In-memory history and pin projection, kept consistent with the store.
//!
//! Store I/O always happens before the state lock is taken, and the lock is
//! held only for a single append or removal. Observers receive
//! [`RegistryChange`] events through a broadcast channel.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use geojson::{feature::Id, Feature, FeatureCollection, Geometry, JsonObject, JsonValue, Value};
use serde::Serialize;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, instrument, warn};

use crate::error::StoreError;
use crate::model::{IncidentId, IncidentRecord, MapPin};
use crate::store::IncidentStore;

pub const DEFAULT_CHANGE_CAPACITY: usize = 256;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum RegistryChange {
    Added(IncidentRecord),
    Removed(IncidentRecord),
}

#[derive(Debug, Default)]
struct RegistryState {
    history: Vec<IncidentRecord>,
    pins: Vec<MapPin>,
    /// Ids removed since the in-flight load listed the store.
    removed_during_load: Option<HashSet<IncidentId>>,
}

impl RegistryState {
    fn contains(&self, id: &IncidentId) -> bool {
        self.history.iter().any(|r| &r.id == id)
    }

    fn push_back(&mut self, record: IncidentRecord) -> bool {
        let removed = self
            .removed_during_load
            .as_ref()
            .is_some_and(|ids| ids.contains(&record.id));
        if removed || self.contains(&record.id) {
            return false;
        }
        self.pins.push(MapPin::from(&record));
        self.history.push(record);
        true
    }

    /// Returns the record it displaced, if the id was already present.
    fn push_front(&mut self, record: IncidentRecord) -> Option<IncidentRecord> {
        if let Some(ids) = self.removed_during_load.as_mut() {
            ids.remove(&record.id);
        }
        let displaced = self.remove(&record.id);
        self.pins.push(MapPin::from(&record));
        self.history.insert(0, record);
        displaced
    }

    fn remove(&mut self, id: &IncidentId) -> Option<IncidentRecord> {
        // pins are derived copies: match on key, never identity
        self.pins.retain(|pin| &pin.key != id);
        let position = self.history.iter().position(|r| &r.id == id)?;
        Some(self.history.remove(position))
    }
}

/// Clears the in-flight flag even if the load future is dropped.
struct LoadGuard<'a>(&'a AtomicBool);

impl Drop for LoadGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct IncidentRegistry<S: IncidentStore> {
    store: Arc<S>,
    state: RwLock<RegistryState>,
    changes: broadcast::Sender<RegistryChange>,
    loading: AtomicBool,
    loaded: AtomicBool,
}

impl<S: IncidentStore> IncidentRegistry<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self::with_change_capacity(store, DEFAULT_CHANGE_CAPACITY)
    }

    pub fn with_change_capacity(store: Arc<S>, capacity: usize) -> Self {
        let (changes, _rx) = broadcast::channel(capacity.max(1));
        Self {
            store,
            state: RwLock::new(RegistryState::default()),
            changes,
            loading: AtomicBool::new(false),
            loaded: AtomicBool::new(false),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Appends every stored record in store order and returns the ones added.
    ///
    /// A call made while another load is in flight is ignored. Records whose
    /// id is already held are skipped, so a repeated load never duplicates.
    /// Records removed while the store is being listed are not appended.
    #[instrument(skip(self))]
    pub async fn load(&self) -> Result<Vec<IncidentRecord>, StoreError> {
        if self
            .loading
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("History load already in flight, ignoring");
            return Ok(Vec::new());
        }
        let _guard = LoadGuard(&self.loading);

        // removes landing while the store is listed must not be resurrected
        self.state.write().await.removed_during_load = Some(HashSet::new());
        let listed = self.store.list().await;
        let records = match listed {
            Ok(records) => records,
            Err(e) => {
                self.state.write().await.removed_during_load = None;
                return Err(e);
            }
        };
        let mut appended = Vec::with_capacity(records.len());

        for record in records {
            let added = self.state.write().await.push_back(record.clone());
            if !added {
                debug!(incident_id = %record.id, "Skipping incident already held or removed");
                continue;
            }
            self.notify(RegistryChange::Added(record.clone()));
            appended.push(record);
        }

        self.state.write().await.removed_during_load = None;
        self.loaded.store(true, Ordering::Release);
        info!(count = appended.len(), "History loaded");
        Ok(appended)
    }

    /// Persists `record`, then shows it at the front of the history.
    /// Nothing becomes visible if persistence fails.
    #[instrument(skip(self, record), fields(incident_id = %record.id))]
    pub async fn commit(&self, record: IncidentRecord) -> Result<(), StoreError> {
        self.store.create(&record).await?;

        let displaced = self.state.write().await.push_front(record.clone());
        if let Some(old) = displaced {
            warn!("Committed incident replaced a stale in-memory copy");
            self.notify(RegistryChange::Removed(old));
        }
        self.notify(RegistryChange::Added(record));
        Ok(())
    }

    /// Deletes from the store, then from both projections. Absent ids succeed.
    #[instrument(skip(self, id), fields(incident_id = %id))]
    pub async fn remove(&self, id: &IncidentId) -> Result<(), StoreError> {
        self.store.delete(id).await?;

        let removed = {
            let mut state = self.state.write().await;
            if let Some(ids) = state.removed_during_load.as_mut() {
                ids.insert(id.clone());
            }
            state.remove(id)
        };
        match removed {
            Some(record) => self.notify(RegistryChange::Removed(record)),
            None => debug!("Incident not held in memory"),
        }
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::Acquire)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RegistryChange> {
        self.changes.subscribe()
    }

    pub async fn history(&self) -> Vec<IncidentRecord> {
        self.state.read().await.history.clone()
    }

    pub async fn pins(&self) -> Vec<MapPin> {
        self.state.read().await.pins.clone()
    }

    pub async fn get(&self, id: &IncidentId) -> Option<IncidentRecord> {
        self.state
            .read()
            .await
            .history
            .iter()
            .find(|r| &r.id == id)
            .cloned()
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.history.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Pin layer as GeoJSON points (`[lon, lat]`), keyed by incident id.
    pub async fn pins_geojson(&self) -> FeatureCollection {
        let state = self.state.read().await;
        let by_id: HashMap<&str, &IncidentRecord> = state
            .history
            .iter()
            .map(|r| (r.id.as_str(), r))
            .collect();

        let features = state
            .pins
            .iter()
            .map(|pin| {
                let mut properties = JsonObject::new();
                properties.insert("label".into(), JsonValue::from(pin.label.clone()));
                if let Some(record) = by_id.get(pin.key.as_str()) {
                    properties.insert(
                        "network_status".into(),
                        JsonValue::from(record.network_status.as_str()),
                    );
                    properties.insert("timestamp_ms".into(), JsonValue::from(record.timestamp.0));
                }
                Feature {
                    bbox: None,
                    geometry: Some(Geometry::new(Value::Point(vec![
                        pin.position.lon(),
                        pin.position.lat(),
                    ]))),
                    id: Some(Id::String(pin.key.as_str().to_string())),
                    properties: Some(properties),
                    foreign_members: None,
                }
            })
            .collect();

        FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        }
    }

    fn notify(&self, change: RegistryChange) {
        // no receivers is fine
        let _ = self.changes.send(change);
    }
}
