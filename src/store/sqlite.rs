use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rusqlite::{params, Connection, ErrorCode};
use tokio::sync::OnceCell;
use tracing::{debug, error, info, instrument, warn};

use super::IncidentStore;
use crate::codec;
use crate::error::StoreError;
use crate::model::{IncidentId, IncidentRecord, UnixTimeMs};

pub const CURRENT_SCHEMA_VERSION: u32 = 1;
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA_V1: &str = r#"
    BEGIN;
    CREATE TABLE IF NOT EXISTS incident_logs (
        row_id INTEGER PRIMARY KEY AUTOINCREMENT,
        incident_id TEXT NOT NULL UNIQUE,
        disaster_type TEXT NOT NULL,
        location TEXT NOT NULL,
        network_status TEXT NOT NULL,
        timestamp_ms INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_incident_logs_timestamp
        ON incident_logs(timestamp_ms DESC, row_id DESC);
    PRAGMA user_version = 1;
    COMMIT;
"#;

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::IoFailure(e.to_string())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreLocation {
    File(PathBuf),
    InMemory,
}

/// SQLite-backed store, opened lazily on first use.
///
/// Concurrent first calls wait on the same initialization; the schema is
/// created exactly once per store instance.
pub struct SqliteIncidentStore {
    location: StoreLocation,
    conn: OnceCell<Arc<Mutex<Connection>>>,
}

impl SqliteIncidentStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            location: StoreLocation::File(path.into()),
            conn: OnceCell::new(),
        }
    }

    pub fn new_in_memory() -> Self {
        Self {
            location: StoreLocation::InMemory,
            conn: OnceCell::new(),
        }
    }

    pub fn location(&self) -> &StoreLocation {
        &self.location
    }

    pub fn is_initialized(&self) -> bool {
        self.conn.initialized()
    }

    async fn connection(&self) -> Result<Arc<Mutex<Connection>>, StoreError> {
        let conn = self
            .conn
            .get_or_try_init(|| async {
                let location = self.location.clone();
                let conn = run_blocking(move || open_connection(&location)).await?;
                Ok::<_, StoreError>(Arc::new(Mutex::new(conn)))
            })
            .await?;
        Ok(Arc::clone(conn))
    }

    async fn with_connection<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.connection().await?;
        run_blocking(move || {
            let guard = conn.lock().map_err(|_| StoreError::LockFailed)?;
            f(&guard)
        })
        .await
    }
}

async fn run_blocking<T, F>(f: F) -> Result<T, StoreError>
where
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| StoreError::IoFailure(format!("blocking task failed: {e}")))?
}

fn open_connection(location: &StoreLocation) -> Result<Connection, StoreError> {
    let conn = match location {
        StoreLocation::File(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            info!(path = %path.display(), "Opening incident database");
            Connection::open(path)?
        }
        StoreLocation::InMemory => Connection::open_in_memory()?,
    };
    conn.busy_timeout(BUSY_TIMEOUT)?;
    migrate(&conn)?;
    Ok(conn)
}

fn migrate(conn: &Connection) -> Result<(), StoreError> {
    let found: u32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    if found > CURRENT_SCHEMA_VERSION {
        return Err(StoreError::FutureSchema {
            found,
            max: CURRENT_SCHEMA_VERSION,
        });
    }
    if found < 1 {
        conn.execute_batch(SCHEMA_V1)?;
        info!(version = CURRENT_SCHEMA_VERSION, "Incident schema created");
    }
    Ok(())
}

/// Row exactly as stored, before any decoding.
struct RawRow {
    row_id: i64,
    incident_id: String,
    disaster_type: String,
    location: String,
    network_status: String,
    timestamp_ms: i64,
}

impl RawRow {
    fn decode(self) -> Result<IncidentRecord, &'static str> {
        let disaster_type = self
            .disaster_type
            .parse()
            .map_err(|_| "unknown disaster type")?;
        let location = codec::parse_lat_lon(&self.location).map_err(|_| "unparseable location")?;
        let network_status = self
            .network_status
            .parse()
            .map_err(|()| "unknown network status")?;
        let timestamp = u64::try_from(self.timestamp_ms).map_err(|_| "negative timestamp")?;
        if self.incident_id.trim().is_empty() {
            return Err("empty incident id");
        }
        Ok(IncidentRecord {
            id: IncidentId::from_stored(self.incident_id),
            disaster_type,
            location,
            network_status,
            timestamp: UnixTimeMs(timestamp),
        })
    }
}

#[async_trait::async_trait]
impl IncidentStore for SqliteIncidentStore {
    #[instrument(skip(self, record), fields(incident_id = %record.id))]
    async fn create(&self, record: &IncidentRecord) -> Result<(), StoreError> {
        let incident_id = record.id.as_str().to_string();
        let disaster_type = record.disaster_type.as_str();
        let location = codec::format_lat_lon(record.location);
        let network_status = record.network_status.as_str();
        let timestamp_ms = i64::try_from(record.timestamp.0).unwrap_or(i64::MAX);

        let result = self
            .with_connection(move |conn| {
                let inserted = conn.execute(
                    "INSERT INTO incident_logs \
                     (incident_id, disaster_type, location, network_status, timestamp_ms) \
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![incident_id, disaster_type, location, network_status, timestamp_ms],
                );
                match inserted {
                    Ok(_) => Ok(()),
                    Err(rusqlite::Error::SqliteFailure(err, _))
                        if err.code == ErrorCode::ConstraintViolation =>
                    {
                        Err(StoreError::DuplicateId(incident_id))
                    }
                    Err(e) => Err(e.into()),
                }
            })
            .await;

        match &result {
            Ok(()) => info!("Incident persisted"),
            Err(StoreError::DuplicateId(_)) => warn!("Incident id already stored"),
            Err(e) => error!("Failed to persist incident: {e}"),
        }
        result
    }

    #[instrument(skip(self))]
    async fn list(&self) -> Result<Vec<IncidentRecord>, StoreError> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT row_id, incident_id, disaster_type, location, network_status, timestamp_ms \
                 FROM incident_logs ORDER BY timestamp_ms DESC, row_id DESC",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok(RawRow {
                    row_id: row.get(0)?,
                    incident_id: row.get(1)?,
                    disaster_type: row.get(2)?,
                    location: row.get(3)?,
                    network_status: row.get(4)?,
                    timestamp_ms: row.get(5)?,
                })
            })?;

            let mut records = Vec::new();
            for row in rows {
                let raw = row?;
                let row_id = raw.row_id;
                match raw.decode() {
                    Ok(record) => records.push(record),
                    Err(reason) => warn!(row_id, reason, "Skipping corrupted incident row"),
                }
            }
            Ok(records)
        })
        .await
    }

    #[instrument(skip(self, id), fields(incident_id = %id))]
    async fn delete(&self, id: &IncidentId) -> Result<(), StoreError> {
        let incident_id = id.as_str().to_string();
        let removed = self
            .with_connection(move |conn| {
                Ok(conn.execute(
                    "DELETE FROM incident_logs WHERE incident_id = ?1",
                    params![incident_id],
                )?)
            })
            .await?;
        if removed == 0 {
            debug!("Delete of absent incident treated as success");
        }
        Ok(())
    }
}
