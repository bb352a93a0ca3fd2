use crate::error::StoreError;
use crate::model::{IncidentId, IncidentRecord};

#[cfg(not(target_arch = "wasm32"))]
mod sqlite;

#[cfg(not(target_arch = "wasm32"))]
pub use self::sqlite::{SqliteIncidentStore, StoreLocation, CURRENT_SCHEMA_VERSION};

// ============================================================================
// Storage Trait
// ============================================================================

/// Durable incident persistence.
///
/// Implementations own any internal row identifier; callers only ever see the
/// user-facing [`IncidentId`].
#[async_trait::async_trait]
pub trait IncidentStore: Send + Sync {
    /// Appends a new row. Fails with `DuplicateId` if `record.id` is taken.
    async fn create(&self, record: &IncidentRecord) -> Result<(), StoreError>;

    /// All records, newest timestamp first; ties newest insertion first.
    async fn list(&self) -> Result<Vec<IncidentRecord>, StoreError>;

    /// Removes the matching row. Absent ids are a successful no-op.
    async fn delete(&self, id: &IncidentId) -> Result<(), StoreError>;
}
