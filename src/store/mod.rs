//! The target record store, as consumed by the importer and verifier.

pub mod migrate;
mod sqlite;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::entity::Entity;
use crate::error::StoreError;
use crate::transform::TargetRecord;

pub use sqlite::SqliteTargetStore;

/// Identifier assigned by the target store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub String);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredRecord {
    pub id: RecordId,
    pub entity: Entity,
    pub owner_id: String,
    pub legacy_id: Option<i64>,
    pub body: Value,
}

/// Per-entity document operations. Implementations must enforce uniqueness
/// of `(entity, legacyId)` and report a violation as
/// [`StoreError::Duplicate`].
#[async_trait]
pub trait TargetStore: Send + Sync {
    async fn insert(&self, record: &TargetRecord) -> Result<RecordId, StoreError>;

    /// Insert or overwrite the record matched by `natural_key` within the
    /// record's entity.
    async fn upsert_by_key(
        &self,
        natural_key: &str,
        record: &TargetRecord,
    ) -> Result<RecordId, StoreError>;

    async fn get(&self, entity: Entity, id: &RecordId) -> Result<Option<StoredRecord>, StoreError>;

    async fn find_by_legacy_id(
        &self,
        entity: Entity,
        legacy_id: i64,
    ) -> Result<Option<RecordId>, StoreError>;

    async fn list_by_owner(
        &self,
        entity: Entity,
        owner_id: &str,
    ) -> Result<Vec<StoredRecord>, StoreError>;

    /// Returns whether a record was removed.
    async fn delete(&self, entity: Entity, id: &RecordId) -> Result<bool, StoreError>;
}
