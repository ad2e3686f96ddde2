use std::collections::BTreeMap;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, info_span, warn, Instrument};

use crate::entity::Entity;
use crate::error::{ExtractionError, ImportError, MigrationError, StoreError};
use crate::extract::SourceClient;
use crate::store::{RecordId, TargetStore};
use crate::transform::{raw_legacy_id, transform_row, SourceRow};

pub const PROGRESS_EVERY: u64 = 100;

/// Success/failure counters for one entity, the shape operators see.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct EntityCounts {
    pub success: u64,
    pub failed: u64,
}

pub type MigrationSummary = BTreeMap<Entity, EntityCounts>;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RowFailure {
    pub legacy_id: Option<i64>,
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionFailure {
    pub code: String,
    pub message: String,
}

impl From<&ExtractionError> for ExtractionFailure {
    fn from(err: &ExtractionError) -> Self {
        Self {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EntityReport {
    pub extracted: u64,
    pub inserted: u64,
    pub already_present: u64,
    pub upserted: u64,
    pub failed: u64,
    pub failures: Vec<RowFailure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extraction_error: Option<ExtractionFailure>,
}

impl EntityReport {
    pub fn succeeded(&self) -> u64 {
        self.inserted + self.already_present + self.upserted
    }

    pub fn counts(&self) -> EntityCounts {
        EntityCounts {
            success: self.succeeded(),
            failed: self.failed,
        }
    }

    fn record(&mut self, outcome: RowOutcome) {
        match outcome {
            RowOutcome::Inserted(_) => self.inserted += 1,
            RowOutcome::AlreadyPresent(_) => self.already_present += 1,
            RowOutcome::Upserted(_) => self.upserted += 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MigrationReport {
    pub started_at: String,
    pub finished_at: String,
    pub entities: BTreeMap<Entity, EntityReport>,
}

impl MigrationReport {
    pub fn summary(&self) -> MigrationSummary {
        self.entities
            .iter()
            .map(|(entity, report)| (*entity, report.counts()))
            .collect()
    }

    /// Entities whose extraction aborted, in processing order.
    pub fn extraction_failures(&self) -> Vec<Entity> {
        self.entities
            .iter()
            .filter(|(_, report)| report.extraction_error.is_some())
            .map(|(entity, _)| *entity)
            .collect()
    }

    pub fn total_failed_rows(&self) -> u64 {
        self.entities.values().map(|report| report.failed).sum()
    }
}

/// What the idempotency rule decided for a row that made it to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    Inserted(RecordId),
    AlreadyPresent(RecordId),
    Upserted(RecordId),
}

impl RowOutcome {
    pub fn id(&self) -> &RecordId {
        match self {
            RowOutcome::Inserted(id) | RowOutcome::AlreadyPresent(id) | RowOutcome::Upserted(id) => {
                id
            }
        }
    }
}

/// Drives extract, transform and load for every entity in order.
pub struct Importer<'a> {
    source: &'a SourceClient,
    store: &'a dyn TargetStore,
}

impl<'a> Importer<'a> {
    pub fn new(source: &'a SourceClient, store: &'a dyn TargetStore) -> Self {
        Self { source, store }
    }

    /// Run every entity and return the per-entity counters.
    pub async fn run_migration(&self) -> MigrationSummary {
        self.run().await.summary()
    }

    /// As [`Importer::run`], abandoned with
    /// [`MigrationError::DeadlineExceeded`] once `deadline` elapses.
    pub async fn run_with_deadline(
        &self,
        deadline: Duration,
    ) -> Result<MigrationReport, MigrationError> {
        tokio::time::timeout(deadline, self.run())
            .await
            .map_err(|_| MigrationError::DeadlineExceeded {
                secs: deadline.as_secs(),
            })
    }

    pub async fn run(&self) -> MigrationReport {
        let started_at = Utc::now().to_rfc3339();
        info!(target: "journal_migrate", event = "migration_start");

        let mut entities = BTreeMap::new();
        for entity in Entity::ALL {
            let report = self.import_entity(entity).await;
            entities.insert(entity, report);
        }

        let report = MigrationReport {
            started_at,
            finished_at: Utc::now().to_rfc3339(),
            entities,
        };
        info!(
            target: "journal_migrate",
            event = "migration_complete",
            failed_rows = report.total_failed_rows(),
            failed_extractions = report.extraction_failures().len()
        );
        report
    }

    pub async fn import_entity(&self, entity: Entity) -> EntityReport {
        let mut report = EntityReport::default();
        let collection = entity.source_collection();

        let rows = match self.source.fetch_all(collection).await {
            Ok(rows) => rows,
            Err(err) => {
                warn!(
                    target: "journal_migrate",
                    event = "extract_failed",
                    entity = %entity,
                    collection,
                    code = err.code(),
                    error = %err
                );
                report.extraction_error = Some(ExtractionFailure::from(&err));
                return report;
            }
        };

        report.extracted = rows.len() as u64;
        info!(target: "journal_migrate", event = "import_entity_start", entity = %entity, rows = report.extracted);

        for (index, row) in rows.iter().enumerate() {
            let legacy_id = raw_legacy_id(row);
            let span = info_span!(target: "journal_migrate", "import_row", entity = %entity, legacy_id);
            match self.import_row(entity, row).instrument(span).await {
                Ok(outcome) => report.record(outcome),
                Err(err) => {
                    warn!(
                        target: "journal_migrate",
                        event = "import_row_failed",
                        entity = %entity,
                        legacy_id,
                        code = err.code(),
                        error = %err
                    );
                    report.failed += 1;
                    report.failures.push(RowFailure {
                        legacy_id,
                        code: err.code().to_string(),
                        message: err.to_string(),
                    });
                }
            }

            let processed = index as u64 + 1;
            if processed % PROGRESS_EVERY == 0 {
                info!(
                    target: "journal_migrate",
                    event = "import_progress",
                    entity = %entity,
                    processed,
                    total = report.extracted,
                    failed = report.failed
                );
            }
        }

        info!(
            target: "journal_migrate",
            event = "import_entity_complete",
            entity = %entity,
            inserted = report.inserted,
            already_present = report.already_present,
            upserted = report.upserted,
            failed = report.failed
        );
        report
    }

    /// Transform one row and write it under the entity's idempotency rule.
    pub async fn import_row(&self, entity: Entity, row: &SourceRow) -> Result<RowOutcome, ImportError> {
        let record = transform_row(entity, row)?;

        if entity.keyed_by_owner() {
            let id = self.store.upsert_by_key(record.owner_id(), &record).await?;
            return Ok(RowOutcome::Upserted(id));
        }

        let legacy_id = record.legacy_id();
        if let Some(existing) = self.store.find_by_legacy_id(entity, legacy_id).await? {
            return Ok(RowOutcome::AlreadyPresent(existing));
        }

        match self.store.insert(&record).await {
            Ok(id) => Ok(RowOutcome::Inserted(id)),
            // Another writer got there between the lookup and the insert.
            Err(err @ StoreError::Duplicate { .. }) => {
                match self.store.find_by_legacy_id(entity, legacy_id).await? {
                    Some(existing) => Ok(RowOutcome::AlreadyPresent(existing)),
                    None => Err(err.into()),
                }
            }
            Err(err) => Err(err.into()),
        }
    }
}
