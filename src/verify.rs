//! Read-only parity check between the legacy source and the target store.

use std::fmt;

use futures::stream::{self, StreamExt, TryStreamExt};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::config::Config;
use crate::entity::Entity;
use crate::error::{StoreError, VerifyError};
use crate::extract::SourceClient;
use crate::store::TargetStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ParityStatus {
    Match,
    /// `diff` is target minus source.
    Mismatch { diff: i64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityParity {
    pub entity: Entity,
    pub source_count: u64,
    pub target_count: u64,
    #[serde(flatten)]
    pub status: ParityStatus,
}

impl EntityParity {
    pub fn new(entity: Entity, source_count: u64, target_count: u64) -> Self {
        let status = if source_count == target_count {
            ParityStatus::Match
        } else {
            ParityStatus::Mismatch {
                diff: target_count as i64 - source_count as i64,
            }
        };
        Self {
            entity,
            source_count,
            target_count,
            status,
        }
    }

    pub fn is_match(&self) -> bool {
        self.status == ParityStatus::Match
    }
}

impl fmt::Display for EntityParity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            ParityStatus::Match => write!(
                f,
                "[match] {} source={} target={}",
                self.entity, self.source_count, self.target_count
            ),
            ParityStatus::Mismatch { diff } => write!(
                f,
                "[mismatch] {} source={} target={} (diff {:+})",
                self.entity, self.source_count, self.target_count, diff
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionSample {
    pub entity: Entity,
    pub collection: String,
    pub rows: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationReport {
    pub owners: usize,
    pub entities: Vec<EntityParity>,
    pub samples: Vec<CollectionSample>,
}

impl VerificationReport {
    pub fn all_match(&self) -> bool {
        self.entities.iter().all(EntityParity::is_match)
    }

    pub fn mismatches(&self) -> impl Iterator<Item = &EntityParity> {
        self.entities.iter().filter(|parity| !parity.is_match())
    }

    /// One pass/fail line per entity, in processing order.
    pub fn parity_lines(&self) -> Vec<String> {
        self.entities.iter().map(ToString::to_string).collect()
    }

    /// Human-readable spot-check listing of the sampled source rows.
    pub fn sample_listing(&self) -> String {
        let mut out = String::new();
        for sample in &self.samples {
            out.push_str(&format!(
                "--- {} ({}): first {} row(s) by id ---\n",
                sample.entity,
                sample.collection,
                sample.rows.len()
            ));
            for row in &sample.rows {
                out.push_str(&row.to_string());
                out.push('\n');
            }
        }
        out
    }
}

pub struct Verifier<'a> {
    source: &'a SourceClient,
    store: &'a dyn TargetStore,
    concurrency: usize,
    sample_size: usize,
}

impl<'a> Verifier<'a> {
    pub fn new(
        source: &'a SourceClient,
        store: &'a dyn TargetStore,
        concurrency: usize,
        sample_size: usize,
    ) -> Self {
        Self {
            source,
            store,
            concurrency: concurrency.max(1),
            sample_size,
        }
    }

    pub fn from_config(
        source: &'a SourceClient,
        store: &'a dyn TargetStore,
        config: &Config,
    ) -> Self {
        Self::new(source, store, config.verify_concurrency, config.sample_size)
    }

    /// Compare per-entity totals and collect the spot-check samples. Neither
    /// store is written.
    pub async fn verify(&self) -> Result<VerificationReport, VerifyError> {
        let owners = self.source.distinct_owners().await?;
        info!(target: "journal_migrate", event = "verify_owners", owners = owners.len());

        let mut entities = Vec::with_capacity(Entity::ALL.len());
        for entity in Entity::ALL {
            let source_count = self.source.count(entity.source_collection()).await?;
            let target_count = self.target_total(entity, &owners).await?;
            let parity = EntityParity::new(entity, source_count, target_count);
            info!(
                target: "journal_migrate",
                event = "verify_entity",
                entity = %entity,
                source_count,
                target_count,
                matched = parity.is_match()
            );
            entities.push(parity);
        }

        let mut samples = Vec::new();
        if self.sample_size > 0 {
            for entity in Entity::ALL {
                let collection = entity.source_collection();
                let rows = self.source.sample(collection, self.sample_size).await?;
                samples.push(CollectionSample {
                    entity,
                    collection: collection.to_string(),
                    rows,
                });
            }
        }

        Ok(VerificationReport {
            owners: owners.len(),
            entities,
            samples,
        })
    }

    /// Sum of per-owner record counts, queried with bounded fan-out.
    async fn target_total(&self, entity: Entity, owners: &[String]) -> Result<u64, StoreError> {
        stream::iter(owners)
            .map(|owner| async move {
                self.store
                    .list_by_owner(entity, owner)
                    .await
                    .map(|records| records.len() as u64)
            })
            .buffer_unordered(self.concurrency)
            .try_fold(0u64, |total, count| async move { Ok(total + count) })
            .await
    }
}
