#![allow(clippy::unwrap_used, clippy::expect_used)]

mod util;

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use journal_migrate::import::{EntityCounts, RowOutcome};
use journal_migrate::store::{RecordId, StoredRecord};
use journal_migrate::transform::TargetRecord;
use journal_migrate::{Entity, Importer, MigrationError, StoreError, TargetStore};
use serde_json::{json, Value};
use util::{check_in_row, memory_store, profile_row, seed_all, FakeSource};

/// A store that loses every insert to a concurrent writer: the first lookup
/// misses, the insert hits the uniqueness constraint, and later lookups
/// return `winner` (if any).
struct LosingStore {
    winner: Option<RecordId>,
    lookups: Mutex<u32>,
}

impl LosingStore {
    fn new(winner: Option<&str>) -> Self {
        Self {
            winner: winner.map(|id| RecordId(id.to_string())),
            lookups: Mutex::new(0),
        }
    }
}

#[async_trait]
impl TargetStore for LosingStore {
    async fn insert(&self, record: &TargetRecord) -> Result<RecordId, StoreError> {
        Err(StoreError::Duplicate {
            entity: record.entity(),
            key: format!("legacy_id={}", record.legacy_id()),
        })
    }

    async fn upsert_by_key(
        &self,
        natural_key: &str,
        _record: &TargetRecord,
    ) -> Result<RecordId, StoreError> {
        Ok(RecordId(natural_key.to_string()))
    }

    async fn get(&self, _entity: Entity, _id: &RecordId) -> Result<Option<StoredRecord>, StoreError> {
        Ok(None)
    }

    async fn find_by_legacy_id(
        &self,
        _entity: Entity,
        _legacy_id: i64,
    ) -> Result<Option<RecordId>, StoreError> {
        let mut lookups = self.lookups.lock().unwrap();
        *lookups += 1;
        if *lookups == 1 {
            return Ok(None);
        }
        Ok(self.winner.clone())
    }

    async fn list_by_owner(
        &self,
        _entity: Entity,
        _owner_id: &str,
    ) -> Result<Vec<StoredRecord>, StoreError> {
        Ok(Vec::new())
    }

    async fn delete(&self, _entity: Entity, _id: &RecordId) -> Result<bool, StoreError> {
        Ok(false)
    }
}

async fn snapshot(store: &dyn TargetStore, owners: &[&str]) -> Vec<(Entity, String, Option<i64>, Value)> {
    let mut records = Vec::new();
    for entity in Entity::ALL {
        for owner in owners {
            for record in store.list_by_owner(entity, owner).await.unwrap() {
                records.push((entity, record.id.0, record.legacy_id, record.body));
            }
        }
    }
    records
}

#[tokio::test]
async fn rerunning_check_ins_keeps_a_single_record() {
    let source = FakeSource::start().await;
    source.set_rows("daily_checkins", vec![check_in_row(12, "user-a")]);
    let client = source.client(1000);
    let store = memory_store().await;
    let importer = Importer::new(&client, &store);

    let first = importer.import_entity(Entity::CheckIns).await;
    assert_eq!(first.inserted, 1);
    let id = store
        .find_by_legacy_id(Entity::CheckIns, 12)
        .await
        .unwrap()
        .expect("record written");
    assert_eq!(store.list_by_owner(Entity::CheckIns, "user-a").await.unwrap().len(), 1);

    let second = importer.import_entity(Entity::CheckIns).await;
    assert_eq!(second.inserted, 0);
    assert_eq!(second.already_present, 1);
    assert_eq!(second.counts(), EntityCounts { success: 1, failed: 0 });

    let listed = store.list_by_owner(Entity::CheckIns, "user-a").await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, id);
    assert_eq!(listed[0].body["checkInDate"], "2025-02-20");
}

#[tokio::test]
async fn full_replay_yields_identical_records() {
    let source = FakeSource::start().await;
    seed_all(&source);
    let client = source.client(2);
    let store = memory_store().await;
    let importer = Importer::new(&client, &store);

    let first = importer.run_migration().await;
    let before = snapshot(&store, &["user-a", "user-b"]).await;
    let second = importer.run_migration().await;
    let after = snapshot(&store, &["user-a", "user-b"]).await;

    assert_eq!(first, second);
    assert_eq!(before, after);
    assert_eq!(before.len(), 10);
    assert_eq!(
        serde_json::to_value(&second).unwrap(),
        json!({
            "profiles": {"success": 2, "failed": 0},
            "check_ins": {"success": 3, "failed": 0},
            "session_reflections": {"success": 2, "failed": 0},
            "competition_reports": {"success": 1, "failed": 0},
            "review_entries": {"success": 2, "failed": 0},
        })
    );
}

#[tokio::test]
async fn migrated_documents_carry_legacy_ids_and_normalized_fields() {
    let source = FakeSource::start().await;
    seed_all(&source);
    let client = source.client(1000);
    let store = memory_store().await;
    Importer::new(&client, &store).run().await;

    let reports = store
        .list_by_owner(Entity::CompetitionReports, "user-b")
        .await
        .unwrap();
    assert_eq!(reports.len(), 1);
    let body = &reports[0].body;
    assert_eq!(body["legacyId"], 30);
    assert_eq!(body["snatchAttempts"], json!([{"weight": "90"}, {"weight": "94"}]));
    assert_eq!(body["snatchBest"], 94.0);
    assert_eq!(body["cleanJerkBest"], 115.0);
    for absent in ["squatAttempts", "benchAttempts", "deadliftAttempts", "squatBest"] {
        assert!(body.get(absent).is_none(), "{absent} should be absent");
    }

    let profiles = store.list_by_owner(Entity::Profiles, "user-a").await.unwrap();
    assert_eq!(profiles[0].body["createdAt"], "2024-11-02");
    assert!(profiles[0].body.get("nextCompetition").is_none());
}

#[tokio::test]
async fn profile_rerun_overwrites_with_latest_snapshot() {
    let source = FakeSource::start().await;
    source.set_rows("profiles", vec![profile_row(1, "user-a", "Ada")]);
    let client = source.client(1000);
    let store = memory_store().await;
    let importer = Importer::new(&client, &store);

    let first = importer.import_entity(Entity::Profiles).await;
    assert_eq!(first.upserted, 1);

    source.set_rows("profiles", vec![profile_row(1, "user-a", "Ada L.")]);
    importer.import_entity(Entity::Profiles).await;

    let listed = store.list_by_owner(Entity::Profiles, "user-a").await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].body["firstName"], "Ada L.");
}

#[tokio::test]
async fn bad_rows_are_counted_and_skipped() {
    let source = FakeSource::start().await;
    source.set_rows(
        "daily_checkins",
        vec![
            check_in_row(1, "user-a"),
            json!({"id": 2, "user_id": "user-a"}),
            json!({"id": "not-a-number", "user_id": "user-a", "created_at": "2025-01-01"}),
            check_in_row(4, "user-a"),
        ],
    );
    let client = source.client(1000);
    let store = memory_store().await;

    let report = Importer::new(&client, &store)
        .import_entity(Entity::CheckIns)
        .await;
    assert_eq!(report.extracted, 4);
    assert_eq!(report.counts(), EntityCounts { success: 2, failed: 2 });
    assert_eq!(report.failures[0].legacy_id, Some(2));
    assert_eq!(report.failures[0].code, "TRANSFORM/MISSING_FIELD");
    assert_eq!(report.failures[1].legacy_id, None);
    assert_eq!(report.failures[1].code, "TRANSFORM/PRIMARY_KEY");
    assert_eq!(store.list_by_owner(Entity::CheckIns, "user-a").await.unwrap().len(), 2);
}

#[tokio::test]
async fn extraction_failure_aborts_only_that_entity() {
    let source = FakeSource::start().await;
    seed_all(&source);
    source.fail("daily_checkins");
    let client = source.client(1000);
    let store = memory_store().await;

    let report = Importer::new(&client, &store).run().await;

    assert_eq!(report.extraction_failures(), vec![Entity::CheckIns]);
    let check_ins = &report.entities[&Entity::CheckIns];
    let failure = check_ins.extraction_error.as_ref().unwrap();
    assert_eq!(failure.code, "EXTRACT/STATUS");
    assert!(failure.message.contains("daily_checkins"));
    assert!(failure.message.contains("503"));
    assert!(failure.message.contains("upstream down"));
    assert_eq!(check_ins.counts(), EntityCounts::default());
    assert!(store.list_by_owner(Entity::CheckIns, "user-a").await.unwrap().is_empty());

    assert_eq!(report.entities[&Entity::ReviewEntries].inserted, 2);
    assert_eq!(report.entities[&Entity::Profiles].upserted, 2);
}

#[tokio::test]
async fn paging_stops_on_the_first_short_page() {
    let source = FakeSource::start().await;
    source.set_rows(
        "daily_checkins",
        (1..=5).map(|id| check_in_row(id, "user-a")).collect(),
    );
    let client = source.client(2);
    let store = memory_store().await;

    let report = Importer::new(&client, &store)
        .import_entity(Entity::CheckIns)
        .await;
    assert_eq!(report.inserted, 5);
    assert_eq!(source.page_offsets("daily_checkins"), vec![0, 2, 4]);

    source.set_rows(
        "daily_checkins",
        (1..=4).map(|id| check_in_row(id, "user-a")).collect(),
    );
    let rows = client.fetch_all("daily_checkins").await.unwrap();
    assert_eq!(rows.len(), 4);
    assert_eq!(source.page_offsets("daily_checkins"), vec![0, 2, 4, 0, 2, 4]);
}

#[tokio::test]
async fn job_deadline_abandons_a_hung_source() {
    let source = FakeSource::start().await;
    seed_all(&source);
    source.delay_responses(Duration::from_secs(5));
    let client = source.client(1000);
    let store = memory_store().await;

    let err = Importer::new(&client, &store)
        .run_with_deadline(Duration::from_millis(100))
        .await
        .unwrap_err();
    assert!(matches!(err, MigrationError::DeadlineExceeded { .. }));
    assert_eq!(err.code(), "MIGRATE/DEADLINE");
}

#[tokio::test]
async fn insert_conflict_resolves_to_the_existing_record() {
    let source = FakeSource::start().await;
    let client = source.client(1000);
    let store = LosingStore::new(Some("winner"));

    let outcome = Importer::new(&client, &store)
        .import_row(Entity::CheckIns, &check_in_row(12, "user-a"))
        .await
        .unwrap();
    assert_eq!(outcome, RowOutcome::AlreadyPresent(RecordId("winner".into())));
    assert_eq!(*store.lookups.lock().unwrap(), 2);
}

#[tokio::test]
async fn insert_conflict_without_existing_record_counts_as_failed() {
    let source = FakeSource::start().await;
    source.set_rows("daily_checkins", vec![check_in_row(12, "user-a")]);
    let client = source.client(1000);
    let store = LosingStore::new(None);

    let report = Importer::new(&client, &store)
        .import_entity(Entity::CheckIns)
        .await;
    assert_eq!(report.counts(), EntityCounts { success: 0, failed: 1 });
    assert_eq!(report.failures[0].legacy_id, Some(12));
    assert_eq!(report.failures[0].code, "STORE/DUPLICATE");
}

#[tokio::test]
async fn request_timeout_aborts_only_the_slow_entity() {
    let source = FakeSource::start().await;
    seed_all(&source);
    source.delay_responses(Duration::from_secs(2));
    let client = source.client_with_timeout(1000, Duration::from_millis(100));
    let store = memory_store().await;

    let report = Importer::new(&client, &store)
        .import_entity(Entity::CheckIns)
        .await;
    let failure = report.extraction_error.as_ref().expect("request should time out");
    assert_eq!(failure.code, "EXTRACT/TRANSPORT");
    assert!(failure.message.contains("daily_checkins"));
    assert_eq!(report.counts(), EntityCounts::default());
    assert!(store.list_by_owner(Entity::CheckIns, "user-a").await.unwrap().is_empty());
}
