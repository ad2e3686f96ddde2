use std::str::FromStr;

use async_trait::async_trait;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous,
};
use sqlx::{Row, SqlitePool};
use tracing::info;

use super::{migrate, RecordId, StoredRecord, TargetStore};
use crate::entity::Entity;
use crate::error::StoreError;
use crate::transform::TargetRecord;

const SELECT_COLUMNS: &str = "SELECT id, entity, owner_id, legacy_id, body FROM records";

/// Document store backed by a single SQLite `records` table.
#[derive(Debug, Clone)]
pub struct SqliteTargetStore {
    pool: SqlitePool,
}

impl SqliteTargetStore {
    /// Open (creating if needed) the store at a sqlx SQLite URL and bring its
    /// schema up to date.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let in_memory = url.contains(":memory:");
        let mut opts = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);
        if !in_memory {
            opts = opts
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Full);
        }

        // An in-memory database lives and dies with its one connection.
        let mut pool_opts = SqlitePoolOptions::new().max_connections(if in_memory { 1 } else { 4 });
        if in_memory {
            pool_opts = pool_opts.idle_timeout(None).max_lifetime(None);
        }
        let pool = pool_opts
            .after_connect(|conn, _| {
                Box::pin(async move {
                    sqlx::query("PRAGMA busy_timeout = 5000;")
                        .execute(&mut *conn)
                        .await?;
                    Ok::<_, sqlx::Error>(())
                })
            })
            .connect_with(opts)
            .await?;

        info!(target: "journal_migrate", event = "target_store_open", in_memory);
        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        migrate::apply_migrations(&pool)
            .await
            .map_err(StoreError::Migration)?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn encode_body(record: &TargetRecord) -> Result<String, StoreError> {
    let document = record.to_document().map_err(StoreError::Serialize)?;
    serde_json::to_string(&document).map_err(StoreError::Serialize)
}

fn decode_row(row: &SqliteRow) -> Result<StoredRecord, StoreError> {
    let id: String = row.try_get("id")?;
    let entity_name: String = row.try_get("entity")?;
    let entity = Entity::from_str(&entity_name)
        .map_err(|reason| StoreError::Database(sqlx::Error::Decode(reason.into())))?;
    let raw_body: String = row.try_get("body")?;
    let body = serde_json::from_str(&raw_body).map_err(|source| StoreError::CorruptRecord {
        entity,
        id: id.clone(),
        source,
    })?;
    Ok(StoredRecord {
        id: RecordId(id),
        entity,
        owner_id: row.try_get("owner_id")?,
        legacy_id: row.try_get("legacy_id")?,
        body,
    })
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[async_trait]
impl TargetStore for SqliteTargetStore {
    async fn insert(&self, record: &TargetRecord) -> Result<RecordId, StoreError> {
        let entity = record.entity();
        let id = uuid::Uuid::now_v7().to_string();
        let now = now_ms();
        let result = sqlx::query(
            "INSERT INTO records (id, entity, owner_id, legacy_id, natural_key, body, created_at, updated_at) \
             VALUES (?, ?, ?, ?, NULL, ?, ?, ?)",
        )
        .bind(&id)
        .bind(entity.as_str())
        .bind(record.owner_id())
        .bind(record.legacy_id())
        .bind(encode_body(record)?)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(RecordId(id)),
            Err(err) if is_unique_violation(&err) => Err(StoreError::Duplicate {
                entity,
                key: format!("legacy_id={}", record.legacy_id()),
            }),
            Err(err) => Err(err.into()),
        }
    }

    async fn upsert_by_key(
        &self,
        natural_key: &str,
        record: &TargetRecord,
    ) -> Result<RecordId, StoreError> {
        let entity = record.entity();
        let now = now_ms();
        let result = sqlx::query_scalar::<_, String>(
            "INSERT INTO records (id, entity, owner_id, legacy_id, natural_key, body, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(entity, natural_key) DO UPDATE SET \
               owner_id = excluded.owner_id, \
               legacy_id = excluded.legacy_id, \
               body = excluded.body, \
               updated_at = excluded.updated_at \
             RETURNING id",
        )
        .bind(uuid::Uuid::now_v7().to_string())
        .bind(entity.as_str())
        .bind(record.owner_id())
        .bind(record.legacy_id())
        .bind(natural_key)
        .bind(encode_body(record)?)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(id) => Ok(RecordId(id)),
            // The natural key was free but another record already holds this legacy id.
            Err(err) if is_unique_violation(&err) => Err(StoreError::Duplicate {
                entity,
                key: format!("legacy_id={}", record.legacy_id()),
            }),
            Err(err) => Err(err.into()),
        }
    }

    async fn get(&self, entity: Entity, id: &RecordId) -> Result<Option<StoredRecord>, StoreError> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE entity = ? AND id = ?"))
            .bind(entity.as_str())
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(decode_row).transpose()
    }

    async fn find_by_legacy_id(
        &self,
        entity: Entity,
        legacy_id: i64,
    ) -> Result<Option<RecordId>, StoreError> {
        let id: Option<String> =
            sqlx::query_scalar("SELECT id FROM records WHERE entity = ? AND legacy_id = ?")
                .bind(entity.as_str())
                .bind(legacy_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(id.map(RecordId))
    }

    async fn list_by_owner(
        &self,
        entity: Entity,
        owner_id: &str,
    ) -> Result<Vec<StoredRecord>, StoreError> {
        let rows = sqlx::query(&format!(
            "{SELECT_COLUMNS} WHERE entity = ? AND owner_id = ? ORDER BY legacy_id, id"
        ))
        .bind(entity.as_str())
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(decode_row).collect()
    }

    async fn delete(&self, entity: Entity, id: &RecordId) -> Result<bool, StoreError> {
        let res = sqlx::query("DELETE FROM records WHERE entity = ? AND id = ?")
            .bind(entity.as_str())
            .bind(&id.0)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}
