//! Error taxonomy for the migration core.
//!
//! Failures are split by blast radius: configuration and extraction errors
//! are fatal to the job or to one entity, transform and import errors are
//! fatal only to the row that raised them. Every error exposes a stable
//! machine-readable code for run reports.

use thiserror::Error;

use crate::entity::Entity;

/// Required configuration is missing or malformed. Raised before any I/O.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable(s): {}", .0.join(", "))]
    Missing(Vec<&'static str>),
    #[error("invalid value for {var}: {value:?} ({reason})")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    pub fn code(&self) -> &'static str {
        match self {
            ConfigError::Missing(_) => "CONFIG/MISSING",
            ConfigError::Invalid { .. } => "CONFIG/INVALID",
        }
    }
}

/// Paging a source collection failed. Always aborts that collection: a
/// truncated page would silently skew every downstream count.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("source collection {collection} returned HTTP {status}: {body}")]
    Status {
        collection: String,
        status: u16,
        body: String,
    },
    #[error("request to source collection {collection} failed: {source}")]
    Transport {
        collection: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("source collection {collection} returned an unreadable page: {source}")]
    Decode {
        collection: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("source collection {collection} did not report an exact count (content-range: {header:?})")]
    MissingCount {
        collection: String,
        header: Option<String>,
    },
}

impl ExtractionError {
    pub fn code(&self) -> &'static str {
        match self {
            ExtractionError::Status { .. } => "EXTRACT/STATUS",
            ExtractionError::Transport { .. } => "EXTRACT/TRANSPORT",
            ExtractionError::Decode { .. } => "EXTRACT/DECODE",
            ExtractionError::MissingCount { .. } => "EXTRACT/COUNT",
        }
    }

    pub fn collection(&self) -> &str {
        match self {
            ExtractionError::Status { collection, .. }
            | ExtractionError::Transport { collection, .. }
            | ExtractionError::Decode { collection, .. }
            | ExtractionError::MissingCount { collection, .. } => collection,
        }
    }
}

/// A source row could not be mapped onto its target record.
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("row does not match the expected shape: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("primary key is not an integer: {0}")]
    InvalidPrimaryKey(String),
    #[error("required field {0} is missing or empty")]
    MissingField(&'static str),
    #[error("field {field} is not numeric: {value}")]
    InvalidNumber { field: &'static str, value: String },
    #[error("field {field} does not start with a YYYY-MM-DD date: {value}")]
    InvalidDate { field: &'static str, value: String },
}

impl TransformError {
    pub fn code(&self) -> &'static str {
        match self {
            TransformError::Decode(_) => "TRANSFORM/DECODE",
            TransformError::InvalidPrimaryKey(_) => "TRANSFORM/PRIMARY_KEY",
            TransformError::MissingField(_) => "TRANSFORM/MISSING_FIELD",
            TransformError::InvalidNumber { .. } => "TRANSFORM/INVALID_NUMBER",
            TransformError::InvalidDate { .. } => "TRANSFORM/INVALID_DATE",
        }
    }
}

/// The target store refused or failed an operation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} record with {key} already exists")]
    Duplicate { entity: Entity, key: String },
    #[error("stored {entity} record {id} has an unreadable body: {source}")]
    CorruptRecord {
        entity: Entity,
        id: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize record: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("failed to apply target store migrations: {0}")]
    Migration(#[source] anyhow::Error),
}

impl StoreError {
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::Duplicate { .. } => "STORE/DUPLICATE",
            StoreError::CorruptRecord { .. } => "STORE/CORRUPT_RECORD",
            StoreError::Serialize(_) => "STORE/SERIALIZE",
            StoreError::Database(_) => "STORE/DATABASE",
            StoreError::Migration(_) => "STORE/MIGRATION",
        }
    }
}

/// A single row failed somewhere between decode and write. Counted and
/// skipped; never aborts the batch.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("transform failed: {0}")]
    Transform(#[from] TransformError),
    #[error("write failed: {0}")]
    Store(#[from] StoreError),
}

impl ImportError {
    pub fn code(&self) -> &'static str {
        match self {
            ImportError::Transform(err) => err.code(),
            ImportError::Store(err) => err.code(),
        }
    }
}

/// The parity check could not read one of the stores.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
    #[error("target store query failed: {0}")]
    Store(#[from] StoreError),
}

impl VerifyError {
    pub fn code(&self) -> &'static str {
        match self {
            VerifyError::Extraction(err) => err.code(),
            VerifyError::Store(err) => err.code(),
        }
    }
}

/// Job-level failures: the run cannot start or cannot finish.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to build source client: {0}")]
    SourceClient(#[source] reqwest::Error),
    #[error("target store unavailable: {0}")]
    Store(#[from] StoreError),
    #[error("job exceeded its deadline of {secs}s")]
    DeadlineExceeded { secs: u64 },
}

impl MigrationError {
    pub fn code(&self) -> &'static str {
        match self {
            MigrationError::Config(err) => err.code(),
            MigrationError::SourceClient(_) => "MIGRATE/SOURCE_CLIENT",
            MigrationError::Store(err) => err.code(),
            MigrationError::DeadlineExceeded { .. } => "MIGRATE/DEADLINE",
        }
    }
}
