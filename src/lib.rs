//! Migration core for the legacy training journal: extract rows from the old
//! REST source, reshape them into target documents, load them idempotently
//! and verify parity afterwards.

pub mod config;
pub mod entity;
pub mod error;
pub mod extract;
pub mod import;
pub mod logging;
pub mod store;
pub mod transform;
pub mod verify;

pub use config::Config;
pub use entity::Entity;
pub use error::{
    ConfigError, ExtractionError, ImportError, MigrationError, StoreError, TransformError,
    VerifyError,
};
pub use extract::SourceClient;
pub use import::{Importer, MigrationReport, MigrationSummary};
pub use store::{SqliteTargetStore, TargetStore};
pub use verify::{VerificationReport, Verifier};

/// Open both ends of a run from validated configuration.
pub async fn connect(config: &Config) -> Result<(SourceClient, SqliteTargetStore), MigrationError> {
    let source = SourceClient::from_config(config).map_err(MigrationError::SourceClient)?;
    let store = SqliteTargetStore::connect(&config.target_url).await?;
    Ok((source, store))
}
