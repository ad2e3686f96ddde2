pub mod execute;
pub mod report;

pub use execute::{
    EntityCounts, EntityReport, ExtractionFailure, Importer, MigrationReport, MigrationSummary,
    RowFailure, RowOutcome, PROGRESS_EVERY,
};
pub use report::write_migration_report;
