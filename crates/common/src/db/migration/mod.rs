//! Schema migrations
//!
//! The tables keep their established names. Postgres folds
//! unquoted identifiers to lowercase, so they live on as `monitoredsources`,
//! `detectedchanges` and `userenquiries`.

mod m20250301_000001_create_monitored_sources;
mod m20250301_000002_create_detected_changes;
mod m20250301_000003_create_user_enquiries;
mod m20250415_000004_extend_user_enquiries;

use sea_orm::{DatabaseConnection, DbErr};
use sea_orm_migration::{MigrationTrait, MigratorTrait};
use tracing::info;

/// Migrator for the changewatch schema
pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_monitored_sources::Migration),
            Box::new(m20250301_000002_create_detected_changes::Migration),
            Box::new(m20250301_000003_create_user_enquiries::Migration),
            Box::new(m20250415_000004_extend_user_enquiries::Migration),
        ]
    }
}

/// Runs all pending migrations and reports how many were applied
pub async fn run_migrations(db: &DatabaseConnection) -> Result<usize, DbErr> {
    let pending = Migrator::get_pending_migrations(db).await?.len();
    if pending == 0 {
        info!("Schema is up to date");
        return Ok(0);
    }

    info!(pending, "Applying schema migrations");
    Migrator::up(db, None).await?;
    Ok(pending)
}
