//! Database layer for changewatch
//!
//! Provides:
//! - SeaORM entity models
//! - Schema migrations
//! - Repository pattern for data access
//! - Connection pool management

pub mod migration;
pub mod models;
mod repository;

pub use migration::{run_migrations, Migrator};
pub use repository::{
    CheckOutcome, EnquirySearch, EnquiryUpdate, MonitorStatus, NewDetectedChange, NewEnquiry,
    Observation, Repository,
};

use crate::config::DatabaseConfig;
use crate::errors::{AppError, Result};
use backoff::ExponentialBackoff;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Database connection pool wrapper
#[derive(Clone)]
pub struct DbPool {
    /// Primary connection (for writes)
    pub primary: Arc<DatabaseConnection>,

    /// Read replica connection (optional)
    pub replica: Option<Arc<DatabaseConnection>>,
}

fn connect_options(url: &str, config: &DatabaseConfig) -> ConnectOptions {
    let mut opts = ConnectOptions::new(url);
    opts.max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .sqlx_logging(true);
    opts
}

impl DbPool {
    /// Create a new database pool from configuration
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        info!("Connecting to primary database...");

        let primary = Database::connect(connect_options(&config.url, config))
            .await
            .map_err(|e| AppError::DatabaseConnection {
                message: format!("Failed to connect to primary: {}", e)
            })?;

        // Connect to replica if configured
        let replica = if let Some(ref read_url) = config.read_url {
            info!("Connecting to read replica...");

            let replica_conn = Database::connect(connect_options(read_url, config))
                .await
                .map_err(|e| AppError::DatabaseConnection {
                    message: format!("Failed to connect to replica: {}", e)
                })?;

            Some(Arc::new(replica_conn))
        } else {
            None
        };

        info!("Database connections established");

        Ok(Self {
            primary: Arc::new(primary),
            replica,
        })
    }

    /// Connect, retrying with exponential backoff while the database comes up
    pub async fn connect_with_retry(config: &DatabaseConfig) -> Result<Self> {
        let policy = ExponentialBackoff {
            max_elapsed_time: Some(Duration::from_secs(config.connect_retry_secs)),
            ..Default::default()
        };

        backoff::future::retry(policy, || async {
            Self::new(config).await.map_err(|e| match e {
                AppError::DatabaseConnection { .. } => {
                    warn!(error = %e, "Database not reachable yet, retrying");
                    backoff::Error::transient(e)
                }
                other => backoff::Error::permanent(other),
            })
        })
        .await
    }

    /// Wrap an existing connection, used for both reads and writes
    pub fn from_connection(conn: DatabaseConnection) -> Self {
        Self {
            primary: Arc::new(conn),
            replica: None,
        }
    }

    /// Get the connection for reads (replica if available, otherwise primary)
    pub fn read(&self) -> &DatabaseConnection {
        self.replica.as_deref().unwrap_or(&self.primary)
    }

    /// Get the connection for writes (always primary)
    pub fn write(&self) -> &DatabaseConnection {
        &self.primary
    }

    /// Apply pending migrations on the primary
    pub async fn migrate(&self) -> Result<usize> {
        run_migrations(&self.primary)
            .await
            .map_err(|e| AppError::Migration { message: e.to_string() })
    }

    /// Ping the database to check connectivity
    pub async fn ping(&self) -> Result<()> {
        use sea_orm::ConnectionTrait;

        self.primary
            .execute_unprepared("SELECT 1")
            .await
            .map_err(|e| AppError::DatabaseConnection {
                message: format!("Primary ping failed: {}", e),
            })?;

        if let Some(ref replica) = self.replica {
            replica
                .execute_unprepared("SELECT 1")
                .await
                .map_err(|e| AppError::DatabaseConnection {
                    message: format!("Replica ping failed: {}", e),
                })?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[test]
    fn test_clones_share_one_connection() {
        let pool =
            DbPool::from_connection(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let cloned = pool.clone();

        assert!(Arc::ptr_eq(&pool.primary, &cloned.primary));
        assert!(std::ptr::eq(cloned.read(), cloned.write()));
    }

    #[test]
    fn test_reads_prefer_replica() {
        let pool = DbPool {
            primary: Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection()),
            replica: Some(Arc::new(
                MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
            )),
        };

        assert!(!std::ptr::eq(pool.read(), pool.write()));
    }
}
