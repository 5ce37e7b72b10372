//! PostgreSQL adapters.
//!
//! sqlx-backed implementations of the store ports. Queries are
//! runtime-bound (no compile-time database dependency); rows map
//! through `TryFrom` into domain types.

mod level_repository;
mod membership_repository;
mod point_ledger;
mod redemption_store;
mod upgrade_record_store;

pub use level_repository::PostgresLevelRepository;
pub use membership_repository::PostgresMembershipRepository;
pub use point_ledger::PostgresPointLedger;
pub use redemption_store::PostgresRedemptionStore;
pub use upgrade_record_store::PostgresUpgradeRecordStore;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::config::DatabaseConfig;
use crate::domain::foundation::{DomainError, ErrorCode};

/// Builds a connection pool from configuration, optionally running
/// migrations.
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, DomainError> {
    let pool = PgPoolOptions::new()
        .min_connections(config.min_connections)
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout())
        .connect(&config.url)
        .await
        .map_err(|e| store_error("Failed to connect to database", e))?;

    if config.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await.map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to run migrations: {}", e),
            )
        })?;
    }

    Ok(pool)
}

/// Classifies an sqlx error: pool/IO trouble is retryable, everything
/// else is a hard database error.
pub(crate) fn store_error(context: &str, err: sqlx::Error) -> DomainError {
    match &err {
        sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => {
            DomainError::transient(format!("{}: {}", context, err))
        }
        _ => DomainError::new(
            ErrorCode::DatabaseError,
            format!("{}: {}", context, err),
        ),
    }
}
