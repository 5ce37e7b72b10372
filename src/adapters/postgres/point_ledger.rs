//! PostgreSQL implementation of PointLedger.
//!
//! Consumption takes a per-user advisory transaction lock before the
//! balance check so two concurrent consumes for the same user serialize
//! instead of both reading the same pre-spend balance. Grants need no
//! lock: appends to distinct rows never conflict.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{DomainError, ErrorCode, PointEntryId, Timestamp, UserId};
use crate::domain::points::{PointLedgerEntry, PointSource};
use crate::ports::PointLedger;

use super::store_error;

/// PostgreSQL implementation of the PointLedger port.
pub struct PostgresPointLedger {
    pool: PgPool,
}

impl PostgresPointLedger {
    /// Creates a ledger backed by the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a ledger entry.
#[derive(Debug, sqlx::FromRow)]
struct EntryRow {
    id: Uuid,
    user_id: String,
    delta: i64,
    source: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<EntryRow> for PointLedgerEntry {
    type Error = DomainError;

    fn try_from(row: EntryRow) -> Result<Self, Self::Error> {
        Ok(PointLedgerEntry {
            id: PointEntryId::from_uuid(row.id),
            user_id: UserId::new(row.user_id).map_err(|e| {
                DomainError::new(ErrorCode::DatabaseError, format!("Invalid user_id: {}", e))
            })?,
            delta: row.delta,
            source: parse_source(&row.source)?,
            created_at: Timestamp::from_datetime(row.created_at),
        })
    }
}

fn parse_source(s: &str) -> Result<PointSource, DomainError> {
    match s {
        "redemption" => Ok(PointSource::Redemption),
        "purchase" => Ok(PointSource::Purchase),
        "spend" => Ok(PointSource::Spend),
        "adjustment" => Ok(PointSource::Adjustment),
        _ => Err(DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid point source value: {}", s),
        )),
    }
}

pub(super) fn source_to_str(source: &PointSource) -> &'static str {
    match source {
        PointSource::Redemption => "redemption",
        PointSource::Purchase => "purchase",
        PointSource::Spend => "spend",
        PointSource::Adjustment => "adjustment",
    }
}

#[async_trait]
impl PointLedger for PostgresPointLedger {
    async fn append(&self, entry: &PointLedgerEntry) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO point_ledger (id, user_id, delta, source, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(entry.id.as_uuid())
        .bind(entry.user_id.as_str())
        .bind(entry.delta)
        .bind(source_to_str(&entry.source))
        .bind(entry.created_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| store_error("Failed to append ledger entry", e))?;

        Ok(())
    }

    async fn append_checked(&self, entry: &PointLedgerEntry) -> Result<(), DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| store_error("Failed to open transaction", e))?;

        // Serialize per-user: released automatically at commit/rollback.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1)::bigint)")
            .bind(entry.user_id.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| store_error("Failed to take user lock", e))?;

        let available: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(delta), 0)::BIGINT FROM point_ledger WHERE user_id = $1",
        )
        .bind(entry.user_id.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| store_error("Failed to read balance", e))?;

        if available + entry.delta < 0 {
            return Err(DomainError::new(
                ErrorCode::InsufficientBalance,
                format!(
                    "Insufficient points: requested {}, available {}",
                    -entry.delta, available
                ),
            )
            .with_detail("user_id", entry.user_id.as_str())
            .with_detail("requested", (-entry.delta).to_string())
            .with_detail("available", available.to_string()));
        }

        sqlx::query(
            r#"
            INSERT INTO point_ledger (id, user_id, delta, source, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(entry.id.as_uuid())
        .bind(entry.user_id.as_str())
        .bind(entry.delta)
        .bind(source_to_str(&entry.source))
        .bind(entry.created_at.as_datetime())
        .execute(&mut *tx)
        .await
        .map_err(|e| store_error("Failed to append ledger entry", e))?;

        tx.commit()
            .await
            .map_err(|e| store_error("Failed to commit ledger entry", e))?;

        Ok(())
    }

    async fn balance(&self, user_id: &UserId) -> Result<i64, DomainError> {
        sqlx::query_scalar(
            "SELECT COALESCE(SUM(delta), 0)::BIGINT FROM point_ledger WHERE user_id = $1",
        )
        .bind(user_id.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| store_error("Failed to read balance", e))
    }

    async fn entries_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<PointLedgerEntry>, DomainError> {
        let rows = sqlx::query_as::<_, EntryRow>(
            r#"
            SELECT id, user_id, delta, source, created_at
            FROM point_ledger
            WHERE user_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| store_error("Failed to load ledger entries", e))?;

        rows.into_iter().map(PointLedgerEntry::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_roundtrips_through_strings() {
        for source in [
            PointSource::Redemption,
            PointSource::Purchase,
            PointSource::Spend,
            PointSource::Adjustment,
        ] {
            assert_eq!(parse_source(source_to_str(&source)).unwrap(), source);
        }
    }

    #[test]
    fn unknown_source_is_a_database_error() {
        let err = parse_source("lottery").unwrap_err();
        assert_eq!(err.code, ErrorCode::DatabaseError);
    }
}
