//! PostgreSQL implementation of UpgradeRecordStore.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{
    DomainError, ErrorCode, LevelId, Timestamp, UpgradeRecordId, UserId,
};
use crate::domain::membership::UpgradeRecord;
use crate::ports::UpgradeRecordStore;

use super::store_error;

/// PostgreSQL implementation of the UpgradeRecordStore port.
pub struct PostgresUpgradeRecordStore {
    pool: PgPool,
}

impl PostgresUpgradeRecordStore {
    /// Creates a store backed by the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of an upgrade record.
#[derive(Debug, sqlx::FromRow)]
struct UpgradeRow {
    id: Uuid,
    user_id: String,
    from_level_id: Option<Uuid>,
    to_level_id: Uuid,
    price_charged_cents: i64,
    credit_applied_cents: i64,
    created_at: DateTime<Utc>,
}

impl TryFrom<UpgradeRow> for UpgradeRecord {
    type Error = DomainError;

    fn try_from(row: UpgradeRow) -> Result<Self, Self::Error> {
        Ok(UpgradeRecord {
            id: UpgradeRecordId::from_uuid(row.id),
            user_id: UserId::new(row.user_id).map_err(|e| {
                DomainError::new(ErrorCode::DatabaseError, format!("Invalid user_id: {}", e))
            })?,
            from_level_id: row.from_level_id.map(LevelId::from_uuid),
            to_level_id: LevelId::from_uuid(row.to_level_id),
            price_charged_cents: row.price_charged_cents,
            credit_applied_cents: row.credit_applied_cents,
            created_at: Timestamp::from_datetime(row.created_at),
        })
    }
}

#[async_trait]
impl UpgradeRecordStore for PostgresUpgradeRecordStore {
    async fn append(&self, record: &UpgradeRecord) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO upgrade_records (
                id, user_id, from_level_id, to_level_id,
                price_charged_cents, credit_applied_cents, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(record.id.as_uuid())
        .bind(record.user_id.as_str())
        .bind(record.from_level_id.map(|id| *id.as_uuid()))
        .bind(record.to_level_id.as_uuid())
        .bind(record.price_charged_cents)
        .bind(record.credit_applied_cents)
        .bind(record.created_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| store_error("Failed to append upgrade record", e))?;

        Ok(())
    }

    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<UpgradeRecord>, DomainError> {
        let rows = sqlx::query_as::<_, UpgradeRow>(
            r#"
            SELECT id, user_id, from_level_id, to_level_id,
                   price_charged_cents, credit_applied_cents, created_at
            FROM upgrade_records
            WHERE user_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| store_error("Failed to load upgrade records", e))?;

        rows.into_iter().map(UpgradeRecord::try_from).collect()
    }
}
