//! PostgreSQL implementation of LevelRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{DomainError, ErrorCode, LevelId, Timestamp};
use crate::domain::membership::{LevelStatus, MembershipLevel};
use crate::ports::LevelRepository;

use super::store_error;

/// PostgreSQL implementation of the LevelRepository port.
pub struct PostgresLevelRepository {
    pool: PgPool,
}

impl PostgresLevelRepository {
    /// Creates a repository backed by the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a membership level.
#[derive(Debug, sqlx::FromRow)]
struct LevelRow {
    id: Uuid,
    name: String,
    sort_order: i32,
    price_cents: i64,
    duration_days: i64,
    status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<LevelRow> for MembershipLevel {
    type Error = DomainError;

    fn try_from(row: LevelRow) -> Result<Self, Self::Error> {
        Ok(MembershipLevel {
            id: LevelId::from_uuid(row.id),
            name: row.name,
            sort_order: row.sort_order,
            price_cents: row.price_cents,
            duration_days: row.duration_days,
            status: parse_status(&row.status)?,
            created_at: Timestamp::from_datetime(row.created_at),
        })
    }
}

fn parse_status(s: &str) -> Result<LevelStatus, DomainError> {
    match s {
        "active" => Ok(LevelStatus::Active),
        "retired" => Ok(LevelStatus::Retired),
        _ => Err(DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid level status value: {}", s),
        )),
    }
}

fn status_to_str(status: &LevelStatus) -> &'static str {
    match status {
        LevelStatus::Active => "active",
        LevelStatus::Retired => "retired",
    }
}

#[async_trait]
impl LevelRepository for PostgresLevelRepository {
    async fn save(&self, level: &MembershipLevel) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO membership_levels (
                id, name, sort_order, price_cents, duration_days, status, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(level.id.as_uuid())
        .bind(&level.name)
        .bind(level.sort_order)
        .bind(level.price_cents)
        .bind(level.duration_days)
        .bind(status_to_str(&level.status))
        .bind(level.created_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.constraint() == Some("membership_levels_sort_order_key") {
                    return DomainError::validation(
                        "sort_order",
                        format!("A level with sort_order {} already exists", level.sort_order),
                    );
                }
            }
            store_error("Failed to save level", e)
        })?;

        Ok(())
    }

    async fn update(&self, level: &MembershipLevel) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE membership_levels
            SET name = $2, status = $3
            WHERE id = $1
            "#,
        )
        .bind(level.id.as_uuid())
        .bind(&level.name)
        .bind(status_to_str(&level.status))
        .execute(&self.pool)
        .await
        .map_err(|e| store_error("Failed to update level", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::LevelNotFound,
                format!("Level {} not found", level.id),
            ));
        }
        Ok(())
    }

    async fn find_by_id(&self, id: &LevelId) -> Result<Option<MembershipLevel>, DomainError> {
        let row = sqlx::query_as::<_, LevelRow>(
            r#"
            SELECT id, name, sort_order, price_cents, duration_days, status, created_at
            FROM membership_levels
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| store_error("Failed to load level", e))?;

        row.map(MembershipLevel::try_from).transpose()
    }

    async fn list_active(&self) -> Result<Vec<MembershipLevel>, DomainError> {
        let rows = sqlx::query_as::<_, LevelRow>(
            r#"
            SELECT id, name, sort_order, price_cents, duration_days, status, created_at
            FROM membership_levels
            WHERE status = 'active'
            ORDER BY sort_order ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| store_error("Failed to list levels", e))?;

        rows.into_iter().map(MembershipLevel::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_roundtrips_through_strings() {
        for status in [LevelStatus::Active, LevelStatus::Retired] {
            assert_eq!(parse_status(status_to_str(&status)).unwrap(), status);
        }
    }

    #[test]
    fn unknown_status_is_a_database_error() {
        let err = parse_status("paused").unwrap_err();
        assert_eq!(err.code, ErrorCode::DatabaseError);
    }
}
