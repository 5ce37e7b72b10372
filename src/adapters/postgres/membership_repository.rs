//! PostgreSQL implementation of MembershipRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{
    DomainError, ErrorCode, LevelId, MembershipId, Timestamp, UserId,
};
use crate::domain::membership::{Membership, MembershipSource, MembershipStatus};
use crate::ports::MembershipRepository;

use super::store_error;

/// PostgreSQL implementation of the MembershipRepository port.
pub struct PostgresMembershipRepository {
    pool: PgPool,
}

impl PostgresMembershipRepository {
    /// Creates a repository backed by the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a membership.
#[derive(Debug, sqlx::FromRow)]
pub(super) struct MembershipRow {
    id: Uuid,
    user_id: String,
    level_id: Uuid,
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
    status: String,
    source: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<MembershipRow> for Membership {
    type Error = DomainError;

    fn try_from(row: MembershipRow) -> Result<Self, Self::Error> {
        Ok(Membership {
            id: MembershipId::from_uuid(row.id),
            user_id: UserId::new(row.user_id).map_err(|e| {
                DomainError::new(ErrorCode::DatabaseError, format!("Invalid user_id: {}", e))
            })?,
            level_id: LevelId::from_uuid(row.level_id),
            starts_at: Timestamp::from_datetime(row.starts_at),
            ends_at: Timestamp::from_datetime(row.ends_at),
            status: parse_status(&row.status)?,
            source: parse_source(&row.source)?,
            created_at: Timestamp::from_datetime(row.created_at),
        })
    }
}

fn parse_status(s: &str) -> Result<MembershipStatus, DomainError> {
    match s {
        "active" => Ok(MembershipStatus::Active),
        "cancelled" => Ok(MembershipStatus::Cancelled),
        "expired" => Ok(MembershipStatus::Expired),
        _ => Err(DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid membership status value: {}", s),
        )),
    }
}

pub(super) fn status_to_str(status: &MembershipStatus) -> &'static str {
    match status {
        MembershipStatus::Active => "active",
        MembershipStatus::Cancelled => "cancelled",
        MembershipStatus::Expired => "expired",
    }
}

fn parse_source(s: &str) -> Result<MembershipSource, DomainError> {
    match s {
        "purchase" => Ok(MembershipSource::Purchase),
        "redemption" => Ok(MembershipSource::Redemption),
        "upgrade" => Ok(MembershipSource::Upgrade),
        _ => Err(DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid membership source value: {}", s),
        )),
    }
}

pub(super) fn source_to_str(source: &MembershipSource) -> &'static str {
    match source {
        MembershipSource::Purchase => "purchase",
        MembershipSource::Redemption => "redemption",
        MembershipSource::Upgrade => "upgrade",
    }
}

#[async_trait]
impl MembershipRepository for PostgresMembershipRepository {
    async fn save(&self, membership: &Membership) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO memberships (
                id, user_id, level_id, starts_at, ends_at, status, source, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(membership.id.as_uuid())
        .bind(membership.user_id.as_str())
        .bind(membership.level_id.as_uuid())
        .bind(membership.starts_at.as_datetime())
        .bind(membership.ends_at.as_datetime())
        .bind(status_to_str(&membership.status))
        .bind(source_to_str(&membership.source))
        .bind(membership.created_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| store_error("Failed to save membership", e))?;

        Ok(())
    }

    async fn update(&self, membership: &Membership) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE memberships
            SET ends_at = $2, status = $3
            WHERE id = $1
            "#,
        )
        .bind(membership.id.as_uuid())
        .bind(membership.ends_at.as_datetime())
        .bind(status_to_str(&membership.status))
        .execute(&self.pool)
        .await
        .map_err(|e| store_error("Failed to update membership", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::MembershipNotFound,
                format!("Membership {} not found", membership.id),
            ));
        }
        Ok(())
    }

    async fn find_by_id(&self, id: &MembershipId) -> Result<Option<Membership>, DomainError> {
        let row = sqlx::query_as::<_, MembershipRow>(
            r#"
            SELECT id, user_id, level_id, starts_at, ends_at, status, source, created_at
            FROM memberships
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| store_error("Failed to load membership", e))?;

        row.map(Membership::try_from).transpose()
    }

    async fn find_valid_for_user(
        &self,
        user_id: &UserId,
        now: &Timestamp,
    ) -> Result<Vec<Membership>, DomainError> {
        let rows = sqlx::query_as::<_, MembershipRow>(
            r#"
            SELECT id, user_id, level_id, starts_at, ends_at, status, source, created_at
            FROM memberships
            WHERE user_id = $1 AND status = 'active' AND ends_at > $2
            "#,
        )
        .bind(user_id.as_str())
        .bind(now.as_datetime())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| store_error("Failed to load memberships", e))?;

        rows.into_iter().map(Membership::try_from).collect()
    }
}
