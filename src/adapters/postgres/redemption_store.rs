//! PostgreSQL implementation of RedemptionStore.
//!
//! Consumption is one transaction built around a compare-and-swap:
//! `UPDATE ... WHERE code = $1 AND status = 'unused'`. Zero rows
//! affected means the race was lost (or the key is unknown); the loser
//! re-reads the row to report the precise conflict. The grant rows are
//! written in the same transaction, so a failing grant rolls the status
//! flip back and the code stays redeemable.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{
    DomainError, ErrorCode, LevelId, RedemptionCodeId, Timestamp, UserId,
};
use crate::domain::redemption::{CodeEffect, CodeKey, CodeStatus, RedemptionCode};
use crate::ports::{
    RedemptionCommit, RedemptionGrant, RedemptionReceipt, RedemptionStore,
};

use super::membership_repository::{source_to_str, status_to_str};
use super::store_error;

/// PostgreSQL implementation of the RedemptionStore port.
pub struct PostgresRedemptionStore {
    pool: PgPool,
}

impl PostgresRedemptionStore {
    /// Creates a store backed by the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a redemption code.
///
/// The effect is flattened into typed columns instead of a JSON blob so
/// the schema can check it.
#[derive(Debug, sqlx::FromRow)]
struct CodeRow {
    id: Uuid,
    code: String,
    effect_kind: String,
    effect_level_id: Option<Uuid>,
    effect_days: Option<i64>,
    effect_points: Option<i64>,
    status: String,
    used_by: Option<String>,
    used_at: Option<DateTime<Utc>>,
    invalidated_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<CodeRow> for RedemptionCode {
    type Error = DomainError;

    fn try_from(row: CodeRow) -> Result<Self, Self::Error> {
        let effect = match row.effect_kind.as_str() {
            "membership_days" => match (row.effect_level_id, row.effect_days) {
                (Some(level_id), Some(days)) => CodeEffect::MembershipDays {
                    level_id: LevelId::from_uuid(level_id),
                    days,
                },
                _ => {
                    return Err(DomainError::new(
                        ErrorCode::DatabaseError,
                        format!("Code '{}' has malformed membership effect", row.code),
                    ));
                }
            },
            "points" => match row.effect_points {
                Some(amount) => CodeEffect::Points { amount },
                None => {
                    return Err(DomainError::new(
                        ErrorCode::DatabaseError,
                        format!("Code '{}' has malformed points effect", row.code),
                    ));
                }
            },
            other => {
                return Err(DomainError::new(
                    ErrorCode::DatabaseError,
                    format!("Invalid effect kind value: {}", other),
                ));
            }
        };

        let used_by = row
            .used_by
            .map(UserId::new)
            .transpose()
            .map_err(|e| {
                DomainError::new(ErrorCode::DatabaseError, format!("Invalid used_by: {}", e))
            })?;

        Ok(RedemptionCode {
            id: RedemptionCodeId::from_uuid(row.id),
            key: CodeKey::try_new(&row.code).map_err(|e| {
                DomainError::new(ErrorCode::DatabaseError, format!("Invalid code key: {}", e))
            })?,
            effect,
            status: parse_status(&row.status)?,
            used_by,
            used_at: row.used_at.map(Timestamp::from_datetime),
            invalidated_at: row.invalidated_at.map(Timestamp::from_datetime),
            created_at: Timestamp::from_datetime(row.created_at),
        })
    }
}

fn parse_status(s: &str) -> Result<CodeStatus, DomainError> {
    match s {
        "unused" => Ok(CodeStatus::Unused),
        "used" => Ok(CodeStatus::Used),
        "invalidated" => Ok(CodeStatus::Invalidated),
        _ => Err(DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid code status value: {}", s),
        )),
    }
}

/// Conflict error for a code observed in a terminal (or missing) state.
fn conflict_for(key: &CodeKey, status: Option<&str>) -> DomainError {
    match status {
        None => DomainError::new(
            ErrorCode::CodeNotFound,
            format!("Code '{}' does not exist", key),
        ),
        Some("used") => DomainError::new(
            ErrorCode::CodeAlreadyUsed,
            format!("Code '{}' was already redeemed", key),
        ),
        Some("invalidated") => DomainError::new(
            ErrorCode::CodeInvalidated,
            format!("Code '{}' has been invalidated", key),
        ),
        Some(other) => DomainError::new(
            ErrorCode::DatabaseError,
            format!("Code '{}' has unexpected status '{}'", key, other),
        ),
    }
}

const SELECT_CODE: &str = r#"
    SELECT id, code, effect_kind, effect_level_id, effect_days, effect_points,
           status, used_by, used_at, invalidated_at, created_at
    FROM redemption_codes
    WHERE code = $1
"#;

#[async_trait]
impl RedemptionStore for PostgresRedemptionStore {
    async fn save(&self, code: &RedemptionCode) -> Result<(), DomainError> {
        let (effect_kind, effect_level_id, effect_days, effect_points) = match code.effect {
            CodeEffect::MembershipDays { level_id, days } => {
                ("membership_days", Some(*level_id.as_uuid()), Some(days), None)
            }
            CodeEffect::Points { amount } => ("points", None, None, Some(amount)),
        };

        sqlx::query(
            r#"
            INSERT INTO redemption_codes (
                id, code, effect_kind, effect_level_id, effect_days, effect_points,
                status, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(code.id.as_uuid())
        .bind(code.key.as_str())
        .bind(effect_kind)
        .bind(effect_level_id)
        .bind(effect_days)
        .bind(effect_points)
        .bind("unused")
        .bind(code.created_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.constraint() == Some("redemption_codes_code_key") {
                    return DomainError::validation(
                        "code",
                        format!("Code '{}' already exists", code.key),
                    );
                }
            }
            store_error("Failed to save code", e)
        })?;

        Ok(())
    }

    async fn find_by_key(&self, key: &CodeKey) -> Result<Option<RedemptionCode>, DomainError> {
        let row = sqlx::query_as::<_, CodeRow>(SELECT_CODE)
            .bind(key.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| store_error("Failed to load code", e))?;

        row.map(RedemptionCode::try_from).transpose()
    }

    async fn commit_redemption(
        &self,
        commit: RedemptionCommit,
    ) -> Result<RedemptionReceipt, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| store_error("Failed to open transaction", e))?;

        // CAS: only an unused row flips.
        let updated = sqlx::query(
            r#"
            UPDATE redemption_codes
            SET status = 'used', used_by = $2, used_at = $3
            WHERE code = $1 AND status = 'unused'
            "#,
        )
        .bind(commit.key.as_str())
        .bind(commit.user_id.as_str())
        .bind(commit.used_at.as_datetime())
        .execute(&mut *tx)
        .await
        .map_err(|e| store_error("Failed to consume code", e))?;

        if updated.rows_affected() == 0 {
            let status: Option<String> =
                sqlx::query_scalar("SELECT status FROM redemption_codes WHERE code = $1")
                    .bind(commit.key.as_str())
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(|e| store_error("Failed to classify conflict", e))?;
            return Err(conflict_for(&commit.key, status.as_deref()));
        }

        // The grant lives in the same transaction; any failure below
        // rolls the status flip back on drop.
        let receipt = match commit.grant {
            RedemptionGrant::NewMembership(membership) => {
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
                .execute(&mut *tx)
                .await
                .map_err(|e| store_error("Failed to grant membership", e))?;

                RedemptionReceipt {
                    membership_id: Some(membership.id),
                    point_entry_id: None,
                }
            }
            RedemptionGrant::ExtendMembership {
                membership_id,
                new_ends_at,
                ..
            } => {
                let extended = sqlx::query(
                    r#"
                    UPDATE memberships
                    SET ends_at = $2
                    WHERE id = $1 AND status = 'active'
                    "#,
                )
                .bind(membership_id.as_uuid())
                .bind(new_ends_at.as_datetime())
                .execute(&mut *tx)
                .await
                .map_err(|e| store_error("Failed to extend membership", e))?;

                if extended.rows_affected() == 0 {
                    return Err(DomainError::new(
                        ErrorCode::MembershipNotFound,
                        format!("Membership {} not found or not active", membership_id),
                    ));
                }

                RedemptionReceipt {
                    membership_id: Some(membership_id),
                    point_entry_id: None,
                }
            }
            RedemptionGrant::Points(entry) => {
                sqlx::query(
                    r#"
                    INSERT INTO point_ledger (id, user_id, delta, source, created_at)
                    VALUES ($1, $2, $3, $4, $5)
                    "#,
                )
                .bind(entry.id.as_uuid())
                .bind(entry.user_id.as_str())
                .bind(entry.delta)
                .bind(super::point_ledger::source_to_str(&entry.source))
                .bind(entry.created_at.as_datetime())
                .execute(&mut *tx)
                .await
                .map_err(|e| store_error("Failed to grant points", e))?;

                RedemptionReceipt {
                    membership_id: None,
                    point_entry_id: Some(entry.id),
                }
            }
        };

        tx.commit()
            .await
            .map_err(|e| store_error("Failed to commit redemption", e))?;

        Ok(receipt)
    }

    async fn invalidate(
        &self,
        key: &CodeKey,
        now: Timestamp,
    ) -> Result<RedemptionCode, DomainError> {
        let row = sqlx::query_as::<_, CodeRow>(
            r#"
            UPDATE redemption_codes
            SET status = 'invalidated', invalidated_at = $2
            WHERE code = $1 AND status = 'unused'
            RETURNING id, code, effect_kind, effect_level_id, effect_days, effect_points,
                      status, used_by, used_at, invalidated_at, created_at
            "#,
        )
        .bind(key.as_str())
        .bind(now.as_datetime())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| store_error("Failed to invalidate code", e))?;

        match row {
            Some(row) => RedemptionCode::try_from(row),
            None => {
                let status: Option<String> =
                    sqlx::query_scalar("SELECT status FROM redemption_codes WHERE code = $1")
                        .bind(key.as_str())
                        .fetch_optional(&self.pool)
                        .await
                        .map_err(|e| store_error("Failed to classify conflict", e))?;
                Err(conflict_for(key, status.as_deref()))
            }
        }
    }
}
