//! Membership level entity.
//!
//! Levels form a total order by `sort_order` (higher = more privileged).
//! A level is immutable once created except for retirement, which is a
//! soft delete: retired levels stop being purchase/upgrade targets but
//! remain resolvable for memberships that already reference them.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    LevelId, StateMachine, Timestamp, ValidationError,
};

/// Lifecycle status of a membership level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelStatus {
    /// Purchasable and a valid upgrade target.
    Active,

    /// Soft-deleted. Existing memberships keep resolving against it.
    Retired,
}

impl StateMachine for LevelStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        matches!((self, target), (LevelStatus::Active, LevelStatus::Retired))
    }

    fn valid_transitions(&self) -> Vec<Self> {
        match self {
            LevelStatus::Active => vec![LevelStatus::Retired],
            LevelStatus::Retired => vec![],
        }
    }
}

/// A membership tier with a privilege rank, price, and duration.
///
/// # Invariants
///
/// - `name` is non-empty
/// - `price_cents >= 0` (money is i64 cents, never floats)
/// - `duration_days > 0`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipLevel {
    /// Unique identifier for this level.
    pub id: LevelId,

    /// Display name, e.g. "Gold".
    pub name: String,

    /// Total ordering among levels; higher = more privileged.
    pub sort_order: i32,

    /// Full price for one duration, in cents.
    pub price_cents: i64,

    /// Length of one membership period bought at this level.
    pub duration_days: i64,

    /// Lifecycle status.
    pub status: LevelStatus,

    /// When the level was created.
    pub created_at: Timestamp,
}

impl MembershipLevel {
    /// Creates a new active level after validating its fields.
    pub fn create(
        id: LevelId,
        name: impl Into<String>,
        sort_order: i32,
        price_cents: i64,
        duration_days: i64,
    ) -> Result<Self, ValidationError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ValidationError::empty_field("name"));
        }
        if price_cents < 0 {
            return Err(ValidationError::out_of_range(
                "price_cents",
                0,
                i64::MAX,
                price_cents,
            ));
        }
        if duration_days <= 0 {
            return Err(ValidationError::out_of_range(
                "duration_days",
                1,
                i64::MAX,
                duration_days,
            ));
        }

        Ok(Self {
            id,
            name,
            sort_order,
            price_cents,
            duration_days,
            status: LevelStatus::Active,
            created_at: Timestamp::now(),
        })
    }

    /// Returns true if this level can be purchased or upgraded to.
    pub fn is_active(&self) -> bool {
        self.status == LevelStatus::Active
    }

    /// Soft-deletes this level.
    ///
    /// # Errors
    ///
    /// Returns error if the level is already retired.
    pub fn retire(&mut self) -> Result<(), ValidationError> {
        self.status = self.status.transition_to(LevelStatus::Retired)?;
        Ok(())
    }

    /// Value of one membership day at this level, in cents (floored).
    pub fn daily_rate_cents(&self) -> i64 {
        self.price_cents / self.duration_days
    }
}
