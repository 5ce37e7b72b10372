//! Membership aggregate entity.
//!
//! A Membership is one user's hold on a level for a time window. A user
//! accumulates membership rows over time (history is never mutated after
//! expiry); at most one row is currently valid at any instant.
//!
//! # Design Decisions
//!
//! - **Append-mostly**: upgrades close the old row and open a new one
//!   rather than editing the window in place
//! - **Validity is derived**: `is_valid_at` combines status and end date;
//!   nothing stores a "current" flag
//! - **Provenance retained**: `source` records how the row came to exist

use crate::domain::foundation::{
    DomainError, ErrorCode, LevelId, MembershipId, StateMachine, Timestamp, UserId,
};
use serde::{Deserialize, Serialize};

use super::MembershipStatus;

/// How a membership row came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipSource {
    /// Bought directly at the level's full price.
    Purchase,

    /// Granted by redeeming a code.
    Redemption,

    /// Opened by a prorated upgrade from a lower level.
    Upgrade,
}

/// Membership aggregate - one user's hold on a level for a time window.
///
/// # Invariants
///
/// - `starts_at <= ends_at`
/// - Status transitions follow the state machine rules
/// - Terminal rows are never reopened
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    /// Unique identifier for this membership row.
    pub id: MembershipId,

    /// User who holds this membership.
    pub user_id: UserId,

    /// Level held.
    pub level_id: LevelId,

    /// Start of the validity window.
    pub starts_at: Timestamp,

    /// End of the validity window.
    pub ends_at: Timestamp,

    /// Current lifecycle status.
    pub status: MembershipStatus,

    /// How this row came to exist.
    pub source: MembershipSource,

    /// When the row was created.
    pub created_at: Timestamp,
}

impl Membership {
    /// Opens a new active membership starting at `starts_at` for
    /// `duration_days` whole days.
    pub fn start(
        id: MembershipId,
        user_id: UserId,
        level_id: LevelId,
        starts_at: Timestamp,
        duration_days: i64,
        source: MembershipSource,
    ) -> Self {
        Self {
            id,
            user_id,
            level_id,
            starts_at,
            ends_at: starts_at.add_days(duration_days),
            status: MembershipStatus::Active,
            source,
            created_at: starts_at,
        }
    }

    /// Returns true if this row counts as the user's membership at `now`.
    pub fn is_valid_at(&self, now: &Timestamp) -> bool {
        self.status == MembershipStatus::Active && self.ends_at.is_after(now)
    }

    /// Whole days remaining at `now`, floored, never negative.
    pub fn remaining_days(&self, now: &Timestamp) -> i64 {
        now.whole_days_until(&self.ends_at).max(0)
    }

    /// Pushes the end date out by `days`.
    ///
    /// # Errors
    ///
    /// Returns error if the membership is not Active or `days` is not
    /// positive.
    pub fn extend(&mut self, days: i64) -> Result<(), DomainError> {
        if self.status != MembershipStatus::Active {
            return Err(DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!("Cannot extend a {:?} membership", self.status),
            ));
        }
        if days <= 0 {
            return Err(DomainError::validation(
                "days",
                "Extension must be a positive number of days",
            ));
        }
        self.ends_at = self.ends_at.add_days(days);
        Ok(())
    }

    /// Closes this membership as of `now` (upgrade migration path).
    ///
    /// The end date is pulled in so the row stops being valid immediately;
    /// the unused tail has already been converted into upgrade credit.
    ///
    /// # Errors
    ///
    /// Returns error if the transition from the current status is not
    /// allowed.
    pub fn cancel(&mut self, now: Timestamp) -> Result<(), DomainError> {
        self.transition_to(MembershipStatus::Cancelled)?;
        if now.is_before(&self.ends_at) {
            self.ends_at = now;
        }
        Ok(())
    }

    /// Marks this membership as expired.
    ///
    /// # Errors
    ///
    /// Returns error if the transition from the current status is not
    /// allowed.
    pub fn expire(&mut self) -> Result<(), DomainError> {
        self.transition_to(MembershipStatus::Expired)?;
        Ok(())
    }

    fn transition_to(&mut self, target: MembershipStatus) -> Result<(), DomainError> {
        self.status = self.status.transition_to(target).map_err(|_| {
            DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!(
                    "Cannot transition membership from {:?} to {:?}",
                    self.status, target
                ),
            )
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_user_id() -> UserId {
        UserId::new("user-123").unwrap()
    }

    fn active_membership(duration_days: i64) -> Membership {
        Membership::start(
            MembershipId::new(),
            test_user_id(),
            LevelId::new(),
            Timestamp::now(),
            duration_days,
            MembershipSource::Purchase,
        )
    }

    // Construction tests

    #[test]
    fn start_opens_active_window() {
        let m = active_membership(30);
        assert_eq!(m.status, MembershipStatus::Active);
        assert_eq!(m.starts_at.whole_days_until(&m.ends_at), 30);
        assert_eq!(m.source, MembershipSource::Purchase);
    }

    // Validity tests

    #[test]
    fn active_within_window_is_valid() {
        let m = active_membership(30);
        assert!(m.is_valid_at(&Timestamp::now()));
    }

    #[test]
    fn active_past_end_date_is_not_valid() {
        let m = active_membership(30);
        let later = Timestamp::now().add_days(31);
        assert!(!m.is_valid_at(&later));
    }

    #[test]
    fn cancelled_is_not_valid_even_within_window() {
        let mut m = active_membership(30);
        m.cancel(Timestamp::now()).unwrap();
        assert!(!m.is_valid_at(&Timestamp::now()));
    }

    // Remaining days

    #[test]
    fn remaining_days_floors_and_clamps() {
        let m = active_membership(10);
        let now = Timestamp::now();
        assert_eq!(m.remaining_days(&now), 10);
        assert_eq!(m.remaining_days(&now.add_days(3).add_hours(1)), 6);
        assert_eq!(m.remaining_days(&now.add_days(30)), 0);
    }

    // Lifecycle transitions

    #[test]
    fn extend_pushes_end_date() {
        let mut m = active_membership(10);
        let old_end = m.ends_at;
        m.extend(5).unwrap();
        assert_eq!(old_end.whole_days_until(&m.ends_at), 5);
    }

    #[test]
    fn extend_rejects_non_positive_days() {
        let mut m = active_membership(10);
        assert!(m.extend(0).is_err());
        assert!(m.extend(-3).is_err());
    }

    #[test]
    fn extend_rejects_cancelled_membership() {
        let mut m = active_membership(10);
        m.cancel(Timestamp::now()).unwrap();
        assert!(m.extend(5).is_err());
    }

    #[test]
    fn cancel_pulls_end_date_to_now() {
        let mut m = active_membership(30);
        let now = Timestamp::now();
        m.cancel(now).unwrap();
        assert_eq!(m.status, MembershipStatus::Cancelled);
        assert_eq!(m.ends_at, now);
    }

    #[test]
    fn cancel_after_end_keeps_original_end() {
        let mut m = active_membership(30);
        let original_end = m.ends_at;
        m.cancel(Timestamp::now().add_days(60)).unwrap();
        assert_eq!(m.ends_at, original_end);
    }

    #[test]
    fn expired_cannot_cancel() {
        let mut m = active_membership(30);
        m.expire().unwrap();
        assert!(m.cancel(Timestamp::now()).is_err());
    }
}
