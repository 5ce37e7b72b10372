//! Membership repository port (write side).
//!
//! Defines the contract for persisting and retrieving Membership rows.
//! A user accumulates rows over time; only reads needed by the current
//! handlers are exposed (no open-ended query surface).

use crate::domain::foundation::{DomainError, MembershipId, Timestamp, UserId};
use crate::domain::membership::Membership;
use async_trait::async_trait;

/// Repository port for Membership persistence.
///
/// Implementations must ensure:
/// - History rows stay immutable apart from status transitions
/// - `update` never resurrects a terminal row
#[async_trait]
pub trait MembershipRepository: Send + Sync {
    /// Save a new membership row.
    ///
    /// # Errors
    ///
    /// - `DatabaseError` on persistence failure
    async fn save(&self, membership: &Membership) -> Result<(), DomainError>;

    /// Update an existing membership row (status/end-date changes).
    ///
    /// # Errors
    ///
    /// - `MembershipNotFound` if the row doesn't exist
    /// - `DatabaseError` on persistence failure
    async fn update(&self, membership: &Membership) -> Result<(), DomainError>;

    /// Find a membership by its ID.
    ///
    /// Returns `None` if not found.
    async fn find_by_id(&self, id: &MembershipId) -> Result<Option<Membership>, DomainError>;

    /// All rows for `user_id` that are valid at `now` (Active with an
    /// end date in the future).
    ///
    /// The caller applies the selection rule; this is just the filter.
    async fn find_valid_for_user(
        &self,
        user_id: &UserId,
        now: &Timestamp,
    ) -> Result<Vec<Membership>, DomainError>;
}
