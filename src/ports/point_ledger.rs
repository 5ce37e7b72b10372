//! Point ledger port.
//!
//! Append-only. The balance is always derived from entries; there is no
//! counter to update, so grants never contend. Consumption contends on
//! the balance aggregate and must be checked-and-appended atomically.

use crate::domain::foundation::{DomainError, UserId};
use crate::domain::points::PointLedgerEntry;
use async_trait::async_trait;

/// Store port for the append-only point ledger.
#[async_trait]
pub trait PointLedger: Send + Sync {
    /// Append an entry without a balance check (grants, `delta > 0`).
    ///
    /// # Errors
    ///
    /// - `DatabaseError` on persistence failure
    async fn append(&self, entry: &PointLedgerEntry) -> Result<(), DomainError>;

    /// Append a negative entry iff the resulting balance stays
    /// non-negative, atomically with respect to concurrent appends for
    /// the same user.
    ///
    /// # Errors
    ///
    /// - `InsufficientBalance` (with `requested`/`available` details) if
    ///   the entry would push the balance below zero
    /// - `DatabaseError` on persistence failure
    async fn append_checked(&self, entry: &PointLedgerEntry) -> Result<(), DomainError>;

    /// Current balance: sum of all entry deltas for the user.
    async fn balance(&self, user_id: &UserId) -> Result<i64, DomainError>;

    /// All entries for a user, oldest first.
    async fn entries_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<PointLedgerEntry>, DomainError>;
}
