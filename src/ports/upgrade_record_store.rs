//! Upgrade record store port.
//!
//! Append-only audit of committed upgrades. Records are never updated
//! or deleted.

use crate::domain::foundation::{DomainError, UserId};
use crate::domain::membership::UpgradeRecord;
use async_trait::async_trait;

/// Store port for upgrade audit rows.
#[async_trait]
pub trait UpgradeRecordStore: Send + Sync {
    /// Append an upgrade record.
    ///
    /// # Errors
    ///
    /// - `DatabaseError` on persistence failure
    async fn append(&self, record: &UpgradeRecord) -> Result<(), DomainError>;

    /// All records for a user, oldest first.
    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<UpgradeRecord>, DomainError>;
}
