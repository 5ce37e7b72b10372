//! Redemption store port.
//!
//! Codes are read and minted like any other row, but consumption goes
//! through a single `commit_redemption` call: the adapter must apply the
//! `Unused -> Used` compare-and-swap and the granted side effect as one
//! all-or-nothing unit. The handler decides *what* to grant; the adapter
//! owns *atomicity*. A failed effect must leave the code unused.

use crate::domain::foundation::{
    DomainError, MembershipId, PointEntryId, RedemptionCodeId, Timestamp, UserId,
};
use crate::domain::membership::Membership;
use crate::domain::points::PointLedgerEntry;
use crate::domain::redemption::{CodeKey, RedemptionCode};
use async_trait::async_trait;

/// Side effect to apply together with the code's state transition.
///
/// Built by the redeem handler from the code's effect and the user's
/// current membership situation.
#[derive(Debug, Clone)]
pub enum RedemptionGrant {
    /// Open a brand-new membership row.
    NewMembership(Membership),

    /// Push an existing same-level membership's end date out.
    ExtendMembership {
        membership_id: MembershipId,
        days: i64,
        new_ends_at: Timestamp,
    },

    /// Append a point grant to the user's ledger.
    Points(PointLedgerEntry),
}

/// One atomic consume-and-grant unit.
#[derive(Debug, Clone)]
pub struct RedemptionCommit {
    /// Code row being consumed.
    pub code_id: RedemptionCodeId,

    /// Normalized code key (the CAS predicate target).
    pub key: CodeKey,

    /// User consuming the code.
    pub user_id: UserId,

    /// Consumption timestamp recorded on the code.
    pub used_at: Timestamp,

    /// Side effect to apply in the same unit.
    pub grant: RedemptionGrant,
}

/// Identifiers of whatever the grant created or touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedemptionReceipt {
    pub membership_id: Option<MembershipId>,
    pub point_entry_id: Option<PointEntryId>,
}

/// Store port for redemption codes.
///
/// Implementations must ensure:
/// - `key` uniqueness
/// - `commit_redemption` and `invalidate` are atomic check-and-transition
///   operations, never a read-then-write pair: of two racing commits for
///   the same code, exactly one succeeds and the other observes a
///   `CodeAlreadyUsed`/`CodeInvalidated` conflict
#[async_trait]
pub trait RedemptionStore: Send + Sync {
    /// Mint a new code.
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` if the key already exists
    /// - `DatabaseError` on persistence failure
    async fn save(&self, code: &RedemptionCode) -> Result<(), DomainError>;

    /// Find a code by its normalized key.
    ///
    /// Returns `None` if not found.
    async fn find_by_key(&self, key: &CodeKey) -> Result<Option<RedemptionCode>, DomainError>;

    /// Atomically consume the code and apply its grant.
    ///
    /// # Errors
    ///
    /// - `CodeAlreadyUsed` / `CodeInvalidated` if the CAS loses the race
    /// - `DatabaseError` / `TransientStoreFailure` on storage failure;
    ///   the code is left unused in every failure case
    async fn commit_redemption(
        &self,
        commit: RedemptionCommit,
    ) -> Result<RedemptionReceipt, DomainError>;

    /// Atomically withdraw an unused code (administrative path).
    ///
    /// Returns the updated code row.
    ///
    /// # Errors
    ///
    /// - `CodeNotFound` if no such key exists
    /// - `CodeAlreadyUsed` / `CodeInvalidated` if the code is terminal
    async fn invalidate(
        &self,
        key: &CodeKey,
        now: Timestamp,
    ) -> Result<RedemptionCode, DomainError>;
}
