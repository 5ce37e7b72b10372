//! In-memory implementation of every store port.
//!
//! One `Mutex` guards the whole dataset, so the compare-and-swap in
//! `commit_redemption` and the balance check in `append_checked` are
//! serialized exactly like the database transactions they stand in for.
//!
//! # Security Note
//!
//! This adapter is for **testing only**. It uses `.expect()` on lock
//! operations and keeps everything resident; production code uses the
//! Postgres adapters.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::domain::foundation::{
    DomainError, ErrorCode, LevelId, MembershipId, Timestamp, UserId,
};
use crate::domain::membership::{Membership, MembershipLevel, UpgradeRecord};
use crate::domain::points::{balance_of, PointLedgerEntry};
use crate::domain::redemption::{CodeKey, CodeStatus, RedemptionCode};
use crate::ports::{
    LevelRepository, MembershipRepository, PointLedger, RedemptionCommit, RedemptionGrant,
    RedemptionReceipt, RedemptionStore, UpgradeRecordStore,
};

#[derive(Debug, Default)]
struct StoreState {
    levels: HashMap<LevelId, MembershipLevel>,
    memberships: HashMap<MembershipId, Membership>,
    codes: HashMap<String, RedemptionCode>,
    ledger: Vec<PointLedgerEntry>,
    upgrades: Vec<UpgradeRecord>,
}

/// In-memory store implementing all store ports.
///
/// # Panics
///
/// Methods panic if the internal lock is poisoned. Acceptable for test
/// code; this adapter must NOT be used in production.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<StoreState>,
}

impl InMemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StoreState> {
        self.state.lock().expect("InMemoryStore: lock poisoned")
    }

    // === Test Helpers ===

    /// Number of membership rows across all users.
    pub fn membership_count(&self) -> usize {
        self.lock().memberships.len()
    }

    /// Raw code row by key, bypassing the port (for assertions).
    pub fn code_by_key(&self, key: &CodeKey) -> Option<RedemptionCode> {
        self.lock().codes.get(key.as_str()).cloned()
    }
}

#[async_trait]
impl LevelRepository for InMemoryStore {
    async fn save(&self, level: &MembershipLevel) -> Result<(), DomainError> {
        let mut state = self.lock();
        if state
            .levels
            .values()
            .any(|l| l.sort_order == level.sort_order)
        {
            return Err(DomainError::validation(
                "sort_order",
                format!("A level with sort_order {} already exists", level.sort_order),
            ));
        }
        state.levels.insert(level.id, level.clone());
        Ok(())
    }

    async fn update(&self, level: &MembershipLevel) -> Result<(), DomainError> {
        let mut state = self.lock();
        if !state.levels.contains_key(&level.id) {
            return Err(DomainError::new(
                ErrorCode::LevelNotFound,
                format!("Level {} not found", level.id),
            ));
        }
        state.levels.insert(level.id, level.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &LevelId) -> Result<Option<MembershipLevel>, DomainError> {
        Ok(self.lock().levels.get(id).cloned())
    }

    async fn list_active(&self) -> Result<Vec<MembershipLevel>, DomainError> {
        let mut levels: Vec<MembershipLevel> = self
            .lock()
            .levels
            .values()
            .filter(|l| l.is_active())
            .cloned()
            .collect();
        levels.sort_by_key(|l| l.sort_order);
        Ok(levels)
    }
}

#[async_trait]
impl MembershipRepository for InMemoryStore {
    async fn save(&self, membership: &Membership) -> Result<(), DomainError> {
        self.lock()
            .memberships
            .insert(membership.id, membership.clone());
        Ok(())
    }

    async fn update(&self, membership: &Membership) -> Result<(), DomainError> {
        let mut state = self.lock();
        if !state.memberships.contains_key(&membership.id) {
            return Err(DomainError::new(
                ErrorCode::MembershipNotFound,
                format!("Membership {} not found", membership.id),
            ));
        }
        state.memberships.insert(membership.id, membership.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &MembershipId) -> Result<Option<Membership>, DomainError> {
        Ok(self.lock().memberships.get(id).cloned())
    }

    async fn find_valid_for_user(
        &self,
        user_id: &UserId,
        now: &Timestamp,
    ) -> Result<Vec<Membership>, DomainError> {
        Ok(self
            .lock()
            .memberships
            .values()
            .filter(|m| &m.user_id == user_id && m.is_valid_at(now))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl RedemptionStore for InMemoryStore {
    async fn save(&self, code: &RedemptionCode) -> Result<(), DomainError> {
        let mut state = self.lock();
        if state.codes.contains_key(code.key.as_str()) {
            return Err(DomainError::validation(
                "code",
                format!("Code '{}' already exists", code.key),
            ));
        }
        state.codes.insert(code.key.as_str().to_string(), code.clone());
        Ok(())
    }

    async fn find_by_key(&self, key: &CodeKey) -> Result<Option<RedemptionCode>, DomainError> {
        Ok(self.lock().codes.get(key.as_str()).cloned())
    }

    async fn commit_redemption(
        &self,
        commit: RedemptionCommit,
    ) -> Result<RedemptionReceipt, DomainError> {
        // Everything below happens under one lock: the status check, the
        // grant, and the transition are a single atomic unit. The grant
        // is applied first so that a failing grant leaves the code
        // untouched (unused and redeemable).
        let mut state = self.lock();

        match state.codes.get(commit.key.as_str()) {
            None => {
                return Err(DomainError::new(
                    ErrorCode::CodeNotFound,
                    format!("Code '{}' does not exist", commit.key),
                ));
            }
            Some(code) => match code.status {
                CodeStatus::Unused => {}
                CodeStatus::Used => {
                    return Err(DomainError::new(
                        ErrorCode::CodeAlreadyUsed,
                        format!("Code '{}' was already redeemed", commit.key),
                    ));
                }
                CodeStatus::Invalidated => {
                    return Err(DomainError::new(
                        ErrorCode::CodeInvalidated,
                        format!("Code '{}' has been invalidated", commit.key),
                    ));
                }
            },
        }

        let receipt = match commit.grant {
            RedemptionGrant::NewMembership(membership) => {
                let membership_id = membership.id;
                state.memberships.insert(membership_id, membership);
                RedemptionReceipt {
                    membership_id: Some(membership_id),
                    point_entry_id: None,
                }
            }
            RedemptionGrant::ExtendMembership {
                membership_id,
                new_ends_at,
                ..
            } => {
                let membership =
                    state.memberships.get_mut(&membership_id).ok_or_else(|| {
                        DomainError::new(
                            ErrorCode::MembershipNotFound,
                            format!("Membership {} not found", membership_id),
                        )
                    })?;
                membership.ends_at = new_ends_at;
                RedemptionReceipt {
                    membership_id: Some(membership_id),
                    point_entry_id: None,
                }
            }
            RedemptionGrant::Points(entry) => {
                let point_entry_id = entry.id;
                state.ledger.push(entry);
                RedemptionReceipt {
                    membership_id: None,
                    point_entry_id: Some(point_entry_id),
                }
            }
        };

        let code = state
            .codes
            .get_mut(commit.key.as_str())
            .expect("code row checked above");
        code.status = CodeStatus::Used;
        code.used_by = Some(commit.user_id.clone());
        code.used_at = Some(commit.used_at);

        Ok(receipt)
    }

    async fn invalidate(
        &self,
        key: &CodeKey,
        now: Timestamp,
    ) -> Result<RedemptionCode, DomainError> {
        let mut state = self.lock();

        let code = state.codes.get_mut(key.as_str()).ok_or_else(|| {
            DomainError::new(
                ErrorCode::CodeNotFound,
                format!("Code '{}' does not exist", key),
            )
        })?;

        match code.status {
            CodeStatus::Unused => {
                code.status = CodeStatus::Invalidated;
                code.invalidated_at = Some(now);
                Ok(code.clone())
            }
            CodeStatus::Used => Err(DomainError::new(
                ErrorCode::CodeAlreadyUsed,
                format!("Code '{}' was already redeemed", key),
            )),
            CodeStatus::Invalidated => Err(DomainError::new(
                ErrorCode::CodeInvalidated,
                format!("Code '{}' has been invalidated", key),
            )),
        }
    }
}

#[async_trait]
impl PointLedger for InMemoryStore {
    async fn append(&self, entry: &PointLedgerEntry) -> Result<(), DomainError> {
        self.lock().ledger.push(entry.clone());
        Ok(())
    }

    async fn append_checked(&self, entry: &PointLedgerEntry) -> Result<(), DomainError> {
        // Balance check and append share the lock: no interleaving
        // consume can sneak between them.
        let mut state = self.lock();
        let available: i64 = state
            .ledger
            .iter()
            .filter(|e| e.user_id == entry.user_id)
            .map(|e| e.delta)
            .sum();

        if available + entry.delta < 0 {
            return Err(DomainError::new(
                ErrorCode::InsufficientBalance,
                format!(
                    "Insufficient points: requested {}, available {}",
                    -entry.delta, available
                ),
            )
            .with_detail("user_id", entry.user_id.as_str())
            .with_detail("requested", (-entry.delta).to_string())
            .with_detail("available", available.to_string()));
        }

        state.ledger.push(entry.clone());
        Ok(())
    }

    async fn balance(&self, user_id: &UserId) -> Result<i64, DomainError> {
        let state = self.lock();
        let entries: Vec<PointLedgerEntry> = state
            .ledger
            .iter()
            .filter(|e| &e.user_id == user_id)
            .cloned()
            .collect();
        Ok(balance_of(&entries))
    }

    async fn entries_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<PointLedgerEntry>, DomainError> {
        Ok(self
            .lock()
            .ledger
            .iter()
            .filter(|e| &e.user_id == user_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl UpgradeRecordStore for InMemoryStore {
    async fn append(&self, record: &UpgradeRecord) -> Result<(), DomainError> {
        self.lock().upgrades.push(record.clone());
        Ok(())
    }

    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<UpgradeRecord>, DomainError> {
        Ok(self
            .lock()
            .upgrades
            .iter()
            .filter(|r| &r.user_id == user_id)
            .cloned()
            .collect())
    }
}
