//! RedeemCodeHandler - Exactly-once code consumption.
//!
//! The handler reads the code, decides what the grant looks like for
//! this user (extend a same-level membership, open a new one, or append
//! points), then hands the store one atomic consume-and-grant commit.
//! The store's compare-and-swap on the code status is what makes a
//! racing duplicate observe a Conflict instead of a second success;
//! the early status check here only shapes the friendly error path.

use std::sync::Arc;

use crate::application::retry::with_retry;
use crate::domain::foundation::{
    ErrorCode, EventEnvelope, EventId, MembershipId, PointEntryId, SerializableDomainEvent,
    Timestamp, UserId,
};
use crate::domain::membership::{
    Membership, MembershipCreated, MembershipExtended, MembershipSource,
};
use crate::domain::points::{PointLedgerEntry, PointSource};
use crate::domain::redemption::{
    CodeEffect, CodeKey, CodeRedeemed, CodeStatus, RedemptionCode, RedemptionError,
};
use crate::ports::{
    EventPublisher, LevelRepository, MembershipRepository, RedemptionCommit, RedemptionGrant,
    RedemptionStore,
};

/// Command to redeem a code for the calling user.
#[derive(Debug, Clone)]
pub struct RedeemCodeCommand {
    pub user_id: UserId,
    pub code: String,
}

/// Identifiers of what the redemption created, for the caller's
/// confirmation screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedeemCodeResult {
    pub membership_id: Option<MembershipId>,
    pub point_entry_id: Option<PointEntryId>,
}

/// Handler consuming redemption codes exactly once.
pub struct RedeemCodeHandler {
    codes: Arc<dyn RedemptionStore>,
    memberships: Arc<dyn MembershipRepository>,
    levels: Arc<dyn LevelRepository>,
    event_publisher: Arc<dyn EventPublisher>,
}

impl RedeemCodeHandler {
    pub fn new(
        codes: Arc<dyn RedemptionStore>,
        memberships: Arc<dyn MembershipRepository>,
        levels: Arc<dyn LevelRepository>,
        event_publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            codes,
            memberships,
            levels,
            event_publisher,
        }
    }

    pub async fn handle(&self, cmd: RedeemCodeCommand) -> Result<RedeemCodeResult, RedemptionError> {
        let key = CodeKey::try_new(&cmd.code)
            .map_err(|e| RedemptionError::validation("code", e.to_string()))?;
        let now = Timestamp::now();

        // 1. Exact lookup by normalized key.
        let code = with_retry(|| self.codes.find_by_key(&key))
            .await
            .map_err(RedemptionError::from)?
            .ok_or_else(|| RedemptionError::not_found(key.as_str()))?;

        // 2. Friendly conflict before attempting the commit.
        if code.status != CodeStatus::Unused {
            return Err(code.conflict());
        }

        // 3. Shape the grant for this user.
        let grant = self.build_grant(&code, &cmd.user_id, now).await?;

        // 4. One atomic unit: CAS unused->used plus the grant. A lost
        //    race surfaces here as a conflict; retrying a transient
        //    failure is safe because a committed first attempt turns
        //    the retry into a conflict rather than a second effect.
        let commit = RedemptionCommit {
            code_id: code.id,
            key: key.clone(),
            user_id: cmd.user_id.clone(),
            used_at: now,
            grant,
        };
        let receipt = match with_retry(|| self.codes.commit_redemption(commit.clone())).await {
            Ok(receipt) => receipt,
            Err(err) if err.code == ErrorCode::CodeAlreadyUsed => {
                return Err(RedemptionError::already_used(key, None));
            }
            Err(err) if err.code == ErrorCode::CodeInvalidated => {
                return Err(RedemptionError::invalidated(key));
            }
            Err(err) => return Err(err.into()),
        };

        // 5. Audit events; the sink is fire-and-forget.
        let redeemed = CodeRedeemed {
            event_id: EventId::new(),
            code_id: code.id,
            code: key.as_str().to_string(),
            user_id: cmd.user_id.clone(),
            membership_id: receipt.membership_id,
            point_entry_id: receipt.point_entry_id,
            occurred_at: now,
        };
        let mut envelopes: Vec<EventEnvelope> = vec![redeemed.to_envelope()];
        match &commit.grant {
            RedemptionGrant::NewMembership(membership) => {
                envelopes.push(
                    MembershipCreated {
                        event_id: EventId::new(),
                        membership_id: membership.id,
                        user_id: cmd.user_id.clone(),
                        level_id: membership.level_id,
                        ends_at: membership.ends_at,
                        occurred_at: now,
                    }
                    .to_envelope(),
                );
            }
            RedemptionGrant::ExtendMembership {
                membership_id,
                days,
                new_ends_at,
            } => {
                envelopes.push(
                    MembershipExtended {
                        event_id: EventId::new(),
                        membership_id: *membership_id,
                        user_id: cmd.user_id.clone(),
                        days_added: *days,
                        new_ends_at: *new_ends_at,
                        occurred_at: now,
                    }
                    .to_envelope(),
                );
            }
            RedemptionGrant::Points(_) => {}
        }
        let envelopes = envelopes
            .into_iter()
            .map(|e| e.with_user_id(cmd.user_id.to_string()))
            .collect();
        if let Err(err) = self.event_publisher.publish_all(envelopes).await {
            tracing::warn!(error = %err, "failed to publish redemption events");
        }

        Ok(RedeemCodeResult {
            membership_id: receipt.membership_id,
            point_entry_id: receipt.point_entry_id,
        })
    }

    /// Turns the code's effect into a concrete grant for this user.
    async fn build_grant(
        &self,
        code: &RedemptionCode,
        user_id: &UserId,
        now: Timestamp,
    ) -> Result<RedemptionGrant, RedemptionError> {
        match code.effect {
            CodeEffect::Points { amount } => {
                let entry = PointLedgerEntry::grant(
                    PointEntryId::new(),
                    user_id.clone(),
                    amount,
                    PointSource::Redemption,
                    now,
                )
                .map_err(|e| RedemptionError::validation("amount", e.to_string()))?;
                Ok(RedemptionGrant::Points(entry))
            }
            CodeEffect::MembershipDays { level_id, days } => {
                let level = with_retry(|| self.levels.find_by_id(&level_id))
                    .await
                    .map_err(RedemptionError::from)?
                    .ok_or_else(|| {
                        RedemptionError::effect_unavailable(
                            code.key.clone(),
                            "its membership level no longer exists",
                        )
                    })?;
                if !level.is_active() {
                    return Err(RedemptionError::effect_unavailable(
                        code.key.clone(),
                        format!("level {} has been retired", level.name),
                    ));
                }

                // Extend only a same-level current membership; anything
                // else gets a fresh row so history stays append-only.
                let valid_rows = with_retry(|| {
                    self.memberships.find_valid_for_user(user_id, &now)
                })
                .await
                .map_err(RedemptionError::from)?;

                if let Some(same_level) =
                    valid_rows.into_iter().find(|m| m.level_id == level_id)
                {
                    Ok(RedemptionGrant::ExtendMembership {
                        membership_id: same_level.id,
                        days,
                        new_ends_at: same_level.ends_at.add_days(days),
                    })
                } else {
                    Ok(RedemptionGrant::NewMembership(Membership::start(
                        MembershipId::new(),
                        user_id.clone(),
                        level_id,
                        now,
                        days,
                        MembershipSource::Redemption,
                    )))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::events::InMemoryEventBus;
    use crate::adapters::memory::InMemoryStore;
    use crate::domain::foundation::{DomainError, LevelId, RedemptionCodeId};
    use crate::domain::membership::MembershipLevel;
    use crate::ports::RedemptionReceipt;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn user() -> UserId {
        UserId::new("user-1").unwrap()
    }

    fn handler(
        store: &Arc<InMemoryStore>,
        bus: &Arc<InMemoryEventBus>,
    ) -> RedeemCodeHandler {
        RedeemCodeHandler::new(store.clone(), store.clone(), store.clone(), bus.clone())
    }

    async fn seed_level(store: &InMemoryStore, sort_order: i32) -> MembershipLevel {
        let level = MembershipLevel::create(
            LevelId::new(),
            format!("L{}", sort_order),
            sort_order,
            30_000,
            30,
        )
        .unwrap();
        LevelRepository::save(store, &level).await.unwrap();
        level
    }

    async fn seed_code(store: &InMemoryStore, key: &str, effect: CodeEffect) -> RedemptionCode {
        let code = RedemptionCode::mint(
            RedemptionCodeId::new(),
            CodeKey::try_new(key).unwrap(),
            effect,
        )
        .unwrap();
        RedemptionStore::save(store, &code).await.unwrap();
        code
    }

    // ════════════════════════════════════════════════════════════════
    // Success Paths
    // ════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn points_code_appends_ledger_entry() {
        let store = Arc::new(InMemoryStore::new());
        let bus = Arc::new(InMemoryEventBus::new());
        seed_code(&store, "ABC123", CodeEffect::Points { amount: 50 }).await;

        let result = handler(&store, &bus)
            .handle(RedeemCodeCommand {
                user_id: user(),
                code: "abc123".to_string(), // normalization applies
            })
            .await
            .unwrap();

        assert!(result.point_entry_id.is_some());
        assert!(result.membership_id.is_none());
        assert_eq!(crate::ports::PointLedger::balance(store.as_ref(), &user())
            .await
            .unwrap(), 50);
        assert!(bus.has_event("redemption.code_redeemed.v1"));
    }

    #[tokio::test]
    async fn membership_code_opens_new_row_for_fresh_user() {
        let store = Arc::new(InMemoryStore::new());
        let bus = Arc::new(InMemoryEventBus::new());
        let level = seed_level(&store, 10).await;
        seed_code(
            &store,
            "DAYS30",
            CodeEffect::MembershipDays {
                level_id: level.id,
                days: 30,
            },
        )
        .await;

        let result = handler(&store, &bus)
            .handle(RedeemCodeCommand {
                user_id: user(),
                code: "DAYS30".to_string(),
            })
            .await
            .unwrap();

        let membership_id = result.membership_id.expect("membership granted");
        let row = MembershipRepository::find_by_id(store.as_ref(), &membership_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.level_id, level.id);
        assert_eq!(row.source, MembershipSource::Redemption);
        assert!(bus.has_event("membership.created.v1"));
    }

    #[tokio::test]
    async fn membership_code_extends_same_level_row() {
        let store = Arc::new(InMemoryStore::new());
        let bus = Arc::new(InMemoryEventBus::new());
        let level = seed_level(&store, 10).await;
        let existing = Membership::start(
            MembershipId::new(),
            user(),
            level.id,
            Timestamp::now(),
            30,
            MembershipSource::Purchase,
        );
        MembershipRepository::save(store.as_ref(), &existing).await.unwrap();
        seed_code(
            &store,
            "DAYS15",
            CodeEffect::MembershipDays {
                level_id: level.id,
                days: 15,
            },
        )
        .await;

        let result = handler(&store, &bus)
            .handle(RedeemCodeCommand {
                user_id: user(),
                code: "DAYS15".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(result.membership_id, Some(existing.id));
        let row = MembershipRepository::find_by_id(store.as_ref(), &existing.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(existing.ends_at.whole_days_until(&row.ends_at), 15);
        assert_eq!(store.membership_count(), 1);
        assert!(bus.has_event("membership.extended.v1"));
    }

    // ════════════════════════════════════════════════════════════════
    // Failure Paths
    // ════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn unknown_code_is_not_found() {
        let store = Arc::new(InMemoryStore::new());
        let bus = Arc::new(InMemoryEventBus::new());

        let result = handler(&store, &bus)
            .handle(RedeemCodeCommand {
                user_id: user(),
                code: "NOPE99".to_string(),
            })
            .await;

        assert!(matches!(result, Err(RedemptionError::NotFound(_))));
    }

    #[tokio::test]
    async fn used_code_conflicts_as_already_used() {
        let store = Arc::new(InMemoryStore::new());
        let bus = Arc::new(InMemoryEventBus::new());
        seed_code(&store, "ABC123", CodeEffect::Points { amount: 10 }).await;

        let h = handler(&store, &bus);
        h.handle(RedeemCodeCommand {
            user_id: user(),
            code: "ABC123".to_string(),
        })
        .await
        .unwrap();

        let result = h
            .handle(RedeemCodeCommand {
                user_id: UserId::new("user-2").unwrap(),
                code: "ABC123".to_string(),
            })
            .await;

        // Conflict, not NotFound, and specifically the "already used" kind.
        assert!(matches!(result, Err(RedemptionError::AlreadyUsed { .. })));
    }

    #[tokio::test]
    async fn invalidated_code_conflicts_distinctly() {
        let store = Arc::new(InMemoryStore::new());
        let bus = Arc::new(InMemoryEventBus::new());
        let code = seed_code(&store, "XYZ999", CodeEffect::Points { amount: 10 }).await;
        store.invalidate(&code.key, Timestamp::now()).await.unwrap();

        let result = handler(&store, &bus)
            .handle(RedeemCodeCommand {
                user_id: user(),
                code: "XYZ999".to_string(),
            })
            .await;

        let err = result.unwrap_err();
        assert!(matches!(err, RedemptionError::Invalidated { .. }));
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn membership_code_for_retired_level_is_unavailable() {
        let store = Arc::new(InMemoryStore::new());
        let bus = Arc::new(InMemoryEventBus::new());
        let mut level = seed_level(&store, 10).await;
        seed_code(
            &store,
            "OLDLVL",
            CodeEffect::MembershipDays {
                level_id: level.id,
                days: 30,
            },
        )
        .await;
        level.retire().unwrap();
        LevelRepository::update(store.as_ref(), &level).await.unwrap();

        let result = handler(&store, &bus)
            .handle(RedeemCodeCommand {
                user_id: user(),
                code: "OLDLVL".to_string(),
            })
            .await;

        assert!(matches!(result, Err(RedemptionError::EffectUnavailable { .. })));
        // The code is still unused and would become redeemable again if
        // the level were restored.
        let stored = store.code_by_key(&CodeKey::try_new("OLDLVL").unwrap()).unwrap();
        assert_eq!(stored.status, CodeStatus::Unused);
    }

    #[tokio::test]
    async fn malformed_code_fails_validation() {
        let store = Arc::new(InMemoryStore::new());
        let bus = Arc::new(InMemoryEventBus::new());

        let result = handler(&store, &bus)
            .handle(RedeemCodeCommand {
                user_id: user(),
                code: "a!".to_string(),
            })
            .await;

        assert!(matches!(result, Err(RedemptionError::ValidationFailed { .. })));
    }

    // ════════════════════════════════════════════════════════════════
    // Store-failure behavior
    // ════════════════════════════════════════════════════════════════

    /// RedemptionStore that fails the first commit with a transient
    /// error, delegating everything else to an InMemoryStore.
    struct FlakyCommitStore {
        inner: InMemoryStore,
        failures_left: AtomicU32,
    }

    #[async_trait]
    impl RedemptionStore for FlakyCommitStore {
        async fn save(&self, code: &RedemptionCode) -> Result<(), DomainError> {
            RedemptionStore::save(&self.inner, code).await
        }

        async fn find_by_key(
            &self,
            key: &CodeKey,
        ) -> Result<Option<RedemptionCode>, DomainError> {
            self.inner.find_by_key(key).await
        }

        async fn commit_redemption(
            &self,
            commit: RedemptionCommit,
        ) -> Result<RedemptionReceipt, DomainError> {
            if self
                .failures_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(DomainError::transient("connection reset"));
            }
            self.inner.commit_redemption(commit).await
        }

        async fn invalidate(
            &self,
            key: &CodeKey,
            now: Timestamp,
        ) -> Result<RedemptionCode, DomainError> {
            self.inner.invalidate(key, now).await
        }
    }

    #[tokio::test]
    async fn transient_commit_failure_is_retried_once() {
        let flaky = Arc::new(FlakyCommitStore {
            inner: InMemoryStore::new(),
            failures_left: AtomicU32::new(1),
        });
        let side_store = Arc::new(InMemoryStore::new());
        let bus = Arc::new(InMemoryEventBus::new());
        let code = RedemptionCode::mint(
            RedemptionCodeId::new(),
            CodeKey::try_new("FLAKY1").unwrap(),
            CodeEffect::Points { amount: 5 },
        )
        .unwrap();
        RedemptionStore::save(flaky.as_ref(), &code).await.unwrap();

        let h = RedeemCodeHandler::new(
            flaky.clone(),
            side_store.clone(),
            side_store.clone(),
            bus.clone(),
        );
        let result = h
            .handle(RedeemCodeCommand {
                user_id: user(),
                code: "FLAKY1".to_string(),
            })
            .await
            .unwrap();

        assert!(result.point_entry_id.is_some());
    }
}
