//! CalculateUpgradePriceHandler - Prorated upgrade quote.
//!
//! Pure computation over loaded rows: no side effects, safe to call any
//! number of times. The commit step recomputes the same quote and
//! refuses to charge a price that no longer matches.

use std::sync::Arc;

use crate::application::retry::with_retry;
use crate::domain::foundation::{LevelId, MembershipId, Timestamp, UserId};
use crate::domain::membership::{quote_upgrade, MembershipError, UpgradeQuote};
use crate::ports::{LevelRepository, MembershipRepository};

use super::source::resolve_source_membership;

/// Command to quote an upgrade for a user.
#[derive(Debug, Clone)]
pub struct CalculateUpgradePriceCommand {
    pub user_id: UserId,
    pub target_level_id: LevelId,
    /// Upgrade from this specific membership instead of the resolved
    /// current one. Must be owned by `user_id`.
    pub membership_id: Option<MembershipId>,
}

/// Handler computing prorated upgrade quotes.
pub struct CalculateUpgradePriceHandler {
    memberships: Arc<dyn MembershipRepository>,
    levels: Arc<dyn LevelRepository>,
}

impl CalculateUpgradePriceHandler {
    pub fn new(
        memberships: Arc<dyn MembershipRepository>,
        levels: Arc<dyn LevelRepository>,
    ) -> Self {
        Self { memberships, levels }
    }

    pub async fn handle(
        &self,
        cmd: CalculateUpgradePriceCommand,
    ) -> Result<UpgradeQuote, MembershipError> {
        let now = Timestamp::now();

        // 1. Target must exist and still be purchasable.
        let target = with_retry(|| self.levels.find_by_id(&cmd.target_level_id))
            .await?
            .filter(|level| level.is_active())
            .ok_or_else(|| MembershipError::level_not_found(cmd.target_level_id))?;

        // 2. Source membership: explicit and owned, or the resolved current.
        let source = resolve_source_membership(
            self.memberships.as_ref(),
            self.levels.as_ref(),
            &cmd.user_id,
            cmd.membership_id.as_ref(),
            &now,
        )
        .await?;

        // 3. Pure proration.
        quote_upgrade(
            source.as_ref().map(|(m, l)| (m, l)),
            &target,
            &now,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryStore;
    use crate::domain::membership::{Membership, MembershipLevel, MembershipSource};

    fn user() -> UserId {
        UserId::new("user-1").unwrap()
    }

    async fn seed_level(
        store: &InMemoryStore,
        name: &str,
        sort_order: i32,
        price_cents: i64,
        duration_days: i64,
    ) -> MembershipLevel {
        let level =
            MembershipLevel::create(LevelId::new(), name, sort_order, price_cents, duration_days)
                .unwrap();
        LevelRepository::save(store, &level).await.unwrap();
        level
    }

    /// Seeds a membership with `remaining` whole days left as of now.
    ///
    /// An extra hour of slack keeps the floored day count stable while
    /// the test runs.
    async fn seed_membership_with_remaining(
        store: &InMemoryStore,
        owner: &UserId,
        level: &MembershipLevel,
        remaining: i64,
    ) -> Membership {
        let starts = Timestamp::now()
            .minus_days(level.duration_days - remaining)
            .add_hours(1);
        let membership = Membership::start(
            MembershipId::new(),
            owner.clone(),
            level.id,
            starts,
            level.duration_days,
            MembershipSource::Purchase,
        );
        MembershipRepository::save(store, &membership).await.unwrap();
        membership
    }

    fn handler(store: &Arc<InMemoryStore>) -> CalculateUpgradePriceHandler {
        CalculateUpgradePriceHandler::new(store.clone(), store.clone())
    }

    #[tokio::test]
    async fn quotes_full_price_without_membership() {
        let store = Arc::new(InMemoryStore::new());
        let gold = seed_level(&store, "Gold", 20, 50_000, 30).await;

        let quote = handler(&store)
            .handle(CalculateUpgradePriceCommand {
                user_id: user(),
                target_level_id: gold.id,
                membership_id: None,
            })
            .await
            .unwrap();

        assert_eq!(quote.final_price_cents, 50_000);
        assert_eq!(quote.credit_applied_cents, 0);
        assert_eq!(quote.remaining_days, 0);
    }

    #[tokio::test]
    async fn quotes_prorated_price_from_current_membership() {
        // 300.00/30d with 10 days left, target 500.00: credit 100.00
        let store = Arc::new(InMemoryStore::new());
        let silver = seed_level(&store, "Silver", 10, 30_000, 30).await;
        let gold = seed_level(&store, "Gold", 20, 50_000, 30).await;
        seed_membership_with_remaining(&store, &user(), &silver, 10).await;

        let quote = handler(&store)
            .handle(CalculateUpgradePriceCommand {
                user_id: user(),
                target_level_id: gold.id,
                membership_id: None,
            })
            .await
            .unwrap();

        assert_eq!(quote.remaining_days, 10);
        assert_eq!(quote.credit_applied_cents, 10_000);
        assert_eq!(quote.final_price_cents, 40_000);
    }

    #[tokio::test]
    async fn unknown_target_level_is_not_found() {
        let store = Arc::new(InMemoryStore::new());

        let result = handler(&store)
            .handle(CalculateUpgradePriceCommand {
                user_id: user(),
                target_level_id: LevelId::new(),
                membership_id: None,
            })
            .await;

        assert!(matches!(result, Err(MembershipError::LevelNotFound(_))));
    }

    #[tokio::test]
    async fn retired_target_level_is_not_found() {
        let store = Arc::new(InMemoryStore::new());
        let mut gold = seed_level(&store, "Gold", 20, 50_000, 30).await;
        gold.retire().unwrap();
        LevelRepository::update(store.as_ref(), &gold).await.unwrap();

        let result = handler(&store)
            .handle(CalculateUpgradePriceCommand {
                user_id: user(),
                target_level_id: gold.id,
                membership_id: None,
            })
            .await;

        assert!(matches!(result, Err(MembershipError::LevelNotFound(_))));
    }

    #[tokio::test]
    async fn downgrade_is_invalid() {
        let store = Arc::new(InMemoryStore::new());
        let silver = seed_level(&store, "Silver", 10, 30_000, 30).await;
        let gold = seed_level(&store, "Gold", 20, 50_000, 30).await;
        seed_membership_with_remaining(&store, &user(), &gold, 10).await;

        let result = handler(&store)
            .handle(CalculateUpgradePriceCommand {
                user_id: user(),
                target_level_id: silver.id,
                membership_id: None,
            })
            .await;

        assert!(matches!(result, Err(MembershipError::InvalidUpgrade { .. })));
    }

    #[tokio::test]
    async fn foreign_membership_id_is_forbidden() {
        let store = Arc::new(InMemoryStore::new());
        let silver = seed_level(&store, "Silver", 10, 30_000, 30).await;
        let gold = seed_level(&store, "Gold", 20, 50_000, 30).await;
        let other_user = UserId::new("someone-else").unwrap();
        let foreign =
            seed_membership_with_remaining(&store, &other_user, &silver, 10).await;

        let result = handler(&store)
            .handle(CalculateUpgradePriceCommand {
                user_id: user(),
                target_level_id: gold.id,
                membership_id: Some(foreign.id),
            })
            .await;

        assert!(matches!(result, Err(MembershipError::Forbidden(_))));
    }

    #[tokio::test]
    async fn unknown_explicit_membership_is_not_found() {
        let store = Arc::new(InMemoryStore::new());
        let gold = seed_level(&store, "Gold", 20, 50_000, 30).await;

        let result = handler(&store)
            .handle(CalculateUpgradePriceCommand {
                user_id: user(),
                target_level_id: gold.id,
                membership_id: Some(MembershipId::new()),
            })
            .await;

        assert!(matches!(result, Err(MembershipError::MembershipNotFound(_))));
    }

    #[tokio::test]
    async fn expired_explicit_membership_quotes_without_credit() {
        let store = Arc::new(InMemoryStore::new());
        let silver = seed_level(&store, "Silver", 10, 30_000, 30).await;
        let gold = seed_level(&store, "Gold", 20, 50_000, 30).await;

        // Window ended ten days ago: the row exists but is invalid, so
        // the explicit reference falls back to an uncredited quote.
        let stale = Membership::start(
            MembershipId::new(),
            user(),
            silver.id,
            Timestamp::now().minus_days(40),
            silver.duration_days,
            MembershipSource::Purchase,
        );
        MembershipRepository::save(store.as_ref(), &stale).await.unwrap();

        let quote = handler(&store)
            .handle(CalculateUpgradePriceCommand {
                user_id: user(),
                target_level_id: gold.id,
                membership_id: Some(stale.id),
            })
            .await
            .unwrap();

        assert_eq!(quote.final_price_cents, 50_000);
        assert_eq!(quote.credit_applied_cents, 0);
    }
}
