//! ResolveCurrentMembershipHandler - Query for a user's current membership.

use std::sync::Arc;

use crate::domain::foundation::{Timestamp, UserId};
use crate::domain::membership::{Membership, MembershipError, MembershipLevel};
use crate::ports::{LevelRepository, MembershipRepository};

use super::source::resolve_source_membership;

/// Query for the user's single current membership, if any.
#[derive(Debug, Clone)]
pub struct ResolveCurrentMembershipQuery {
    pub user_id: UserId,
}

/// The current membership joined with its level.
#[derive(Debug, Clone)]
pub struct CurrentMembership {
    pub membership: Membership,
    pub level: MembershipLevel,
}

/// Read-only handler; selection is latest end date among valid rows,
/// ties to the more privileged level.
pub struct ResolveCurrentMembershipHandler {
    memberships: Arc<dyn MembershipRepository>,
    levels: Arc<dyn LevelRepository>,
}

impl ResolveCurrentMembershipHandler {
    pub fn new(
        memberships: Arc<dyn MembershipRepository>,
        levels: Arc<dyn LevelRepository>,
    ) -> Self {
        Self { memberships, levels }
    }

    pub async fn handle(
        &self,
        query: ResolveCurrentMembershipQuery,
    ) -> Result<Option<CurrentMembership>, MembershipError> {
        let now = Timestamp::now();
        let current = resolve_source_membership(
            self.memberships.as_ref(),
            self.levels.as_ref(),
            &query.user_id,
            None,
            &now,
        )
        .await?;

        Ok(current.map(|(membership, level)| CurrentMembership { membership, level }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryStore;
    use crate::domain::foundation::{LevelId, MembershipId};
    use crate::domain::membership::MembershipSource;

    fn user() -> UserId {
        UserId::new("user-1").unwrap()
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

    async fn seed_membership(
        store: &InMemoryStore,
        level: &MembershipLevel,
        duration_days: i64,
    ) -> Membership {
        let membership = Membership::start(
            MembershipId::new(),
            user(),
            level.id,
            Timestamp::now(),
            duration_days,
            MembershipSource::Purchase,
        );
        MembershipRepository::save(store, &membership).await.unwrap();
        membership
    }

    fn handler(store: &Arc<InMemoryStore>) -> ResolveCurrentMembershipHandler {
        ResolveCurrentMembershipHandler::new(store.clone(), store.clone())
    }

    #[tokio::test]
    async fn returns_none_for_user_without_membership() {
        let store = Arc::new(InMemoryStore::new());
        let result = handler(&store)
            .handle(ResolveCurrentMembershipQuery { user_id: user() })
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn returns_the_membership_with_latest_end_date() {
        let store = Arc::new(InMemoryStore::new());
        let l1 = seed_level(&store, 1).await;
        let l2 = seed_level(&store, 2).await;
        seed_membership(&store, &l1, 10).await;
        let long = seed_membership(&store, &l2, 60).await;

        let current = handler(&store)
            .handle(ResolveCurrentMembershipQuery { user_id: user() })
            .await
            .unwrap()
            .expect("should resolve a membership");

        assert_eq!(current.membership.id, long.id);
        assert_eq!(current.level.id, l2.id);
    }

    #[tokio::test]
    async fn ignores_other_users_rows() {
        let store = Arc::new(InMemoryStore::new());
        let level = seed_level(&store, 1).await;
        let other = Membership::start(
            MembershipId::new(),
            UserId::new("someone-else").unwrap(),
            level.id,
            Timestamp::now(),
            30,
            MembershipSource::Purchase,
        );
        MembershipRepository::save(store.as_ref(), &other).await.unwrap();

        let result = handler(&store)
            .handle(ResolveCurrentMembershipQuery { user_id: user() })
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn ignores_cancelled_rows() {
        let store = Arc::new(InMemoryStore::new());
        let level = seed_level(&store, 1).await;
        let mut membership = seed_membership(&store, &level, 30).await;
        membership.cancel(Timestamp::now()).unwrap();
        MembershipRepository::update(store.as_ref(), &membership)
            .await
            .unwrap();

        let result = handler(&store)
            .handle(ResolveCurrentMembershipQuery { user_id: user() })
            .await
            .unwrap();
        assert!(result.is_none());
    }
}
