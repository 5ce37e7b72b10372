//! GetPointsBalanceHandler - Derived balance query.

use std::sync::Arc;

use crate::application::retry::with_retry;
use crate::domain::foundation::UserId;
use crate::domain::points::PointsError;
use crate::ports::PointLedger;

/// Query for a user's current point balance.
#[derive(Debug, Clone)]
pub struct GetPointsBalanceQuery {
    pub user_id: UserId,
}

/// Read-only handler summing the user's ledger.
pub struct GetPointsBalanceHandler {
    ledger: Arc<dyn PointLedger>,
}

impl GetPointsBalanceHandler {
    pub fn new(ledger: Arc<dyn PointLedger>) -> Self {
        Self { ledger }
    }

    pub async fn handle(&self, query: GetPointsBalanceQuery) -> Result<i64, PointsError> {
        Ok(with_retry(|| self.ledger.balance(&query.user_id)).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryStore;
    use crate::domain::foundation::{PointEntryId, Timestamp};
    use crate::domain::points::{PointLedgerEntry, PointSource};

    fn user() -> UserId {
        UserId::new("user-1").unwrap()
    }

    #[tokio::test]
    async fn empty_ledger_has_zero_balance() {
        let store = Arc::new(InMemoryStore::new());
        let handler = GetPointsBalanceHandler::new(store.clone());

        let balance = handler
            .handle(GetPointsBalanceQuery { user_id: user() })
            .await
            .unwrap();
        assert_eq!(balance, 0);
    }

    #[tokio::test]
    async fn balance_is_sum_of_entries() {
        let store = Arc::new(InMemoryStore::new());
        let now = Timestamp::now();
        for (amount, grant) in [(100, true), (25, false), (5, true)] {
            let entry = if grant {
                PointLedgerEntry::grant(
                    PointEntryId::new(), user(), amount, PointSource::Purchase, now,
                )
                .unwrap()
            } else {
                PointLedgerEntry::consume(
                    PointEntryId::new(), user(), amount, PointSource::Spend, now,
                )
                .unwrap()
            };
            store.append(&entry).await.unwrap();
        }

        let handler = GetPointsBalanceHandler::new(store.clone());
        let balance = handler
            .handle(GetPointsBalanceQuery { user_id: user() })
            .await
            .unwrap();
        assert_eq!(balance, 80);
    }
}
