//! GrantPointsHandler - Append a positive ledger entry.

use std::sync::Arc;

use crate::application::retry::with_retry;
use crate::domain::foundation::{
    EventId, PointEntryId, SerializableDomainEvent, Timestamp, UserId,
};
use crate::domain::points::{PointLedgerEntry, PointSource, PointsError, PointsGranted};
use crate::ports::{EventPublisher, PointLedger};

/// Command to grant points to a user.
#[derive(Debug, Clone)]
pub struct GrantPointsCommand {
    pub user_id: UserId,
    pub amount: i64,
    pub source: PointSource,
}

/// Handler appending point grants.
pub struct GrantPointsHandler {
    ledger: Arc<dyn PointLedger>,
    event_publisher: Arc<dyn EventPublisher>,
}

impl GrantPointsHandler {
    pub fn new(ledger: Arc<dyn PointLedger>, event_publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            ledger,
            event_publisher,
        }
    }

    pub async fn handle(&self, cmd: GrantPointsCommand) -> Result<PointLedgerEntry, PointsError> {
        let now = Timestamp::now();
        let entry = PointLedgerEntry::grant(
            PointEntryId::new(),
            cmd.user_id.clone(),
            cmd.amount,
            cmd.source,
            now,
        )
        .map_err(|e| PointsError::validation("amount", e.to_string()))?;

        with_retry(|| self.ledger.append(&entry)).await?;

        let event = PointsGranted {
            event_id: EventId::new(),
            entry_id: entry.id,
            user_id: cmd.user_id.clone(),
            amount: cmd.amount,
            occurred_at: now,
        };
        let envelope = event.to_envelope().with_user_id(cmd.user_id.to_string());
        if let Err(err) = self.event_publisher.publish(envelope).await {
            tracing::warn!(error = %err, "failed to publish points.granted event");
        }

        Ok(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::events::InMemoryEventBus;
    use crate::adapters::memory::InMemoryStore;

    fn user() -> UserId {
        UserId::new("user-1").unwrap()
    }

    #[tokio::test]
    async fn grants_points_and_publishes() {
        let store = Arc::new(InMemoryStore::new());
        let bus = Arc::new(InMemoryEventBus::new());
        let handler = GrantPointsHandler::new(store.clone(), bus.clone());

        let entry = handler
            .handle(GrantPointsCommand {
                user_id: user(),
                amount: 120,
                source: PointSource::Purchase,
            })
            .await
            .unwrap();

        assert_eq!(entry.delta, 120);
        assert_eq!(store.balance(&user()).await.unwrap(), 120);
        assert!(bus.has_event("points.granted.v1"));
    }

    #[tokio::test]
    async fn rejects_non_positive_amounts() {
        let store = Arc::new(InMemoryStore::new());
        let bus = Arc::new(InMemoryEventBus::new());
        let handler = GrantPointsHandler::new(store.clone(), bus.clone());

        for amount in [0, -10] {
            let result = handler
                .handle(GrantPointsCommand {
                    user_id: user(),
                    amount,
                    source: PointSource::Adjustment,
                })
                .await;
            assert!(matches!(result, Err(PointsError::ValidationFailed { .. })));
        }
        assert_eq!(bus.event_count(), 0);
    }
}
