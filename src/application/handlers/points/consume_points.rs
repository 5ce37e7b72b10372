//! ConsumePointsHandler - Append a negative ledger entry with an atomic
//! balance check.

use std::sync::Arc;

use crate::application::retry::with_retry;
use crate::domain::foundation::{
    EventId, PointEntryId, SerializableDomainEvent, Timestamp, UserId,
};
use crate::domain::points::{PointLedgerEntry, PointSource, PointsConsumed, PointsError};
use crate::ports::{EventPublisher, PointLedger};

/// Command to spend points from a user's balance.
#[derive(Debug, Clone)]
pub struct ConsumePointsCommand {
    pub user_id: UserId,
    pub amount: i64,
    pub source: PointSource,
}

/// Handler appending point consumption.
///
/// The balance check lives in the ledger's `append_checked`, atomically
/// with the append; this handler never pre-reads the balance to decide.
pub struct ConsumePointsHandler {
    ledger: Arc<dyn PointLedger>,
    event_publisher: Arc<dyn EventPublisher>,
}

impl ConsumePointsHandler {
    pub fn new(ledger: Arc<dyn PointLedger>, event_publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            ledger,
            event_publisher,
        }
    }

    pub async fn handle(&self, cmd: ConsumePointsCommand) -> Result<PointLedgerEntry, PointsError> {
        let now = Timestamp::now();
        let entry = PointLedgerEntry::consume(
            PointEntryId::new(),
            cmd.user_id.clone(),
            cmd.amount,
            cmd.source,
            now,
        )
        .map_err(|e| PointsError::validation("amount", e.to_string()))?;

        with_retry(|| self.ledger.append_checked(&entry)).await?;

        let event = PointsConsumed {
            event_id: EventId::new(),
            entry_id: entry.id,
            user_id: cmd.user_id.clone(),
            amount: cmd.amount,
            occurred_at: now,
        };
        let envelope = event.to_envelope().with_user_id(cmd.user_id.to_string());
        if let Err(err) = self.event_publisher.publish(envelope).await {
            tracing::warn!(error = %err, "failed to publish points.consumed event");
        }

        Ok(entry)
    }
}
