//! Tracing-backed event publisher.
//!
//! The audit sink for deployments that have no event transport: every
//! domain event is emitted as a structured `tracing` record and picked
//! up by whatever subscriber the host process installed. Publishing
//! never fails.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, EventEnvelope};
use crate::ports::EventPublisher;

/// Publishes domain events as structured tracing records.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventPublisher;

impl TracingEventPublisher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EventPublisher for TracingEventPublisher {
    async fn publish(&self, event: EventEnvelope) -> Result<(), DomainError> {
        tracing::info!(
            target: "tiergate::audit",
            event_id = %event.event_id,
            event_type = %event.event_type,
            aggregate_type = %event.aggregate_type,
            aggregate_id = %event.aggregate_id,
            occurred_at = %event.occurred_at,
            payload = %event.payload,
            "domain event"
        );
        Ok(())
    }

    async fn publish_all(&self, events: Vec<EventEnvelope>) -> Result<(), DomainError> {
        for event in events {
            self.publish(event).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn publish_never_fails() {
        let publisher = TracingEventPublisher::new();
        let envelope =
            EventEnvelope::new("points.granted.v1", "entry-1", "PointLedger", json!({}));
        assert!(publisher.publish(envelope).await.is_ok());
    }
}
