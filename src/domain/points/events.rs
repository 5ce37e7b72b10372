//! Points domain events.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{EventId, PointEntryId, Timestamp, UserId};
use crate::domain_event;

/// Points were granted to a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointsGranted {
    pub event_id: EventId,
    pub entry_id: PointEntryId,
    pub user_id: UserId,
    pub amount: i64,
    pub occurred_at: Timestamp,
}

domain_event!(
    PointsGranted,
    event_type = "points.granted.v1",
    schema_version = 1,
    aggregate_id = entry_id,
    aggregate_type = "PointLedger",
    occurred_at = occurred_at,
    event_id = event_id
);

/// Points were consumed from a user's balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointsConsumed {
    pub event_id: EventId,
    pub entry_id: PointEntryId,
    pub user_id: UserId,
    pub amount: i64,
    pub occurred_at: Timestamp,
}

domain_event!(
    PointsConsumed,
    event_type = "points.consumed.v1",
    schema_version = 1,
    aggregate_id = entry_id,
    aggregate_type = "PointLedger",
    occurred_at = occurred_at,
    event_id = event_id
);
