//! Membership domain events.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{EventId, LevelId, MembershipId, Timestamp, UserId};
use crate::domain_event;

/// A membership row was opened (purchase or redemption grant).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MembershipCreated {
    pub event_id: EventId,
    pub membership_id: MembershipId,
    pub user_id: UserId,
    pub level_id: LevelId,
    pub ends_at: Timestamp,
    pub occurred_at: Timestamp,
}

domain_event!(
    MembershipCreated,
    event_type = "membership.created.v1",
    schema_version = 1,
    aggregate_id = membership_id,
    aggregate_type = "Membership",
    occurred_at = occurred_at,
    event_id = event_id
);

/// An existing membership's end date was pushed out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MembershipExtended {
    pub event_id: EventId,
    pub membership_id: MembershipId,
    pub user_id: UserId,
    pub days_added: i64,
    pub new_ends_at: Timestamp,
    pub occurred_at: Timestamp,
}

domain_event!(
    MembershipExtended,
    event_type = "membership.extended.v1",
    schema_version = 1,
    aggregate_id = membership_id,
    aggregate_type = "Membership",
    occurred_at = occurred_at,
    event_id = event_id
);

/// A prorated upgrade closed one membership and opened another.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MembershipUpgraded {
    pub event_id: EventId,
    pub membership_id: MembershipId,
    pub user_id: UserId,
    pub from_level_id: Option<LevelId>,
    pub to_level_id: LevelId,
    pub price_charged_cents: i64,
    pub credit_applied_cents: i64,
    pub occurred_at: Timestamp,
}

domain_event!(
    MembershipUpgraded,
    event_type = "membership.upgraded.v1",
    schema_version = 1,
    aggregate_id = membership_id,
    aggregate_type = "Membership",
    occurred_at = occurred_at,
    event_id = event_id
);
