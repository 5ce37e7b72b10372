//! Redemption domain events.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    EventId, MembershipId, PointEntryId, RedemptionCodeId, Timestamp, UserId,
};
use crate::domain_event;

/// A code was consumed and its effect applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeRedeemed {
    pub event_id: EventId,
    pub code_id: RedemptionCodeId,
    pub code: String,
    pub user_id: UserId,
    pub membership_id: Option<MembershipId>,
    pub point_entry_id: Option<PointEntryId>,
    pub occurred_at: Timestamp,
}

domain_event!(
    CodeRedeemed,
    event_type = "redemption.code_redeemed.v1",
    schema_version = 1,
    aggregate_id = code_id,
    aggregate_type = "RedemptionCode",
    occurred_at = occurred_at,
    event_id = event_id
);

/// A code was withdrawn by an administrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeInvalidated {
    pub event_id: EventId,
    pub code_id: RedemptionCodeId,
    pub code: String,
    pub occurred_at: Timestamp,
}

domain_event!(
    CodeInvalidated,
    event_type = "redemption.code_invalidated.v1",
    schema_version = 1,
    aggregate_id = code_id,
    aggregate_type = "RedemptionCode",
    occurred_at = occurred_at,
    event_id = event_id
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::SerializableDomainEvent;

    #[test]
    fn redeemed_event_envelope_routes_by_code_aggregate() {
        let code_id = RedemptionCodeId::new();
        let event = CodeRedeemed {
            event_id: EventId::new(),
            code_id,
            code: "ABC123".to_string(),
            user_id: UserId::new("user-1").unwrap(),
            membership_id: None,
            point_entry_id: Some(PointEntryId::new()),
            occurred_at: Timestamp::now(),
        };

        let envelope = event.to_envelope();
        assert_eq!(envelope.event_type, "redemption.code_redeemed.v1");
        assert_eq!(envelope.aggregate_id, code_id.to_string());
        assert_eq!(envelope.aggregate_type, "RedemptionCode");
    }
}
