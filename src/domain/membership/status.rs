//! Membership status state machine.

use crate::domain::foundation::StateMachine;
use serde::{Deserialize, Serialize};

/// Status of a user membership record.
///
/// A membership is *currently valid* only when Active and its end date
/// is in the future; history rows keep their terminal status forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipStatus {
    /// Counts toward the user's current membership while the window lasts.
    Active,

    /// Closed early, e.g. replaced by an upgrade. Never valid again.
    Cancelled,

    /// Ran past its end date. Never valid again.
    Expired,
}

impl StateMachine for MembershipStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use MembershipStatus::*;
        matches!(
            (self, target),
            (Active, Cancelled) | (Active, Expired) | (Cancelled, Expired)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use MembershipStatus::*;
        match self {
            Active => vec![Cancelled, Expired],
            Cancelled => vec![Expired],
            Expired => vec![],
        }
    }
}
