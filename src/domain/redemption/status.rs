//! Redemption code status state machine.

use crate::domain::foundation::StateMachine;
use serde::{Deserialize, Serialize};

/// Lifecycle status of a redemption code.
///
/// `Used` and `Invalidated` are terminal; there is no way back to
/// `Unused`, which is what makes a consumed code safe to keep forever
/// as an audit row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeStatus {
    /// Mint state; the only state a redemption can start from.
    Unused,

    /// Consumed by exactly one user.
    Used,

    /// Withdrawn by an administrator before anyone consumed it.
    Invalidated,
}

impl StateMachine for CodeStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use CodeStatus::*;
        matches!((self, target), (Unused, Used) | (Unused, Invalidated))
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use CodeStatus::*;
        match self {
            Unused => vec![Used, Invalidated],
            Used | Invalidated => vec![],
        }
    }
}
