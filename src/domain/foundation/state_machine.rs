//! State machine trait for status enums.
//!
//! Provides a consistent interface for validating and performing state
//! transitions across entity lifecycle statuses (membership, code, level).

use super::ValidationError;

/// Trait for status enums that represent state machines.
///
/// Implementors define valid state transitions and get validated
/// transition methods for free.
///
/// # Example
///
/// ```ignore
/// impl StateMachine for CodeStatus {
///     fn can_transition_to(&self, target: &Self) -> bool {
///         matches!((self, target), (Unused, Used) | (Unused, Invalidated))
///     }
///
///     fn valid_transitions(&self) -> Vec<Self> {
///         match self {
///             Unused => vec![Used, Invalidated],
///             Used | Invalidated => vec![],
///         }
///     }
/// }
///
/// // Usage:
/// let new_status = current_status.transition_to(CodeStatus::Used)?;
/// ```
pub trait StateMachine: Sized + Copy + PartialEq + std::fmt::Debug {
    /// Returns true if transition from self to target is valid.
    fn can_transition_to(&self, target: &Self) -> bool;

    /// Returns all valid target states from current state.
    fn valid_transitions(&self) -> Vec<Self>;

    /// Performs transition with validation, returning error if invalid.
    ///
    /// This is the preferred way to change state, as it ensures
    /// the transition is valid according to the state machine rules.
    fn transition_to(&self, target: Self) -> Result<Self, ValidationError> {
        if self.can_transition_to(&target) {
            Ok(target)
        } else {
            Err(ValidationError::invalid_format(
                "state_transition",
                format!("Cannot transition from {:?} to {:?}", self, target),
            ))
        }
    }

    /// Checks if current state is terminal (no valid outgoing transitions).
    fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum TestStatus {
        Open,
        Consumed,
        Revoked,
    }

    impl StateMachine for TestStatus {
        fn can_transition_to(&self, target: &Self) -> bool {
            use TestStatus::*;
            matches!((self, target), (Open, Consumed) | (Open, Revoked))
        }

        fn valid_transitions(&self) -> Vec<Self> {
            use TestStatus::*;
            match self {
                Open => vec![Consumed, Revoked],
                Consumed | Revoked => vec![],
            }
        }
    }

    #[test]
    fn transition_to_succeeds_for_valid_transition() {
        let status = TestStatus::Open;
        let result = status.transition_to(TestStatus::Consumed);
        assert_eq!(result, Ok(TestStatus::Consumed));
    }

    #[test]
    fn transition_to_fails_for_invalid_transition() {
        let status = TestStatus::Consumed;
        let result = status.transition_to(TestStatus::Revoked);
        assert!(result.is_err());
    }

    #[test]
    fn terminal_states_have_no_transitions() {
        assert!(TestStatus::Consumed.is_terminal());
        assert!(TestStatus::Revoked.is_terminal());
        assert!(!TestStatus::Open.is_terminal());
    }
}
