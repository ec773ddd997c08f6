//! State machine trait for lifecycle status enums.

use super::ValidationError;

/// Status enums with a fixed set of allowed transitions.
///
/// Implementors list their edges once; `transition_to` and `is_terminal`
/// are derived from that table.
pub trait StateMachine: Sized + Copy + PartialEq + std::fmt::Debug {
    /// Returns true if moving from self to target is allowed.
    fn can_transition_to(&self, target: &Self) -> bool;

    /// Returns all states reachable in one step from the current one.
    fn valid_transitions(&self) -> Vec<Self>;

    /// Performs the transition, returning an error if the edge does not exist.
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

    /// A state with no outgoing edges.
    fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }
}
