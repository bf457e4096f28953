//! Error types shared across the simulation
//!
//! Nothing in here is fatal to the simulation: decision errors leave the agent's
//! heading unchanged, and `SimError`s are reported to the supervisor while both
//! drivers keep running.

use crate::game::state::AgentId;

/// Why a direction decision did not produce a new heading
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecisionError {
    /// The completion service throttled us, or the cooldown is still active
    #[error("Rate limit exceeded")]
    RateLimited,
    /// Success status, but no usable coordinate pair in the reply
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
    /// Network error, timeout or non-success status
    #[error("Transport failure: {0}")]
    Transport(String),
}

/// Failures surfaced by the periodic drivers
#[derive(Debug, Clone, thiserror::Error)]
pub enum SimError {
    #[error("Agent {agent} had non-finite state and was reset")]
    NonFiniteState { agent: AgentId },
    #[error("No heading applied in a cycle of {attempted} decisions (last error: {last})")]
    NoDecisionsApplied { attempted: usize, last: DecisionError },
    #[error(transparent)]
    Decision(#[from] DecisionError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_error_messages() {
        assert_eq!(DecisionError::RateLimited.to_string(), "Rate limit exceeded");
        assert_eq!(
            DecisionError::Transport("status 500".to_string()).to_string(),
            "Transport failure: status 500"
        );
    }

    #[test]
    fn test_sim_error_wraps_decision_error() {
        let err: SimError = DecisionError::MalformedResponse("no pair".to_string()).into();
        assert_eq!(err.to_string(), "Malformed response: no pair");
    }

    #[test]
    fn test_no_decisions_applied_message() {
        let err = SimError::NoDecisionsApplied {
            attempted: 3,
            last: DecisionError::RateLimited,
        };
        assert!(err.to_string().contains("3 decisions"));
        assert!(err.to_string().contains("Rate limit exceeded"));
    }
}
