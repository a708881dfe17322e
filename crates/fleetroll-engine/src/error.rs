//! Orchestrator error types.

use thiserror::Error;

use fleetroll_provider::ProviderError;

/// Result type alias for roll operations.
pub type RollResult<T> = Result<T, RollError>;

/// Errors that abort a roll.
///
/// Everything here is fatal to the run. Per-instance retirement
/// failures are deliberately absent — they are carried as data in
/// [`crate::RetireOutcome`] and logged, never raised.
#[derive(Debug, Error)]
pub enum RollError {
    #[error("autoscaling group not found: {0}")]
    GroupNotFound(String),

    #[error("group {0} has no attached target group")]
    NoTargetGroup(String),

    #[error("group {group} has {count} attached target groups, exactly one is required")]
    AmbiguousTargetGroup { group: String, count: usize },

    #[error(
        "invalid plan: deployment capacity {deployment} must strictly exceed \
         both desired capacity {desired} and current capacity {current}"
    )]
    InvalidPlan {
        deployment: u32,
        desired: u32,
        current: u32,
    },

    #[error("provider error: {0}")]
    Api(#[from] ProviderError),

    #[error("timed out after {elapsed_secs}s waiting for {condition}")]
    WaitTimeout {
        condition: String,
        elapsed_secs: u64,
    },
}
