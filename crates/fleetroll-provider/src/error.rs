//! Provider error types.

use thiserror::Error;

/// Result type alias for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Errors surfaced by a fleet provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("autoscaling group not found: {0}")]
    GroupNotFound(String),

    #[error("instance not found: {0}")]
    InstanceNotFound(String),

    #[error("remote api error: {0}")]
    Api(String),
}
