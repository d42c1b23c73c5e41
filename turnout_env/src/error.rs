//! Error types for the environment layer.

use thiserror::Error;

/// Errors raised by the environment layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvError {
    /// A cancel token was observed at a yield point
    #[error("Cancelled at {0}")]
    Cancelled(String),
}

impl EnvError {
    /// Creates a cancellation error tagged with the yield point.
    pub fn cancelled(at: impl Into<String>) -> Self {
        Self::Cancelled(at.into())
    }
}
