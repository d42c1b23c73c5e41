//! Cooperative cancellation.

use crate::error::EnvError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared flag observed by step loops between steps.
///
/// Cloning the token shares the flag, so a caller can keep one clone and hand
/// the other to a running session.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Returns `Err(EnvError::Cancelled)` if cancellation was requested.
    pub fn check(&self, at: &str) -> Result<(), EnvError> {
        if self.is_cancelled() {
            Err(EnvError::cancelled(at))
        } else {
            Ok(())
        }
    }
}
