//! Per-invocation context handed to every executing phase.

use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

use crate::error::{ReleaseError, Result};

/// Cancellation scope shared by every phase of one invocation
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    cancel: CancellationToken,
}

impl RunContext {
    /// Fresh, uncancelled context
    pub fn new() -> Self {
        Self::default()
    }

    /// Token observed by blocking work
    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Cancel everything running under this context
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Whether the context has been cancelled
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves once the context is cancelled
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.cancel.cancelled()
    }

    /// Error out early if the context is already cancelled
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(ReleaseError::Cancelled);
        }
        Ok(())
    }
}
