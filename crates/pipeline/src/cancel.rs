//! Cooperative cancellation.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Running,
    Canceling,
}

/// Run-wide cancellation state.
///
/// Clones share state. The first [`request`](Self::request) moves the run
/// from [`Running`](PipelineState::Running) to
/// [`Canceling`](PipelineState::Canceling); later requests are no-ops.
/// Workers observe the transition between steps and never mid-call.
#[derive(Debug, Clone, Default)]
pub struct Canceller {
    token: CancellationToken,
    requested: Arc<AtomicBool>,
}

impl Canceller {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Returns `true` only for the call that made the
    /// transition.
    pub fn request(&self) -> bool {
        if self.requested.swap(true, Ordering::SeqCst) {
            return false;
        }
        tracing::warn!("Canceling...");
        self.token.cancel();
        true
    }

    pub fn state(&self) -> PipelineState {
        if self.is_cancelled() { PipelineState::Canceling } else { PipelineState::Running }
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Resolves once cancellation has been requested.
    pub fn cancelled(&self) -> WaitForCancellationFutureOwned {
        self.token.clone().cancelled_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_happens_once() {
        let canceller = Canceller::new();
        assert_eq!(canceller.state(), PipelineState::Running);
        let clone = canceller.clone();
        assert!(clone.request());
        assert!(!canceller.request());
        assert!(!clone.request());
        assert_eq!(canceller.state(), PipelineState::Canceling);
        assert!(canceller.token().is_cancelled());
    }

    #[tokio::test]
    async fn test_cancelled_future_resolves() {
        let canceller = Canceller::new();
        let waiter = tokio::spawn(canceller.cancelled());
        canceller.request();
        waiter.await.unwrap();
    }
}
