//! Cancellation token for cooperative cancellation.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// A token for cooperative cancellation.
///
/// Pipelines check the token at every stage boundary; a running tool is
/// never interrupted. Cancellation is idempotent and the first reason wins.
#[derive(Debug, Default)]
pub struct CancellationToken {
    cancelled: AtomicBool,
    reason: RwLock<Option<String>>,
}

impl CancellationToken {
    /// Creates a new cancellation token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation with a reason.
    ///
    /// Returns true if this call performed the cancellation. The reason is
    /// stored before the flag is raised, so an observer that sees
    /// [`is_cancelled`](Self::is_cancelled) also sees the reason.
    pub fn cancel(&self, reason: impl Into<String>) -> bool {
        let mut slot = self.reason.write();
        if self.cancelled.load(Ordering::SeqCst) {
            return false;
        }
        let reason = reason.into();
        debug!(reason = %reason, "Cancellation requested");
        *slot = Some(reason);
        self.cancelled.store(true, Ordering::SeqCst);
        true
    }

    /// Returns whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Returns the cancellation reason, if cancelled.
    #[must_use]
    pub fn reason(&self) -> Option<String> {
        self.reason.read().clone()
    }
}
