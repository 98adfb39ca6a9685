//! Per-call cancellation and deadline

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Cancellation handle and optional deadline carried by every request.
///
/// Cloning shares the cancellation token; cancelling any clone aborts every
/// call that was given one.
#[derive(Debug, Clone)]
pub struct RequestContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl Default for RequestContext {
    fn default() -> Self {
        Self { cancel: CancellationToken::new(), deadline: None }
    }
}

impl RequestContext {
    /// Context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self::default()
    }

    /// Replace the cancellation token with `cancel`.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Bound the whole logical call, retries included, to `timeout` from now.
    /// An earlier deadline already present is kept. A timeout too large to
    /// represent as an instant adds no deadline.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.with_deadline(deadline),
            None => self,
        }
    }

    /// Set `deadline`, keeping an earlier one already present.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) if existing < deadline => existing,
            _ => deadline,
        });
        self
    }

    /// Token cancelled when this call is aborted.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Instant by which the whole call must finish, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Abort every call sharing this context.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Whether [`cancel`](Self::cancel) was called on any clone.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
