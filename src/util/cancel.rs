//! Cooperative cancellation for long-running query stages.
//!
//! Normalization and score matrix construction can take unbounded time on
//! adversarial queries or large document sets. Both poll a
//! [`CancellationToken`] at every unit of work so the surrounding search can
//! abort them by flipping the shared flag or by letting a deadline pass.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::error::{CqqlError, Result};

/// A cloneable cancellation signal with an optional deadline.
///
/// Clones share the same flag, so cancelling any clone cancels all of them.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancellationToken {
    /// Create a token that is never cancelled unless [`cancel`](Self::cancel) is called.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a token that trips once `timeout` has elapsed from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::new().with_deadline(Instant::now() + timeout)
    }

    /// Set an absolute deadline.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Get the deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Check whether cancellation was requested or the deadline passed.
    pub fn is_cancelled(&self) -> bool {
        if self.cancelled.load(Ordering::Relaxed) {
            return true;
        }
        matches!(self.deadline, Some(deadline) if Instant::now() >= deadline)
    }

    /// Fail with [`CqqlError::Cancelled`] if the token has tripped.
    ///
    /// `stage` names the work being interrupted and ends up in the error message.
    pub fn check(&self, stage: &str) -> Result<()> {
        if self.cancelled.load(Ordering::Relaxed) {
            return Err(CqqlError::cancelled(format!("{stage} was cancelled")));
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(CqqlError::cancelled(format!(
                    "{stage} exceeded its deadline"
                )));
            }
        }
        Ok(())
    }
}
