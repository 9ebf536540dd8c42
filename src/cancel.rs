//! Cooperative cancellation shared across analyses.
//!
//! One token is threaded through the whole run; analyses derive children
//! with tighter deadlines. Checks are cheap enough to sit in batch loops.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Clone, Debug)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            deadline: None,
        }
    }

    pub fn with_deadline(timeout: Duration) -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            deadline: Some(Instant::now() + timeout),
        }
    }

    /// Child sharing the parent's flag with an additional, possibly
    /// tighter, deadline.
    pub fn child_with_timeout(&self, timeout: Duration) -> Self {
        let child_deadline = Instant::now() + timeout;
        let deadline = match self.deadline {
            Some(parent) => Some(parent.min(child_deadline)),
            None => Some(child_deadline),
        };
        Self {
            flag: Arc::clone(&self.flag),
            deadline,
        }
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        if self.flag.load(Ordering::Relaxed) {
            return true;
        }
        matches!(self.deadline, Some(d) if Instant::now() >= d)
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_token_is_live() {
        assert!(!CancelToken::new().is_cancelled());
    }

    #[test]
    fn cancel_propagates_to_children() {
        let parent = CancelToken::new();
        let child = parent.child_with_timeout(Duration::from_secs(3600));
        parent.cancel();
        assert!(child.is_cancelled());
    }

    #[test]
    fn elapsed_deadline_cancels() {
        let token = CancelToken::with_deadline(Duration::from_millis(0));
        assert!(token.is_cancelled());
    }
}
