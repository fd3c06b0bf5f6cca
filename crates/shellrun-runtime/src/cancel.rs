use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Why a running child was stopped before it exited on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// The caller's [`CancelToken`] was triggered.
    Requested,
    /// The configured timeout elapsed.
    TimedOut,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelReason::Requested => write!(f, "cancelled"),
            CancelReason::TimedOut => write!(f, "timed out"),
        }
    }
}

/// Shared cancellation flag observed while a child process is running.
///
/// Clones share the same flag; cancelling any clone cancels them all. A token
/// stays cancelled once set.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}
