//! Cooperative cancellation

use ltrank_core::{LtrError, LtrResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared flag that aborts blocking waits
///
/// Clones share the same flag. Once aborted, a signal stays aborted.
#[derive(Debug, Clone, Default)]
pub struct AbortSignal {
    flag: Arc<AtomicBool>,
}

impl AbortSignal {
    /// Create a signal that has not fired
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire the signal
    pub fn abort(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// Whether the signal has fired
    pub fn is_aborted(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// `Err(Interrupted)` if the signal has fired
    pub fn check(&self) -> LtrResult<()> {
        if self.is_aborted() {
            Err(LtrError::Interrupted)
        } else {
            Ok(())
        }
    }
}
