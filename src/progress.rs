//! Cooperative progress reporting and cancellation.
//!
//! Long-running stages call [`Progress::check_canceled`] between bounded units
//! of work and stop with [`Error::Canceled`] when asked to. Mutations made
//! before the checkpoint are kept.
//!
//! ```
//! use haplotype_network::progress::{CancellationToken, Progress};
//!
//! let mut token = CancellationToken::new();
//! let handle = token.clone();
//! assert!(token.check_canceled().is_ok());
//! handle.cancel();
//! assert!(token.check_canceled().is_err());
//! ```

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::error::{Error, Result};

/// A progress sink that can also request cancellation.
pub trait Progress {
    /// Report that `current` out of `total` units are done.
    fn advance(&mut self, _current: usize, _total: usize) {}

    fn is_canceled(&self) -> bool {
        false
    }

    fn check_canceled(&self) -> Result<()> {
        if self.is_canceled() {
            Err(Error::Canceled)
        } else {
            Ok(())
        }
    }
}

/// Ignores progress and never cancels.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl Progress for NoProgress {}

/// A clonable handle; cancelling any clone cancels all of them.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    canceled: Arc<AtomicBool>,
    current: Arc<AtomicUsize>,
    total: Arc<AtomicUsize>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.canceled.store(true, Ordering::SeqCst);
    }

    /// Last reported `(current, total)`.
    pub fn position(&self) -> (usize, usize) {
        (
            self.current.load(Ordering::Relaxed),
            self.total.load(Ordering::Relaxed),
        )
    }
}

impl Progress for CancellationToken {
    fn advance(&mut self, current: usize, total: usize) {
        self.current.store(current, Ordering::Relaxed);
        self.total.store(total, Ordering::Relaxed);
    }

    fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::SeqCst)
    }
}
