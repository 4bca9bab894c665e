//! Shared abort signal

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// A flag which can be raised from any thread to stop the blocking loops.
///
/// Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct AbortSignal(Arc<AtomicBool>);

impl AbortSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the signal.
    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Lower the signal so that it can be reused for the next operation.
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
