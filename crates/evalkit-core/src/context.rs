//! Cooperative cancellation for evaluations.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cancellation-aware context passed to the engine and every metric.
///
/// The engine only ever polls [`EvalContext::is_cancelled`] between metric
/// invocations; it never blocks on the context.
#[derive(Debug, Clone, Default)]
pub struct EvalContext {
    cancelled: Arc<AtomicBool>,
}

impl EvalContext {
    /// A context paired with the handle that cancels it.
    pub fn new() -> (Self, CancelHandle) {
        let ctx = Self::default();
        let handle = CancelHandle {
            cancelled: Arc::clone(&ctx.cancelled),
        };
        (ctx, handle)
    }

    /// A context that can never be cancelled.
    pub fn background() -> Self {
        Self::default()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Trigger side of an [`EvalContext`].
#[derive(Debug, Clone)]
pub struct CancelHandle {
    cancelled: Arc<AtomicBool>,
}

impl CancelHandle {
    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}
