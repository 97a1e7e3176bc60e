//! Structured observability hooks for evaluation batches.
//!
//! Emission functions for the batch lifecycle: start, per-item completion,
//! finish, and cancellation. Spans come from `#[instrument]` on the engine
//! entry points.

use tracing::{debug, info, warn};

/// Emit event: a batch of `total` items is starting.
pub fn emit_batch_started(total: usize, metrics: usize, concurrency: usize) {
    info!(
        event = "batch.started",
        total = total,
        metrics = metrics,
        concurrency = concurrency,
    );
}

/// Emit event: one item finished.
pub fn emit_item_evaluated(item_id: &str, completed: usize, total: usize, success: bool) {
    debug!(
        event = "batch.item_evaluated",
        item_id = %item_id,
        completed = completed,
        total = total,
        success = success,
    );
}

/// Emit event: the whole batch finished.
pub fn emit_batch_finished(total: usize, failed: usize, duration_ms: u64) {
    info!(
        event = "batch.finished",
        total = total,
        failed = failed,
        duration_ms = duration_ms,
    );
}

/// Emit event: cancellation observed while evaluating an item (warning level).
pub fn emit_evaluation_cancelled(item_id: &str, scored: usize, remaining: usize) {
    warn!(
        event = "item.cancelled",
        item_id = %item_id,
        scored = scored,
        remaining = remaining,
    );
}
