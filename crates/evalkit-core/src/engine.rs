//! Evaluation engine: runs the registered metrics over one or many inputs.
//!
//! With a concurrency limit of 1 items are evaluated strictly in order on
//! the caller's task. Above 1, each item runs in its own tokio task and a
//! semaphore bounds how many are in flight. Finished records land in a
//! pre-sized, index-addressed slot vector; the slot write, the completion
//! counter and the progress callbacks share one mutex, so callbacks never
//! overlap even though they fire in completion order.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, Semaphore};
use tracing::{debug, instrument, warn, Instrument};

use crate::context::EvalContext;
use crate::counters::EVAL_COUNTERS;
use crate::error::EvalError;
use crate::input::EvalInput;
use crate::metric::MetricRef;
use crate::obs;
use crate::result::{EvaluationResult, EvaluationResults};
use crate::score::Scores;

/// Called once per finished item with `(completed, total, result)`.
pub type ProgressCallback = Arc<dyn Fn(usize, usize, &EvaluationResult) + Send + Sync>;

/// Engine settings that can be loaded from configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum number of items evaluated at once. 0 means "keep the default".
    pub concurrency: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { concurrency: 1 }
    }
}

/// Drives an ordered list of metrics over evaluation inputs.
#[derive(Clone)]
pub struct Engine {
    metrics: Vec<MetricRef>,
    concurrency: usize,
    callbacks: Vec<ProgressCallback>,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.metrics.iter().map(|m| m.name()).collect();
        f.debug_struct("Engine")
            .field("metrics", &names)
            .field("concurrency", &self.concurrency)
            .field("callbacks", &self.callbacks.len())
            .finish()
    }
}

struct BatchState {
    slots: Vec<Option<EvaluationResult>>,
    completed: usize,
}

impl Engine {
    /// Create a sequential engine over `metrics`, scored in the given order.
    pub fn new(metrics: Vec<MetricRef>) -> Self {
        Self {
            metrics,
            concurrency: 1,
            callbacks: Vec::new(),
        }
    }

    pub fn from_config(metrics: Vec<MetricRef>, config: &EngineConfig) -> Self {
        Self::new(metrics).with_concurrency(config.concurrency)
    }

    /// Set the concurrency limit. A limit of 0 is ignored.
    pub fn with_concurrency(mut self, limit: usize) -> Self {
        if limit > 0 {
            self.concurrency = limit;
        }
        self
    }

    /// Builder form of [`Engine::on_progress`].
    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(usize, usize, &EvaluationResult) + Send + Sync + 'static,
    {
        self.on_progress(callback);
        self
    }

    /// Register a progress callback. Callbacks run in registration order.
    pub fn on_progress<F>(&mut self, callback: F)
    where
        F: Fn(usize, usize, &EvaluationResult) + Send + Sync + 'static,
    {
        self.callbacks.push(Arc::new(callback));
    }

    pub fn metrics(&self) -> &[MetricRef] {
        &self.metrics
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Evaluate a single input. The returned record has an empty item id.
    ///
    /// Cancellation is checked before each metric; once observed, the record
    /// carries [`EvalError::Cancelled`] and only the scores computed so far.
    pub async fn evaluate_one(&self, ctx: &EvalContext, input: EvalInput) -> EvaluationResult {
        score_item(&self.metrics, ctx, String::new(), &input).await
    }

    /// Evaluate `inputs`, returning one record per input in input order with
    /// item ids `item-0`, `item-1`, ….
    #[instrument(skip_all, fields(total = inputs.len(), concurrency = self.concurrency))]
    pub async fn evaluate_many(
        &self,
        ctx: &EvalContext,
        inputs: Vec<EvalInput>,
    ) -> EvaluationResults {
        let items = inputs
            .into_iter()
            .enumerate()
            .map(|(index, input)| (format!("item-{index}"), input))
            .collect();
        self.run_batch(ctx, items).await
    }

    /// Evaluate inputs keyed by caller-chosen ids.
    ///
    /// Each id appears exactly once in the result; the order of records is
    /// unspecified.
    #[instrument(skip_all, fields(total = items.len(), concurrency = self.concurrency))]
    pub async fn evaluate_with_ids(
        &self,
        ctx: &EvalContext,
        items: HashMap<String, EvalInput>,
    ) -> EvaluationResults {
        self.run_batch(ctx, items.into_iter().collect()).await
    }

    async fn run_batch(
        &self,
        ctx: &EvalContext,
        items: Vec<(String, EvalInput)>,
    ) -> EvaluationResults {
        let total = items.len();
        let started = Instant::now();
        obs::emit_batch_started(total, self.metrics.len(), self.concurrency);

        let results = if self.concurrency <= 1 {
            self.run_sequential(ctx, items).await
        } else {
            self.run_concurrent(ctx, items).await
        };

        let failed = results.iter().filter(|r| !r.is_success()).count();
        obs::emit_batch_finished(total, failed, started.elapsed().as_millis() as u64);
        results.into()
    }

    async fn run_sequential(
        &self,
        ctx: &EvalContext,
        items: Vec<(String, EvalInput)>,
    ) -> Vec<EvaluationResult> {
        let total = items.len();
        let mut results = Vec::with_capacity(total);

        for (item_id, input) in items {
            let scored = AssertUnwindSafe(score_item(&self.metrics, ctx, item_id.clone(), &input))
                .catch_unwind()
                .await;
            let result = match scored {
                Ok(result) => result,
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    warn!(item_id = %item_id, error = %message, "evaluation task failed");
                    task_failed(item_id, &input, message)
                }
            };
            let completed = results.len() + 1;
            notify(&self.callbacks, completed, total, &result);
            results.push(result);
        }

        results
    }

    async fn run_concurrent(
        &self,
        ctx: &EvalContext,
        items: Vec<(String, EvalInput)>,
    ) -> Vec<EvaluationResult> {
        let total = items.len();
        let items = Arc::new(items);
        let metrics: Arc<[MetricRef]> = self.metrics.clone().into();
        let callbacks: Arc<[ProgressCallback]> = self.callbacks.clone().into();
        let state = Arc::new(Mutex::new(BatchState {
            slots: (0..total).map(|_| None).collect(),
            completed: 0,
        }));

        // Semaphore enforces the concurrency limit
        let sem = Arc::new(Semaphore::new(self.concurrency));

        let mut tasks = Vec::with_capacity(total);

        for index in 0..total {
            let items = Arc::clone(&items);
            let metrics = Arc::clone(&metrics);
            let callbacks = Arc::clone(&callbacks);
            let state = Arc::clone(&state);
            let sem = Arc::clone(&sem);
            let ctx = ctx.clone();
            let span = tracing::debug_span!("evalkit.item", item_id = %items[index].0);

            let task = tokio::spawn(
                async move {
                    let _permit = sem.acquire_owned().await.ok();

                    let (item_id, input) = &items[index];
                    let result = score_item(&metrics, &ctx, item_id.clone(), input).await;

                    let mut state = state.lock().await;
                    state.completed += 1;
                    let completed = state.completed;
                    notify(&callbacks, completed, total, &result);
                    state.slots[index] = Some(result);
                }
                .instrument(span),
            );

            tasks.push(task);
        }

        let mut task_errors: Vec<Option<String>> = vec![None; total];
        let joined = futures::future::join_all(tasks).await;
        for (index, joined) in joined.into_iter().enumerate() {
            if let Err(e) = joined {
                warn!(item_id = %items[index].0, error = %e, "evaluation task failed");
                task_errors[index] = Some(e.to_string());
            }
        }

        let mut state = state.lock().await;

        // A task that died before publishing still gets a record in its slot.
        for index in 0..total {
            if state.slots[index].is_some() {
                continue;
            }
            let (item_id, input) = &items[index];
            let message = task_errors[index]
                .take()
                .unwrap_or_else(|| "task finished without a result".to_string());
            let result = task_failed(item_id.clone(), input, message);
            state.completed += 1;
            let completed = state.completed;
            notify(&callbacks, completed, total, &result);
            state.slots[index] = Some(result);
        }

        std::mem::take(&mut state.slots)
            .into_iter()
            .flatten()
            .collect()
    }
}

/// Record for an item whose evaluation died before producing a result.
fn task_failed(item_id: String, input: &EvalInput, message: String) -> EvaluationResult {
    EvaluationResult {
        item_id,
        input: input.clone(),
        scores: Scores::new(),
        error: Some(EvalError::TaskFailed { message }),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panicked: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panicked: {message}")
    } else {
        "panicked".to_string()
    }
}

fn notify(
    callbacks: &[ProgressCallback],
    completed: usize,
    total: usize,
    result: &EvaluationResult,
) {
    obs::emit_item_evaluated(&result.item_id, completed, total, result.is_success());
    for callback in callbacks {
        callback(completed, total, result);
    }
}

/// Score one input with every metric in order, polling for cancellation
/// before each metric.
async fn score_item(
    metrics: &[MetricRef],
    ctx: &EvalContext,
    item_id: String,
    input: &EvalInput,
) -> EvaluationResult {
    let mut scores = Scores::new();

    for (position, metric) in metrics.iter().enumerate() {
        if ctx.is_cancelled() {
            obs::emit_evaluation_cancelled(&item_id, position, metrics.len() - position);
            EVAL_COUNTERS.inc_cancellations();
            return EvaluationResult {
                item_id,
                input: input.clone(),
                scores,
                error: Some(EvalError::Cancelled),
            };
        }

        let score = metric.score(ctx, input).await;
        if let Some(error) = &score.error {
            debug!(metric = %metric.name(), error = %error, "metric failed");
        }
        scores.push(score);
    }

    let failures = scores.iter().filter(|s| !s.is_success()).count();
    EVAL_COUNTERS.add_metric_failures(failures as u64);
    EVAL_COUNTERS.inc_items_evaluated();

    EvaluationResult {
        item_id,
        input: input.clone(),
        scores,
        error: None,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    use super::*;
    use crate::metric::testing::{failing, CountingMetric};
    use crate::metric::FnMetric;
    use crate::score::Score;

    fn inputs(n: usize) -> Vec<EvalInput> {
        (0..n)
            .map(|i| EvalInput::new(format!("q{i}"), format!("a{i}")))
            .collect()
    }

    #[test]
    fn test_concurrency_zero_is_ignored() {
        let engine = Engine::new(vec![]).with_concurrency(4).with_concurrency(0);
        assert_eq!(engine.concurrency(), 4);
        assert_eq!(Engine::new(vec![]).with_concurrency(0).concurrency(), 1);
    }

    #[test]
    fn test_from_config() {
        let config: EngineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.concurrency, 1);

        let engine = Engine::from_config(vec![], &EngineConfig { concurrency: 8 });
        assert_eq!(engine.concurrency(), 8);
    }

    #[tokio::test]
    async fn test_evaluate_one_scores_in_registration_order() {
        let engine = Engine::new(vec![
            CountingMetric::new("first", 0.1) as MetricRef,
            failing("second"),
            CountingMetric::new("third", 0.3) as MetricRef,
        ]);

        let result = engine
            .evaluate_one(&EvalContext::background(), EvalInput::new("q", "a"))
            .await;

        assert!(result.is_success(), "metric failures must not fail the record");
        let names: Vec<&str> = result.scores.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["first", "second", "third"]);
        assert_eq!(result.item_id, "");
    }

    #[tokio::test]
    async fn test_evaluate_one_with_no_metrics() {
        let result = Engine::new(vec![])
            .evaluate_one(&EvalContext::background(), EvalInput::default())
            .await;
        assert!(result.is_success());
        assert!(result.scores.is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_before_start_yields_empty_scores() {
        let metric = CountingMetric::new("m", 1.0);
        let engine = Engine::new(vec![metric.clone() as MetricRef]);
        let (ctx, cancel) = EvalContext::new();
        cancel.cancel();

        let result = engine.evaluate_one(&ctx, EvalInput::default()).await;

        assert_eq!(result.error, Some(EvalError::Cancelled));
        assert!(result.scores.is_empty());
        assert_eq!(metric.calls(), 0);
    }

    #[tokio::test]
    async fn test_cancellation_between_metrics_keeps_partial_scores() {
        let (ctx, cancel) = EvalContext::new();
        let trigger = FnMetric::new("cancels", move |_, _| {
            cancel.cancel();
            Score::new("cancels", 1.0)
        });
        let after = CountingMetric::new("after", 1.0);
        let engine = Engine::new(vec![
            Arc::new(trigger) as MetricRef,
            after.clone() as MetricRef,
        ]);

        let result = engine.evaluate_one(&ctx, EvalInput::default()).await;

        assert_eq!(result.error, Some(EvalError::Cancelled));
        assert_eq!(result.scores.len(), 1);
        assert_eq!(result.scores.as_slice()[0].name, "cancels");
        assert_eq!(after.calls(), 0);
    }

    #[tokio::test]
    async fn test_sequential_progress_is_monotonic() {
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let engine = Engine::new(vec![CountingMetric::new("m", 0.5) as MetricRef]).with_progress(
            move |completed, total, result| {
                sink.lock().unwrap().push((completed, total, result.item_id.clone()));
            },
        );

        let results = engine
            .evaluate_many(&EvalContext::background(), inputs(3))
            .await;

        assert_eq!(results.len(), 3);
        let seen = seen.lock().unwrap().clone();
        assert_eq!(
            seen,
            vec![
                (1, 3, "item-0".to_string()),
                (2, 3, "item-1".to_string()),
                (3, 3, "item-2".to_string()),
            ]
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_results_are_index_aligned() {
        let engine = Engine::new(vec![Arc::new(FnMetric::new("echo", |_, input| {
            let n: f64 = input.input().trim_start_matches('q').parse().unwrap_or(-1.0);
            Score::new("echo", n)
        })) as MetricRef])
        .with_concurrency(4);

        let results = engine
            .evaluate_many(&EvalContext::background(), inputs(25))
            .await;

        assert_eq!(results.len(), 25);
        for (index, result) in results.iter().enumerate() {
            assert_eq!(result.item_id, format!("item-{index}"));
            assert_eq!(result.input.input(), format!("q{index}"));
            assert_eq!(result.scores.as_slice()[0].value, index as f64);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_callbacks_fire_once_per_item() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counts = Arc::new(StdMutex::new(Vec::new()));
        let (c, k) = (Arc::clone(&calls), Arc::clone(&counts));
        let engine = Engine::new(vec![CountingMetric::new("m", 1.0) as MetricRef])
            .with_concurrency(3)
            .with_progress(move |completed, total, _| {
                assert_eq!(total, 12);
                c.fetch_add(1, Ordering::SeqCst);
                k.lock().unwrap().push(completed);
            });

        engine
            .evaluate_many(&EvalContext::background(), inputs(12))
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 12);
        let counts = counts.lock().unwrap().clone();
        assert_eq!(counts, (1..=12).collect::<Vec<_>>());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_panicking_metric_yields_task_failure_record() {
        let engine = Engine::new(vec![Arc::new(FnMetric::new("explodes", |_, input| {
            if input.input() == "q1" {
                panic!("metric blew up");
            }
            Score::new("explodes", 1.0)
        })) as MetricRef])
        .with_concurrency(2);

        let results = engine
            .evaluate_many(&EvalContext::background(), inputs(3))
            .await;

        assert_eq!(results.len(), 3);
        assert!(results.as_slice()[0].is_success());
        assert!(matches!(
            results.as_slice()[1].error,
            Some(EvalError::TaskFailed { .. })
        ));
        assert_eq!(results.as_slice()[1].item_id, "item-1");
        assert!(results.as_slice()[2].is_success());
    }

    #[tokio::test]
    async fn test_panicking_metric_sequential_matches_concurrent() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let engine = Engine::new(vec![Arc::new(FnMetric::new("explodes", |_, input| {
            if input.input() == "q1" {
                panic!("metric blew up");
            }
            Score::new("explodes", 1.0)
        })) as MetricRef])
        .with_progress(move |_, _, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let results = engine
            .evaluate_many(&EvalContext::background(), inputs(3))
            .await;

        assert_eq!(results.len(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(results.as_slice()[0].is_success());
        match &results.as_slice()[1].error {
            Some(EvalError::TaskFailed { message }) => {
                assert!(message.contains("metric blew up"), "{message}");
            }
            other => panic!("expected task failure, got {other:?}"),
        }
        assert_eq!(results.as_slice()[1].item_id, "item-1");
        assert!(results.as_slice()[1].scores.is_empty());
        assert!(results.as_slice()[2].is_success());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_callbacks_never_overlap() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let (busy, max) = (Arc::clone(&in_flight), Arc::clone(&peak));
        let engine = Engine::new(vec![CountingMetric::new("m", 1.0) as MetricRef])
            .with_concurrency(8)
            .with_progress(move |_, _, _| {
                let now = busy.fetch_add(1, Ordering::SeqCst) + 1;
                max.fetch_max(now, Ordering::SeqCst);
                std::thread::sleep(std::time::Duration::from_millis(1));
                busy.fetch_sub(1, Ordering::SeqCst);
            });

        let results = engine
            .evaluate_many(&EvalContext::background(), inputs(40))
            .await;

        assert_eq!(results.len(), 40);
        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_evaluate_with_ids_sequential() {
        let engine = Engine::new(vec![CountingMetric::new("m", 1.0) as MetricRef]);
        let items: HashMap<String, EvalInput> = [("alpha", "a"), ("beta", "b")]
            .into_iter()
            .map(|(id, out)| (id.to_string(), EvalInput::new("q", out)))
            .collect();

        let results = engine
            .evaluate_with_ids(&EvalContext::background(), items)
            .await;

        assert_eq!(results.len(), 2);
        assert_eq!(results.get("alpha").unwrap().input.output(), "a");
        assert_eq!(results.get("beta").unwrap().input.output(), "b");
    }
}
