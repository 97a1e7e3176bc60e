//! The metric capability and its combinators.
//!
//! # Module layout
//!
//! - [`Metric`]: the scoring trait every metric implements
//! - [`FnMetric`]: wraps a plain scoring closure
//! - [`composite`]: `CompositeMetric`, averages its children
//! - [`conditional`]: `ConditionalMetric`, guarded delegation
//! - [`weighted`]: `WeightedMetric`, scales a wrapped metric

pub mod composite;
pub mod conditional;
pub mod weighted;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::context::EvalContext;
use crate::input::EvalInput;
use crate::score::Score;

pub use composite::CompositeMetric;
pub use conditional::ConditionalMetric;
pub use weighted::WeightedMetric;

/// A named scoring function over an [`EvalInput`].
///
/// Metrics report failure through [`Score::error`], never by panicking or
/// returning `Err`; a failed score is simply left out of every average.
/// Implementations are expected not to block, since cancellation is only
/// observed between metric calls.
#[async_trait]
pub trait Metric: Send + Sync {
    fn name(&self) -> &str;

    async fn score(&self, ctx: &EvalContext, input: &EvalInput) -> Score;
}

/// Shared handle to a metric, as stored by the engine and combinators.
pub type MetricRef = Arc<dyn Metric>;

type ScoreFn = dyn Fn(&EvalContext, &EvalInput) -> Score + Send + Sync;

/// Metric backed by an arbitrary closure.
#[derive(Clone)]
pub struct FnMetric {
    name: String,
    func: Arc<ScoreFn>,
}

impl FnMetric {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&EvalContext, &EvalInput) -> Score + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }
}

impl fmt::Debug for FnMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnMetric").field("name", &self.name).finish()
    }
}

#[async_trait]
impl Metric for FnMetric {
    fn name(&self) -> &str {
        &self.name
    }

    async fn score(&self, ctx: &EvalContext, input: &EvalInput) -> Score {
        (self.func)(ctx, input)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Stub metrics shared by the combinator and engine unit tests.

    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::error::EvalError;

    /// Returns a fixed value and counts its invocations.
    pub struct CountingMetric {
        pub name: String,
        pub value: f64,
        pub calls: AtomicUsize,
    }

    impl CountingMetric {
        pub fn new(name: &str, value: f64) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                value,
                calls: AtomicUsize::new(0),
            })
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Metric for CountingMetric {
        fn name(&self) -> &str {
            &self.name
        }

        async fn score(&self, _ctx: &EvalContext, _input: &EvalInput) -> Score {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Score::new(&self.name, self.value).with_reason("stub")
        }
    }

    pub fn failing(name: &str) -> MetricRef {
        let owned = name.to_string();
        Arc::new(FnMetric::new(name, move |_, _| {
            Score::failed(&owned, EvalError::metric(&owned, "stub failure"))
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fn_metric_delegates_to_closure() {
        let metric = FnMetric::new("length", |_, input| {
            Score::new("length", input.output().chars().count() as f64)
        });

        let score = metric
            .score(&EvalContext::background(), &EvalInput::new("q", "abcd"))
            .await;

        assert_eq!(metric.name(), "length");
        assert_eq!(score.value, 4.0);
        assert!(score.is_success());
    }
}
