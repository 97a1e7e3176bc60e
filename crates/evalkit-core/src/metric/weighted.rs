//! Scaling combinator.

use async_trait::async_trait;

use super::{Metric, MetricRef};
use crate::context::EvalContext;
use crate::input::EvalInput;
use crate::score::Score;

/// Multiplies a successful inner score by `weight`.
///
/// Reports the inner metric's name as its own. A failed inner score is
/// returned as-is, not re-weighted.
pub struct WeightedMetric {
    inner: MetricRef,
    weight: f64,
}

impl WeightedMetric {
    pub fn new(inner: MetricRef, weight: f64) -> Self {
        Self { inner, weight }
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }
}

#[async_trait]
impl Metric for WeightedMetric {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn score(&self, ctx: &EvalContext, input: &EvalInput) -> Score {
        let mut score = self.inner.score(ctx, input).await;
        if score.is_success() {
            score.value *= self.weight;
        }
        score
    }
}
