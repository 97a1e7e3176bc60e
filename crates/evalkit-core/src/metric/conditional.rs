//! Guarded delegation.

use std::sync::Arc;

use async_trait::async_trait;

use super::{Metric, MetricRef};
use crate::context::EvalContext;
use crate::input::EvalInput;
use crate::score::Score;

/// Reason attached when the predicate rejects an input.
pub const CONDITION_NOT_MET: &str = "condition not met";

type Predicate = dyn Fn(&EvalInput) -> bool + Send + Sync;

/// Runs `inner` only when `predicate` accepts the input.
///
/// A rejected input yields a zero score under the conditional's own name.
/// An accepted input yields the inner score untouched, inner name included.
pub struct ConditionalMetric {
    name: String,
    predicate: Arc<Predicate>,
    inner: MetricRef,
}

impl ConditionalMetric {
    pub fn new<P>(name: impl Into<String>, predicate: P, inner: MetricRef) -> Self
    where
        P: Fn(&EvalInput) -> bool + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            predicate: Arc::new(predicate),
            inner,
        }
    }
}

#[async_trait]
impl Metric for ConditionalMetric {
    fn name(&self) -> &str {
        &self.name
    }

    async fn score(&self, ctx: &EvalContext, input: &EvalInput) -> Score {
        if !(self.predicate)(input) {
            return Score::new(&self.name, 0.0).with_reason(CONDITION_NOT_MET);
        }
        self.inner.score(ctx, input).await
    }
}
