//! Averaging combinator.

use async_trait::async_trait;
use serde_json::{json, Map};

use super::{Metric, MetricRef};
use crate::context::EvalContext;
use crate::input::EvalInput;
use crate::score::{Score, Scores};

/// Scores every child in registration order and reports the mean of the
/// successful children under its own name. Failed children are skipped; if
/// none succeed the value is 0.0. The composite itself never fails.
pub struct CompositeMetric {
    name: String,
    children: Vec<MetricRef>,
}

impl CompositeMetric {
    pub fn new(name: impl Into<String>, children: Vec<MetricRef>) -> Self {
        Self {
            name: name.into(),
            children,
        }
    }

    pub fn children(&self) -> &[MetricRef] {
        &self.children
    }

    /// Score the input and also return the raw per-child scores.
    pub async fn score_with_children(
        &self,
        ctx: &EvalContext,
        input: &EvalInput,
    ) -> (Score, Scores) {
        let mut children = Scores::new();
        for child in &self.children {
            children.push(child.score(ctx, input).await);
        }

        let succeeded = children.iter().filter(|s| s.is_success()).count();
        let mut metadata = Map::new();
        metadata.insert("children".into(), json!(children.len()));
        metadata.insert("succeeded".into(), json!(succeeded));

        let score = Score::new(&self.name, children.average())
            .with_reason(format!(
                "mean of {succeeded}/{} successful child metrics",
                children.len()
            ))
            .with_metadata(metadata);

        (score, children)
    }
}

#[async_trait]
impl Metric for CompositeMetric {
    fn name(&self) -> &str {
        &self.name
    }

    async fn score(&self, ctx: &EvalContext, input: &EvalInput) -> Score {
        self.score_with_children(ctx, input).await.0
    }
}
