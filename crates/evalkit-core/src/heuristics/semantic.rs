//! Semantic similarity placeholder.

use async_trait::async_trait;
use serde_json::{json, Map};

use super::cosine::cosine_similarity;
use crate::context::EvalContext;
use crate::input::EvalInput;
use crate::metric::Metric;
use crate::score::Score;

/// Stands in for embedding-based similarity until an embedding backend is
/// wired up: scores with word-frequency cosine similarity and marks the
/// result as an approximation.
#[derive(Debug, Clone)]
pub struct SemanticSimilarity {
    name: String,
}

impl Default for SemanticSimilarity {
    fn default() -> Self {
        Self::new()
    }
}

impl SemanticSimilarity {
    pub fn new() -> Self {
        Self {
            name: "semantic_similarity".to_string(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

#[async_trait]
impl Metric for SemanticSimilarity {
    fn name(&self) -> &str {
        &self.name
    }

    async fn score(&self, _ctx: &EvalContext, input: &EvalInput) -> Score {
        let value = cosine_similarity(input.output(), input.expected());

        let mut metadata = Map::new();
        metadata.insert("method".into(), json!("word_cosine"));
        metadata.insert("approximation".into(), json!(true));

        Score::new(&self.name, value)
            .with_reason(format!(
                "approximated by word cosine similarity {value:.3}; no embedding backend configured"
            ))
            .with_metadata(metadata)
    }
}
