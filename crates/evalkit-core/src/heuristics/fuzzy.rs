//! Blend of character- and word-level similarity.

use async_trait::async_trait;
use serde_json::{json, Map};

use super::jaccard::{jaccard_similarity, TokenGranularity};
use super::levenshtein::levenshtein_similarity;
use crate::context::EvalContext;
use crate::input::EvalInput;
use crate::metric::Metric;
use crate::score::Score;

/// Mean of Levenshtein similarity and word-level Jaccard, both case-insensitive.
///
/// The threshold only shapes the reason text; a value below it is still a
/// successful score.
#[derive(Debug, Clone)]
pub struct FuzzyMatch {
    name: String,
    threshold: f64,
}

impl Default for FuzzyMatch {
    fn default() -> Self {
        Self::new()
    }
}

impl FuzzyMatch {
    pub fn new() -> Self {
        Self {
            name: "fuzzy_match".to_string(),
            threshold: 0.8,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }
}

#[async_trait]
impl Metric for FuzzyMatch {
    fn name(&self) -> &str {
        &self.name
    }

    async fn score(&self, _ctx: &EvalContext, input: &EvalInput) -> Score {
        let output = input.output().to_lowercase();
        let expected = input.expected().to_lowercase();
        let edit = levenshtein_similarity(&output, &expected, true);
        let overlap = jaccard_similarity(&output, &expected, TokenGranularity::Words);
        let value = (edit + overlap) / 2.0;
        let passed = value >= self.threshold;

        let reason = if passed {
            format!("similarity {value:.3} meets threshold {:.3}", self.threshold)
        } else {
            format!("similarity {value:.3} below threshold {:.3}", self.threshold)
        };

        let mut metadata = Map::new();
        metadata.insert("levenshtein".into(), json!(edit));
        metadata.insert("jaccard".into(), json!(overlap));
        metadata.insert("threshold".into(), json!(self.threshold));
        metadata.insert("passed".into(), json!(passed));

        Score::new(&self.name, value)
            .with_reason(reason)
            .with_metadata(metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_identical_text_passes() {
        let input =
            EvalInput::new("q", "Paris is the capital").with_expected("Paris is the capital");
        let score = FuzzyMatch::new()
            .score(&EvalContext::background(), &input)
            .await;

        assert_eq!(score.value, 1.0);
        assert!(score.reason.unwrap().contains("meets threshold"));
        assert_eq!(score.metadata.unwrap()["passed"], json!(true));
    }

    #[tokio::test]
    async fn test_below_threshold_is_not_an_error() {
        let input =
            EvalInput::new("q", "completely different").with_expected("nothing alike here");
        let score = FuzzyMatch::new()
            .threshold(0.9)
            .score(&EvalContext::background(), &input)
            .await;

        assert!(score.is_success());
        assert!(score.value < 0.9);
        assert!(score.reason.unwrap().contains("below threshold"));
    }

    #[tokio::test]
    async fn test_case_only_difference_is_a_full_match() {
        let input = EvalInput::new("q", "The Cat").with_expected("the cat");
        let score = FuzzyMatch::new()
            .score(&EvalContext::background(), &input)
            .await;
        assert_eq!(score.value, 1.0);
        assert_eq!(score.metadata.unwrap()["jaccard"], json!(1.0));
    }

    #[tokio::test]
    async fn test_blend_of_both_components() {
        // Levenshtein: 2 edits over 11 chars; word Jaccard: {the, cat} of 4 distinct
        let input = EvalInput::new("q", "The cat sat").with_expected("the cat ran");
        let score = FuzzyMatch::new()
            .score(&EvalContext::background(), &input)
            .await;
        let expected = (1.0 - 2.0 / 11.0 + 0.5) / 2.0;
        assert!((score.value - expected).abs() < 1e-12);
    }
}
