//! Simplified ROUGE-L (longest common subsequence F-measure).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map};

use super::whitespace_tokens;
use crate::context::EvalContext;
use crate::input::EvalInput;
use crate::metric::Metric;
use crate::score::Score;

/// Precision, recall and F-measure derived from the LCS length.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RougeLScore {
    pub lcs: usize,
    pub precision: f64,
    pub recall: f64,
    pub f_measure: f64,
}

/// Length of the longest common subsequence of two token sequences.
fn lcs_length(a: &[&str], b: &[&str]) -> usize {
    let m = a.len();
    let n = b.len();

    if m == 0 || n == 0 {
        return 0;
    }

    let mut dp = vec![vec![0usize; n + 1]; m + 1];

    for i in 1..=m {
        for j in 1..=n {
            if a[i - 1] == b[j - 1] {
                dp[i][j] = dp[i - 1][j - 1] + 1;
            } else {
                dp[i][j] = dp[i][j - 1].max(dp[i - 1][j]);
            }
        }
    }

    dp[m][n]
}

/// ROUGE-L over pre-tokenized candidate and reference.
///
/// `F = ((1 + β²)·P·R) / (β²·P + R)`. Two empty sequences match perfectly;
/// exactly one empty sequence, or no common subsequence, scores 0.
pub fn rouge_l(candidate: &[&str], reference: &[&str], beta: f64) -> RougeLScore {
    match (candidate.is_empty(), reference.is_empty()) {
        (true, true) => {
            return RougeLScore {
                lcs: 0,
                precision: 1.0,
                recall: 1.0,
                f_measure: 1.0,
            }
        }
        (true, false) | (false, true) => {
            return RougeLScore {
                lcs: 0,
                precision: 0.0,
                recall: 0.0,
                f_measure: 0.0,
            }
        }
        (false, false) => {}
    }

    let lcs = lcs_length(candidate, reference);
    let precision = lcs as f64 / candidate.len() as f64;
    let recall = lcs as f64 / reference.len() as f64;

    let beta_sq = beta * beta;
    let denominator = beta_sq * precision + recall;
    let f_measure = if denominator == 0.0 {
        0.0
    } else {
        ((1.0 + beta_sq) * precision * recall) / denominator
    };

    RougeLScore {
        lcs,
        precision,
        recall,
        f_measure,
    }
}

/// Scores `output` (candidate) against `expected` (reference) with ROUGE-L.
#[derive(Debug, Clone)]
pub struct RougeL {
    name: String,
    beta: f64,
}

impl Default for RougeL {
    fn default() -> Self {
        Self::new()
    }
}

impl RougeL {
    pub fn new() -> Self {
        Self {
            name: "rouge_l".to_string(),
            beta: 1.0,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Recall weight: values above 1 favour recall over precision.
    pub fn beta(mut self, beta: f64) -> Self {
        self.beta = beta;
        self
    }
}

#[async_trait]
impl Metric for RougeL {
    fn name(&self) -> &str {
        &self.name
    }

    async fn score(&self, _ctx: &EvalContext, input: &EvalInput) -> Score {
        let candidate = whitespace_tokens(input.output());
        let reference = whitespace_tokens(input.expected());
        let result = rouge_l(&candidate, &reference, self.beta);

        let mut metadata = Map::new();
        metadata.insert("lcs".into(), json!(result.lcs));
        metadata.insert("precision".into(), json!(result.precision));
        metadata.insert("recall".into(), json!(result.recall));
        metadata.insert("beta".into(), json!(self.beta));

        Score::new(&self.name, result.f_measure)
            .with_reason(format!(
                "LCS {} (P {:.3}, R {:.3})",
                result.lcs, result.precision, result.recall
            ))
            .with_metadata(metadata)
    }
}
