//! Simplified sentence-level BLEU.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{json, Map};

use super::whitespace_tokens;
use crate::context::EvalContext;
use crate::input::EvalInput;
use crate::metric::Metric;
use crate::score::Score;

/// Highest n-gram order used unless configured otherwise.
pub const DEFAULT_MAX_NGRAM: usize = 4;

/// Precision substituted for an n-gram order with no matches, so a single
/// empty order does not zero the geometric mean.
const SMOOTHING_FLOOR: f64 = 0.01;

fn count_ngrams<'t, 's>(tokens: &'t [&'s str], n: usize) -> HashMap<&'t [&'s str], usize> {
    let mut counts = HashMap::new();
    if n == 0 || tokens.len() < n {
        return counts;
    }
    for window in tokens.windows(n) {
        *counts.entry(window).or_insert(0) += 1;
    }
    counts
}

/// Clipped n-gram precision: candidate matches capped by reference counts.
fn clipped_precision(candidate: &[&str], reference: &[&str], n: usize) -> f64 {
    let cand = count_ngrams(candidate, n);
    let total: usize = cand.values().sum();
    if total == 0 {
        return 0.0;
    }

    let refs = count_ngrams(reference, n);
    let matched: usize = cand
        .iter()
        .map(|(gram, count)| (*count).min(refs.get(gram).copied().unwrap_or(0)))
        .sum();

    matched as f64 / total as f64
}

fn brevity_penalty(candidate_len: usize, reference_len: usize) -> f64 {
    if candidate_len >= reference_len {
        1.0
    } else {
        (1.0 - reference_len as f64 / candidate_len as f64).exp()
    }
}

/// BLEU over pre-tokenized candidate and reference.
///
/// `brevity_penalty × exp(mean(ln p_n))` for n in `1..=max_n`, with zero
/// precisions floored at 0.01. An empty candidate scores 0.0.
pub fn bleu_score(candidate: &[&str], reference: &[&str], max_n: usize) -> f64 {
    if candidate.is_empty() {
        return 0.0;
    }
    let max_n = max_n.max(1);

    let log_sum: f64 = (1..=max_n)
        .map(|n| {
            let p = clipped_precision(candidate, reference, n);
            if p > 0.0 {
                p.ln()
            } else {
                SMOOTHING_FLOOR.ln()
            }
        })
        .sum();

    brevity_penalty(candidate.len(), reference.len()) * (log_sum / max_n as f64).exp()
}

/// Scores `output` (candidate) against `expected` (reference) with BLEU.
#[derive(Debug, Clone)]
pub struct Bleu {
    name: String,
    max_n: usize,
}

impl Default for Bleu {
    fn default() -> Self {
        Self::new()
    }
}

impl Bleu {
    pub fn new() -> Self {
        Self {
            name: "bleu".to_string(),
            max_n: DEFAULT_MAX_NGRAM,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Highest n-gram order; values below 1 are treated as 1.
    pub fn max_n(mut self, max_n: usize) -> Self {
        self.max_n = max_n.max(1);
        self
    }
}

#[async_trait]
impl Metric for Bleu {
    fn name(&self) -> &str {
        &self.name
    }

    async fn score(&self, _ctx: &EvalContext, input: &EvalInput) -> Score {
        let candidate = whitespace_tokens(input.output());
        let reference = whitespace_tokens(input.expected());
        let value = bleu_score(&candidate, &reference, self.max_n);

        let mut metadata = Map::new();
        metadata.insert("max_n".into(), json!(self.max_n));
        metadata.insert("candidate_length".into(), json!(candidate.len()));
        metadata.insert("reference_length".into(), json!(reference.len()));

        Score::new(&self.name, value)
            .with_reason(format!("BLEU-{} {value:.3}", self.max_n))
            .with_metadata(metadata)
    }
}
