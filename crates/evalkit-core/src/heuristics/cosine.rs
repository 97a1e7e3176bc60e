//! Word-frequency cosine similarity.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::context::EvalContext;
use crate::input::EvalInput;
use crate::metric::Metric;
use crate::score::Score;

fn term_frequencies(text: &str) -> HashMap<String, f64> {
    let mut freqs = HashMap::new();
    for token in text.split_whitespace() {
        let token = token.trim_matches(|c: char| !c.is_alphanumeric());
        if token.is_empty() {
            continue;
        }
        *freqs.entry(token.to_lowercase()).or_insert(0.0) += 1.0;
    }
    freqs
}

fn norm(freqs: &HashMap<String, f64>) -> f64 {
    freqs.values().map(|v| v * v).sum::<f64>().sqrt()
}

/// Cosine of the angle between the word-frequency vectors of `a` and `b`.
///
/// Both empty gives 1.0; exactly one empty gives 0.0.
pub fn cosine_similarity(a: &str, b: &str) -> f64 {
    let fa = term_frequencies(a);
    let fb = term_frequencies(b);

    match (fa.is_empty(), fb.is_empty()) {
        (true, true) => return 1.0,
        (true, false) | (false, true) => return 0.0,
        (false, false) => {}
    }

    let dot: f64 = fa
        .iter()
        .filter_map(|(term, x)| fb.get(term).map(|y| x * y))
        .sum();

    dot / (norm(&fa) * norm(&fb))
}

/// Scores `output` against `expected` by word-frequency cosine similarity.
#[derive(Debug, Clone)]
pub struct Cosine {
    name: String,
}

impl Default for Cosine {
    fn default() -> Self {
        Self::new()
    }
}

impl Cosine {
    pub fn new() -> Self {
        Self {
            name: "cosine_similarity".to_string(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

#[async_trait]
impl Metric for Cosine {
    fn name(&self) -> &str {
        &self.name
    }

    async fn score(&self, _ctx: &EvalContext, input: &EvalInput) -> Score {
        let value = cosine_similarity(input.output(), input.expected());
        Score::new(&self.name, value).with_reason(format!("cosine similarity {value:.3}"))
    }
}
