//! Token-set overlap.

use std::collections::HashSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::context::EvalContext;
use crate::input::EvalInput;
use crate::metric::Metric;
use crate::score::Score;

/// How text is split into tokens before comparing sets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenGranularity {
    /// Whitespace-separated words.
    #[default]
    Words,
    /// Individual characters.
    Characters,
}

fn token_set(text: &str, granularity: TokenGranularity) -> HashSet<String> {
    match granularity {
        TokenGranularity::Words => text.split_whitespace().map(str::to_string).collect(),
        TokenGranularity::Characters => text.chars().map(String::from).collect(),
    }
}

/// `|A ∩ B| / |A ∪ B|` over deduplicated tokens; two empty sets give 1.0.
pub fn jaccard_similarity(a: &str, b: &str, granularity: TokenGranularity) -> f64 {
    let a = token_set(a, granularity);
    let b = token_set(b, granularity);

    let union = a.union(&b).count();
    if union == 0 {
        return 1.0;
    }
    a.intersection(&b).count() as f64 / union as f64
}

/// Scores `output` against `expected` by token-set overlap.
#[derive(Debug, Clone)]
pub struct Jaccard {
    name: String,
    granularity: TokenGranularity,
    case_sensitive: bool,
}

impl Default for Jaccard {
    fn default() -> Self {
        Self::new()
    }
}

impl Jaccard {
    pub fn new() -> Self {
        Self {
            name: "jaccard_similarity".to_string(),
            granularity: TokenGranularity::Words,
            case_sensitive: true,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn granularity(mut self, granularity: TokenGranularity) -> Self {
        self.granularity = granularity;
        self
    }

    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }
}

#[async_trait]
impl Metric for Jaccard {
    fn name(&self) -> &str {
        &self.name
    }

    async fn score(&self, _ctx: &EvalContext, input: &EvalInput) -> Score {
        let value = if self.case_sensitive {
            jaccard_similarity(input.output(), input.expected(), self.granularity)
        } else {
            jaccard_similarity(
                &input.output().to_lowercase(),
                &input.expected().to_lowercase(),
                self.granularity,
            )
        };
        Score::new(&self.name, value).with_reason(format!("token overlap {value:.3}"))
    }
}
