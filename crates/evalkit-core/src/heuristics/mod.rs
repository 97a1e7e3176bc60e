//! Reference-based text-similarity metrics.
//!
//! Every heuristic compares an input's `output` against its `expected`
//! answer and never produces a failed score; degenerate inputs (empty
//! strings, no overlap) map to fixed values instead.

pub mod bleu;
pub mod cosine;
pub mod exact;
pub mod fuzzy;
pub mod jaccard;
pub mod levenshtein;
pub mod rouge;
pub mod semantic;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::metric::MetricRef;

pub use bleu::{bleu_score, Bleu, DEFAULT_MAX_NGRAM};
pub use cosine::{cosine_similarity, Cosine};
pub use exact::{Contains, ExactMatch};
pub use fuzzy::FuzzyMatch;
pub use jaccard::{jaccard_similarity, Jaccard, TokenGranularity};
pub use levenshtein::{levenshtein_distance, levenshtein_similarity, Levenshtein};
pub use rouge::{rouge_l, RougeL, RougeLScore};
pub use semantic::SemanticSimilarity;

/// Names of the built-in heuristics, for configuration and the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeuristicKind {
    Levenshtein,
    Jaccard,
    Cosine,
    Bleu,
    RougeL,
    FuzzyMatch,
    SemanticSimilarity,
    ExactMatch,
    Contains,
}

impl HeuristicKind {
    pub const ALL: [HeuristicKind; 9] = [
        HeuristicKind::Levenshtein,
        HeuristicKind::Jaccard,
        HeuristicKind::Cosine,
        HeuristicKind::Bleu,
        HeuristicKind::RougeL,
        HeuristicKind::FuzzyMatch,
        HeuristicKind::SemanticSimilarity,
        HeuristicKind::ExactMatch,
        HeuristicKind::Contains,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HeuristicKind::Levenshtein => "levenshtein",
            HeuristicKind::Jaccard => "jaccard",
            HeuristicKind::Cosine => "cosine",
            HeuristicKind::Bleu => "bleu",
            HeuristicKind::RougeL => "rouge_l",
            HeuristicKind::FuzzyMatch => "fuzzy_match",
            HeuristicKind::SemanticSimilarity => "semantic_similarity",
            HeuristicKind::ExactMatch => "exact_match",
            HeuristicKind::Contains => "contains",
        }
    }
}

impl fmt::Display for HeuristicKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a heuristic name does not match any [`HeuristicKind`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown heuristic metric: {0}")]
pub struct UnknownHeuristic(pub String);

impl FromStr for HeuristicKind {
    type Err = UnknownHeuristic;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        HeuristicKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == wanted)
            .ok_or_else(|| UnknownHeuristic(s.to_string()))
    }
}

/// Build a heuristic metric with its default settings.
pub fn build(kind: HeuristicKind) -> MetricRef {
    match kind {
        HeuristicKind::Levenshtein => Arc::new(Levenshtein::new()),
        HeuristicKind::Jaccard => Arc::new(Jaccard::new()),
        HeuristicKind::Cosine => Arc::new(Cosine::new()),
        HeuristicKind::Bleu => Arc::new(Bleu::new()),
        HeuristicKind::RougeL => Arc::new(RougeL::new()),
        HeuristicKind::FuzzyMatch => Arc::new(FuzzyMatch::new()),
        HeuristicKind::SemanticSimilarity => Arc::new(SemanticSimilarity::new()),
        HeuristicKind::ExactMatch => Arc::new(ExactMatch::new()),
        HeuristicKind::Contains => Arc::new(Contains::new()),
    }
}

/// Whitespace tokenization shared by the n-gram and LCS metrics.
pub(crate) fn whitespace_tokens(text: &str) -> Vec<&str> {
    text.split_whitespace().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parses_its_own_name() {
        for kind in HeuristicKind::ALL {
            assert_eq!(kind.as_str().parse::<HeuristicKind>(), Ok(kind));
        }
    }

    #[test]
    fn test_kind_parse_is_lenient_about_case_and_dashes() {
        assert_eq!("ROUGE-L".parse::<HeuristicKind>(), Ok(HeuristicKind::RougeL));
        assert_eq!(
            " Fuzzy-Match ".parse::<HeuristicKind>(),
            Ok(HeuristicKind::FuzzyMatch)
        );
    }

    #[test]
    fn test_unknown_kind() {
        let err = "meteor".parse::<HeuristicKind>().unwrap_err();
        assert_eq!(err.to_string(), "unknown heuristic metric: meteor");
    }

    #[test]
    fn test_build_names_match_kind() {
        for kind in HeuristicKind::ALL {
            let metric = build(kind);
            assert!(!metric.name().is_empty(), "{kind} must have a name");
        }
        assert_eq!(build(HeuristicKind::RougeL).name(), "rouge_l");
    }

    #[test]
    fn test_kind_serde_uses_snake_case() {
        let json = serde_json::to_string(&HeuristicKind::SemanticSimilarity).unwrap();
        assert_eq!(json, "\"semantic_similarity\"");
    }
}
