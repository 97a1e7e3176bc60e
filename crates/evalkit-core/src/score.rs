//! Per-metric score records and their ordered collection.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::EvalError;

/// The outcome of one metric applied to one input.
///
/// A score is successful iff `error` is `None`. When `error` is set the
/// `value` carries no meaning and the score is excluded from every average.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Score {
    /// Name of the metric that produced this score.
    pub name: String,
    /// Numeric result, usually in 0.0–1.0.
    pub value: f64,
    /// Human-readable explanation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Metric-specific details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
    /// Set when the metric failed to produce a value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<EvalError>,
}

impl Score {
    /// A successful score.
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
            reason: None,
            metadata: None,
            error: None,
        }
    }

    /// A failed score. The value is zeroed but must not be read.
    pub fn failed(name: impl Into<String>, error: EvalError) -> Self {
        Self {
            error: Some(error),
            ..Self::new(name, 0.0)
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Ordered sequence of scores, usually one per registered metric.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Scores(Vec<Score>);

impl Scores {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, score: Score) {
        self.0.push(score);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Score> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Score] {
        &self.0
    }

    /// First score with the given name.
    pub fn get(&self, name: &str) -> Option<&Score> {
        self.0.iter().find(|s| s.name == name)
    }

    /// Scores without an error, in order.
    pub fn successful(&self) -> Scores {
        self.0.iter().filter(|s| s.is_success()).cloned().collect()
    }

    /// Scores with an error, in order.
    pub fn failed(&self) -> Scores {
        self.0.iter().filter(|s| !s.is_success()).cloned().collect()
    }

    /// Mean value of the successful scores; 0.0 when none succeeded.
    pub fn average(&self) -> f64 {
        mean(self.0.iter().filter(|s| s.is_success()).map(|s| s.value))
    }

    /// Mean value of the successful scores named `name`; 0.0 when none.
    pub fn average_by_name(&self, name: &str) -> f64 {
        mean(
            self.0
                .iter()
                .filter(|s| s.is_success() && s.name == name)
                .map(|s| s.value),
        )
    }
}

pub(crate) fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

impl From<Vec<Score>> for Scores {
    fn from(scores: Vec<Score>) -> Self {
        Self(scores)
    }
}

impl FromIterator<Score> for Scores {
    fn from_iter<I: IntoIterator<Item = Score>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Scores {
    type Item = Score;
    type IntoIter = std::vec::IntoIter<Score>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Scores {
    type Item = &'a Score;
    type IntoIter = std::slice::Iter<'a, Score>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
