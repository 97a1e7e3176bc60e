//! Per-item evaluation records and cross-item aggregation.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EvalError;
use crate::input::EvalInput;
use crate::score::{mean, Score, Scores};

/// All scores produced for one input item.
///
/// Success is decided by the engine alone (cancellation, task failure).
/// Individual failed scores do not fail the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub item_id: String,
    pub input: EvalInput,
    pub scores: Scores,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<EvalError>,
}

impl EvaluationResult {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// First score with the given metric name.
    pub fn score(&self, name: &str) -> Option<&Score> {
        self.scores.get(name)
    }
}

/// Ordered collection of evaluation records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EvaluationResults(Vec<EvaluationResult>);

impl EvaluationResults {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, EvaluationResult> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[EvaluationResult] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<EvaluationResult> {
        self.0
    }

    /// Record with the given item id, if present.
    pub fn get(&self, item_id: &str) -> Option<&EvaluationResult> {
        self.0.iter().find(|r| r.item_id == item_id)
    }

    pub fn successful(&self) -> EvaluationResults {
        self.0.iter().filter(|r| r.is_success()).cloned().collect()
    }

    pub fn failed(&self) -> EvaluationResults {
        self.0.iter().filter(|r| !r.is_success()).cloned().collect()
    }

    /// Cross-item average for one metric.
    ///
    /// Each item contributes at most once: its first score named `name`,
    /// and only when that score succeeded. Returns 0.0 when no item
    /// contributes.
    pub fn average_by_metric(&self, name: &str) -> f64 {
        mean(
            self.0
                .iter()
                .filter_map(|r| r.scores.get(name))
                .filter(|s| s.is_success())
                .map(|s| s.value),
        )
    }

    /// Every metric name seen in the collection mapped to its cross-item average.
    pub fn summary(&self) -> BTreeMap<String, f64> {
        let names: BTreeSet<&str> = self
            .0
            .iter()
            .flat_map(|r| r.scores.iter().map(|s| s.name.as_str()))
            .collect();

        names
            .into_iter()
            .map(|name| (name.to_string(), self.average_by_metric(name)))
            .collect()
    }

    /// Serializable roll-up of the collection.
    pub fn report(&self) -> EvalReport {
        let succeeded = self.0.iter().filter(|r| r.is_success()).count();
        EvalReport {
            total: self.0.len(),
            succeeded,
            failed: self.0.len() - succeeded,
            averages: self.summary(),
            generated_at: Utc::now(),
        }
    }
}

/// Aggregate summary of a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalReport {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub averages: BTreeMap<String, f64>,
    pub generated_at: DateTime<Utc>,
}

impl From<Vec<EvaluationResult>> for EvaluationResults {
    fn from(results: Vec<EvaluationResult>) -> Self {
        Self(results)
    }
}

impl FromIterator<EvaluationResult> for EvaluationResults {
    fn from_iter<I: IntoIterator<Item = EvaluationResult>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for EvaluationResults {
    type Item = EvaluationResult;
    type IntoIter = std::vec::IntoIter<EvaluationResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a EvaluationResults {
    type Item = &'a EvaluationResult;
    type IntoIter = std::slice::Iter<'a, EvaluationResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, scores: Vec<Score>, error: Option<EvalError>) -> EvaluationResult {
        EvaluationResult {
            item_id: id.to_string(),
            input: EvalInput::default(),
            scores: scores.into(),
            error,
        }
    }

    fn sample() -> EvaluationResults {
        vec![
            record(
                "item-0",
                vec![Score::new("bleu", 0.6), Score::new("rouge_l", 1.0)],
                None,
            ),
            record(
                "item-1",
                vec![
                    Score::new("bleu", 0.2),
                    // Later duplicates are ignored by the cross-item average.
                    Score::new("bleu", 1.0),
                ],
                None,
            ),
            record(
                "item-2",
                vec![Score::failed("bleu", EvalError::metric("bleu", "boom"))],
                Some(EvalError::Cancelled),
            ),
        ]
        .into()
    }

    #[test]
    fn test_partition_by_record_error() {
        let results = sample();
        assert_eq!(results.successful().len(), 2);
        assert_eq!(results.failed().len(), 1);
        assert_eq!(results.failed().as_slice()[0].item_id, "item-2");
    }

    #[test]
    fn test_average_by_metric_uses_first_match_and_skips_failures() {
        let results = sample();
        assert!((results.average_by_metric("bleu") - 0.4).abs() < 1e-12);
        assert_eq!(results.average_by_metric("rouge_l"), 1.0);
        assert_eq!(results.average_by_metric("missing"), 0.0);
    }

    #[test]
    fn test_summary_covers_every_metric_name() {
        let summary = sample().summary();
        assert_eq!(summary.len(), 2);
        assert!((summary["bleu"] - 0.4).abs() < 1e-12);
        assert_eq!(summary["rouge_l"], 1.0);
    }

    #[test]
    fn test_report_counts() {
        let report = sample().report();
        assert_eq!(report.total, 3);
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.averages, sample().summary());
    }

    #[test]
    fn test_empty_collection() {
        let results = EvaluationResults::default();
        assert!(results.summary().is_empty());
        assert_eq!(results.average_by_metric("bleu"), 0.0);
        assert_eq!(results.report().total, 0);
    }
}
