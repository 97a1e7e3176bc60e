//! Error taxonomy for evaluation records and dataset loading.

use serde::{Deserialize, Serialize};

/// Errors carried on [`Score`](crate::Score) and
/// [`EvaluationResult`](crate::EvaluationResult) records.
///
/// Records are cloned freely (progress callbacks, reports), so the variants
/// hold owned strings rather than boxed sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EvalError {
    #[error("evaluation cancelled")]
    Cancelled,

    #[error("metric {metric} failed: {message}")]
    MetricFailed { metric: String, message: String },

    #[error("evaluation task failed: {message}")]
    TaskFailed { message: String },
}

impl EvalError {
    /// Shorthand for a metric-level failure.
    pub fn metric(metric: impl Into<String>, message: impl Into<String>) -> Self {
        EvalError::MetricFailed {
            metric: metric.into(),
            message: message.into(),
        }
    }
}

/// Errors produced while loading raw dataset records.
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("line {line}: invalid JSON: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("line {line}: record is not a JSON object")]
    NotAnObject { line: usize },

    /// A JSON-array dataset holds a non-object at this 0-based position.
    #[error("array element {index}: record is not a JSON object")]
    ElementNotAnObject { index: usize },

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
