//! evalkit core library
//!
//! Scores model outputs with pluggable metrics: text heuristics, metric
//! combinators, and an engine that evaluates batches sequentially or with
//! bounded concurrency.

pub mod context;
pub mod counters;
pub mod dataset;
pub mod engine;
pub mod error;
pub mod heuristics;
pub mod input;
pub mod metric;
pub mod obs;
pub mod result;
pub mod score;
pub mod telemetry;

pub use context::{CancelHandle, EvalContext};
pub use counters::{EvalCounters, EVAL_COUNTERS};
pub use dataset::{
    default_mapper, load_records_json, load_records_jsonl, DatasetEvaluator, Mapper, Record,
};
pub use engine::{Engine, EngineConfig, ProgressCallback};
pub use error::{DatasetError, EvalError};
pub use heuristics::{
    Bleu, Contains, Cosine, ExactMatch, FuzzyMatch, HeuristicKind, Jaccard, Levenshtein, RougeL,
    SemanticSimilarity, TokenGranularity, UnknownHeuristic,
};
pub use input::EvalInput;
pub use metric::{CompositeMetric, ConditionalMetric, FnMetric, Metric, MetricRef, WeightedMetric};
pub use result::{EvalReport, EvaluationResult, EvaluationResults};
pub use score::{Score, Scores};
pub use telemetry::init_tracing;

/// Crate version, as reported by the CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
