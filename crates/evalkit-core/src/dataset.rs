//! Dataset evaluation: raw JSON records in, evaluation records out.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::debug;

use crate::context::EvalContext;
use crate::engine::Engine;
use crate::error::DatasetError;
use crate::input::EvalInput;
use crate::result::EvaluationResults;

pub type Result<T> = std::result::Result<T, DatasetError>;

/// One raw dataset row: a string-keyed JSON object.
pub type Record = Map<String, Value>;

/// Turns a raw record into an [`EvalInput`].
pub type Mapper = Arc<dyn Fn(&Record) -> EvalInput + Send + Sync>;

pub const DEFAULT_INPUT_KEY: &str = "input";
pub const DEFAULT_OUTPUT_KEY: &str = "output";
pub const DEFAULT_EXPECTED_KEY: &str = "expected";

fn string_field(record: &Record, key: &str) -> String {
    match record.get(key) {
        Some(Value::String(s)) => s.clone(),
        _ => String::new(),
    }
}

/// Build the standard mapper.
///
/// Reads string values at the three given keys; a key that is absent or not
/// a string maps to the empty string. The whole record is kept as metadata.
pub fn default_mapper(
    input_key: impl Into<String>,
    output_key: impl Into<String>,
    expected_key: impl Into<String>,
) -> impl Fn(&Record) -> EvalInput + Send + Sync + 'static {
    let input_key = input_key.into();
    let output_key = output_key.into();
    let expected_key = expected_key.into();

    move |record: &Record| {
        EvalInput::new(
            string_field(record, &input_key),
            string_field(record, &output_key),
        )
        .with_expected(string_field(record, &expected_key))
        .with_metadata(record.clone())
    }
}

/// Evaluates a dataset of raw records through an [`Engine`].
#[derive(Clone)]
pub struct DatasetEvaluator {
    engine: Engine,
    mapper: Mapper,
}

impl fmt::Debug for DatasetEvaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatasetEvaluator")
            .field("engine", &self.engine)
            .finish_non_exhaustive()
    }
}

impl DatasetEvaluator {
    pub fn new<F>(engine: Engine, mapper: F) -> Self
    where
        F: Fn(&Record) -> EvalInput + Send + Sync + 'static,
    {
        Self {
            engine,
            mapper: Arc::new(mapper),
        }
    }

    /// Evaluator using `input` / `output` / `expected` as field names.
    pub fn with_default_mapper(engine: Engine) -> Self {
        Self::new(
            engine,
            default_mapper(DEFAULT_INPUT_KEY, DEFAULT_OUTPUT_KEY, DEFAULT_EXPECTED_KEY),
        )
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Map every record and evaluate the batch with
    /// [`Engine::evaluate_many`]. Results follow record order.
    pub async fn evaluate(&self, ctx: &EvalContext, records: &[Record]) -> EvaluationResults {
        let inputs: Vec<EvalInput> = records.iter().map(|r| (self.mapper)(r)).collect();
        debug!(records = inputs.len(), "mapped dataset records");
        self.engine.evaluate_many(ctx, inputs).await
    }
}

/// Parse a JSON array of objects. Errors name the 0-based array position.
pub fn load_records_json(text: &str) -> Result<Vec<Record>> {
    let values: Vec<Value> = serde_json::from_str(text)?;
    values
        .into_iter()
        .enumerate()
        .map(|(index, value)| match value {
            Value::Object(record) => Ok(record),
            _ => Err(DatasetError::ElementNotAnObject { index }),
        })
        .collect()
}

/// Parse JSON Lines: one object per line. Blank lines are skipped; line
/// numbers in errors are 1-based.
pub fn load_records_jsonl(text: &str) -> Result<Vec<Record>> {
    let mut records = Vec::new();

    for (index, line) in text.lines().enumerate() {
        let line_no = index + 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let value: Value = serde_json::from_str(line).map_err(|source| DatasetError::Parse {
            line: line_no,
            source,
        })?;

        match value {
            Value::Object(record) => records.push(record),
            _ => return Err(DatasetError::NotAnObject { line: line_no }),
        }
    }

    Ok(records)
}
