//! The per-item input record handed to every metric.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One item to evaluate: the prompt, the model output, an optional
/// reference answer and retrieval context, plus free-form metadata.
///
/// `EvalInput` is an immutable value. Every `with_*` method returns a
/// modified copy and leaves the receiver untouched; the metadata map sits
/// behind an `Arc`, so copies are cheap and an instance can be shared across
/// evaluation tasks without locking.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvalInput {
    #[serde(default)]
    input: String,
    #[serde(default)]
    output: String,
    #[serde(default)]
    expected: String,
    #[serde(default)]
    context: String,
    #[serde(default)]
    metadata: Arc<Map<String, Value>>,
}

impl EvalInput {
    /// Create an input record from a prompt and the model's output.
    pub fn new(input: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            ..Self::default()
        }
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn expected(&self) -> &str {
        &self.expected
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }

    /// Look up a single metadata value.
    pub fn metadata_value(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }

    /// Copy with a different prompt.
    pub fn with_input(&self, input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            ..self.clone()
        }
    }

    /// Copy with a different model output.
    pub fn with_output(&self, output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            ..self.clone()
        }
    }

    /// Copy with a reference answer.
    pub fn with_expected(&self, expected: impl Into<String>) -> Self {
        Self {
            expected: expected.into(),
            ..self.clone()
        }
    }

    /// Copy with retrieval context.
    pub fn with_context(&self, context: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            ..self.clone()
        }
    }

    /// Copy with the metadata map replaced wholesale.
    pub fn with_metadata(&self, metadata: Map<String, Value>) -> Self {
        Self {
            metadata: Arc::new(metadata),
            ..self.clone()
        }
    }

    /// Copy with one metadata entry inserted (or overwritten).
    pub fn with_metadata_entry(&self, key: impl Into<String>, value: Value) -> Self {
        let mut metadata = (*self.metadata).clone();
        metadata.insert(key.into(), value);
        self.with_metadata(metadata)
    }
}
