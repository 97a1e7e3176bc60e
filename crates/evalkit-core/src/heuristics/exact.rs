//! Exact and substring matching.

use async_trait::async_trait;

use crate::context::EvalContext;
use crate::input::EvalInput;
use crate::metric::Metric;
use crate::score::Score;

fn normalize(text: &str, trim: bool, case_sensitive: bool) -> String {
    let text = if trim { text.trim() } else { text };
    if case_sensitive {
        text.to_string()
    } else {
        text.to_lowercase()
    }
}

/// 1.0 when `output` equals `expected`, otherwise 0.0.
#[derive(Debug, Clone)]
pub struct ExactMatch {
    name: String,
    trim: bool,
    case_sensitive: bool,
}

impl Default for ExactMatch {
    fn default() -> Self {
        Self::new()
    }
}

impl ExactMatch {
    pub fn new() -> Self {
        Self {
            name: "exact_match".to_string(),
            trim: true,
            case_sensitive: true,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Ignore leading and trailing whitespace (on by default).
    pub fn trim(mut self, trim: bool) -> Self {
        self.trim = trim;
        self
    }

    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }
}

#[async_trait]
impl Metric for ExactMatch {
    fn name(&self) -> &str {
        &self.name
    }

    async fn score(&self, _ctx: &EvalContext, input: &EvalInput) -> Score {
        let output = normalize(input.output(), self.trim, self.case_sensitive);
        let expected = normalize(input.expected(), self.trim, self.case_sensitive);
        if output == expected {
            Score::new(&self.name, 1.0).with_reason("output matches expected")
        } else {
            Score::new(&self.name, 0.0).with_reason("output differs from expected")
        }
    }
}

/// 1.0 when `output` contains `expected` as a substring, otherwise 0.0.
#[derive(Debug, Clone)]
pub struct Contains {
    name: String,
    case_sensitive: bool,
}

impl Default for Contains {
    fn default() -> Self {
        Self::new()
    }
}

impl Contains {
    pub fn new() -> Self {
        Self {
            name: "contains".to_string(),
            case_sensitive: true,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }
}

#[async_trait]
impl Metric for Contains {
    fn name(&self) -> &str {
        &self.name
    }

    async fn score(&self, _ctx: &EvalContext, input: &EvalInput) -> Score {
        let output = normalize(input.output(), false, self.case_sensitive);
        let expected = normalize(input.expected(), false, self.case_sensitive);
        if output.contains(&expected) {
            Score::new(&self.name, 1.0).with_reason("output contains expected")
        } else {
            Score::new(&self.name, 0.0).with_reason("expected not found in output")
        }
    }
}
