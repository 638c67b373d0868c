// Structured case results as reported by the test runner

use serde::{Deserialize, Deserializer, Serialize};
use std::str::FromStr;

use crate::error::AdapterError;

/// Overall outcome of a finished case
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Passed,
    Failed,
    Skipped,
}

impl FromStr for Outcome {
    type Err = AdapterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "passed" => Ok(Self::Passed),
            "failed" => Ok(Self::Failed),
            "skipped" => Ok(Self::Skipped),
            other => Err(AdapterError::unrecognized_outcome(other)),
        }
    }
}

/// Outcome of a single assertion part
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartOutcome {
    Passed,
    /// Non-fatal failure (`EXPECT_*`)
    Failed,
    /// Fatal failure (`ASSERT_*`)
    FatalFailure,
    Skipped,
}

impl PartOutcome {
    pub fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }
}

impl FromStr for PartOutcome {
    type Err = AdapterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "passed" | "success" => Ok(Self::Passed),
            "failed" | "nonfatal_failure" => Ok(Self::Failed),
            "fatal_failure" => Ok(Self::FatalFailure),
            "skipped" | "skip" => Ok(Self::Skipped),
            other => Err(AdapterError::unrecognized_outcome(other)),
        }
    }
}

/// Source line as the runner reports it; gtest uses `-1` for "no location"
pub(crate) fn deserialize_line<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let line = Option::<i64>::deserialize(deserializer)?;
    Ok(line.and_then(|l| u32::try_from(l).ok()))
}

/// One assertion record inside a case result.
///
/// The outcome stays in its raw runner spelling until the deriver inspects it,
/// so that a version mismatch surfaces as `UnrecognizedOutcome` rather than a
/// decode failure far from the case it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionPart {
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default, deserialize_with = "deserialize_line")]
    pub line: Option<u32>,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub message: String,
    pub outcome: String,
}

impl AssertionPart {
    pub fn new(outcome: impl Into<String>) -> Self {
        Self {
            file: None,
            line: None,
            summary: String::new(),
            message: String::new(),
            outcome: outcome.into(),
        }
    }

    pub fn at(mut self, file: impl Into<String>, line: u32) -> Self {
        self.file = Some(file.into());
        self.line = Some(line);
        self
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn parsed_outcome(&self) -> Result<PartOutcome, AdapterError> {
        self.outcome.parse()
    }
}

/// Result delivered with `case-end`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseResult {
    pub outcome: String,
    #[serde(default)]
    pub parts: Vec<AssertionPart>,
}

impl CaseResult {
    pub fn new(outcome: impl Into<String>, parts: Vec<AssertionPart>) -> Self {
        Self {
            outcome: outcome.into(),
            parts,
        }
    }

    pub fn passed() -> Self {
        Self::new("passed", Vec::new())
    }

    pub fn skipped() -> Self {
        Self::new("skipped", Vec::new())
    }

    pub fn failed(parts: Vec<AssertionPart>) -> Self {
        Self::new("failed", parts)
    }

    pub fn parsed_outcome(&self) -> Result<Outcome, AdapterError> {
        self.outcome.parse()
    }
}
