// Lifecycle events - the callback sequence emitted by the test runner
// Runs contain groups, groups contain cases, cases contain assertion parts.

use serde::{Deserialize, Serialize};

use crate::state::{AssertionPart, CaseResult};

/// One lifecycle callback
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ListenerEvent {
    /// Test program started
    RunStart {
        #[serde(default)]
        description: Option<String>,
    },

    /// Test suite started
    GroupStart {
        name: String,
        #[serde(default)]
        type_param: Option<String>,
    },

    /// Individual test started
    CaseStart {
        name: String,
        #[serde(default)]
        type_param: Option<String>,
        #[serde(default)]
        value_param: Option<String>,
        #[serde(default)]
        file: Option<String>,
        #[serde(default, deserialize_with = "crate::state::result::deserialize_line")]
        line: Option<u32>,
    },

    /// Assertion recorded inside the current case
    AssertionPart(AssertionPart),

    /// Individual test finished
    CaseEnd { result: CaseResult },

    /// Test suite finished
    GroupEnd,

    /// Test program finished
    RunEnd,
}

impl ListenerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::RunStart { .. } => "run_start",
            Self::GroupStart { .. } => "group_start",
            Self::CaseStart { .. } => "case_start",
            Self::AssertionPart(_) => "assertion_part",
            Self::CaseEnd { .. } => "case_end",
            Self::GroupEnd => "group_end",
            Self::RunEnd => "run_end",
        }
    }

    /// Parse one JSON-lines record
    pub fn from_json_line(line: &str) -> serde_json::Result<Self> {
        serde_json::from_str(line)
    }
}

/// Description attached to a group node, present only for type-parameterised suites
pub fn group_description(type_param: Option<&str>) -> Option<String> {
    type_param.map(|t| format!("type_param = {}", t))
}

/// Description attached to a case node
pub fn case_description(
    type_param: Option<&str>,
    value_param: Option<&str>,
    file: Option<&str>,
    line: Option<u32>,
) -> String {
    format!(
        "type_param = {}\nvalue_param = {}\nfile = {}\nline = {}",
        type_param.unwrap_or_default(),
        value_param.unwrap_or_default(),
        file.unwrap_or_default(),
        line.map(|l| l.to_string()).unwrap_or_default()
    )
}
