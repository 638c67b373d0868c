// State module - report data model
// Runs, report nodes and the log entries attached to them

pub mod metrics;
pub mod result;

pub use metrics::RunSummary;
pub use result::{AssertionPart, CaseResult, Outcome, PartOutcome};

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::time::Timestamp;

/// Identifier the backend assigned to a run
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub String);

/// Identifier the backend assigned to a report node
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Terminal status of a closed node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Passed,
    Failed,
    Skipped,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of report node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Grouping node (root suite, test suite)
    Group,
    /// Individual test
    Case,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Group => f.write_str("group"),
            Self::Case => f.write_str("case"),
        }
    }
}

/// Log severity. The adapter only ever emits `Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
}

/// Diagnostic record attached to a case before it is closed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: Timestamp,
    pub severity: Severity,
    pub file: Option<String>,
    pub line: Option<u32>,
    pub body: String,
}

impl LogEntry {
    /// Build an error entry from an assertion location and failure summary
    pub fn failure(
        timestamp: Timestamp,
        file: Option<&str>,
        line: Option<u32>,
        summary: &str,
    ) -> Self {
        let body = format!(
            "file = {}\nline = {}\n{}",
            file.unwrap_or("unknown"),
            line.map(|l| l.to_string()).unwrap_or_else(|| "-1".to_string()),
            summary
        );
        Self {
            timestamp,
            severity: Severity::Error,
            file: file.map(str::to_string),
            line,
            body,
        }
    }
}

/// Top-level execution context
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Run {
    /// `None` when the backend failed to create the run
    pub id: Option<RunId>,
    pub name: String,
    pub description: String,
    pub start_time: Timestamp,
    pub end_time: Option<Timestamp>,
}

/// Hierarchical report unit held on the tracker's stack while open
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportNode {
    /// `None` for a detached node whose creation never reached the backend
    pub id: Option<NodeId>,
    pub name: String,
    pub kind: NodeKind,
    pub description: Option<String>,
    pub start_time: Timestamp,
    pub end_time: Option<Timestamp>,
    pub status: Option<Status>,
    /// Position on the stack, 0 for the root group
    pub depth: usize,
    children: ChildTally,
}

impl ReportNode {
    pub fn open(
        id: Option<NodeId>,
        name: impl Into<String>,
        kind: NodeKind,
        description: Option<String>,
        start_time: Timestamp,
        depth: usize,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            description,
            start_time,
            end_time: None,
            status: None,
            depth,
            children: ChildTally::default(),
        }
    }

    pub fn is_detached(&self) -> bool {
        self.id.is_none()
    }

    /// Number of children closed under this node so far
    pub fn child_count(&self) -> usize {
        self.children.passed + self.children.failed + self.children.skipped
    }

    pub(crate) fn record_child(&mut self, status: Status) {
        match status {
            Status::Passed => self.children.passed += 1,
            Status::Failed => self.children.failed += 1,
            Status::Skipped => self.children.skipped += 1,
        }
    }

    /// Status summarising the children closed so far:
    /// failed if any failed, else passed if any passed, else skipped
    pub fn aggregate_status(&self) -> Status {
        if self.children.failed > 0 {
            Status::Failed
        } else if self.children.passed > 0 {
            Status::Passed
        } else {
            Status::Skipped
        }
    }

    pub fn handle(&self) -> NodeHandle {
        NodeHandle {
            id: self.id.clone(),
            kind: self.kind,
            depth: self.depth,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
struct ChildTally {
    passed: usize,
    failed: usize,
    skipped: usize,
}

/// Reference to an open node returned by `begin_*`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeHandle {
    pub id: Option<NodeId>,
    pub kind: NodeKind,
    pub depth: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    fn epoch() -> Timestamp {
        DateTime::<Utc>::UNIX_EPOCH
    }

    #[test]
    fn test_failure_log_body() {
        let entry = LogEntry::failure(epoch(), Some("a.cc"), Some(10), "expected 1 got 2");
        assert_eq!(entry.severity, Severity::Error);
        assert_eq!(entry.file.as_deref(), Some("a.cc"));
        assert_eq!(entry.line, Some(10));
        assert_eq!(entry.body, "file = a.cc\nline = 10\nexpected 1 got 2");
    }

    #[test]
    fn test_failure_log_body_unknown_location() {
        let entry = LogEntry::failure(epoch(), None, None, "boom");
        assert_eq!(entry.body, "file = unknown\nline = -1\nboom");
        assert!(entry.file.is_none());
    }

    #[test]
    fn test_aggregate_status() {
        let mut node = ReportNode::open(None, "suite", NodeKind::Group, None, epoch(), 1);
        assert_eq!(node.aggregate_status(), Status::Skipped);

        node.record_child(Status::Skipped);
        node.record_child(Status::Passed);
        assert_eq!(node.aggregate_status(), Status::Passed);

        node.record_child(Status::Failed);
        assert_eq!(node.aggregate_status(), Status::Failed);
        assert_eq!(node.child_count(), 3);
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&Status::Skipped).unwrap();
        assert_eq!(json, "\"skipped\"");
        assert_eq!(Status::Failed.to_string(), "failed");
    }
}
