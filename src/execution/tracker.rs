// Run tracker
// Mirrors the live nesting of lifecycle callbacks as a stack of open report
// nodes and issues backend calls at each open/close boundary.

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::{AdapterError, BackendError, Result};
use crate::report::{NewNode, NewRun, ReportingBackend};
use crate::state::{LogEntry, NodeHandle, NodeKind, ReportNode, Run, RunSummary, Status};
use crate::time::{Clock, SystemClock};

pub const DEFAULT_LAUNCH_NAME: &str = "Google Test Launch";
pub const DEFAULT_ROOT_NAME: &str = "Google Test Suite";

/// Status given to a group closed without an explicit status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupStatusPolicy {
    /// Always `skipped`
    #[default]
    Skipped,
    /// Aggregate of the children closed under the group
    Propagate,
}

/// Naming and policy knobs for a tracker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerOptions {
    pub launch_name: String,
    pub root_name: String,
    pub group_status: GroupStatusPolicy,
}

impl Default for TrackerOptions {
    fn default() -> Self {
        Self {
            launch_name: DEFAULT_LAUNCH_NAME.to_string(),
            root_name: DEFAULT_ROOT_NAME.to_string(),
            group_status: GroupStatusPolicy::default(),
        }
    }
}

/// Stack-based run tracker.
///
/// Nodes are closed strictly last-opened first-closed. A node whose
/// `create_node` call failed is still pushed, detached, so the matching
/// `end_current` keeps the stack aligned with the callback sequence; detached
/// nodes and their descendants issue no backend calls.
pub struct RunTracker<B, C = SystemClock> {
    backend: B,
    clock: C,
    options: TrackerOptions,
    run: Option<Run>,
    finished: bool,
    stack: Vec<ReportNode>,
    summary: RunSummary,
}

impl<B: ReportingBackend> RunTracker<B, SystemClock> {
    pub fn new(backend: B, options: TrackerOptions) -> Self {
        Self::with_clock(backend, SystemClock, options)
    }
}

impl<B: ReportingBackend, C: Clock> RunTracker<B, C> {
    pub fn with_clock(backend: B, clock: C, options: TrackerOptions) -> Self {
        Self {
            backend,
            clock,
            options,
            run: None,
            finished: false,
            stack: Vec::new(),
            summary: RunSummary::default(),
        }
    }

    /// Open the run and its root group
    pub fn begin_run(&mut self, description: impl Into<String>) -> Result<&Run> {
        if self.run.is_some() {
            return Err(violation("begin_run called more than once"));
        }

        let request = NewRun {
            name: self.options.launch_name.clone(),
            description: description.into(),
            start_time: self.clock.now(),
        };
        let created = self.backend.create_run(&request);
        debug!(name = %request.name, ok = created.is_ok(), "create_run");

        let (id, run_err) = split(created);
        self.run = Some(Run {
            id,
            name: request.name,
            description: request.description,
            start_time: request.start_time,
            end_time: None,
        });

        let root_name = self.options.root_name.clone();
        let root_result = self.open_node(root_name, NodeKind::Group, None);

        if let Some(err) = run_err {
            return Err(err.into());
        }
        root_result?;

        self.run
            .as_ref()
            .ok_or_else(|| violation("run vanished while opening the root group"))
    }

    /// Open a group under the current node
    pub fn begin_group(
        &mut self,
        name: impl Into<String>,
        description: Option<String>,
    ) -> Result<NodeHandle> {
        self.open_node(name.into(), NodeKind::Group, description)
    }

    /// Open a case under the current node
    pub fn begin_case(
        &mut self,
        name: impl Into<String>,
        description: Option<String>,
    ) -> Result<NodeHandle> {
        self.open_node(name.into(), NodeKind::Case, description)
    }

    fn open_node(
        &mut self,
        name: String,
        kind: NodeKind,
        description: Option<String>,
    ) -> Result<NodeHandle> {
        let run = match &self.run {
            Some(run) if !self.finished => run,
            _ => return Err(violation(format!("cannot open {} {:?}: no open run", kind, name))),
        };

        let parent = self.stack.last();
        if let Some(parent) = parent
            && parent.kind == NodeKind::Case
        {
            return Err(violation(format!(
                "cannot open {} {:?} inside case {:?}",
                kind, name, parent.name
            )));
        }
        if parent.is_none() && kind != NodeKind::Group {
            return Err(violation(format!("cannot open {} {:?} as root", kind, name)));
        }

        let depth = self.stack.len();
        let start_time = self.clock.now();
        let parent_id = parent.and_then(|p| p.id.clone());
        let attached = run.id.is_some() && (parent.is_none() || parent_id.is_some());

        let mut backend_err = None;
        let id = match (&run.id, attached) {
            (Some(run_id), true) => {
                let request = NewNode {
                    run: run_id.clone(),
                    parent: parent_id,
                    name: name.clone(),
                    kind,
                    description: description.clone(),
                    start_time,
                };
                let (id, err) = split(self.backend.create_node(&request));
                backend_err = err;
                id
            }
            _ => None,
        };

        let node = ReportNode::open(id, name, kind, description, start_time, depth);
        debug!(
            depth,
            kind = %node.kind,
            name = %node.name,
            detached = node.is_detached(),
            "opened node"
        );
        let handle = node.handle();
        self.stack.push(node);

        match backend_err {
            Some(err) => Err(err.into()),
            None => Ok(handle),
        }
    }

    /// Close the node on top of the stack.
    ///
    /// Without an explicit status a case closes `skipped` and a group closes
    /// according to the configured [`GroupStatusPolicy`]. Log entries are
    /// sent in the order given, before the node is finished.
    pub fn end_current(&mut self, status: Option<Status>, logs: Vec<LogEntry>) -> Result<()> {
        match self.stack.len() {
            0 => return Err(violation("end_current called with no open node")),
            1 => {
                return Err(violation(
                    "end_current would close the root group; use end_run",
                ));
            }
            _ => {}
        }

        let Some(node) = self.stack.pop() else {
            return Err(violation("end_current called with no open node"));
        };
        self.close_node(node, status, logs)
    }

    /// Close the root group and the run
    pub fn end_run(&mut self) -> Result<RunSummary> {
        if self.run.is_none() || self.finished {
            return Err(violation("end_run called with no open run"));
        }
        if self.stack.len() != 1 {
            let open: Vec<&str> = self.stack.iter().skip(1).map(|n| n.name.as_str()).collect();
            return Err(violation(format!(
                "end_run called with {} node(s) still open: {}",
                open.len(),
                open.join(" > ")
            )));
        }

        let mut first_err = None;
        if let Some(root) = self.stack.pop()
            && let Err(err) = self.close_node(root, None, Vec::new())
        {
            first_err = Some(err);
        }

        let end_time = self.clock.now();
        self.finished = true;
        if let Some(run) = self.run.as_mut() {
            run.end_time = Some(end_time);
            self.summary.set_duration(end_time - run.start_time);
            if let Some(id) = &run.id {
                let result = self.backend.finish_run(id, end_time);
                debug!(run = %id, ok = result.is_ok(), "finish_run");
                if let Err(err) = result {
                    first_err.get_or_insert(err.into());
                }
            }
        }

        match first_err {
            Some(err) => Err(err),
            None => Ok(self.summary.clone()),
        }
    }

    fn close_node(
        &mut self,
        mut node: ReportNode,
        status: Option<Status>,
        logs: Vec<LogEntry>,
    ) -> Result<()> {
        let status = status.unwrap_or_else(|| match (node.kind, self.options.group_status) {
            (NodeKind::Group, GroupStatusPolicy::Propagate) => node.aggregate_status(),
            _ => Status::Skipped,
        });
        let end_time = self.clock.now();
        node.end_time = Some(end_time);
        node.status = Some(status);

        if let Some(parent) = self.stack.last_mut() {
            parent.record_child(status);
        }
        self.summary.record_close(node.kind, status, logs.len());

        debug!(
            depth = node.depth,
            kind = %node.kind,
            name = %node.name,
            %status,
            logs = logs.len(),
            "closing node"
        );

        let Some(id) = &node.id else {
            return Ok(());
        };

        let mut first_err: Option<BackendError> = None;
        for entry in &logs {
            if let Err(err) = self.backend.append_log(id, entry) {
                first_err = Some(err);
                break;
            }
        }
        if let Err(err) = self.backend.finish_node(id, end_time, status) {
            first_err.get_or_insert(err);
        }

        match first_err {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }

    /// Number of open nodes, root included
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn current(&self) -> Option<&ReportNode> {
        self.stack.last()
    }

    /// Names of the open nodes from the root to the current node
    pub fn open_path(&self) -> Vec<&str> {
        self.stack.iter().map(|n| n.name.as_str()).collect()
    }

    pub fn run(&self) -> Option<&Run> {
        self.run.as_ref()
    }

    pub fn is_running(&self) -> bool {
        self.run.is_some() && !self.finished
    }

    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }
}

fn split<T>(result: std::result::Result<T, BackendError>) -> (Option<T>, Option<BackendError>) {
    match result {
        Ok(value) => (Some(value), None),
        Err(err) => (None, Some(err)),
    }
}

fn violation(message: impl Into<String>) -> AdapterError {
    let err = AdapterError::protocol(message);
    error!("{}", err);
    err
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::InMemoryBackend;
    use crate::time::ManualClock;

    fn tracker() -> RunTracker<InMemoryBackend, ManualClock> {
        RunTracker::with_clock(
            InMemoryBackend::new(),
            ManualClock::epoch(),
            TrackerOptions::default(),
        )
    }

    #[test]
    fn test_begin_run_pushes_root() {
        let mut tracker = tracker();
        let run = tracker.begin_run("desc").unwrap();
        assert_eq!(run.name, DEFAULT_LAUNCH_NAME);
        assert_eq!(run.description, "desc");
        assert_eq!(tracker.depth(), 1);
        assert_eq!(tracker.open_path(), vec![DEFAULT_ROOT_NAME]);
    }

    #[test]
    fn test_begin_run_twice_is_protocol_error() {
        let mut tracker = tracker();
        tracker.begin_run("first").unwrap();
        let err = tracker.begin_run("second").unwrap_err();
        assert!(matches!(err, AdapterError::Protocol { .. }));
        assert_eq!(tracker.depth(), 1);
    }

    #[test]
    fn test_begin_group_without_run() {
        let mut tracker = tracker();
        let err = tracker.begin_group("suite", None).unwrap_err();
        assert!(matches!(err, AdapterError::Protocol { .. }));
        assert_eq!(tracker.depth(), 0);
    }

    #[test]
    fn test_case_inside_case_rejected() {
        let mut tracker = tracker();
        tracker.begin_run("").unwrap();
        tracker.begin_case("outer", None).unwrap();
        let err = tracker.begin_case("inner", None).unwrap_err();
        assert!(matches!(err, AdapterError::Protocol { .. }));
        assert_eq!(tracker.depth(), 2);
    }

    #[test]
    fn test_end_current_cannot_close_root() {
        let mut tracker = tracker();
        tracker.begin_run("").unwrap();
        let err = tracker.end_current(None, Vec::new()).unwrap_err();
        assert!(matches!(err, AdapterError::Protocol { .. }));
        assert_eq!(tracker.depth(), 1);
    }

    #[test]
    fn test_case_default_status_is_skipped() {
        let mut tracker = tracker();
        tracker.begin_run("").unwrap();
        tracker.begin_case("case", None).unwrap();
        tracker.end_current(None, Vec::new()).unwrap();
        assert_eq!(
            tracker.backend().finished(NodeKind::Case),
            vec![Status::Skipped]
        );
    }

    #[test]
    fn test_propagate_group_status() {
        let mut tracker = RunTracker::with_clock(
            InMemoryBackend::new(),
            ManualClock::epoch(),
            TrackerOptions {
                group_status: GroupStatusPolicy::Propagate,
                ..TrackerOptions::default()
            },
        );
        tracker.begin_run("").unwrap();
        tracker.begin_group("suite", None).unwrap();
        tracker.begin_case("a", None).unwrap();
        tracker.end_current(Some(Status::Passed), Vec::new()).unwrap();
        tracker.begin_case("b", None).unwrap();
        tracker.end_current(Some(Status::Failed), Vec::new()).unwrap();
        tracker.end_current(None, Vec::new()).unwrap();
        tracker.end_run().unwrap();

        assert_eq!(
            tracker.backend().finished(NodeKind::Group),
            vec![Status::Failed, Status::Failed]
        );
    }

    #[test]
    fn test_end_run_records_duration() {
        let mut tracker = tracker();
        tracker.begin_run("").unwrap();
        let summary = tracker.end_run().unwrap();
        assert_eq!(summary.groups, 1);
        assert!(summary.duration_ms > 0);
        assert!(!tracker.is_running());
        assert!(tracker.run().and_then(|r| r.end_time).is_some());
    }
}
