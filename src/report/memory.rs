// In-memory backend - records every call in order

use std::collections::HashSet;

use super::{
    NewNode, NewRun, OP_APPEND_LOG, OP_CREATE_NODE, OP_CREATE_RUN, OP_FINISH_NODE, OP_FINISH_RUN,
    ReportingBackend,
};
use crate::error::BackendError;
use crate::state::{LogEntry, NodeId, NodeKind, RunId, Status};
use crate::time::Timestamp;

/// One recorded backend call
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    CreateRun {
        id: RunId,
        request: NewRun,
    },
    CreateNode {
        id: NodeId,
        request: NewNode,
    },
    AppendLog {
        node: NodeId,
        entry: LogEntry,
    },
    FinishNode {
        node: NodeId,
        end_time: Timestamp,
        status: Status,
    },
    FinishRun {
        run: RunId,
        end_time: Timestamp,
    },
}

impl BackendCall {
    pub fn operation(&self) -> &'static str {
        match self {
            Self::CreateRun { .. } => OP_CREATE_RUN,
            Self::CreateNode { .. } => OP_CREATE_NODE,
            Self::AppendLog { .. } => OP_APPEND_LOG,
            Self::FinishNode { .. } => OP_FINISH_NODE,
            Self::FinishRun { .. } => OP_FINISH_RUN,
        }
    }
}

/// Backend that keeps the full call history.
///
/// Rejects calls that reference unknown ids or finish something twice, so a
/// misbehaving tracker shows up as a `BackendError`.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    calls: Vec<BackendCall>,
    next_id: usize,
    open_runs: HashSet<RunId>,
    open_nodes: HashSet<NodeId>,
    failures: Vec<&'static str>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next call of `operation` fail with `BackendError::Rejected`
    pub fn fail_next(&mut self, operation: &'static str) {
        self.failures.push(operation);
    }

    pub fn calls(&self) -> &[BackendCall] {
        &self.calls
    }

    pub fn operations(&self) -> Vec<&'static str> {
        self.calls.iter().map(BackendCall::operation).collect()
    }

    /// Names of created nodes of the given kind, in creation order
    pub fn created(&self, kind: NodeKind) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                BackendCall::CreateNode { request, .. } if request.kind == kind => {
                    Some(request.name.as_str())
                }
                _ => None,
            })
            .collect()
    }

    /// Statuses passed to `finish_node` for nodes of the given kind, in order
    pub fn finished(&self, kind: NodeKind) -> Vec<Status> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                BackendCall::FinishNode { node, status, .. }
                    if self.kind_of(node) == Some(kind) =>
                {
                    Some(*status)
                }
                _ => None,
            })
            .collect()
    }

    /// Log entries in emission order, paired with the node they belong to
    pub fn logs(&self) -> Vec<(&NodeId, &LogEntry)> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                BackendCall::AppendLog { node, entry } => Some((node, entry)),
                _ => None,
            })
            .collect()
    }

    /// Request that created `node`
    pub fn node(&self, node: &NodeId) -> Option<&NewNode> {
        self.calls.iter().find_map(|call| match call {
            BackendCall::CreateNode { id, request } if id == node => Some(request),
            _ => None,
        })
    }

    fn kind_of(&self, node: &NodeId) -> Option<NodeKind> {
        self.node(node).map(|request| request.kind)
    }

    pub fn open_node_count(&self) -> usize {
        self.open_nodes.len()
    }

    fn check_failure(&mut self, operation: &'static str) -> Result<(), BackendError> {
        if let Some(pos) = self.failures.iter().position(|op| *op == operation) {
            self.failures.remove(pos);
            return Err(BackendError::rejected(operation, "injected failure"));
        }
        Ok(())
    }

    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{}", prefix, self.next_id)
    }

    fn require_open_node(&self, node: &NodeId) -> Result<(), BackendError> {
        if self.open_nodes.contains(node) {
            Ok(())
        } else {
            Err(BackendError::UnknownId {
                kind: "open node",
                id: node.0.clone(),
            })
        }
    }
}

impl ReportingBackend for InMemoryBackend {
    fn create_run(&mut self, request: &NewRun) -> Result<RunId, BackendError> {
        self.check_failure(OP_CREATE_RUN)?;
        let id = RunId(self.next_id("run"));
        self.open_runs.insert(id.clone());
        self.calls.push(BackendCall::CreateRun {
            id: id.clone(),
            request: request.clone(),
        });
        Ok(id)
    }

    fn create_node(&mut self, request: &NewNode) -> Result<NodeId, BackendError> {
        self.check_failure(OP_CREATE_NODE)?;
        if !self.open_runs.contains(&request.run) {
            return Err(BackendError::UnknownId {
                kind: "open run",
                id: request.run.0.clone(),
            });
        }
        if let Some(parent) = &request.parent {
            self.require_open_node(parent)?;
        }
        let id = NodeId(self.next_id("node"));
        self.open_nodes.insert(id.clone());
        self.calls.push(BackendCall::CreateNode {
            id: id.clone(),
            request: request.clone(),
        });
        Ok(id)
    }

    fn append_log(&mut self, node: &NodeId, entry: &LogEntry) -> Result<(), BackendError> {
        self.check_failure(OP_APPEND_LOG)?;
        self.require_open_node(node)?;
        self.calls.push(BackendCall::AppendLog {
            node: node.clone(),
            entry: entry.clone(),
        });
        Ok(())
    }

    fn finish_node(
        &mut self,
        node: &NodeId,
        end_time: Timestamp,
        status: Status,
    ) -> Result<(), BackendError> {
        self.check_failure(OP_FINISH_NODE)?;
        self.require_open_node(node)?;
        self.open_nodes.remove(node);
        self.calls.push(BackendCall::FinishNode {
            node: node.clone(),
            end_time,
            status,
        });
        Ok(())
    }

    fn finish_run(&mut self, run: &RunId, end_time: Timestamp) -> Result<(), BackendError> {
        self.check_failure(OP_FINISH_RUN)?;
        if !self.open_runs.remove(run) {
            return Err(BackendError::UnknownId {
                kind: "open run",
                id: run.0.clone(),
            });
        }
        self.calls.push(BackendCall::FinishRun {
            run: run.clone(),
            end_time,
        });
        Ok(())
    }
}
