// Report module - reporting backend surface and implementations

pub mod console;
pub mod memory;
pub mod streaming;

pub use console::ConsoleBackend;
pub use memory::{BackendCall, InMemoryBackend};
pub use streaming::StreamingJsonBackend;

use serde::Serialize;

use crate::error::BackendError;
use crate::state::{LogEntry, NodeId, NodeKind, RunId, Status};
use crate::time::Timestamp;

pub const OP_CREATE_RUN: &str = "create_run";
pub const OP_CREATE_NODE: &str = "create_node";
pub const OP_APPEND_LOG: &str = "append_log";
pub const OP_FINISH_NODE: &str = "finish_node";
pub const OP_FINISH_RUN: &str = "finish_run";

/// Request to open a run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewRun {
    pub name: String,
    pub description: String,
    pub start_time: Timestamp,
}

/// Request to open a node under `parent`, or directly under the run when
/// `parent` is `None`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewNode {
    pub run: RunId,
    pub parent: Option<NodeId>,
    pub name: String,
    pub kind: NodeKind,
    pub description: Option<String>,
    pub start_time: Timestamp,
}

/// Remote reporting backend.
///
/// Calls arrive synchronously and in callback order. `create_*` must return
/// the identifier before anything referencing it is issued.
pub trait ReportingBackend {
    fn create_run(&mut self, request: &NewRun) -> Result<RunId, BackendError>;

    fn create_node(&mut self, request: &NewNode) -> Result<NodeId, BackendError>;

    fn append_log(&mut self, node: &NodeId, entry: &LogEntry) -> Result<(), BackendError>;

    fn finish_node(
        &mut self,
        node: &NodeId,
        end_time: Timestamp,
        status: Status,
    ) -> Result<(), BackendError>;

    fn finish_run(&mut self, run: &RunId, end_time: Timestamp) -> Result<(), BackendError>;
}

impl<B: ReportingBackend + ?Sized> ReportingBackend for Box<B> {
    fn create_run(&mut self, request: &NewRun) -> Result<RunId, BackendError> {
        (**self).create_run(request)
    }

    fn create_node(&mut self, request: &NewNode) -> Result<NodeId, BackendError> {
        (**self).create_node(request)
    }

    fn append_log(&mut self, node: &NodeId, entry: &LogEntry) -> Result<(), BackendError> {
        (**self).append_log(node, entry)
    }

    fn finish_node(
        &mut self,
        node: &NodeId,
        end_time: Timestamp,
        status: Status,
    ) -> Result<(), BackendError> {
        (**self).finish_node(node, end_time, status)
    }

    fn finish_run(&mut self, run: &RunId, end_time: Timestamp) -> Result<(), BackendError> {
        (**self).finish_run(run, end_time)
    }
}

impl<B: ReportingBackend + ?Sized> ReportingBackend for &mut B {
    fn create_run(&mut self, request: &NewRun) -> Result<RunId, BackendError> {
        (**self).create_run(request)
    }

    fn create_node(&mut self, request: &NewNode) -> Result<NodeId, BackendError> {
        (**self).create_node(request)
    }

    fn append_log(&mut self, node: &NodeId, entry: &LogEntry) -> Result<(), BackendError> {
        (**self).append_log(node, entry)
    }

    fn finish_node(
        &mut self,
        node: &NodeId,
        end_time: Timestamp,
        status: Status,
    ) -> Result<(), BackendError> {
        (**self).finish_node(node, end_time, status)
    }

    fn finish_run(&mut self, run: &RunId, end_time: Timestamp) -> Result<(), BackendError> {
        (**self).finish_run(run, end_time)
    }
}
