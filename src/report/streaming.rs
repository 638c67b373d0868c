use serde_json::json;
use std::io::{self, Write};
use uuid::Uuid;

use super::{NewNode, NewRun, ReportingBackend};
use crate::error::BackendError;
use crate::state::{LogEntry, NodeId, RunId, Status};
use crate::time::Timestamp;

/// Backend that writes each call as one JSON line.
///
/// Lines are flushed as they are written so a consumer sees calls in callback
/// order even if the process dies mid-run.
pub struct StreamingJsonBackend<W: Write> {
    writer: W,
}

impl StreamingJsonBackend<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> StreamingJsonBackend<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn emit(&mut self, event: &serde_json::Value) -> Result<(), BackendError> {
        serde_json::to_writer(&mut self.writer, event)?;
        writeln!(self.writer)?;
        self.writer.flush()?;
        Ok(())
    }
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

impl<W: Write> ReportingBackend for StreamingJsonBackend<W> {
    fn create_run(&mut self, request: &NewRun) -> Result<RunId, BackendError> {
        let id = RunId(new_id());
        self.emit(&json!({
            "event": "create_run",
            "id": id,
            "name": request.name,
            "description": request.description,
            "startTime": request.start_time.to_rfc3339(),
        }))?;
        Ok(id)
    }

    fn create_node(&mut self, request: &NewNode) -> Result<NodeId, BackendError> {
        let id = NodeId(new_id());
        let mut event = json!({
            "event": "create_node",
            "id": id,
            "run": request.run,
            "parent": request.parent,
            "name": request.name,
            "kind": request.kind,
            "startTime": request.start_time.to_rfc3339(),
        });
        if let Some(description) = &request.description {
            event["description"] = json!(description);
        }
        self.emit(&event)?;
        Ok(id)
    }

    fn append_log(&mut self, node: &NodeId, entry: &LogEntry) -> Result<(), BackendError> {
        self.emit(&json!({
            "event": "append_log",
            "node": node,
            "timestamp": entry.timestamp.to_rfc3339(),
            "severity": entry.severity,
            "file": entry.file,
            "line": entry.line,
            "body": entry.body,
        }))
    }

    fn finish_node(
        &mut self,
        node: &NodeId,
        end_time: Timestamp,
        status: Status,
    ) -> Result<(), BackendError> {
        self.emit(&json!({
            "event": "finish_node",
            "node": node,
            "endTime": end_time.to_rfc3339(),
            "status": status,
        }))
    }

    fn finish_run(&mut self, run: &RunId, end_time: Timestamp) -> Result<(), BackendError> {
        self.emit(&json!({
            "event": "finish_run",
            "run": run,
            "endTime": end_time.to_rfc3339(),
        }))
    }
}
