// Console backend - indented tree output

use console::style;
use std::collections::HashMap;
use std::io::{self, Write};

use super::{NewNode, NewRun, ReportingBackend};
use crate::error::BackendError;
use crate::state::{LogEntry, NodeId, NodeKind, RunId, Status};
use crate::time::Timestamp;

const INDENT: &str = "  ";

struct ConsoleNode {
    name: String,
    kind: NodeKind,
    depth: usize,
    start_time: Timestamp,
    logs: Vec<String>,
}

/// Human-readable backend.
///
/// Groups print when opened, cases print one status line when finished with
/// their failure logs underneath.
pub struct ConsoleBackend<W: Write> {
    writer: W,
    next_id: usize,
    nodes: HashMap<NodeId, ConsoleNode>,
    run_start: HashMap<RunId, Timestamp>,
}

impl ConsoleBackend<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> ConsoleBackend<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            next_id: 0,
            nodes: HashMap::new(),
            run_start: HashMap::new(),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn next_id(&mut self) -> String {
        self.next_id += 1;
        self.next_id.to_string()
    }

    fn unknown_node(node: &NodeId) -> BackendError {
        BackendError::UnknownId {
            kind: "node",
            id: node.0.clone(),
        }
    }
}

fn status_label(status: Status) -> String {
    match status {
        Status::Passed => style("PASSED").green().bold().to_string(),
        Status::Failed => style("FAILED").red().bold().to_string(),
        Status::Skipped => style("SKIPPED").yellow().to_string(),
    }
}

impl<W: Write> ReportingBackend for ConsoleBackend<W> {
    fn create_run(&mut self, request: &NewRun) -> Result<RunId, BackendError> {
        let id = RunId(format!("run-{}", self.next_id()));
        writeln!(self.writer, "▶ {}", style(&request.name).bold())?;
        if !request.description.is_empty() {
            writeln!(self.writer, "{}{}", INDENT, style(&request.description).dim())?;
        }
        self.run_start.insert(id.clone(), request.start_time);
        Ok(id)
    }

    fn create_node(&mut self, request: &NewNode) -> Result<NodeId, BackendError> {
        let depth = match &request.parent {
            Some(parent) => {
                self.nodes
                    .get(parent)
                    .ok_or_else(|| Self::unknown_node(parent))?
                    .depth
                    + 1
            }
            None => 0,
        };
        let id = NodeId(format!("node-{}", self.next_id()));

        if request.kind == NodeKind::Group {
            writeln!(
                self.writer,
                "{}{}",
                INDENT.repeat(depth + 1),
                style(&request.name).cyan()
            )?;
        }

        self.nodes.insert(
            id.clone(),
            ConsoleNode {
                name: request.name.clone(),
                kind: request.kind,
                depth,
                start_time: request.start_time,
                logs: Vec::new(),
            },
        );
        Ok(id)
    }

    fn append_log(&mut self, node: &NodeId, entry: &LogEntry) -> Result<(), BackendError> {
        let target = self
            .nodes
            .get_mut(node)
            .ok_or_else(|| Self::unknown_node(node))?;
        target.logs.push(entry.body.clone());
        Ok(())
    }

    fn finish_node(
        &mut self,
        node: &NodeId,
        end_time: Timestamp,
        status: Status,
    ) -> Result<(), BackendError> {
        let finished = self
            .nodes
            .remove(node)
            .ok_or_else(|| Self::unknown_node(node))?;
        let indent = INDENT.repeat(finished.depth + 1);
        let elapsed = (end_time - finished.start_time).num_milliseconds();

        if finished.kind == NodeKind::Case {
            writeln!(
                self.writer,
                "{}{} {} ({}ms)",
                indent,
                status_label(status),
                finished.name,
                elapsed
            )?;
        }
        for log in &finished.logs {
            for line in log.lines() {
                writeln!(self.writer, "{}{}{}", indent, INDENT, style(line).red())?;
            }
        }
        self.writer.flush()?;
        Ok(())
    }

    fn finish_run(&mut self, run: &RunId, end_time: Timestamp) -> Result<(), BackendError> {
        let start = self
            .run_start
            .remove(run)
            .ok_or_else(|| BackendError::UnknownId {
                kind: "run",
                id: run.0.clone(),
            })?;
        writeln!(
            self.writer,
            "■ finished in {}ms",
            (end_time - start).num_milliseconds()
        )?;
        self.writer.flush()?;
        Ok(())
    }
}
