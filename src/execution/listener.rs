// Event listener
// Translates the runner's lifecycle callbacks into tracker operations and
// decides what a failure in the adapter means for the rest of the run.

use serde::{Deserialize, Serialize};
use std::mem;
use tracing::{debug, error, warn};

use super::deriver::derive;
use super::events::{ListenerEvent, case_description, group_description};
use super::tracker::RunTracker;
use crate::error::{AdapterError, Result};
use crate::report::ReportingBackend;
use crate::state::{AssertionPart, CaseResult, NodeKind, Outcome, RunSummary};
use crate::time::{Clock, SystemClock};

pub const DEFAULT_RUN_DESCRIPTION: &str = "This is a test launch for google tests.";

/// What to do when the reporting backend fails a call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendErrorPolicy {
    /// Return the error and stop reporting
    #[default]
    Abort,
    /// Log the error and keep reporting with reduced fidelity
    Degrade,
}

/// Case outcomes as the runner reported them, counted whether or not the
/// report could be produced
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OutcomeTally {
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl OutcomeTally {
    fn record(&mut self, result: &CaseResult) {
        match result.parsed_outcome() {
            Ok(Outcome::Passed) => self.passed += 1,
            Ok(Outcome::Failed) => self.failed += 1,
            Ok(Outcome::Skipped) => self.skipped += 1,
            Err(_) => {}
        }
    }

    pub fn total(&self) -> usize {
        self.passed + self.failed + self.skipped
    }

    pub fn any_failed(&self) -> bool {
        self.failed > 0
    }
}

/// Lifecycle listener driving a [`RunTracker`].
///
/// Protocol and outcome errors halt reporting immediately. Backend errors
/// halt or degrade depending on [`BackendErrorPolicy`]. Once halted, events
/// are still accepted so the caller's test run is never disturbed, and the
/// [`OutcomeTally`] keeps counting.
pub struct EventListener<B, C = SystemClock> {
    tracker: RunTracker<B, C>,
    policy: BackendErrorPolicy,
    default_description: String,
    pending_parts: Vec<AssertionPart>,
    halted: bool,
    backend_errors: usize,
    tally: OutcomeTally,
    summary: Option<RunSummary>,
}

impl<B: ReportingBackend, C: Clock> EventListener<B, C> {
    pub fn new(tracker: RunTracker<B, C>) -> Self {
        Self {
            tracker,
            policy: BackendErrorPolicy::default(),
            default_description: DEFAULT_RUN_DESCRIPTION.to_string(),
            pending_parts: Vec::new(),
            halted: false,
            backend_errors: 0,
            tally: OutcomeTally::default(),
            summary: None,
        }
    }

    pub fn with_policy(mut self, policy: BackendErrorPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Description used when `run_start` carries none
    pub fn with_default_description(mut self, description: impl Into<String>) -> Self {
        self.default_description = description.into();
        self
    }

    /// Handle one lifecycle callback
    pub fn on_event(&mut self, event: ListenerEvent) -> Result<()> {
        if let ListenerEvent::CaseEnd { result } = &event {
            self.tally.record(result);
        }

        if self.halted {
            debug!(event = event.name(), "reporting halted, ignoring event");
            return Ok(());
        }

        let name = event.name();
        match self.dispatch(event) {
            Ok(()) => Ok(()),
            Err(err) if err.is_fatal() => {
                error!(event = name, "{}; reporting halted", err);
                self.halted = true;
                Err(err)
            }
            Err(err) => {
                self.backend_errors += 1;
                match self.policy {
                    BackendErrorPolicy::Abort => {
                        error!(event = name, "{}; reporting halted", err);
                        self.halted = true;
                        Err(err)
                    }
                    BackendErrorPolicy::Degrade => {
                        warn!(event = name, "{}; continuing with a partial report", err);
                        Ok(())
                    }
                }
            }
        }
    }

    /// Handle one JSON-lines record.
    ///
    /// A record that does not decode leaves the tracker out of step with the
    /// runner, so reporting halts. Later records are still read for the tally.
    pub fn on_json_line(&mut self, line: &str) -> Result<()> {
        match ListenerEvent::from_json_line(line) {
            Ok(event) => self.on_event(event),
            Err(err) if self.halted => {
                debug!("reporting halted, ignoring undecodable event: {}", err);
                Ok(())
            }
            Err(err) => {
                let err = AdapterError::from(err);
                error!("{}; reporting halted", err);
                self.halted = true;
                Err(err)
            }
        }
    }

    fn dispatch(&mut self, event: ListenerEvent) -> Result<()> {
        match event {
            ListenerEvent::RunStart { description } => {
                let description =
                    description.unwrap_or_else(|| self.default_description.clone());
                self.tracker.begin_run(description)?;
            }
            ListenerEvent::GroupStart { name, type_param } => {
                self.tracker
                    .begin_group(name, group_description(type_param.as_deref()))?;
            }
            ListenerEvent::CaseStart {
                name,
                type_param,
                value_param,
                file,
                line,
            } => {
                self.pending_parts.clear();
                let description = case_description(
                    type_param.as_deref(),
                    value_param.as_deref(),
                    file.as_deref(),
                    line,
                );
                self.tracker.begin_case(name, Some(description))?;
            }
            ListenerEvent::AssertionPart(part) => {
                self.require_current(NodeKind::Case, "assertion_part")?;
                self.pending_parts.push(part);
            }
            ListenerEvent::CaseEnd { result } => {
                self.require_current(NodeKind::Case, "case_end")?;
                let streamed = mem::take(&mut self.pending_parts);
                let parts = if result.parts.is_empty() {
                    streamed
                } else {
                    result.parts
                };
                let at = self.tracker.clock().now();
                let derived = derive(&parts, &result.outcome, at)?;
                self.tracker
                    .end_current(Some(derived.status), derived.logs)?;
            }
            ListenerEvent::GroupEnd => {
                if self.tracker.depth() <= 1 {
                    return Err(AdapterError::protocol("group_end without an open group"));
                }
                self.require_current(NodeKind::Group, "group_end")?;
                self.tracker.end_current(None, Vec::new())?;
            }
            ListenerEvent::RunEnd => {
                let summary = self.tracker.end_run()?;
                self.summary = Some(summary);
            }
        }
        Ok(())
    }

    fn require_current(&self, kind: NodeKind, event: &str) -> Result<()> {
        match self.tracker.current() {
            Some(node) if node.kind == kind => Ok(()),
            Some(node) => Err(AdapterError::protocol(format!(
                "{} received while {} {:?} is open",
                event, node.kind, node.name
            ))),
            None => Err(AdapterError::protocol(format!(
                "{} received with no open node",
                event
            ))),
        }
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn backend_errors(&self) -> usize {
        self.backend_errors
    }

    pub fn tally(&self) -> OutcomeTally {
        self.tally
    }

    /// Summary of the closed run, available after `run_end`
    pub fn summary(&self) -> Option<&RunSummary> {
        self.summary.as_ref()
    }

    pub fn tracker(&self) -> &RunTracker<B, C> {
        &self.tracker
    }

    pub fn into_tracker(self) -> RunTracker<B, C> {
        self.tracker
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::tracker::TrackerOptions;
    use crate::report::InMemoryBackend;
    use crate::time::ManualClock;

    fn listener() -> EventListener<InMemoryBackend, ManualClock> {
        EventListener::new(RunTracker::with_clock(
            InMemoryBackend::new(),
            ManualClock::epoch(),
            TrackerOptions::default(),
        ))
    }

    #[test]
    fn test_default_description() {
        let mut listener = listener();
        listener
            .on_event(ListenerEvent::RunStart { description: None })
            .unwrap();
        let run = listener.tracker().run().unwrap();
        assert_eq!(run.description, DEFAULT_RUN_DESCRIPTION);
    }

    #[test]
    fn test_assertion_part_outside_case_halts() {
        let mut listener = listener();
        listener
            .on_event(ListenerEvent::RunStart { description: None })
            .unwrap();
        let err = listener
            .on_event(ListenerEvent::AssertionPart(AssertionPart::new("failed")))
            .unwrap_err();
        assert!(matches!(err, AdapterError::Protocol { .. }));
        assert!(listener.is_halted());

        // later events are swallowed
        assert!(listener.on_event(ListenerEvent::RunEnd).is_ok());
        assert!(listener.tracker().is_running());
    }

    #[test]
    fn test_group_end_on_open_case_rejected() {
        let mut listener = listener();
        listener
            .on_event(ListenerEvent::RunStart { description: None })
            .unwrap();
        listener
            .on_event(ListenerEvent::GroupStart {
                name: "Suite".to_string(),
                type_param: None,
            })
            .unwrap();
        listener
            .on_event(ListenerEvent::CaseStart {
                name: "Case".to_string(),
                type_param: None,
                value_param: None,
                file: None,
                line: None,
            })
            .unwrap();
        let err = listener.on_event(ListenerEvent::GroupEnd).unwrap_err();
        assert!(matches!(err, AdapterError::Protocol { .. }));
        assert_eq!(listener.tracker().depth(), 3);
    }

    #[test]
    fn test_tally_ignores_unknown_outcome() {
        let mut tally = OutcomeTally::default();
        tally.record(&CaseResult::new("weird", Vec::new()));
        tally.record(&CaseResult::failed(Vec::new()));
        assert_eq!(tally.total(), 1);
        assert!(tally.any_failed());
    }
}
