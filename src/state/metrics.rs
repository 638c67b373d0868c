// Run metrics

use chrono::Duration;
use serde::Serialize;

use crate::state::{NodeKind, Status};

/// Counters collected while a run is open, returned by `end_run`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Groups closed, root included
    pub groups: usize,
    pub cases: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub log_entries: usize,
    pub duration_ms: i64,
}

impl RunSummary {
    pub(crate) fn record_close(&mut self, kind: NodeKind, status: Status, logs: usize) {
        self.log_entries += logs;
        match kind {
            NodeKind::Group => self.groups += 1,
            NodeKind::Case => {
                self.cases += 1;
                match status {
                    Status::Passed => self.passed += 1,
                    Status::Failed => self.failed += 1,
                    Status::Skipped => self.skipped += 1,
                }
            }
        }
    }

    pub(crate) fn set_duration(&mut self, duration: Duration) {
        self.duration_ms = duration.num_milliseconds();
    }

    /// True when no case failed
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }

    /// Pass rate over executed (non-skipped) cases, in percent
    pub fn pass_rate(&self) -> f64 {
        let executed = self.passed + self.failed;
        if executed == 0 {
            0.0
        } else {
            (self.passed as f64 / executed as f64) * 100.0
        }
    }
}
