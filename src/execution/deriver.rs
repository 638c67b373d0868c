// Status and log derivation for finished cases

use crate::error::Result;
use crate::state::{AssertionPart, CaseResult, LogEntry, Outcome, Status};
use crate::time::Timestamp;

/// Terminal status of a case plus the failure evidence to attach before
/// closing it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Derivation {
    pub status: Status,
    pub logs: Vec<LogEntry>,
}

/// Derive a case's status and log entries from its outcome and parts.
///
/// Skipped cases ignore their parts entirely, passed cases produce no logs,
/// and failed cases log every non-passing part in order. `at` stamps every
/// produced entry, which keeps the function pure.
pub fn derive(parts: &[AssertionPart], outcome: &str, at: Timestamp) -> Result<Derivation> {
    let outcome: Outcome = outcome.parse()?;
    match outcome {
        Outcome::Skipped => Ok(Derivation {
            status: Status::Skipped,
            logs: Vec::new(),
        }),
        Outcome::Passed => Ok(Derivation {
            status: Status::Passed,
            logs: Vec::new(),
        }),
        Outcome::Failed => {
            let mut logs = Vec::new();
            for part in parts {
                if part.parsed_outcome()?.is_passed() {
                    continue;
                }
                logs.push(LogEntry::failure(
                    at,
                    part.file.as_deref(),
                    part.line,
                    &part.summary,
                ));
            }
            Ok(Derivation {
                status: Status::Failed,
                logs,
            })
        }
    }
}

/// [`derive`] over a whole case result
pub fn derive_result(result: &CaseResult, at: Timestamp) -> Result<Derivation> {
    derive(&result.parts, &result.outcome, at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AdapterError;
    use chrono::{DateTime, Utc};

    fn at() -> Timestamp {
        DateTime::<Utc>::UNIX_EPOCH
    }

    #[test]
    fn test_passed_without_parts() {
        let derived = derive(&[], "passed", at()).unwrap();
        assert_eq!(derived.status, Status::Passed);
        assert!(derived.logs.is_empty());
    }

    #[test]
    fn test_failed_without_parts_has_no_placeholder() {
        let derived = derive(&[], "failed", at()).unwrap();
        assert_eq!(derived.status, Status::Failed);
        assert!(derived.logs.is_empty());
    }

    #[test]
    fn test_skip_ignores_unknown_part_outcomes() {
        let parts = vec![AssertionPart::new("bogus")];
        let derived = derive(&parts, "skipped", at()).unwrap();
        assert_eq!(derived.status, Status::Skipped);
        assert!(derived.logs.is_empty());
    }

    #[test]
    fn test_unknown_case_outcome() {
        let err = derive(&[], "crashed", at()).unwrap_err();
        assert!(matches!(err, AdapterError::UnrecognizedOutcome { .. }));
    }

    #[test]
    fn test_unknown_part_outcome_in_failed_case() {
        let parts = vec![AssertionPart::new("exploded")];
        let err = derive(&parts, "failed", at()).unwrap_err();
        assert!(matches!(
            err,
            AdapterError::UnrecognizedOutcome { ref value } if value == "exploded"
        ));
    }

    #[test]
    fn test_derive_result_matches_derive() {
        let result = CaseResult::failed(vec![
            AssertionPart::new("fatal_failure")
                .at("b.cc", 3)
                .with_summary("boom"),
        ]);
        let derived = derive_result(&result, at()).unwrap();
        assert_eq!(derived, derive(&result.parts, "failed", at()).unwrap());
        assert_eq!(derived.logs[0].body, "file = b.cc\nline = 3\nboom");
    }
}
