// Status and log derivation

use chrono::{DateTime, TimeZone, Utc};
use rpgtest::AdapterError;
use rpgtest::execution::{derive, derive_result};
use rpgtest::state::{AssertionPart, CaseResult, Severity, Status};
use rpgtest::time::Timestamp;

fn at() -> Timestamp {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

fn failing_part() -> AssertionPart {
    AssertionPart::new("failed")
        .at("a.cc", 10)
        .with_summary("expected 1 got 2")
        .with_message("a.cc:10: Failure\nexpected 1 got 2")
}

#[test]
fn test_passed_case_without_parts() {
    let derived = derive(&[], "passed", at()).unwrap();

    assert_eq!(derived.status, Status::Passed);
    assert!(derived.logs.is_empty());
}

#[test]
fn test_passed_case_never_logs_parts() {
    let parts = vec![AssertionPart::new("passed").at("a.cc", 3)];

    let derived = derive(&parts, "passed", at()).unwrap();

    assert_eq!(derived.status, Status::Passed);
    assert!(derived.logs.is_empty());
}

#[test]
fn test_failed_case_logs_only_failing_parts() {
    // Arrange
    let parts = vec![AssertionPart::new("passed").at("a.cc", 5), failing_part()];

    // Act
    let derived = derive(&parts, "failed", at()).unwrap();

    // Assert
    assert_eq!(derived.status, Status::Failed);
    assert_eq!(derived.logs.len(), 1);
    let entry = &derived.logs[0];
    assert_eq!(entry.severity, Severity::Error);
    assert_eq!(entry.timestamp, at());
    assert_eq!(entry.file.as_deref(), Some("a.cc"));
    assert_eq!(entry.line, Some(10));
    assert!(entry.body.contains("expected 1 got 2"));
    assert!(entry.body.contains("a.cc"));
    assert!(entry.body.contains("10"));
}

#[test]
fn test_failed_case_preserves_part_order() {
    let parts = vec![
        AssertionPart::new("failed").at("first.cc", 1).with_summary("one"),
        AssertionPart::new("skipped").at("second.cc", 2).with_summary("two"),
        AssertionPart::new("fatal_failure")
            .at("third.cc", 3)
            .with_summary("three"),
    ];

    let derived = derive(&parts, "failed", at()).unwrap();

    let files: Vec<_> = derived
        .logs
        .iter()
        .map(|entry| entry.file.as_deref().unwrap_or_default())
        .collect();
    assert_eq!(files, vec!["first.cc", "second.cc", "third.cc"]);
}

#[test]
fn test_failed_case_without_parts() {
    let derived = derive(&[], "failed", at()).unwrap();

    assert_eq!(derived.status, Status::Failed);
    assert!(derived.logs.is_empty());
}

#[test]
fn test_skip_short_circuits_parts() {
    let parts = vec![failing_part()];

    let derived = derive(&parts, "skipped", at()).unwrap();

    assert_eq!(derived.status, Status::Skipped);
    assert!(derived.logs.is_empty());
}

#[test]
fn test_unrecognized_case_outcome() {
    let result = derive(&[failing_part()], "timeout", at());

    match result {
        Err(AdapterError::UnrecognizedOutcome { value }) => assert_eq!(value, "timeout"),
        other => panic!("expected unrecognized outcome, got {:?}", other),
    }
}

#[test]
fn test_derive_is_pure() {
    let parts = vec![AssertionPart::new("passed"), failing_part()];

    let first = derive(&parts, "failed", at()).unwrap();
    let second = derive(&parts, "failed", at()).unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_unknown_location_renders_placeholders() {
    let parts = vec![AssertionPart::new("failed").with_summary("thrown exception")];

    let derived = derive(&parts, "failed", DateTime::<Utc>::UNIX_EPOCH).unwrap();

    assert_eq!(
        derived.logs[0].body,
        "file = unknown\nline = -1\nthrown exception"
    );
}

#[test]
fn test_derive_result_from_json() {
    let result: CaseResult = serde_json::from_str(
        r#"{"outcome": "failed", "parts": [
            {"file": "a.cc", "line": 10, "summary": "expected 1 got 2", "message": "", "outcome": "failed"}
        ]}"#,
    )
    .unwrap();

    let derived = derive_result(&result, at()).unwrap();

    assert_eq!(derived.status, Status::Failed);
    assert_eq!(derived.logs.len(), 1);
    assert_eq!(
        derived.logs[0].body,
        "file = a.cc\nline = 10\nexpected 1 got 2"
    );
}

#[test]
fn test_derive_result_with_unknown_line() {
    let result: CaseResult = serde_json::from_str(
        r#"{"outcome": "failed", "parts": [
            {"file": "unknown file", "line": -1, "summary": "uncaught exception", "message": "", "outcome": "fatal_failure"}
        ]}"#,
    )
    .unwrap();

    let derived = derive_result(&result, at()).unwrap();

    assert_eq!(
        derived.logs[0].body,
        "file = unknown file\nline = -1\nuncaught exception"
    );
}
