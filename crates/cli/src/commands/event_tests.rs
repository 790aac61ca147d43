// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::TempDir;
use yare::parameterized;

#[test]
fn inline_value_becomes_payload() {
    let event = build_event(
        Some("job_start".into()),
        Some(r#"{"scheduled_at": "2023-01-01T00:00:00Z", "attempt": 1}"#.into()),
        None,
    )
    .unwrap();
    assert_eq!(event.event_type, "job_start");
    assert_eq!(event.value["attempt"], 1);
}

#[test]
fn missing_value_is_an_empty_payload() {
    let event = build_event(Some("TYPE_JOB_SUCCESS".into()), None, None).unwrap();
    assert!(event.value.is_empty());
}

#[test]
fn file_envelope_can_be_retyped() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("event.json");
    std::fs::write(&path, r#"{"type": "task_start", "value": {"attempt": 2}}"#).unwrap();

    let event = build_event(None, None, Some(path.clone())).unwrap();
    assert_eq!(event.event_type, "task_start");

    let event = build_event(Some("task_retry".into()), None, Some(path)).unwrap();
    assert_eq!(event.event_type, "task_retry");
    assert_eq!(event.value["attempt"], 2);
}

#[parameterized(
    not_json = { "{attempt: 1" },
    array = { "[1, 2]" },
    scalar = { "42" },
)]
fn bad_values_are_validation_errors(raw: &str) {
    let err = build_event(Some("job_start".into()), Some(raw.into()), None).unwrap_err();
    assert_eq!(err.code, 2, "{err}");
}
