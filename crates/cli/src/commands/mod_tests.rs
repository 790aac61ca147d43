// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::TimeZone;
use yare::parameterized;

#[parameterized(
    simple = { "BUCKET=gs://lake", "BUCKET", "gs://lake" },
    equals_in_value = { "FILTER=a=b", "FILTER", "a=b" },
    empty_value = { "EMPTY=", "EMPTY", "" },
    trimmed_key = { " KEY =v", "KEY", "v" },
)]
fn key_val_parses(raw: &str, key: &str, value: &str) {
    assert_eq!(parse_key_val(raw).unwrap(), (key.to_string(), value.to_string()));
}

#[parameterized(
    no_equals = { "BUCKET" },
    empty_key = { "=value" },
)]
fn key_val_rejects(raw: &str) {
    assert!(parse_key_val(raw).is_err());
}

#[test]
fn times_accept_dates_and_timestamps() {
    assert_eq!(parse_time("2023-01-02").unwrap(), Utc.with_ymd_and_hms(2023, 1, 2, 0, 0, 0).unwrap());
    assert_eq!(parse_time("2023-01-02T05:00:00+02:00").unwrap(), Utc.with_ymd_and_hms(2023, 1, 2, 3, 0, 0).unwrap());
    assert!(parse_time("yesterday").is_err());
}
