// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::TimeZone;
use serial_test::serial;
use yare::parameterized;

#[parameterized(
    seconds = { 42, "42s" },
    minutes = { 125, "2m 5s" },
    hours = { 3_725, "1h 2m 5s" },
    zero = { 0, "0s" },
)]
fn uptime_formatting(secs: u64, expected: &str) {
    assert_eq!(format_uptime(secs), expected);
}

#[test]
fn time_is_minute_precision_utc() {
    let t = Utc.with_ymd_and_hms(2023, 4, 5, 6, 7, 8).unwrap();
    assert_eq!(format_time(t), "2023-04-05 06:07");
}

#[test]
#[serial]
fn table_pads_columns_to_widest_cell() {
    std::env::set_var("NO_COLOR", "1");
    let mut table = Table::new(vec!["NAME", "STATUS"]);
    table.row(vec!["daily_rollup".into(), "in_queue".into()]);
    table.row(vec!["a".into(), "failed".into()]);

    let mut out = Vec::new();
    table.render(&mut out);
    let text = String::from_utf8(out).unwrap();
    assert_eq!(text, "NAME          STATUS\ndaily_rollup  in_queue\na             failed\n");
    std::env::remove_var("NO_COLOR");
}

#[test]
fn json_lists_ignore_the_text_renderer() {
    let items = vec!["a", "b"];
    let result = handle_list(OutputFormat::Json, &items, "none", |_, _| panic!("text renderer used"));
    assert!(result.is_ok());
}
