// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::TimeZone;
use tb_core::{JobId, ProjectId, ReplayRun};

fn at(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2023, 1, day, 0, 0, 0).unwrap()
}

fn node(index: usize, parent: Option<usize>, name: &str, statuses: &[ReplayRunStatus]) -> ExecutionNode {
    ExecutionNode {
        node_index: index,
        parent_index: parent,
        upstream_indices: parent.into_iter().collect(),
        job_id: JobId::new(),
        job_name: name.to_string(),
        project_id: ProjectId::new(),
        runs: statuses
            .iter()
            .enumerate()
            .map(|(i, s)| ReplayRun { scheduled_at: at(i as u32 + 1), status: *s })
            .collect(),
    }
}

/// Drop ANSI color sequences so assertions hold on a terminal too.
fn plain(bytes: Vec<u8>) -> String {
    let text = String::from_utf8(bytes).unwrap();
    let mut out = String::new();
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '\x1b' {
            for c in chars.by_ref() {
                if c == 'm' {
                    break;
                }
            }
        } else {
            out.push(c);
        }
    }
    out
}

#[test]
fn tree_indents_children_under_parents() {
    use ReplayRunStatus::*;
    let tree = vec![
        node(0, None, "orders", &[Succeeded, Succeeded, Issued]),
        node(1, Some(0), "orders-daily", &[Pending, Pending]),
        node(2, Some(1), "orders-report", &[Pending]),
        node(3, Some(0), "orders-audit", &[Failed]),
    ];
    let mut out = Vec::new();
    print_tree(&tree, &mut out);

    let lines: Vec<String> = plain(out).lines().map(str::to_string).collect();
    assert_eq!(
        lines,
        vec![
            "orders  2 succeeded, 1 issued",
            "  orders-daily  2 pending",
            "    orders-report  1 pending",
            "  orders-audit  1 failed",
        ]
    );
}

#[test]
fn depth_survives_a_dangling_parent() {
    let tree = vec![node(1, Some(7), "orphan", &[])];
    assert_eq!(depth(&tree, &tree[0]), 1);
}

#[test]
fn replay_detail_lists_failures_and_message() {
    let replay = Replay {
        id: tb_core::ReplayId::new(),
        job_id: JobId::new(),
        project_id: ProjectId::new(),
        start_date: at(1),
        end_date: at(2),
        status: ReplayStatus::Failed,
        message: Some("cancelled".into()),
        config: ReplayConfig::default(),
        execution_tree: vec![node(0, None, "orders", &[ReplayRunStatus::Cancelled, ReplayRunStatus::Failed])],
        failures: vec![tb_core::ReplayFailure {
            job_name: "orders".into(),
            scheduled_at: at(2),
            message: "operator exited 1".into(),
        }],
        created_at: at(1),
        updated_at: at(1),
    };
    let mut out = Vec::new();
    print_replay(&replay, &mut out);
    let text = plain(out);

    assert!(text.contains("Status:  failed"), "{text}");
    assert!(text.contains("Message: cancelled"), "{text}");
    assert!(text.contains("orders  1 cancelled, 1 failed"), "{text}");
    assert!(text.contains("orders @ 2023-01-02 00:00: operator exited 1"), "{text}");
    assert_eq!(root_name(&replay), "orders");
    assert_eq!(run_count(&replay.execution_tree), 2);
}

#[test]
fn status_filter_rejects_unknown_values() {
    assert_eq!(parse_status("in_progress"), Ok(ReplayStatus::InProgress));
    assert!(parse_status("paused").is_err());
}
