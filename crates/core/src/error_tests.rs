// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    invalid_spec       = { ErrorKind::InvalidSpec, 2 },
    unknown_dependency = { ErrorKind::UnknownDependency, 2 },
    cyclic_graph       = { ErrorKind::CyclicGraph, 2 },
    name_conflict      = { ErrorKind::NameConflict, 3 },
    replay_conflict    = { ErrorKind::ReplayConflict, 3 },
    not_found          = { ErrorKind::NotFound, 4 },
    no_such_run        = { ErrorKind::NoSuchRun, 4 },
    internal           = { ErrorKind::Internal, 1 },
    deadline           = { ErrorKind::DeadlineExceeded, 1 },
)]
fn exit_codes(kind: ErrorKind, code: i32) {
    assert_eq!(kind.exit_code(), code);
}

#[test]
fn display_matches_serde_name() {
    let kind = ErrorKind::OutOfOrderEvent;
    let json = serde_json::to_string(&kind).unwrap();
    assert_eq!(json, format!("\"{}\"", kind));
}

#[test]
fn only_transient_kinds_are_retryable() {
    assert!(ErrorKind::DeadlineExceeded.is_retryable());
    assert!(ErrorKind::TransientStore.is_retryable());
    assert!(!ErrorKind::InvalidSpec.is_retryable());
    assert!(!ErrorKind::Internal.is_retryable());
}
