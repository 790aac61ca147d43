// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    invalid    = { StoreError::invalid("name", "empty"), ErrorKind::InvalidSpec },
    transition = { StoreError::Transition("deployment is running".into()), ErrorKind::InvalidSpec },
    conflict   = { StoreError::Conflict { entity: "job", name: "a".into(), detail: String::new() }, ErrorKind::NameConflict },
    missing    = { StoreError::not_found("project", "p"), ErrorKind::NotFound },
    wal        = { StoreError::Wal(WalError::Io(std::io::Error::other("disk full"))), ErrorKind::TransientStore },
    migration  = { StoreError::Migration(MigrationError::NothingRecorded), ErrorKind::Internal },
)]
fn kinds(err: StoreError, kind: ErrorKind) {
    assert_eq!(err.kind(), kind);
}

#[test]
fn messages() {
    assert_eq!(StoreError::not_found("project", "p").to_string(), r#"project "p" not found"#);
    let conflict = StoreError::Conflict {
        entity: "job",
        name: "a".into(),
        detail: " in namespace \"other\"".into(),
    };
    assert_eq!(conflict.to_string(), r#"job "a" already exists in namespace "other""#);
}
