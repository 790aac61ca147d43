// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;
use tb_core::test_support::epoch;
use tb_core::Event;

#[test]
fn same_version_is_noop() {
    let v1 = json!({"v": 1, "seq": 1, "state": {}});
    let result = MigrationRegistry::new().migrate_to(v1.clone(), 1).unwrap();
    assert_eq!(result, v1);
}

#[test]
fn too_new_and_no_path() {
    let registry = MigrationRegistry::new();
    assert!(matches!(
        registry.migrate_to(json!({"v": 99, "seq": 1, "state": {}}), 1),
        Err(MigrationError::TooNew(99, 1))
    ));
    assert!(matches!(
        registry.migrate_to(json!({"v": 1, "seq": 1, "state": {}}), 2),
        Err(MigrationError::NoPath(1, 2))
    ));
    assert!(matches!(registry.migrate_to(json!({"seq": 1}), 1), Err(MigrationError::MissingVersion)));
}

struct RenameProjectsField;

impl Migration for RenameProjectsField {
    fn source_version(&self) -> u32 {
        1
    }
    fn target_version(&self) -> u32 {
        2
    }
    fn migrate(&self, snapshot: &mut Value) -> Result<(), MigrationError> {
        if let Some(state) = snapshot.get_mut("state").and_then(Value::as_object_mut) {
            if let Some(projects) = state.remove("project_map") {
                state.insert("projects".into(), projects);
            }
        }
        Ok(())
    }
}

#[test]
fn migration_chain_bumps_version() {
    let mut registry = MigrationRegistry::new();
    registry.migrations.push(Box::new(RenameProjectsField));
    let result = registry.migrate_to(json!({"v": 1, "seq": 42, "state": {"project_map": {}}}), 2).unwrap();
    assert_eq!(result["v"], 2);
    assert_eq!(result["seq"], 42);
    assert_eq!(result["state"]["projects"], json!({}));
}

#[yare::parameterized(
    patch       = { "0.2.1", "0.2.0", Ordering::Greater },
    minor       = { "0.10.0", "0.9.9", Ordering::Greater },
    equal       = { "1.0.0", "v1.0.0", Ordering::Equal },
    older       = { "0.1.9", "0.2.0", Ordering::Less },
    shorter     = { "1.0", "1.0.1", Ordering::Less },
)]
fn version_ordering(a: &str, b: &str, expected: Ordering) {
    assert_eq!(compare_versions(a, b), expected);
}

fn recorded(state: &mut MaterializedState, version: &str) {
    let record = plan_up(state, version, 1, epoch()).unwrap().unwrap();
    state.apply_event(&Event::MigrationRecorded { record });
}

#[test]
fn plan_up_records_each_new_version_once() {
    let mut state = MaterializedState::default();
    recorded(&mut state, "0.1.0");
    assert_eq!(state.latest_migration().unwrap().previous_app_version, "");

    assert!(plan_up(&state, "0.1.0", 1, epoch()).unwrap().is_none());

    recorded(&mut state, "0.2.0");
    assert_eq!(state.latest_migration().unwrap().previous_app_version, "0.1.0");
    assert!(matches!(plan_up(&state, "0.1.5", 1, epoch()), Err(MigrationError::Downgrade { .. })));
}

#[test]
fn rollback_requires_matching_binary() {
    let mut state = MaterializedState::default();
    assert!(matches!(plan_rollback(&state, "0.2.0"), Err(MigrationError::NothingRecorded)));

    recorded(&mut state, "0.1.0");
    recorded(&mut state, "0.2.0");
    let err = plan_rollback(&state, "0.1.0").unwrap_err();
    assert_eq!(err.to_string(), "expecting version [0.2.0] but got [0.1.0]");

    let record = plan_rollback(&state, "0.2.0").unwrap();
    state.apply_event(&Event::MigrationRemoved { record });
    assert_eq!(state.latest_migration().unwrap().app_version, "0.1.0");
}
