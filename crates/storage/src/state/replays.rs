// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Replay handlers.

use tb_core::{Event, ProjectId, Replay, ReplayFailure, ReplayId, ReplayRunStatus, ReplayStatus};

use super::{helpers, MaterializedState};

pub(crate) fn apply(state: &mut MaterializedState, event: &Event) {
    match event {
        Event::ReplayCreated { replay } => {
            helpers::insert_absent(&mut state.replays, replay.id, (**replay).clone());
        }

        Event::ReplayStatusChanged { id, status, message, at } => {
            if let Some(replay) = state.replays.get_mut(id) {
                if !replay.status.is_terminal() && replay.status != *status {
                    replay.status = *status;
                    if message.is_some() {
                        replay.message = message.clone();
                    }
                    replay.updated_at = *at;
                }
            }
        }

        Event::ReplayRunUpdated { id, node_index, scheduled_at, status, failure, at } => {
            let Some(replay) = state.replays.get_mut(id) else { return };
            let Some(node) = replay.execution_tree.iter_mut().find(|n| n.node_index == *node_index) else {
                return;
            };
            let job_name = node.job_name.clone();
            let Some(run) = node.run_mut(*scheduled_at) else { return };
            if !run.status.is_open() || run.status == *status {
                return;
            }
            run.status = *status;
            if let Some(message) = failure {
                replay.failures.push(ReplayFailure {
                    job_name,
                    scheduled_at: *scheduled_at,
                    message: message.clone(),
                });
            }
            replay.updated_at = *at;
        }

        Event::ReplaySuperseded { id, claims, at, .. } => {
            if let Some(replay) = state.replays.get_mut(id) {
                for node in &mut replay.execution_tree {
                    for run in &mut node.runs {
                        let claimed = claims.iter().any(|(job, t)| *job == node.job_id && *t == run.scheduled_at);
                        if claimed && run.status == ReplayRunStatus::Pending {
                            run.status = ReplayRunStatus::Superseded;
                        }
                    }
                }
                replay.updated_at = *at;
            }
        }

        _ => {}
    }
}

impl MaterializedState {
    pub fn replay(&self, id: ReplayId) -> Option<&Replay> {
        self.replays.get(&id)
    }

    pub fn replay_by_prefix(&self, prefix: &str) -> Option<&Replay> {
        helpers::find_by_prefix(&self.replays, prefix)
    }

    /// Replays of a project, optionally filtered by status, newest first.
    pub fn replays_of(&self, project_id: ProjectId, status: Option<ReplayStatus>) -> Vec<&Replay> {
        let mut out: Vec<_> = self
            .replays
            .values()
            .filter(|r| r.project_id == project_id && status.is_none_or(|s| r.status == s))
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        out
    }

    /// Non-terminal replays of a project, oldest first.
    pub fn active_replays(&self, project_id: ProjectId) -> Vec<&Replay> {
        let mut out: Vec<_> =
            self.replays.values().filter(|r| r.project_id == project_id && !r.status.is_terminal()).collect();
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        out
    }

    pub fn in_progress_replays(&self, project_id: ProjectId) -> usize {
        self.replays
            .values()
            .filter(|r| r.project_id == project_id && r.status == ReplayStatus::InProgress)
            .count()
    }

    /// Projects with accepted replays waiting for a slot.
    pub fn projects_with_accepted_replays(&self) -> Vec<ProjectId> {
        let mut out: Vec<_> = self
            .replays
            .values()
            .filter(|r| r.status == ReplayStatus::Accepted)
            .map(|r| r.project_id)
            .collect();
        out.sort();
        out.dedup();
        out
    }
}
