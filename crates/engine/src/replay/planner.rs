// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Replay planning: which `(job, instant)` pairs a replay re-executes.
//!
//! The root job contributes every cron instant in the closed range. Unless
//! downstreams are ignored, dependents are walked breadth-first along the
//! stored resolver edges; a dependent keeps the parent instants that match
//! its own schedule, and a job reached twice is one node with the union of
//! its instants.

use std::collections::{BTreeSet, HashMap, VecDeque};

use chrono::{DateTime, Utc};
use tb_core::{
    ExecutionNode, JobId, ProjectId, Replay, ReplayConfig, ReplayId, ReplayRun, ReplayRunStatus, ReplayStatus,
};
use tb_storage::{MaterializedState, StoreError};

use crate::error::EngineError;

/// Upper bound on `(job, instant)` pairs in one replay.
pub const MAX_REPLAY_RUNS: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayRequest {
    pub project_id: ProjectId,
    pub job_name: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub config: ReplayConfig,
}

/// A replay ready to persist, with the claims it takes from older ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayPlan {
    pub replay: Replay,
    /// Pending runs of older replays that this one supersedes.
    pub superseded: Vec<(ReplayId, Vec<(JobId, DateTime<Utc>)>)>,
}

/// Build the execution tree of a replay of `root` over `[start, end]`.
pub fn plan_tree(
    state: &MaterializedState,
    root: JobId,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    ignore_downstream: bool,
) -> Result<Vec<ExecutionNode>, EngineError> {
    let job = state.jobs.get(&root).ok_or_else(|| StoreError::not_found("job", root))?;
    if end < start {
        return Err(EngineError::invalid("end_date", "before start_date"));
    }
    let instants: Vec<_> =
        job.spec.cron()?.instants_between(start, end).into_iter().filter(|t| job.is_active_at(*t)).collect();
    if instants.is_empty() {
        return Err(EngineError::invalid(
            "start_date",
            format!("{} has no scheduled instants between {start} and {end}", job.spec.name),
        ));
    }
    if instants.len() > MAX_REPLAY_RUNS {
        return Err(too_many_runs());
    }

    let mut nodes = vec![node(0, None, job.id, &job.spec.name, job.project_id, instants)];
    let mut index: HashMap<JobId, usize> = HashMap::from([(job.id, 0)]);
    let mut queue = VecDeque::from([0usize]);
    let mut total = nodes[0].runs.len();

    while let Some(parent) = queue.pop_front() {
        if ignore_downstream {
            break;
        }
        let parent_job = nodes[parent].job_id;
        let parent_instants: Vec<_> = nodes[parent].runs.iter().map(|r| r.scheduled_at).collect();
        for child in state.downstreams_of(parent_job) {
            let cron = child.spec.cron()?;
            let instants: Vec<_> =
                parent_instants.iter().copied().filter(|t| cron.matches(*t) && child.is_active_at(*t)).collect();
            if instants.is_empty() {
                continue;
            }

            match index.get(&child.id).copied() {
                None => {
                    let at = nodes.len();
                    total += instants.len();
                    nodes.push(node(at, Some(parent), child.id, &child.spec.name, child.project_id, instants));
                    nodes[at].upstream_indices.push(parent);
                    index.insert(child.id, at);
                    queue.push_back(at);
                }
                Some(at) => {
                    if at == parent || reaches(&nodes, parent, at) {
                        continue;
                    }
                    let target = &mut nodes[at];
                    if !target.upstream_indices.contains(&parent) {
                        target.upstream_indices.push(parent);
                        target.upstream_indices.sort_unstable();
                    }
                    let before = target.runs.len();
                    let mut merged: BTreeSet<_> = target.runs.iter().map(|r| r.scheduled_at).collect();
                    merged.extend(instants);
                    if merged.len() > before {
                        total += merged.len() - before;
                        target.runs = merged.into_iter().map(pending).collect();
                        queue.push_back(at);
                    }
                }
            }
            if total > MAX_REPLAY_RUNS {
                return Err(too_many_runs());
            }
        }
    }
    Ok(nodes)
}

fn too_many_runs() -> EngineError {
    EngineError::invalid("end_date", format!("replay would execute more than {MAX_REPLAY_RUNS} runs"))
}

fn node(
    node_index: usize,
    parent_index: Option<usize>,
    job_id: JobId,
    job_name: &str,
    project_id: ProjectId,
    instants: Vec<DateTime<Utc>>,
) -> ExecutionNode {
    ExecutionNode {
        node_index,
        parent_index,
        upstream_indices: Vec::new(),
        job_id,
        job_name: job_name.to_string(),
        project_id,
        runs: instants.into_iter().map(pending).collect(),
    }
}

fn pending(scheduled_at: DateTime<Utc>) -> ReplayRun {
    ReplayRun { scheduled_at, status: ReplayRunStatus::Pending }
}

/// Whether `to` is `from` or one of its in-tree upstreams.
fn reaches(nodes: &[ExecutionNode], from: usize, to: usize) -> bool {
    let mut seen = BTreeSet::new();
    let mut stack = vec![from];
    while let Some(i) = stack.pop() {
        if i == to {
            return true;
        }
        if seen.insert(i) {
            if let Some(node) = nodes.get(i) {
                stack.extend(node.upstream_indices.iter().copied());
            }
        }
    }
    false
}

/// Node indices with every upstream before its dependents; ties go to the
/// lower index.
pub fn execution_order(tree: &[ExecutionNode]) -> Vec<usize> {
    let mut in_degree: Vec<usize> = tree.iter().map(|n| n.upstream_indices.len()).collect();
    let mut ready: BTreeSet<usize> = (0..tree.len()).filter(|i| in_degree[*i] == 0).collect();
    let mut order = Vec::with_capacity(tree.len());
    while let Some(i) = ready.pop_first() {
        order.push(i);
        for (j, node) in tree.iter().enumerate() {
            if node.upstream_indices.contains(&i) {
                in_degree[j] -= 1;
                if in_degree[j] == 0 {
                    ready.insert(j);
                }
            }
        }
    }
    order
}

/// Plan a replay against the current state.
///
/// Overlap with a non-terminal replay of the same project is a conflict
/// unless `force` is set; a forced replay takes over the older replay's
/// pending runs and leaves its issued ones to it.
pub fn build_replay(
    state: &MaterializedState,
    request: &ReplayRequest,
    now: DateTime<Utc>,
) -> Result<ReplayPlan, EngineError> {
    let job = state
        .job_by_name(request.project_id, &request.job_name)
        .ok_or_else(|| StoreError::not_found("job", &request.job_name))?;
    let mut tree =
        plan_tree(state, job.id, request.start_date, request.end_date, request.config.ignore_downstream)?;

    let claims: BTreeSet<(JobId, DateTime<Utc>)> = tree
        .iter()
        .flat_map(|n| n.runs.iter().map(move |r| (n.job_id, r.scheduled_at)))
        .collect();
    let id = ReplayId::new();
    let mut superseded = Vec::new();
    for other in state.active_replays(request.project_id) {
        let overlap: Vec<_> = other.open_claims().intersection(&claims).copied().collect();
        if overlap.is_empty() {
            continue;
        }
        if !request.config.force {
            return Err(EngineError::ReplayConflict(format!(
                "replay {} already covers {} of these runs",
                other.id.short(8),
                overlap.len()
            )));
        }

        let mut taken = Vec::new();
        for (job_id, at) in overlap {
            let status = other
                .execution_tree
                .iter()
                .find(|n| n.job_id == job_id)
                .and_then(|n| n.run(at))
                .map(|r| r.status);
            if status == Some(ReplayRunStatus::Pending) {
                taken.push((job_id, at));
            } else if let Some(run) = tree.iter_mut().find(|n| n.job_id == job_id).and_then(|n| n.run_mut(at)) {
                run.status = ReplayRunStatus::Superseded;
            }
        }
        if !taken.is_empty() {
            superseded.push((other.id, taken));
        }
    }

    let replay = Replay {
        id,
        job_id: job.id,
        project_id: request.project_id,
        start_date: request.start_date,
        end_date: request.end_date,
        status: ReplayStatus::Accepted,
        message: None,
        config: request.config.clone(),
        execution_tree: tree,
        failures: Vec::new(),
        created_at: now,
        updated_at: now,
    };
    Ok(ReplayPlan { replay, superseded })
}

#[cfg(test)]
#[path = "planner_tests.rs"]
mod tests;
