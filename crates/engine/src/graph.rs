// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Graph compilation.
//!
//! Builds a project's DAG from the stored resolver edges. Only same-project
//! edges take part in ordering; upstreams in other projects become external
//! upstreams (sensors) on the task and never close a cycle.

use std::collections::{BTreeMap, BTreeSet};

use tb_adapters::render_config;
use tb_core::dag::{MIN_PRIORITY, PRIORITY_STEP, ROOT_PRIORITY};
use tb_core::{Dag, DagTask, ExternalUpstream, ProjectId};
use tb_storage::{MaterializedState, StoreError};

use crate::error::EngineError;

/// Named nodes with directed `upstream -> downstream` edges.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    upstreams: BTreeMap<String, BTreeSet<String>>,
    downstreams: BTreeMap<String, BTreeSet<String>>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, name: &str) {
        self.upstreams.entry(name.to_string()).or_default();
        self.downstreams.entry(name.to_string()).or_default();
    }

    pub fn add_edge(&mut self, upstream: &str, downstream: &str) {
        self.add_node(upstream);
        self.add_node(downstream);
        self.upstreams.entry(downstream.to_string()).or_default().insert(upstream.to_string());
        self.downstreams.entry(upstream.to_string()).or_default().insert(downstream.to_string());
    }

    pub fn upstreams(&self, name: &str) -> impl Iterator<Item = &String> {
        self.upstreams.get(name).into_iter().flatten()
    }

    pub fn downstreams(&self, name: &str) -> impl Iterator<Item = &String> {
        self.downstreams.get(name).into_iter().flatten()
    }

    /// Kahn's algorithm; among ready nodes the smallest name goes first.
    pub fn topological_order(&self) -> Result<Vec<String>, EngineError> {
        let mut in_degree: BTreeMap<&str, usize> =
            self.upstreams.iter().map(|(name, ups)| (name.as_str(), ups.len())).collect();
        let mut ready: BTreeSet<&str> =
            in_degree.iter().filter(|(_, d)| **d == 0).map(|(name, _)| *name).collect();

        let mut order = Vec::with_capacity(in_degree.len());
        while let Some(name) = ready.pop_first() {
            order.push(name.to_string());
            for down in self.downstreams(name) {
                if let Some(degree) = in_degree.get_mut(down.as_str()) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.insert(down.as_str());
                    }
                }
            }
        }

        if order.len() < in_degree.len() {
            return Err(EngineError::Cycle { cycles: self.cycles() });
        }
        Ok(order)
    }

    /// Every strongly connected component that forms a cycle, each sorted,
    /// ordered by first member.
    pub fn cycles(&self) -> Vec<Vec<String>> {
        let mut tarjan = Tarjan::new(self);
        for name in self.upstreams.keys() {
            if !tarjan.index.contains_key(name.as_str()) {
                tarjan.visit(name);
            }
        }
        let mut cycles: Vec<Vec<String>> = tarjan
            .components
            .into_iter()
            .filter(|c| c.len() > 1 || c.first().is_some_and(|n| self.downstreams(n).any(|d| d == n)))
            .map(|mut c| {
                c.sort();
                c
            })
            .collect();
        cycles.sort();
        cycles
    }

    /// Depth of each node: 0 for roots, else one more than its deepest
    /// upstream. `order` must be topological.
    pub fn levels(&self, order: &[String]) -> BTreeMap<String, u32> {
        let mut levels: BTreeMap<String, u32> = BTreeMap::new();
        for name in order {
            let level = self.upstreams(name).filter_map(|up| levels.get(up)).map(|l| l + 1).max().unwrap_or(0);
            levels.insert(name.clone(), level);
        }
        levels
    }
}

/// Priority weight for a task at `level`.
pub fn priority(level: u32) -> u32 {
    ROOT_PRIORITY.saturating_sub(level.saturating_mul(PRIORITY_STEP)).max(MIN_PRIORITY)
}

struct Tarjan<'a> {
    graph: &'a Graph,
    next: usize,
    index: BTreeMap<&'a str, usize>,
    lowlink: BTreeMap<&'a str, usize>,
    stack: Vec<&'a str>,
    on_stack: BTreeSet<&'a str>,
    components: Vec<Vec<String>>,
}

impl<'a> Tarjan<'a> {
    fn new(graph: &'a Graph) -> Self {
        Self {
            graph,
            next: 0,
            index: BTreeMap::new(),
            lowlink: BTreeMap::new(),
            stack: Vec::new(),
            on_stack: BTreeSet::new(),
            components: Vec::new(),
        }
    }

    fn visit(&mut self, name: &'a str) {
        self.index.insert(name, self.next);
        self.lowlink.insert(name, self.next);
        self.next += 1;
        self.stack.push(name);
        self.on_stack.insert(name);

        let graph = self.graph;
        for down in graph.downstreams(name) {
            let down = down.as_str();
            if !self.index.contains_key(down) {
                self.visit(down);
                let low = self.lowlink[down].min(self.lowlink[name]);
                self.lowlink.insert(name, low);
            } else if self.on_stack.contains(down) {
                let low = self.index[down].min(self.lowlink[name]);
                self.lowlink.insert(name, low);
            }
        }

        if self.lowlink[name] == self.index[name] {
            let mut component = Vec::new();
            while let Some(member) = self.stack.pop() {
                self.on_stack.remove(member);
                component.push(member.to_string());
                if member == name {
                    break;
                }
            }
            self.components.push(component);
        }
    }
}

/// Same-project edge graph of a project, from the stored edges.
pub fn project_graph(state: &MaterializedState, project_id: ProjectId) -> Graph {
    let mut graph = Graph::new();
    for job in state.jobs_of(project_id) {
        graph.add_node(&job.spec.name);
        for edge in state.upstreams_of(job.id) {
            if edge.dependent_project_id == project_id {
                graph.add_edge(&edge.dependent_job_name, &job.spec.name);
            }
        }
    }
    graph
}

/// Compile a project's DAG. Intra-project cycles are fatal and name every
/// node on each cycle.
pub fn compile(state: &MaterializedState, project_id: ProjectId) -> Result<Dag, EngineError> {
    let project = state.projects.get(&project_id).ok_or_else(|| StoreError::not_found("project", project_id))?;
    let graph = project_graph(state, project_id);
    let order = graph.topological_order()?;
    let levels = graph.levels(&order);
    let no_secrets = BTreeMap::new();

    let mut tasks = Vec::with_capacity(order.len());
    for name in &order {
        let Some(job) = state.job_by_name(project_id, name) else { continue };
        let namespace = state.namespaces.get(&job.namespace_id).map(|n| n.name.clone()).unwrap_or_default();
        let mut external_upstreams: Vec<ExternalUpstream> = state
            .upstreams_of(job.id)
            .iter()
            .filter(|e| e.dependent_project_id != project_id)
            .map(|e| ExternalUpstream { project: e.dependent_project_name.clone(), job: e.dependent_job_name.clone() })
            .collect();
        external_upstreams.sort();
        external_upstreams.dedup();

        tasks.push(DagTask {
            job_id: job.id,
            name: name.clone(),
            namespace,
            owner: job.spec.owner.clone(),
            schedule: job.spec.schedule.clone(),
            behavior: job.spec.behavior.clone(),
            window: job.spec.task.window.clone(),
            plugin: job.spec.task.plugin_name.clone(),
            config: render_config(&job.spec.task.config, &project.config, &no_secrets),
            hooks: job.spec.hooks.clone(),
            upstreams: graph.upstreams(name).cloned().collect(),
            external_upstreams,
            http_sensors: job.spec.http_dependencies.clone(),
            downstreams: graph.downstreams(name).cloned().collect(),
            priority: priority(levels.get(name).copied().unwrap_or(0)),
        });
    }

    Ok(Dag { project_id, project: project.name.clone(), tasks })
}

#[cfg(test)]
#[path = "graph_tests.rs"]
mod tests;
