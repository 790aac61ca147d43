// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Project, namespace, secret and resource handlers.

use tb_core::{Event, Namespace, NamespaceId, Project, ProjectId, Resource, Secret};

use super::MaterializedState;

pub(crate) fn apply(state: &mut MaterializedState, event: &Event) {
    match event {
        Event::ProjectRegistered { project } => {
            state.projects.insert(project.id, project.clone());
        }
        Event::NamespaceRegistered { namespace } => {
            state.namespaces.insert(namespace.id, namespace.clone());
        }
        Event::SecretSaved { secret } => {
            state.secrets.insert(secret.id, secret.clone());
        }
        Event::SecretDeleted { id } => {
            state.secrets.remove(id);
        }
        Event::ResourceSaved { resource } => {
            state.resources.insert(resource.id, resource.clone());
        }
        Event::ResourceDeleted { id } => {
            state.resources.remove(id);
        }
        _ => {}
    }
}

impl MaterializedState {
    pub fn project_by_name(&self, name: &str) -> Option<&Project> {
        self.projects.values().find(|p| p.name == name)
    }

    pub fn namespace_by_name(&self, project_id: ProjectId, name: &str) -> Option<&Namespace> {
        self.namespaces.values().find(|n| n.project_id == project_id && n.name == name)
    }

    /// Namespaces of a project, sorted by name.
    pub fn namespaces_of(&self, project_id: ProjectId) -> Vec<&Namespace> {
        let mut out: Vec<_> = self.namespaces.values().filter(|n| n.project_id == project_id).collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }

    /// A secret stored at exactly this scope (no fallback).
    pub fn secret_at(&self, project_id: ProjectId, namespace_id: Option<NamespaceId>, name: &str) -> Option<&Secret> {
        self.secrets
            .values()
            .find(|s| s.project_id == project_id && s.namespace_id == namespace_id && s.name == name)
    }

    /// Resolve a secret as a job in `namespace_id` sees it: a namespace
    /// secret shadows the project secret of the same name.
    pub fn secret(&self, project_id: ProjectId, namespace_id: Option<NamespaceId>, name: &str) -> Option<&Secret> {
        namespace_id
            .and_then(|ns| self.secret_at(project_id, Some(ns), name))
            .or_else(|| self.secret_at(project_id, None, name))
    }

    /// Secrets visible from a scope after shadowing, sorted by name.
    pub fn secrets_visible(&self, project_id: ProjectId, namespace_id: Option<NamespaceId>) -> Vec<&Secret> {
        let mut out: Vec<&Secret> = self
            .secrets
            .values()
            .filter(|s| s.project_id == project_id)
            .filter(|s| match s.namespace_id {
                None => namespace_id.is_none() || self.secret_at(project_id, namespace_id, &s.name).is_none(),
                Some(ns) => Some(ns) == namespace_id,
            })
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }

    pub fn resource_by_name(&self, project_id: ProjectId, name: &str) -> Option<&Resource> {
        self.resources.values().find(|r| r.project_id == project_id && r.name == name)
    }

    pub fn resource_by_urn(&self, urn: &str) -> Option<&Resource> {
        self.resources.values().find(|r| r.urn == urn)
    }

    /// Resources of a project, optionally narrowed to a namespace, sorted by name.
    pub fn resources_of(&self, project_id: ProjectId, namespace_id: Option<NamespaceId>) -> Vec<&Resource> {
        let mut out: Vec<_> = self
            .resources
            .values()
            .filter(|r| r.project_id == project_id && namespace_id.is_none_or(|ns| r.namespace_id == ns))
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }
}
