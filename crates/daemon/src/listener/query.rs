// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Read-only query handlers.

use tb_engine::EngineError;
use tb_wire::{Query, Response};

use crate::lifecycle::DaemonApi;

pub(super) fn handle_query(api: &DaemonApi, query: Query) -> Result<Response, EngineError> {
    let response = match query {
        Query::ListNamespaces { project } => Response::Namespaces { namespaces: api.list_namespaces(&project)? },
        Query::GetSecret { project, namespace, name } => {
            Response::Secret { secret: api.get_secret(&project, namespace.as_deref(), &name)? }
        }
        Query::ListSecrets { project, namespace } => {
            Response::Secrets { secrets: api.list_secrets(&project, namespace.as_deref())? }
        }
        Query::GetResource { project, name } => {
            Response::Resource { resource: Box::new(api.get_resource(&project, &name)?) }
        }
        Query::ListResources { project, namespace } => {
            Response::Resources { resources: api.list_resources(&project, namespace.as_deref())? }
        }
        Query::GetJob { project, name } => Response::Job { job: Box::new(api.get_job(&project, &name)?) },
        Query::ListJobs { project, namespace } => Response::Jobs { jobs: api.list_jobs(&project, namespace.as_deref())? },
        Query::GetDeployment { id } => Response::Deployment { deployment: api.get_deployment(&id)?, created: false },
        Query::ListDeployments { project, status } => {
            Response::Deployments { deployments: api.list_deployments(&project, status)? }
        }
        Query::PlanReplay { project, job, start, end, config } => {
            Response::Replay { replay: Box::new(api.plan_replay(&project, &job, start, end, config)?) }
        }
        Query::GetReplay { id } => Response::Replay { replay: Box::new(api.get_replay(&id)?) },
        Query::ListReplays { project, status } => Response::Replays { replays: api.list_replays(&project, status)? },
        Query::GetJobRuns { project, job, start, end } => {
            Response::Runs { runs: api.get_job_runs(&project, &job, start, end)? }
        }
        Query::UnknownDependencies { project } => {
            Response::UnknownDependencies { unknown: api.unknown_dependencies(&project)? }
        }
    };
    Ok(response)
}
