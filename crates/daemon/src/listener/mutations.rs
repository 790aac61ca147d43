// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Mutation handlers that need more than a one-line mapping.

use tb_core::{JobSpec, WireEvent};
use tb_engine::EngineError;
use tb_storage::ResourceDraft;
use tb_wire::{ResourceInput, Response};
use tracing::warn;

use crate::lifecycle::DaemonApi;

pub(super) fn save_resource(
    api: &DaemonApi,
    project: &str,
    namespace: &str,
    input: ResourceInput,
) -> Result<Response, EngineError> {
    let draft = ResourceDraft {
        name: input.name,
        datastore: input.datastore,
        resource_type: input.resource_type,
        version: input.version,
        spec: input.spec,
        assets: input.assets,
        labels: input.labels,
    };
    let resource = api.save_resource(project, namespace, draft)?;
    Ok(Response::Resource { resource: Box::new(resource) })
}

pub(super) async fn upsert_job(
    api: &DaemonApi,
    project: &str,
    namespace: &str,
    spec: JobSpec,
) -> Result<Response, EngineError> {
    let write = api.upsert_job(project, namespace, spec).await?;
    Ok(Response::JobSaved { job: Box::new(write.job), deployment: write.deployment })
}

/// Ingest failures are logged here as well as returned; the workflow
/// engine posting them rarely surfaces responses.
pub(super) async fn ingest_event(
    api: &DaemonApi,
    project: &str,
    job: &str,
    event: &WireEvent,
) -> Result<Response, EngineError> {
    match api.ingest_event(project, job, event).await {
        Ok(receipt) => Ok(Response::Ingested {
            event: receipt.event.to_string(),
            job_run_id: receipt.job_run_id,
            attempt: receipt.attempt,
            duplicate: receipt.duplicate,
        }),
        Err(e) => {
            warn!(project, job, event = %event.event_type, kind = %e.kind(), error = %e, "event rejected");
            Err(e)
        }
    }
}
