// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Listener task for handling socket I/O.
//!
//! The Listener runs in a spawned task, accepting connections and handing
//! each one request to the control plane.

mod mutations;
mod query;

use std::sync::Arc;
use std::time::Instant;

use tb_core::DeploymentStatus;
use tb_engine::EngineError;
use tb_wire::{self as wire, DaemonStatus, ProtocolError, Request, Response};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tokio::net::UnixListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::env::{ipc_timeout, PROTOCOL_VERSION};
use crate::lifecycle::DaemonApi;

/// Shared daemon context for all request handlers.
pub struct ListenCtx {
    pub api: Arc<DaemonApi>,
    pub start_time: Instant,
    /// Cancelled by a `Shutdown` request
    pub shutdown: CancellationToken,
}

/// Listener task for accepting socket connections.
pub struct Listener {
    unix: UnixListener,
    ctx: Arc<ListenCtx>,
}

/// Errors from connection handling.
#[derive(Debug, Error)]
pub(crate) enum ConnectionError {
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Connection timeout")]
    Timeout,
}

impl Listener {
    pub fn new(unix: UnixListener, ctx: Arc<ListenCtx>) -> Self {
        Self { unix, ctx }
    }

    /// Run the listener loop until shutdown, spawning tasks for each connection.
    pub async fn run(self) {
        let shutdown = self.ctx.shutdown.clone();
        loop {
            tokio::select! {
                result = self.unix.accept() => match result {
                    Ok((stream, _)) => {
                        let ctx = Arc::clone(&self.ctx);
                        tokio::spawn(async move {
                            let (reader, writer) = stream.into_split();
                            if let Err(e) = handle_connection(reader, writer, &ctx).await {
                                log_connection_error(e);
                            }
                        });
                    }
                    Err(e) => error!("Unix accept error: {}", e),
                },
                _ = shutdown.cancelled() => break,
            }
        }
        debug!("listener stopped");
    }
}

fn log_connection_error(e: ConnectionError) {
    match e {
        ConnectionError::Protocol(ProtocolError::ConnectionClosed) => debug!("Client disconnected"),
        ConnectionError::Timeout => warn!("Connection timeout"),
        _ => error!("Connection error: {}", e),
    }
}

/// Handle a single client connection.
///
/// The handler races client disconnect detection; if the client goes away
/// first the handler is dropped. Work already committed to the store stays
/// committed.
pub(crate) async fn handle_connection<R, W>(mut reader: R, mut writer: W, ctx: &ListenCtx) -> Result<(), ConnectionError>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    let request = tokio::time::timeout(ipc_timeout(), wire::read_request(&mut reader))
        .await
        .map_err(|_| ConnectionError::Timeout)??;

    // Log queries at debug level (frequent polling), other requests at info
    if matches!(request, Request::Query { .. } | Request::Ping | Request::Status) {
        debug!(request = ?request, "received query");
    } else {
        info!(request = ?request, "received request");
    }

    let response = tokio::select! {
        response = handle_request(request, ctx) => response,
        _ = detect_client_disconnect(&mut reader) => {
            debug!("Client disconnected, cancelling handler");
            return Ok(());
        }
    };

    debug!("Sending response: {:?}", response);
    tokio::time::timeout(ipc_timeout(), wire::write_response(&mut writer, &response))
        .await
        .map_err(|_| ConnectionError::Timeout)??;
    Ok(())
}

/// In the request-response protocol the client sends one request then
/// waits; a read returning here means EOF or a protocol violation.
async fn detect_client_disconnect<R: AsyncRead + Unpin>(reader: &mut R) {
    let mut buf = [0u8; 1];
    let _ = reader.read(&mut buf).await;
}

/// Handle a single request. Control plane errors become `Response::Error`
/// carrying their kind.
pub(crate) async fn handle_request(request: Request, ctx: &ListenCtx) -> Response {
    match dispatch(request, ctx).await {
        Ok(response) => response,
        Err(e) => {
            debug!(kind = %e.kind(), error = %e, "request failed");
            Response::error(e.kind(), e.to_string())
        }
    }
}

async fn dispatch(request: Request, ctx: &ListenCtx) -> Result<Response, EngineError> {
    let api = ctx.api.as_ref();
    match request {
        Request::Ping => Ok(Response::Pong),

        Request::Hello { version } => {
            if version != PROTOCOL_VERSION {
                warn!(client = %version, daemon = PROTOCOL_VERSION, "client version differs");
            }
            Ok(Response::Hello { version: PROTOCOL_VERSION.to_string() })
        }

        Request::Status => Ok(Response::Status { status: status(ctx) }),

        Request::Shutdown => {
            ctx.shutdown.cancel();
            Ok(Response::ShuttingDown)
        }

        Request::Query { query } => query::handle_query(api, query),

        Request::RegisterProject { name, config } => {
            Ok(Response::Project { project: api.register_project(&name, config)? })
        }

        Request::RegisterNamespace { project, name, config } => {
            Ok(Response::Namespace { namespace: api.register_namespace(&project, &name, config)? })
        }

        Request::SaveSecret { project, namespace, name, value, secret_type } => {
            let secret = api.save_secret(&project, namespace.as_deref(), &name, &value, secret_type)?;
            Ok(Response::Secret { secret })
        }

        Request::DeleteSecret { project, namespace, name } => {
            api.delete_secret(&project, namespace.as_deref(), &name)?;
            Ok(Response::Ok)
        }

        Request::SaveResource { project, namespace, resource } => {
            mutations::save_resource(api, &project, &namespace, resource)
        }

        Request::DeleteResource { project, name } => {
            api.delete_resource(&project, &name)?;
            Ok(Response::Ok)
        }

        Request::UpsertJob { project, namespace, spec } => mutations::upsert_job(api, &project, &namespace, *spec).await,

        Request::ValidateJob { project, spec } => {
            api.validate_job(&project, &spec).await?;
            Ok(Response::Ok)
        }

        Request::DeleteJob { project, name } => {
            let deployment = api.delete_job(&project, &name)?;
            Ok(Response::Deployment { deployment, created: true })
        }

        Request::DeployProject { project } => {
            let (deployment, created) = api.deploy_project(&project)?;
            Ok(Response::Deployment { deployment, created })
        }

        Request::CancelDeployment { id } => {
            Ok(Response::Deployment { deployment: api.cancel_deployment(&id)?, created: false })
        }

        Request::SubmitReplay { project, job, start, end, config } => {
            let replay = api.submit_replay(&project, &job, start, end, config)?;
            Ok(Response::Replay { replay: Box::new(replay) })
        }

        Request::CancelReplay { id } => Ok(Response::Replay { replay: Box::new(api.cancel_replay(&id)?) }),

        Request::IngestEvent { project, job, event } => mutations::ingest_event(api, &project, &job, &event).await,

        Request::DeleteRuns { project, job } => {
            Ok(Response::RunsDeleted { count: api.delete_all_runs_by_job(&project, &job)? })
        }
    }
}

fn status(ctx: &ListenCtx) -> DaemonStatus {
    let store = ctx.api.store();
    let wal_seq = store.processed_seq();
    store.read(|s| DaemonStatus {
        version: PROTOCOL_VERSION.to_string(),
        uptime_secs: ctx.start_time.elapsed().as_secs(),
        projects: s.projects.len(),
        jobs: s.jobs.len(),
        queued_deployments: s.deployments.values().filter(|d| d.status == DeploymentStatus::InQueue).count(),
        active_replays: s.replays.values().filter(|r| !r.status.is_terminal()).count(),
        wal_seq,
    })
}

#[cfg(test)]
#[path = "../listener_tests.rs"]
mod tests;
