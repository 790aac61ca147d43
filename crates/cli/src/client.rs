// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon client: one framed request/response exchange per connection.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tb_core::{
    DeploymentStatus, ErrorKind, Job, JobDeployment, JobSpec, Namespace, Project, Replay, ReplayConfig,
    ReplayStatus, RunListing, WireEvent,
};
use tb_wire::{DaemonStatus, ProtocolError, Query, Request, Response};
use thiserror::Error;
use tokio::net::UnixStream;

use crate::env;
use crate::exit_error::ExitError;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("could not determine state directory")]
    NoStateDir,
    #[error("daemon not running (no socket at {})", .0.display())]
    NotRunning(PathBuf),
    #[error("daemon did not answer within {0:?}")]
    Timeout(Duration),
    #[error("failed to start daemon: {0}")]
    StartFailed(String),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error("{message}")]
    Rejected { kind: ErrorKind, message: String },
    #[error("unexpected response: {0}")]
    Unexpected(String),
}

impl ClientError {
    pub fn is_not_running(&self) -> bool {
        match self {
            ClientError::NotRunning(_) => true,
            ClientError::Protocol(ProtocolError::Io(e)) => matches!(
                e.kind(),
                std::io::ErrorKind::ConnectionRefused | std::io::ErrorKind::NotFound
            ),
            _ => false,
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            ClientError::Rejected { kind, .. } => kind.exit_code(),
            _ => ErrorKind::Internal.exit_code(),
        }
    }
}

impl From<ClientError> for ExitError {
    fn from(e: ClientError) -> Self {
        ExitError::new(e.exit_code(), e.to_string())
    }
}

pub struct DaemonClient {
    socket_path: PathBuf,
    timeout: Duration,
}

impl DaemonClient {
    /// Client for the daemon of the current state directory. Fails fast
    /// when no socket exists.
    pub fn connect() -> Result<Self, ClientError> {
        let socket_path = env::state_dir()?.join(env::SOCKET_FILE);
        if !socket_path.exists() {
            return Err(ClientError::NotRunning(socket_path));
        }
        Ok(Self::at(socket_path, env::ipc_timeout()))
    }

    pub fn at(socket_path: PathBuf, timeout: Duration) -> Self {
        Self { socket_path, timeout }
    }

    /// Connect, spawning `tbd` in the background when nothing answers.
    pub async fn connect_or_start() -> Result<Self, ClientError> {
        if let Ok(client) = Self::connect() {
            if client.ping().await.is_ok() {
                return Ok(client);
            }
        }
        let state_dir = env::state_dir()?;
        spawn_daemon()?;
        let client = Self::at(state_dir.join(env::SOCKET_FILE), env::ipc_timeout());
        client.wait_until_ready(env::start_timeout()).await?;
        Ok(client)
    }

    async fn wait_until_ready(&self, limit: Duration) -> Result<(), ClientError> {
        let deadline = Instant::now() + limit;
        loop {
            if self.socket_path.exists() && self.ping().await.is_ok() {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(ClientError::StartFailed(format!("no answer on {} within {limit:?}", self.socket_path.display())));
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Send one request and read its response. Daemon-side errors come
    /// back as [`ClientError::Rejected`].
    pub async fn send(&self, request: &Request) -> Result<Response, ClientError> {
        let exchange = async {
            let stream = UnixStream::connect(&self.socket_path).await.map_err(ProtocolError::Io)?;
            let (mut reader, mut writer) = stream.into_split();
            tb_wire::write_request(&mut writer, request).await?;
            tb_wire::read_response(&mut reader).await
        };
        let response = tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| ClientError::Timeout(self.timeout))??;
        match response {
            Response::Error { kind, message } => Err(ClientError::Rejected { kind, message }),
            other => Ok(other),
        }
    }

    async fn query(&self, query: Query) -> Result<Response, ClientError> {
        self.send(&Request::Query { query }).await
    }

    fn reject(other: Response) -> ClientError {
        ClientError::Unexpected(format!("{other:?}"))
    }

    pub async fn ping(&self) -> Result<(), ClientError> {
        match self.send(&Request::Ping).await? {
            Response::Pong => Ok(()),
            other => Err(Self::reject(other)),
        }
    }

    pub async fn hello(&self) -> Result<String, ClientError> {
        let request = Request::Hello { version: env!("CARGO_PKG_VERSION").to_string() };
        match self.send(&request).await? {
            Response::Hello { version } => Ok(version),
            other => Err(Self::reject(other)),
        }
    }

    pub async fn status(&self) -> Result<DaemonStatus, ClientError> {
        match self.send(&Request::Status).await? {
            Response::Status { status } => Ok(status),
            other => Err(Self::reject(other)),
        }
    }

    pub async fn shutdown(&self) -> Result<(), ClientError> {
        match self.send(&Request::Shutdown).await? {
            Response::ShuttingDown | Response::Ok => Ok(()),
            other => Err(Self::reject(other)),
        }
    }

    pub async fn register_project(
        &self,
        name: &str,
        config: std::collections::BTreeMap<String, String>,
    ) -> Result<Project, ClientError> {
        match self.send(&Request::RegisterProject { name: name.to_string(), config }).await? {
            Response::Project { project } => Ok(project),
            other => Err(Self::reject(other)),
        }
    }

    pub async fn register_namespace(
        &self,
        project: &str,
        name: &str,
        config: std::collections::BTreeMap<String, String>,
    ) -> Result<Namespace, ClientError> {
        let request = Request::RegisterNamespace { project: project.to_string(), name: name.to_string(), config };
        match self.send(&request).await? {
            Response::Namespace { namespace } => Ok(namespace),
            other => Err(Self::reject(other)),
        }
    }

    pub async fn upsert_job(
        &self,
        project: &str,
        namespace: &str,
        spec: JobSpec,
    ) -> Result<(Job, JobDeployment), ClientError> {
        let request =
            Request::UpsertJob { project: project.to_string(), namespace: namespace.to_string(), spec: Box::new(spec) };
        match self.send(&request).await? {
            Response::JobSaved { job, deployment } => Ok((*job, deployment)),
            other => Err(Self::reject(other)),
        }
    }

    pub async fn validate_job(&self, project: &str, spec: JobSpec) -> Result<(), ClientError> {
        match self.send(&Request::ValidateJob { project: project.to_string(), spec: Box::new(spec) }).await? {
            Response::Ok => Ok(()),
            other => Err(Self::reject(other)),
        }
    }

    pub async fn delete_job(&self, project: &str, name: &str) -> Result<JobDeployment, ClientError> {
        match self.send(&Request::DeleteJob { project: project.to_string(), name: name.to_string() }).await? {
            Response::Deployment { deployment, .. } => Ok(deployment),
            other => Err(Self::reject(other)),
        }
    }

    pub async fn list_jobs(&self, project: &str, namespace: Option<&str>) -> Result<Vec<Job>, ClientError> {
        let query = Query::ListJobs { project: project.to_string(), namespace: namespace.map(str::to_string) };
        match self.query(query).await? {
            Response::Jobs { jobs } => Ok(jobs),
            other => Err(Self::reject(other)),
        }
    }

    /// Returns the deployment and whether it was newly queued.
    pub async fn deploy_project(&self, project: &str) -> Result<(JobDeployment, bool), ClientError> {
        match self.send(&Request::DeployProject { project: project.to_string() }).await? {
            Response::Deployment { deployment, created } => Ok((deployment, created)),
            other => Err(Self::reject(other)),
        }
    }

    pub async fn get_deployment(&self, id: &str) -> Result<JobDeployment, ClientError> {
        match self.query(Query::GetDeployment { id: id.to_string() }).await? {
            Response::Deployment { deployment, .. } => Ok(deployment),
            other => Err(Self::reject(other)),
        }
    }

    pub async fn list_deployments(
        &self,
        project: &str,
        status: Option<DeploymentStatus>,
    ) -> Result<Vec<JobDeployment>, ClientError> {
        match self.query(Query::ListDeployments { project: project.to_string(), status }).await? {
            Response::Deployments { deployments } => Ok(deployments),
            other => Err(Self::reject(other)),
        }
    }

    pub async fn cancel_deployment(&self, id: &str) -> Result<JobDeployment, ClientError> {
        match self.send(&Request::CancelDeployment { id: id.to_string() }).await? {
            Response::Deployment { deployment, .. } => Ok(deployment),
            other => Err(Self::reject(other)),
        }
    }

    pub async fn submit_replay(
        &self,
        project: &str,
        job: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        config: ReplayConfig,
    ) -> Result<Replay, ClientError> {
        let request =
            Request::SubmitReplay { project: project.to_string(), job: job.to_string(), start, end, config };
        match self.send(&request).await? {
            Response::Replay { replay } => Ok(*replay),
            other => Err(Self::reject(other)),
        }
    }

    pub async fn plan_replay(
        &self,
        project: &str,
        job: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        config: ReplayConfig,
    ) -> Result<Replay, ClientError> {
        let query = Query::PlanReplay { project: project.to_string(), job: job.to_string(), start, end, config };
        match self.query(query).await? {
            Response::Replay { replay } => Ok(*replay),
            other => Err(Self::reject(other)),
        }
    }

    pub async fn get_replay(&self, id: &str) -> Result<Replay, ClientError> {
        match self.query(Query::GetReplay { id: id.to_string() }).await? {
            Response::Replay { replay } => Ok(*replay),
            other => Err(Self::reject(other)),
        }
    }

    pub async fn list_replays(&self, project: &str, status: Option<ReplayStatus>) -> Result<Vec<Replay>, ClientError> {
        match self.query(Query::ListReplays { project: project.to_string(), status }).await? {
            Response::Replays { replays } => Ok(replays),
            other => Err(Self::reject(other)),
        }
    }

    pub async fn cancel_replay(&self, id: &str) -> Result<Replay, ClientError> {
        match self.send(&Request::CancelReplay { id: id.to_string() }).await? {
            Response::Replay { replay } => Ok(*replay),
            other => Err(Self::reject(other)),
        }
    }

    pub async fn ingest_event(&self, project: &str, job: &str, event: WireEvent) -> Result<Response, ClientError> {
        match self.send(&Request::IngestEvent { project: project.to_string(), job: job.to_string(), event }).await? {
            ingested @ Response::Ingested { .. } => Ok(ingested),
            other => Err(Self::reject(other)),
        }
    }

    pub async fn get_job_runs(
        &self,
        project: &str,
        job: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<RunListing>, ClientError> {
        let query = Query::GetJobRuns { project: project.to_string(), job: job.to_string(), start, end };
        match self.query(query).await? {
            Response::Runs { runs } => Ok(runs),
            other => Err(Self::reject(other)),
        }
    }
}

/// Spawn `tbd run` detached from this terminal.
fn spawn_daemon() -> Result<(), ClientError> {
    let binary = find_tbd_binary();
    Command::new(&binary)
        .arg("run")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map(|_| ())
        .map_err(|e| ClientError::StartFailed(format!("{}: {e}", binary.display())))
}

/// TB_DAEMON_BINARY, else a `tbd` next to this executable, else PATH.
pub fn find_tbd_binary() -> PathBuf {
    if let Some(explicit) = env::daemon_binary() {
        return explicit;
    }
    if let Some(sibling) = std::env::current_exe().ok().and_then(|exe| exe.parent().map(|d| d.join("tbd"))) {
        if sibling.exists() {
            return sibling;
        }
    }
    PathBuf::from("tbd")
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
