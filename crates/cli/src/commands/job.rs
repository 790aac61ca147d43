// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `tb job` - job spec management

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use tb_core::{DeploymentStatus, JobDeployment};

use super::parse_time;
use crate::client::DaemonClient;
use crate::color;
use crate::exit_error::ExitError;
use crate::output::{format_or_json, format_time, handle_list, OutputFormat, Table};

#[derive(Args)]
pub struct JobArgs {
    #[command(subcommand)]
    pub command: JobCommand,
}

#[derive(Subcommand)]
pub enum JobCommand {
    /// Create or update a job from a spec file or job directory
    Create {
        /// `job.toml` / `job.hcl`, or the directory holding it
        path: PathBuf,
        #[arg(short, long)]
        project: String,
        #[arg(short, long)]
        namespace: String,
    },
    /// Delete a job and queue a redeploy of its project
    Delete {
        name: String,
        #[arg(short, long)]
        project: String,
    },
    /// List a project's jobs
    List {
        #[arg(short, long)]
        project: String,
        #[arg(short, long)]
        namespace: Option<String>,
    },
    /// Deploy a project, optionally uploading every spec under a directory first
    Deploy {
        #[arg(short, long)]
        project: String,
        /// Spec root to upload before deploying
        #[arg(long, requires = "namespace")]
        dir: Option<PathBuf>,
        #[arg(short, long)]
        namespace: Option<String>,
        /// Wait until the deployment finishes
        #[arg(long)]
        wait: bool,
    },
    /// Validate a spec file, locally and against the project
    Validate {
        path: PathBuf,
        #[arg(short, long, required_unless_present = "local")]
        project: Option<String>,
        /// Only check the file itself; do not contact the daemon
        #[arg(long)]
        local: bool,
    },
    /// Expected and actual runs of a job in a time range
    Runs {
        name: String,
        #[arg(short, long)]
        project: String,
        #[arg(long, value_parser = parse_time)]
        start: DateTime<Utc>,
        #[arg(long, value_parser = parse_time)]
        end: DateTime<Utc>,
    },
}

pub async fn handle(command: JobCommand, format: OutputFormat) -> Result<()> {
    match command {
        JobCommand::Create { path, project, namespace } => {
            let loaded = tb_specfile::load_job_spec(&path)?;
            let client = DaemonClient::connect()?;
            let (job, deployment) = client.upsert_job(&project, &namespace, loaded.spec).await?;
            let obj = serde_json::json!({ "job": job, "deployment": deployment });
            format_or_json(format, &obj, || {
                println!(
                    "Job '{}' saved; deployment {} {}",
                    color::header(&job.spec.name),
                    color::muted(&deployment.id.short(8)),
                    color::status(&deployment.status.to_string())
                );
            })
        }
        JobCommand::Delete { name, project } => {
            let client = DaemonClient::connect()?;
            let deployment = client.delete_job(&project, &name).await?;
            format_or_json(format, &deployment, || {
                println!("Job '{}' deleted; deployment {} queued", name, color::muted(&deployment.id.short(8)));
            })
        }
        JobCommand::List { project, namespace } => {
            let client = DaemonClient::connect()?;
            let jobs = client.list_jobs(&project, namespace.as_deref()).await?;
            handle_list(format, &jobs, "No jobs found", |items, out| {
                let mut table = Table::new(vec!["NAME", "TASK", "SCHEDULE", "OWNER", "DESTINATION"]);
                for job in items {
                    table.row(vec![
                        job.spec.name.clone(),
                        job.spec.task.plugin_name.clone(),
                        job.spec.schedule.interval.clone(),
                        job.spec.owner.clone(),
                        job.destination_urn.clone(),
                    ]);
                }
                table.render(out);
            })
        }
        JobCommand::Deploy { project, dir, namespace, wait } => {
            let client = DaemonClient::connect()?;
            if let (Some(dir), Some(namespace)) = (dir, namespace) {
                upload(&client, &project, &namespace, &dir).await?;
            }
            let (deployment, created) = client.deploy_project(&project).await?;
            if !created && format == OutputFormat::Text {
                println!("Deployment already queued for {project}");
            }
            let deployment = if wait { wait_for_deployment(&client, deployment).await? } else { deployment };
            format_or_json(format, &deployment, || print_deployment(&deployment, &mut std::io::stdout()))?;
            if deployment.status == DeploymentStatus::Failed {
                return Err(ExitError::new(1, "deployment failed").into());
            }
            Ok(())
        }
        JobCommand::Validate { path, project, local } => {
            let loaded = tb_specfile::load_job_spec(&path)?;
            if !local {
                if let Some(project) = project {
                    DaemonClient::connect()?.validate_job(&project, loaded.spec.clone()).await?;
                }
            }
            let obj = serde_json::json!({ "valid": true, "name": loaded.spec.name });
            format_or_json(format, &obj, || println!("Job '{}' is valid", loaded.spec.name))
        }
        JobCommand::Runs { name, project, start, end } => {
            let client = DaemonClient::connect()?;
            let runs = client.get_job_runs(&project, &name, start, end).await?;
            handle_list(format, &runs, "No runs in range", |items, out| {
                let mut table = Table::new(vec!["SCHEDULED", "STATUS", "ATTEMPT", "DURATION"]);
                for run in items {
                    table.row(vec![
                        format_time(run.scheduled_at),
                        color::status(&run.status.to_string()),
                        run.attempt.to_string(),
                        run.duration_ms.map(|ms| format!("{}s", ms / 1000)).unwrap_or_else(|| "-".to_string()),
                    ]);
                }
                table.render(out);
            })
        }
    }
}

/// Upsert every spec under `dir`. Invalid files are reported and skipped.
async fn upload(client: &DaemonClient, project: &str, namespace: &str, dir: &std::path::Path) -> Result<()> {
    let collected = tb_specfile::collect_job_specs(dir)?;
    for (path, error) in &collected.skipped {
        eprintln!("skipped {}: {error}", path.display());
    }
    for loaded in collected.specs {
        let name = loaded.spec.name.clone();
        client.upsert_job(project, namespace, loaded.spec).await?;
        eprintln!("uploaded {name}");
    }
    Ok(())
}

async fn wait_for_deployment(client: &DaemonClient, mut deployment: JobDeployment) -> Result<JobDeployment> {
    let id = deployment.id.to_string();
    while !deployment.status.is_terminal() {
        tokio::time::sleep(Duration::from_millis(200)).await;
        deployment = client.get_deployment(&id).await?;
    }
    Ok(deployment)
}

pub(crate) fn print_deployment(deployment: &JobDeployment, out: &mut dyn Write) {
    let _ = writeln!(out, "Deployment: {}", deployment.id);
    let _ = writeln!(out, "Status:     {}", color::status(&deployment.status.to_string()));
    let _ = writeln!(out, "Created:    {}", format_time(deployment.created_at));
    let details = &deployment.details;
    if deployment.status.is_terminal() {
        let _ = writeln!(out, "Succeeded:  {}", details.success_count);
        let _ = writeln!(out, "Failed:     {}", details.failure_count);
    }
    for failure in &details.failures {
        let target = if failure.job_name.is_empty() { "project" } else { failure.job_name.as_str() };
        let _ = writeln!(out, "  {}: {}", color::header(target), failure.message);
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
