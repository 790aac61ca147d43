// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Writes compiled DAG tasks to an asset directory that a workflow engine
//! syncs from: one JSON file per task under `<root>/<project>/`, plus a
//! `runs.jsonl` request log for clears and triggers.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tb_core::DagTask;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::{SchedulerAdapter, SchedulerError};

const TASK_SUFFIX: &str = ".json";
const RUN_LOG: &str = "runs.jsonl";

#[derive(Clone)]
pub struct FileScheduler {
    root: PathBuf,
}

#[derive(Serialize)]
struct RunRequest<'a> {
    action: &'a str,
    job: &'a str,
    scheduled_at: DateTime<Utc>,
}

impl FileScheduler {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn project_dir(&self, project: &str) -> PathBuf {
        self.root.join(project)
    }

    async fn log_run(&self, project: &str, request: RunRequest<'_>) -> Result<(), SchedulerError> {
        let dir = self.project_dir(project);
        fs::create_dir_all(&dir).await?;
        let mut line = serde_json::to_vec(&request)?;
        line.push(b'\n');
        let mut file = fs::OpenOptions::new().create(true).append(true).open(dir.join(RUN_LOG)).await?;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), SchedulerError> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

#[async_trait]
impl SchedulerAdapter for FileScheduler {
    async fn deploy_task(&self, project: &str, task: &DagTask) -> Result<(), SchedulerError> {
        let dir = self.project_dir(project);
        fs::create_dir_all(&dir).await?;
        let bytes = serde_json::to_vec_pretty(task)?;
        write_atomic(&dir.join(format!("{}{TASK_SUFFIX}", task.name)), &bytes).await?;
        debug!(project, task = %task.name, "DAG task written");
        Ok(())
    }

    async fn remove_stale(&self, project: &str, keep: &[String]) -> Result<Vec<String>, SchedulerError> {
        let dir = self.project_dir(project);
        let mut removed = Vec::new();
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(removed),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name().to_string_lossy().to_string();
            let Some(task) = file_name.strip_suffix(TASK_SUFFIX) else { continue };
            if !keep.iter().any(|k| k == task) {
                fs::remove_file(entry.path()).await?;
                removed.push(task.to_string());
            }
        }
        removed.sort();
        if !removed.is_empty() {
            debug!(project, ?removed, "removed stale DAG tasks");
        }
        Ok(removed)
    }

    async fn clear(&self, project: &str, job: &str, scheduled_at: DateTime<Utc>) -> Result<(), SchedulerError> {
        self.log_run(project, RunRequest { action: "clear", job, scheduled_at }).await
    }

    async fn trigger(&self, project: &str, job: &str, scheduled_at: DateTime<Utc>) -> Result<(), SchedulerError> {
        self.log_run(project, RunRequest { action: "trigger", job, scheduled_at }).await
    }
}

#[cfg(test)]
#[path = "file_tests.rs"]
mod tests;
