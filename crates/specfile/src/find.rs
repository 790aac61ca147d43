// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Spec directory discovery.
//!
//! A job lives in its own directory as `job.toml` or `job.hcl`, with asset
//! files under `assets/`. A `this.toml` / `this.hcl` file supplies defaults
//! for every job at or below its directory; the nearest one wins.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tb_core::JobSpec;
use thiserror::Error;

use crate::parser::{Format, JobFile, SpecFileError};

pub const JOB_FILE_STEM: &str = "job";
pub const DEFAULTS_FILE_STEM: &str = "this";
pub const ASSET_DIR: &str = "assets";

/// A parsed job spec and the directory it was read from.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedSpec {
    pub dir: PathBuf,
    pub spec: JobSpec,
}

/// Every valid spec under a root, plus the files that failed.
#[derive(Debug, Default)]
pub struct Collected {
    pub specs: Vec<LoadedSpec>,
    pub skipped: Vec<(PathBuf, String)>,
}

/// Errors from spec directory scanning
#[derive(Debug, Error)]
pub enum FindError {
    #[error("job '{name}' defined in both {} and {}", first.display(), second.display())]
    Duplicate { name: String, first: PathBuf, second: PathBuf },
    #[error("job '{name}' not found; {count} spec(s) skipped due to errors:\n{details}")]
    NotFoundSkipped { name: String, count: usize, details: String },
    #[error(transparent)]
    SpecFile(#[from] SpecFileError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub fn format_for_path(path: &Path) -> Option<Format> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => Some(Format::Toml),
        Some("hcl") => Some(Format::Hcl),
        _ => None,
    }
}

/// Read and decode one spec file, picking the syntax from its extension.
pub fn read_job_file(path: &Path) -> Result<JobFile, SpecFileError> {
    let format = format_for_path(path).ok_or_else(|| SpecFileError::UnsupportedFormat(path.to_path_buf()))?;
    let content = std::fs::read_to_string(path).map_err(|e| SpecFileError::io(path, e))?;
    JobFile::parse(&content, format)
}

/// Load a single job from a spec file, or from a directory holding one.
/// Directory defaults are not applied.
pub fn load_job_spec(path: &Path) -> Result<LoadedSpec, SpecFileError> {
    let file = if path.is_dir() {
        stem_file(path, JOB_FILE_STEM).ok_or_else(|| SpecFileError::Missing("job.toml or job.hcl"))?
    } else {
        path.to_path_buf()
    };
    let dir = file.parent().map(Path::to_path_buf).unwrap_or_default();
    let job = read_job_file(&file)?;
    finish(job, &dir)
}

/// Load every job under `root`, applying directory defaults. Unreadable or
/// invalid specs are logged and reported in [`Collected::skipped`].
pub fn collect_job_specs(root: &Path) -> Result<Collected, FindError> {
    let mut collected = Collected::default();
    if !root.exists() {
        return Ok(collected);
    }
    let tree = scan(root)?;

    let mut defaults: BTreeMap<&Path, JobFile> = BTreeMap::new();
    for (dir, file) in &tree.defaults {
        match read_job_file(file) {
            Ok(parsed) => {
                defaults.insert(dir.as_path(), parsed);
            }
            Err(e) => {
                tracing::warn!(path = %file.display(), error = %e, "skipping invalid defaults file");
                collected.skipped.push((file.clone(), e.to_string()));
            }
        }
    }

    let mut seen: BTreeMap<String, PathBuf> = BTreeMap::new();
    for file in &tree.jobs {
        let dir = file.parent().unwrap_or(root);
        let loaded = read_job_file(file).and_then(|mut job| {
            for ancestor in dir.ancestors() {
                if let Some(parent) = defaults.get(ancestor) {
                    job.merge_from(parent);
                }
                if ancestor == root {
                    break;
                }
            }
            finish(job, dir)
        });
        let loaded = match loaded {
            Ok(loaded) => loaded,
            Err(e) => {
                tracing::warn!(path = %file.display(), error = %e, "skipping invalid job spec");
                collected.skipped.push((file.clone(), e.to_string()));
                continue;
            }
        };
        if let Some(first) = seen.insert(loaded.spec.name.clone(), file.clone()) {
            return Err(FindError::Duplicate { name: loaded.spec.name, first, second: file.clone() });
        }
        collected.specs.push(loaded);
    }
    collected.specs.sort_by(|a, b| a.spec.name.cmp(&b.spec.name));
    Ok(collected)
}

/// Find the job named `name` under `root`.
pub fn find_job_spec(root: &Path, name: &str) -> Result<Option<LoadedSpec>, FindError> {
    let collected = collect_job_specs(root)?;
    if let Some(found) = collected.specs.into_iter().find(|l| l.spec.name == name) {
        return Ok(Some(found));
    }
    if !collected.skipped.is_empty() {
        let details = collected
            .skipped
            .iter()
            .map(|(p, e)| format!("  {}: {e}", p.display()))
            .collect::<Vec<_>>()
            .join("\n");
        return Err(FindError::NotFoundSkipped { name: name.to_string(), count: collected.skipped.len(), details });
    }
    Ok(None)
}

/// Attach files under `dir/assets/`. Inline assets win over files.
fn finish(mut job: JobFile, dir: &Path) -> Result<LoadedSpec, SpecFileError> {
    for (name, content) in read_assets(&dir.join(ASSET_DIR))? {
        job.assets.entry(name).or_insert(content);
    }
    Ok(LoadedSpec { dir: dir.to_path_buf(), spec: job.into_spec()? })
}

/// Asset files keyed by their `/`-separated path relative to `asset_dir`.
pub fn read_assets(asset_dir: &Path) -> Result<BTreeMap<String, String>, SpecFileError> {
    let mut assets = BTreeMap::new();
    if !asset_dir.is_dir() {
        return Ok(assets);
    }
    let mut stack = vec![asset_dir.to_path_buf()];
    while let Some(current) = stack.pop() {
        let entries = std::fs::read_dir(&current).map_err(|e| SpecFileError::io(&current, e))?;
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
                continue;
            }
            let Ok(relative) = path.strip_prefix(asset_dir) else { continue };
            let key = relative.components().map(|c| c.as_os_str().to_string_lossy()).collect::<Vec<_>>().join("/");
            let content = std::fs::read_to_string(&path).map_err(|e| SpecFileError::io(&path, e))?;
            assets.insert(key, content);
        }
    }
    Ok(assets)
}

struct Tree {
    jobs: Vec<PathBuf>,
    defaults: Vec<(PathBuf, PathBuf)>,
}

fn scan(root: &Path) -> Result<Tree, std::io::Error> {
    let mut tree = Tree { jobs: Vec::new(), defaults: Vec::new() };
    let mut stack = vec![root.to_path_buf()];
    while let Some(current) = stack.pop() {
        if let Some(file) = stem_file(&current, JOB_FILE_STEM) {
            tree.jobs.push(file);
        }
        if let Some(file) = stem_file(&current, DEFAULTS_FILE_STEM) {
            tree.defaults.push((current.clone(), file));
        }
        for entry in std::fs::read_dir(&current)?.flatten() {
            let path = entry.path();
            if path.is_dir() && entry.file_name() != ASSET_DIR {
                stack.push(path);
            }
        }
    }
    tree.jobs.sort();
    Ok(tree)
}

/// `dir/<stem>.toml`, else `dir/<stem>.hcl`.
fn stem_file(dir: &Path, stem: &str) -> Option<PathBuf> {
    ["toml", "hcl"].iter().map(|ext| dir.join(format!("{stem}.{ext}"))).find(|p| p.is_file())
}

#[cfg(test)]
#[path = "find_tests.rs"]
mod tests;
