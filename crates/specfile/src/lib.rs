// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job spec files: TOML and HCL parsing, directory defaults, and discovery.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod find;
mod parser;

pub use find::{
    collect_job_specs, find_job_spec, format_for_path, load_job_spec, read_assets, read_job_file, Collected,
    FindError, LoadedSpec, ASSET_DIR, DEFAULTS_FILE_STEM, JOB_FILE_STEM,
};
pub use parser::{parse_date, Format, JobFile, SpecFileError};

use tb_core::JobSpec;

/// Parse a TOML job spec.
pub fn parse_job_spec(content: &str) -> Result<JobSpec, SpecFileError> {
    parse_job_spec_with_format(content, Format::Toml)
}

/// Parse a job spec in the given format.
pub fn parse_job_spec_with_format(content: &str, format: Format) -> Result<JobSpec, SpecFileError> {
    JobFile::parse(content, format)?.into_spec()
}
