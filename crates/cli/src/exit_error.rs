// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Custom error type that carries a process exit code.
//!
//! Commands return `ExitError` instead of calling `std::process::exit()`
//! directly, allowing `main()` to handle process termination.

use std::fmt;

use tb_core::ErrorKind;

#[derive(Debug)]
pub struct ExitError {
    pub code: i32,
    pub message: String,
}

impl ExitError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }

    /// Exit code for an error of `kind`: 2 validation, 3 conflict, 4 not found, 1 otherwise.
    pub fn from_kind(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::new(kind.exit_code(), message)
    }
}

impl fmt::Display for ExitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ExitError {}

impl From<tb_specfile::SpecFileError> for ExitError {
    fn from(e: tb_specfile::SpecFileError) -> Self {
        Self::from_kind(e.kind(), e.to_string())
    }
}

impl From<tb_specfile::FindError> for ExitError {
    fn from(e: tb_specfile::FindError) -> Self {
        let kind = match &e {
            tb_specfile::FindError::SpecFile(inner) => inner.kind(),
            tb_specfile::FindError::Io(_) => ErrorKind::Internal,
            tb_specfile::FindError::Duplicate { .. } => ErrorKind::NameConflict,
            tb_specfile::FindError::NotFoundSkipped { .. } => ErrorKind::NotFound,
        };
        Self::from_kind(kind, e.to_string())
    }
}

#[cfg(test)]
#[path = "exit_error_tests.rs"]
mod tests;
