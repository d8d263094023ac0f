//! Structured error types for mxsym
//!
//! Using thiserror for automatic Display implementation and error chaining.
//! Fatal errors (`ReportError`, `SymbolFileError`) abort the run; `LocateError`
//! and `TranslateError` only ever degrade the frames of one binary.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

/// The report file could not be turned into a `DiagnosticReport`.
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Failed to read report file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Report is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed report: missing `{field}` in {location}")]
    MissingField { field: &'static str, location: String },

    #[error("Malformed report: `{field}` in {location} must be {expected}")]
    InvalidField { field: &'static str, location: String, expected: &'static str },
}

/// The application's own symbol file is unusable. Always fatal.
#[derive(Error, Debug)]
pub enum SymbolFileError {
    #[error("Symbol file '{}' does not exist", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read symbol file '{}'", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("'{}' is not a Mach-O file: {reason}", .path.display())]
    NotMachO { path: PathBuf, reason: String },

    #[error("'{}' has no LC_UUID load command", .0.display())]
    NoUuid(PathBuf),

    #[error("Cannot infer the binary name from '{}'; pass --binary-name", .0.display())]
    NoBinaryName(PathBuf),
}

/// A system binary's symbol file could not be located.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LocateError {
    #[error("no device support directory for this OS version")]
    NoDeviceSupport,

    #[error("symbols not found")]
    NotFound,

    #[error("UUID mismatch ({} candidate(s) checked)", .candidates.len())]
    UuidMismatch { candidates: Vec<(PathBuf, Vec<Uuid>)> },
}

/// The external translation utility failed for one batch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TranslateError {
    #[error("failed to launch {program}: {message}")]
    Spawn { program: String, message: String },

    #[error("{program} timed out after {}s", .timeout.as_secs())]
    Timeout { program: String, timeout: Duration },

    #[error("{program} exited with {status}: {stderr}")]
    Failed { program: String, status: String, stderr: String },

    #[error("{program} produced non UTF-8 output")]
    InvalidOutput { program: String },

    #[error("expected {expected} output lines, got {actual}")]
    LineCountMismatch { expected: usize, actual: usize },
}
