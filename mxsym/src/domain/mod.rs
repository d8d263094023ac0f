//! Domain model for mxsym
//!
//! This module contains core domain types and errors that provide:
//! - Identity of binary images across the pipeline
//! - OS version parsing shared by the report model and the locator
//! - Structured error handling

pub mod errors;
pub mod types;

// Re-export common types for convenience
pub use types::{format_uuid, BinaryKey, OsVersion};

pub use errors::{LocateError, ReportError, SymbolFileError, TranslateError};
