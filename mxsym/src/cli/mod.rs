//! Command-line interface for mxsym
//!
//! This module contains CLI argument parsing; `SymbolicateOptions` is built
//! from `Args` in `crate::options`.

pub mod args;

pub use args::Args;
