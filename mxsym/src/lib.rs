//! # mxsym - MetricKit Report Symbolicator
//!
//! MetricKit delivers crash, hang, CPU, disk-write and app-launch diagnostics
//! as JSON with raw instruction addresses. `mxsym` turns those into readable
//! call stacks using the app's dSYM and the OS symbols Xcode keeps in its
//! device-support directory.
//!
//! ## Architecture Overview
//!
//! ```text
//! report.json ──► report::DiagnosticReport
//!                       │  frames: (binary, UUID, load address, address)
//!                       ▼
//!         ┌─────────────────────────────────────────────┐
//!         │ symbolization                               │
//!         │  AppSymbols          ← dSYM / .xcarchive    │
//!         │  DeviceSupport       ← iOS DeviceSupport    │
//!         │  SystemSymbolLocator ← PATH_RULES + LC_UUID │
//!         │  Symbolicator ──► AddressTranslator (atos)  │
//!         └─────────────────────────────────────────────┘
//!                       │  SymbolizedDiagnostic
//!                       ▼
//!                 render::Renderer ──► stdout
//! ```
//!
//! ## Module Structure
//!
//! - [`report`]: MetricKit payload model and JSON parsing
//! - [`symbolization`]: symbol file lookup, UUID verification, batched `atos` calls
//! - [`render`]: linear (crash log) and aggregated (spindump) output
//! - [`pipeline`]: one end-to-end run, shared by the binary and the tests
//! - [`cli`] / [`options`]: command-line arguments and run configuration
//! - [`domain`]: shared identifiers and error types
//!
//! ## Typical Usage
//!
//! ```bash
//! mxsym --report-path crash.json --symbols-path MyApp.xcarchive
//! mxsym --report-path launch.json --symbols-path MyApp.app.dSYM --mode aggregated
//! ```

pub mod cli;
pub mod domain;
pub mod options;
pub mod pipeline;
pub mod render;
pub mod report;
pub mod symbolization;
