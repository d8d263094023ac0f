//! # MetricKit Report Model
//!
//! Parses MetricKit diagnostic payloads (`MXDiagnosticPayload` JSON) into an
//! owned tree of diagnostics, call stacks and frames.
//!
//! ## Payload Shape
//!
//! ```text
//! { "payload": {                           ← optional envelope
//!     "crashDiagnostics": [ {
//!         "diagnosticMetaData": { ... },
//!         "callStackTree": {
//!             "callStackPerThread": true,
//!             "callStacks": [ {
//!                 "threadAttributed": true,
//!                 "callStackRootFrames": [ {
//!                     "binaryName": "MyApp",
//!                     "binaryUUID": "…",
//!                     "offsetIntoBinaryTextSegment": 4294967296,
//!                     "address": 4295012345,
//!                     "sampleCount": 1,
//!                     "subFrames": [ … ]
//! } ] } ] } } ] } }
//! ```
//!
//! A root frame is the most recent call; `subFrames` walk towards the thread's
//! entry point. Roots may have several children and a call stack may have
//! several roots when the OS aggregated sampled stacks (CPU, hang, launch).

pub mod metadata;
pub mod model;
mod parser;

pub use metadata::DiagnosticMetadata;
pub use model::{
    CallStack, CallStackTree, Diagnostic, DiagnosticKind, DiagnosticReport, Frame, FrameImage,
    ReportEnvelope,
};
