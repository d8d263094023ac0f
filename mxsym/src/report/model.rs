//! In-memory model of a MetricKit diagnostic payload.
//!
//! Everything here is plain owned data, built once by the parser and read by
//! the symbolicator and the renderer.

use std::fmt;

use uuid::Uuid;

use super::metadata::DiagnosticMetadata;
use crate::domain::{BinaryKey, OsVersion};

/// A parsed report: optional envelope metadata plus diagnostics in report order.
#[derive(Debug, Clone, PartialEq)]
pub struct DiagnosticReport {
    /// Present only when the payload was wrapped in an envelope.
    pub envelope: Option<ReportEnvelope>,
    /// `timeStampBegin` / `timeStampEnd` of the payload, passed through verbatim.
    pub time_range: Option<(String, String)>,
    pub diagnostics: Vec<Diagnostic>,
}

impl DiagnosticReport {
    /// OS version declared by the report.
    ///
    /// The envelope wins; the first diagnostic's metadata is the fallback. A
    /// build number missing from the envelope is borrowed from the metadata
    /// when both agree on the version.
    #[must_use]
    pub fn os_version(&self) -> Option<OsVersion> {
        let from_meta = self
            .diagnostics
            .iter()
            .find_map(|d| d.metadata.os_version.as_deref().and_then(OsVersion::parse));

        let from_envelope =
            self.envelope.as_ref().and_then(|e| e.os_version.as_deref()).and_then(OsVersion::parse);

        match (from_envelope, from_meta) {
            (Some(mut env), Some(meta)) => {
                if env.build.is_none() && env.version == meta.version {
                    env.build = meta.build;
                }
                Some(env)
            }
            (Some(env), None) => Some(env),
            (None, meta) => meta,
        }
    }

    /// Device model declared by the report (`iPhone15,2`).
    #[must_use]
    pub fn device_model(&self) -> Option<&str> {
        self.envelope
            .as_ref()
            .and_then(|e| e.device_model.as_deref())
            .or_else(|| self.diagnostics.iter().find_map(|d| d.metadata.device_type.as_deref()))
    }

    /// Every frame of every diagnostic, depth first.
    pub fn frames(&self) -> impl Iterator<Item = &Frame> {
        self.diagnostics.iter().flat_map(Diagnostic::frames)
    }
}

/// Vendor envelope around the payload. Not interpreted; logged, and printed on request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportEnvelope {
    pub customer_id: Option<String>,
    /// Seconds since the Unix epoch.
    pub timestamp: Option<f64>,
    pub os_version: Option<String>,
    pub device_model: Option<String>,
}

/// Kind of a diagnostic, in the order diagnostics are read from a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    Crash,
    Hang,
    DiskWriteException,
    CpuException,
    AppLaunch,
}

impl DiagnosticKind {
    pub const ALL: [DiagnosticKind; 5] = [
        DiagnosticKind::Crash,
        DiagnosticKind::Hang,
        DiagnosticKind::DiskWriteException,
        DiagnosticKind::CpuException,
        DiagnosticKind::AppLaunch,
    ];

    /// Key of the diagnostic array inside the payload.
    #[must_use]
    pub fn payload_key(self) -> &'static str {
        match self {
            DiagnosticKind::Crash => "crashDiagnostics",
            DiagnosticKind::Hang => "hangDiagnostics",
            DiagnosticKind::DiskWriteException => "diskWriteExceptionDiagnostics",
            DiagnosticKind::CpuException => "cpuExceptionDiagnostics",
            DiagnosticKind::AppLaunch => "appLaunchDiagnostics",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DiagnosticKind::Crash => "crash report",
            DiagnosticKind::Hang => "hang diagnostic",
            DiagnosticKind::DiskWriteException => "disk write exception diagnostic",
            DiagnosticKind::CpuException => "CPU exception diagnostic",
            DiagnosticKind::AppLaunch => "app launch diagnostic",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub metadata: DiagnosticMetadata,
    pub call_stack_tree: CallStackTree,
}

impl Diagnostic {
    pub fn frames(&self) -> impl Iterator<Item = &Frame> {
        self.call_stack_tree
            .call_stacks
            .iter()
            .flat_map(|stack| stack.root_frames.iter())
            .flat_map(Frame::walk)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallStackTree {
    /// Vendor hint that each root is one linear per-thread stack. Unreliable.
    pub call_stack_per_thread: bool,
    pub call_stacks: Vec<CallStack>,
}

/// One entry of `callStacks`: usually one thread.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallStack {
    /// Set on the thread the OS attributes the event to (the crashed thread).
    pub thread_attributed: bool,
    pub root_frames: Vec<Frame>,
}

/// A node of a call-stack tree.
///
/// Root frames are the most recent calls; `sub_frames` lead towards the
/// thread entry point.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    pub binary_name: Option<String>,
    pub binary_uuid: Option<Uuid>,
    /// `offsetIntoBinaryTextSegment`: where the binary's text segment was loaded.
    pub load_address: Option<u64>,
    /// Absolute instruction pointer.
    pub address: Option<u64>,
    pub sample_count: Option<u64>,
    pub sub_frames: Vec<Frame>,
}

/// The parts of a frame needed to symbolicate it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameImage<'a> {
    pub binary: BinaryKey,
    pub name: &'a str,
    pub load_address: u64,
    pub address: u64,
}

impl Frame {
    /// `None` when the frame lacks the name, UUID or addresses.
    #[must_use]
    pub fn image(&self) -> Option<FrameImage<'_>> {
        let name = self.binary_name.as_deref()?;
        Some(FrameImage {
            binary: BinaryKey::new(name, self.binary_uuid?),
            name,
            load_address: self.load_address?,
            address: self.address?,
        })
    }

    /// Sample weight; frames without a `sampleCount` weigh 1.
    #[must_use]
    pub fn weight(&self) -> u64 {
        self.sample_count.unwrap_or(1)
    }

    /// Offset of the address into the binary, if both addresses are known.
    #[must_use]
    pub fn offset(&self) -> Option<u64> {
        self.address?.checked_sub(self.load_address?)
    }

    /// Pre-order walk of this frame and all of its descendants.
    pub fn walk(&self) -> impl Iterator<Item = &Frame> {
        let mut pending = vec![self];
        std::iter::from_fn(move || {
            let frame = pending.pop()?;
            pending.extend(frame.sub_frames.iter().rev());
            Some(frame)
        })
    }
}
