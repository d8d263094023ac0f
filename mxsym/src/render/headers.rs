//! Report and per-diagnostic headers.

use std::io::{self, Write};

use chrono::{DateTime, SecondsFormat};

use crate::report::metadata::{display_value, exception_name, signal_name};
use crate::report::{Diagnostic, DiagnosticKind, ReportEnvelope};

/// Customer ID, report date and device. Only envelopes carry these.
///
/// # Errors
/// Propagates write errors from `out`.
pub fn write_report_header<W: Write>(out: &mut W, envelope: &ReportEnvelope) -> io::Result<()> {
    let or_unknown = |v: &Option<String>| v.clone().unwrap_or_else(|| "unknown".to_string());

    writeln!(out, "Customer ID: {}", or_unknown(&envelope.customer_id))?;
    writeln!(out, "Date of report on device: {}", format_timestamp(envelope.timestamp))?;
    writeln!(
        out,
        "Device: {}, {}",
        or_unknown(&envelope.device_model),
        or_unknown(&envelope.os_version)
    )?;
    writeln!(out)
}

/// RFC 3339 in UTC, or `unknown` for a missing or out-of-range timestamp.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn format_timestamp(timestamp: Option<f64>) -> String {
    timestamp
        .filter(|t| t.is_finite())
        .and_then(|t| DateTime::from_timestamp(t.floor() as i64, 0))
        .map_or_else(
            || "unknown".to_string(),
            |dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true),
        )
}

/// What the diagnostic is about, from its metadata.
///
/// # Errors
/// Propagates write errors from `out`.
pub fn write_diagnostic_header<W: Write>(out: &mut W, diagnostic: &Diagnostic) -> io::Result<()> {
    let meta = &diagnostic.metadata;
    let text = |v: &Option<String>| v.as_deref().unwrap_or("unknown").to_string();

    writeln!(
        out,
        "Symbolicating {} from {} {}.{}",
        diagnostic.kind,
        text(&meta.bundle_identifier),
        text(&meta.app_version),
        text(&meta.app_build_version)
    )?;

    match diagnostic.kind {
        DiagnosticKind::Crash => {
            let exception = meta.exception_type.as_ref();
            let signal = meta.signal.as_ref();
            writeln!(out, "Exception type: {}, {}", display_value(exception), exception_name(exception))?;
            writeln!(out, "Exception code: {}", display_value(meta.exception_code.as_ref()))?;
            writeln!(out, "Signal: {}, {}", display_value(signal), signal_name(signal))?;
            if let Some(reason) = &meta.termination_reason {
                writeln!(out, "Termination reason: {}", display_value(Some(reason)))?;
            }
            if let Some(region) = &meta.virtual_memory_region_info {
                writeln!(out, "Virtual memory region: {}", display_value(Some(region)))?;
            }
        }
        DiagnosticKind::Hang => {
            writeln!(out, "Hang duration: {}", display_value(meta.hang_duration.as_ref()))?;
        }
        DiagnosticKind::CpuException => {
            writeln!(
                out,
                "Total time: {} of {}",
                display_value(meta.total_cpu_time.as_ref()),
                display_value(meta.total_sampled_time.as_ref())
            )?;
        }
        DiagnosticKind::DiskWriteException => {
            writeln!(out, "Writes caused: {}", display_value(meta.writes_caused.as_ref()))?;
        }
        DiagnosticKind::AppLaunch => {
            writeln!(out, "Launch duration: {}", display_value(meta.launch_duration.as_ref()))?;
        }
    }

    writeln!(out)
}
