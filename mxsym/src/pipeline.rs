//! One symbolication run: report in, text out.

use std::io::Write;

use anyhow::{Context, Result};
use log::{info, warn};

use crate::domain::format_uuid;
use crate::options::SymbolicateOptions;
use crate::render::Renderer;
use crate::report::DiagnosticReport;
use crate::symbolization::{
    AddressTranslator, AppSymbols, DeviceSupport, MachOUuidReader, Symbolicator,
    SystemSymbolLocator,
};

/// Counts reported back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub diagnostics: usize,
    pub unresolved_binaries: usize,
}

/// Parse, symbolicate and render the report named in `options` into `out`.
///
/// Missing system symbols only degrade output; the error cases are an
/// unusable report or unusable app symbols.
///
/// # Errors
/// Returns an error if the report cannot be parsed, the app symbol file
/// cannot be resolved, or writing to `out` fails.
pub async fn symbolicate<T, W>(
    options: &SymbolicateOptions,
    translator: T,
    out: &mut W,
) -> Result<RunSummary>
where
    T: AddressTranslator,
    W: Write,
{
    let report = DiagnosticReport::from_file(&options.report_path)
        .with_context(|| format!("Failed to load report {}", options.report_path.display()))?;

    if let Some((begin, end)) = &report.time_range {
        info!("Report covers {begin} to {end}");
    }
    if let Some(envelope) = &report.envelope {
        info!(
            "Envelope: customer {}, timestamp {}, device {}",
            envelope.customer_id.as_deref().unwrap_or("-"),
            envelope.timestamp.map_or_else(|| "-".to_string(), |t| t.to_string()),
            envelope.device_model.as_deref().unwrap_or("-"),
        );
    }

    let reader = MachOUuidReader;
    let app = AppSymbols::resolve(
        &options.symbols_path,
        options.binary_name.as_deref(),
        &options.app_arch,
        &reader,
    )
    .context("Failed to resolve app symbols")?;

    if !options.quiet {
        writeln!(out, "Binary name: {}", app.name)?;
        let uuids: Vec<String> = app.uuids.iter().map(format_uuid).collect();
        writeln!(out, "UUID of app symbols: {}", uuids.join(", "))?;
    }

    let device = report.device_model().unwrap_or("unknown device").to_string();
    let device_dir = match report.os_version() {
        Some(os) => match DeviceSupport::select(&options.device_support, &os, report.device_model())
        {
            Ok(selected) => {
                info!("Device support directory: {}", selected.dir.display());
                if !options.quiet {
                    writeln!(
                        out,
                        "Found system library path for {os} {device}: {} ({})",
                        selected.dir.display(),
                        selected.reason
                    )?;
                }
                Some(selected.dir)
            }
            Err(e) => {
                warn!("{e}: {os} under {}", options.device_support.display());
                if !options.quiet {
                    writeln!(out, "Warning: failed to find system library path for {os} {device}")?;
                }
                None
            }
        },
        None => {
            warn!("Report declares no OS version; system binaries stay unresolved");
            if !options.quiet {
                writeln!(out, "Warning: report has no OS version, system symbols unavailable")?;
            }
            None
        }
    };
    if !options.quiet {
        writeln!(out)?;
    }

    let locator = SystemSymbolLocator::new(device_dir.as_deref(), reader);
    let mut symbolicator = Symbolicator::new(translator, app, locator, options.system_arch.clone());
    let diagnostics = symbolicator.symbolicate(&report).await;
    let unresolved = symbolicator.unresolved_binaries();

    Renderer::new(options.mode)
        .with_envelope(options.show_envelope)
        .render(out, &report, &diagnostics, &unresolved)
        .context("Failed to write output")?;

    Ok(RunSummary { diagnostics: diagnostics.len(), unresolved_binaries: unresolved.len() })
}
