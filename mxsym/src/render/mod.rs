//! # Text Output
//!
//! Everything the user reads on stdout:
//!
//! ```text
//! Customer ID: …                       ← only for envelope-wrapped reports
//! Date of report on device: …
//! Device: …
//!
//! Symbolicating crash report from …    ← one block per diagnostic
//! Exception type: 1, EXC_BAD_ACCESS
//! …
//! Attributed: Call stack 0:            ← linear or aggregated, see `mode`
//! 0   libsystem_kernel.dylib 0x00000001e5a1b1d4 __pthread_kill + 8
//!
//! Unresolved binaries:                 ← only if something stayed unresolved
//!   Foundation <…>: symbols not found
//! ```

pub mod aggregated;
pub mod headers;
pub mod linear;
pub mod mode;

use std::io::{self, Write};

pub use aggregated::{aggregate, write_aggregated, DisplayNode};
pub use headers::{format_timestamp, write_diagnostic_header, write_report_header};
pub use linear::write_linear;
pub use mode::{select_mode, ModeOverride, RenderMode};

use crate::domain::BinaryKey;
use crate::report::{DiagnosticReport, Frame};
use crate::symbolization::{Resolution, SymbolizedDiagnostic, SymbolizedFrame, UnresolvedReason};

pub(crate) const MISSING_FRAME: &str = "<missing information in frame>";

/// Raw location of an unresolved frame: `0x<load> + <offset> [<reason>]`.
pub(crate) fn unresolved_text(frame: &Frame, reason: &UnresolvedReason) -> String {
    match (frame.load_address, frame.offset()) {
        (Some(load), Some(offset)) => format!("{load:#x} + {offset} [{reason}]"),
        _ => format!("[{reason}]"),
    }
}

/// Symbol text of a frame, without the binary name.
pub(crate) fn frame_label(frame: &SymbolizedFrame<'_>) -> String {
    if frame.frame.binary_name.is_none() || frame.frame.address.is_none() {
        return MISSING_FRAME.to_string();
    }
    match &frame.resolution {
        Resolution::Symbol(symbol) => symbol.clone(),
        Resolution::Unresolved(reason) => unresolved_text(frame.frame, reason),
    }
}

/// Writes a symbolicated report.
#[derive(Debug, Clone, Copy, Default)]
pub struct Renderer {
    pub mode: ModeOverride,
    /// Print the envelope header. Off by default so that wrapped and bare
    /// reports render the same bytes.
    pub show_envelope: bool,
}

impl Renderer {
    #[must_use]
    pub fn new(mode: ModeOverride) -> Self {
        Self { mode, show_envelope: false }
    }

    #[must_use]
    pub fn with_envelope(mut self, show: bool) -> Self {
        self.show_envelope = show;
        self
    }

    /// Optional envelope header, every diagnostic block, then the unresolved summary.
    ///
    /// # Errors
    /// Propagates write errors from `out`.
    pub fn render<W: Write>(
        &self,
        out: &mut W,
        report: &DiagnosticReport,
        diagnostics: &[SymbolizedDiagnostic<'_>],
        unresolved: &[(BinaryKey, String)],
    ) -> io::Result<()> {
        if let Some(envelope) = report.envelope.as_ref().filter(|_| self.show_envelope) {
            write_report_header(out, envelope)?;
        }
        for diagnostic in diagnostics {
            self.render_diagnostic(out, diagnostic)?;
        }
        write_unresolved_summary(out, unresolved)
    }

    /// Header and call stacks of one diagnostic.
    ///
    /// # Errors
    /// Propagates write errors from `out`.
    pub fn render_diagnostic<W: Write>(
        &self,
        out: &mut W,
        diagnostic: &SymbolizedDiagnostic<'_>,
    ) -> io::Result<()> {
        write_diagnostic_header(out, diagnostic.diagnostic)?;

        let mode = select_mode(&diagnostic.diagnostic.call_stack_tree, self.mode);
        for (index, stack) in diagnostic.call_stacks.iter().enumerate() {
            match mode {
                RenderMode::Linear => write_linear(out, stack, index)?,
                RenderMode::Aggregated => write_aggregated(out, stack, index)?,
            }
        }
        Ok(())
    }
}

/// Binaries whose frames stayed raw addresses, with the reason.
///
/// # Errors
/// Propagates write errors from `out`.
pub fn write_unresolved_summary<W: Write>(
    out: &mut W,
    unresolved: &[(BinaryKey, String)],
) -> io::Result<()> {
    if unresolved.is_empty() {
        return Ok(());
    }
    writeln!(out, "Unresolved binaries:")?;
    for (binary, reason) in unresolved {
        writeln!(out, "  {binary}: {reason}")?;
    }
    Ok(())
}
