//! Crash-log style listing: one frame per line, most recent call first.

use std::io::{self, Write};

use super::{unresolved_text, MISSING_FRAME};
use crate::symbolization::{Resolution, SymbolizedFrame, SymbolizedStack};

/// Write one call stack as a numbered list of frames.
///
/// # Errors
/// Propagates write errors from `out`.
pub fn write_linear<W: Write>(out: &mut W, stack: &SymbolizedStack<'_>, index: usize) -> io::Result<()> {
    let attributed = if stack.stack.thread_attributed { "Attributed: " } else { "" };
    writeln!(out, "{attributed}Call stack {index}:")?;

    let frames: Vec<&SymbolizedFrame<'_>> = stack.roots.iter().flat_map(preorder).collect();
    let width = frames
        .iter()
        .filter_map(|f| f.frame.binary_name.as_deref())
        .map(str::len)
        .max()
        .unwrap_or(0);

    for (idx, symbolized) in frames.iter().enumerate() {
        let frame = symbolized.frame;
        let (Some(binary), Some(address)) = (frame.binary_name.as_deref(), frame.address) else {
            writeln!(out, "{idx:<4}{MISSING_FRAME}")?;
            continue;
        };

        let text = match &symbolized.resolution {
            Resolution::Symbol(symbol) => symbol.clone(),
            Resolution::Unresolved(reason) => unresolved_text(frame, reason),
        };
        writeln!(out, "{idx:<4}{binary:<width$} 0x{address:016x} {text}")?;
    }

    writeln!(out)
}

fn preorder<'s, 'a>(root: &'s SymbolizedFrame<'a>) -> Vec<&'s SymbolizedFrame<'a>> {
    let mut out = Vec::new();
    let mut pending = vec![root];
    while let Some(frame) = pending.pop() {
        out.push(frame);
        pending.extend(frame.sub_frames.iter().rev());
    }
    out
}
