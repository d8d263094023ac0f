//! Spindump style listing: identical frames merged, weighted by sample count.
//!
//! ```text
//! Call stack 0:
//! 4 (100.0%) MyApp main + 120
//! |  4 (100.0%) UIKitCore UIApplicationMain + 340
//! |  |  3 (75.0%) MyApp -[Loader load] + 88
//! |  |  1 (25.0%) MyApp -[Loader parse] + 20
//! ```

// Percentages intentionally convert u64 to f64
#![allow(clippy::cast_precision_loss)]

use std::io::{self, Write};

use super::frame_label;
use crate::symbolization::{SymbolizedFrame, SymbolizedStack};

const INDENT: &str = "|  ";

/// A node of the merged display tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayNode {
    /// Owning binary; part of the merge key together with `label`.
    pub binary: Option<String>,
    pub label: String,
    pub weight: u64,
    pub children: Vec<DisplayNode>,
}

impl DisplayNode {
    fn from_frame(frame: &SymbolizedFrame<'_>) -> Self {
        Self {
            binary: frame.frame.binary_name.clone(),
            label: frame_label(frame),
            weight: 0,
            children: Vec::new(),
        }
    }

    fn same_frame(&self, other: &DisplayNode) -> bool {
        self.binary == other.binary && self.label == other.label
    }
}

/// Merge sibling frames with the same binary and symbol, summing weights.
///
/// Children end up ordered by descending weight; equal weights keep the order
/// in which they were first seen.
#[must_use]
pub fn aggregate(roots: &[SymbolizedFrame<'_>]) -> Vec<DisplayNode> {
    let mut nodes = Vec::new();
    for root in roots {
        merge_into(&mut nodes, root);
    }
    sort_by_weight(&mut nodes);
    nodes
}

fn merge_into(siblings: &mut Vec<DisplayNode>, frame: &SymbolizedFrame<'_>) {
    let candidate = DisplayNode::from_frame(frame);
    let idx = match siblings.iter().position(|n| n.same_frame(&candidate)) {
        Some(idx) => idx,
        None => {
            siblings.push(candidate);
            siblings.len() - 1
        }
    };

    let node = &mut siblings[idx];
    node.weight = node.weight.saturating_add(frame.frame.weight());
    for child in &frame.sub_frames {
        merge_into(&mut node.children, child);
    }
}

fn sort_by_weight(nodes: &mut [DisplayNode]) {
    // stable: ties keep first-seen order
    nodes.sort_by(|a, b| b.weight.cmp(&a.weight));
    for node in nodes {
        sort_by_weight(&mut node.children);
    }
}

/// Write one call stack as a merged, weighted tree.
///
/// # Errors
/// Propagates write errors from `out`.
pub fn write_aggregated<W: Write>(
    out: &mut W,
    stack: &SymbolizedStack<'_>,
    index: usize,
) -> io::Result<()> {
    let attributed = if stack.stack.thread_attributed { "Attributed: " } else { "" };
    writeln!(out, "{attributed}Call stack {index}:")?;

    let nodes = aggregate(&stack.roots);
    let total = nodes.iter().map(|n| n.weight).fold(0, u64::saturating_add);
    for node in &nodes {
        write_node(out, node, 0, total)?;
    }

    writeln!(out)
}

fn write_node<W: Write>(out: &mut W, node: &DisplayNode, depth: usize, total: u64) -> io::Result<()> {
    let percent = if total == 0 { 0.0 } else { node.weight as f64 * 100.0 / total as f64 };
    let label = match &node.binary {
        Some(binary) if node.label != super::MISSING_FRAME => format!("{binary} {}", node.label),
        _ => node.label.clone(),
    };
    writeln!(out, "{}{} ({percent:.1}%) {label}", INDENT.repeat(depth), node.weight)?;

    for child in &node.children {
        write_node(out, child, depth + 1, total)?;
    }
    Ok(())
}
