//! Choosing between linear and aggregated output for one diagnostic.

use log::debug;

use crate::report::{CallStackTree, Frame};

/// How the call stacks of one diagnostic are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// One frame per line, like a crash log backtrace.
    Linear,
    /// Indented, sample-weighted tree, like a spindump.
    Aggregated,
}

/// User override of the shape-based choice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ModeOverride {
    #[default]
    Auto,
    Linear,
    Aggregated,
}

/// Pick the rendering mode from the shape of the tree.
///
/// Linear only when every call stack is a single unbranched path without
/// sample weights. `callStackPerThread` is not trusted: app launch diagnostics
/// set it although their stacks are sampled trees.
#[must_use]
pub fn select_mode(tree: &CallStackTree, mode: ModeOverride) -> RenderMode {
    match mode {
        ModeOverride::Linear => return RenderMode::Linear,
        ModeOverride::Aggregated => return RenderMode::Aggregated,
        ModeOverride::Auto => {}
    }

    let linear = tree.call_stacks.iter().all(|stack| {
        stack.root_frames.len() <= 1 && stack.root_frames.iter().all(is_single_path)
    });

    if linear != tree.call_stack_per_thread {
        debug!(
            "callStackPerThread={} disagrees with the tree shape; rendering {}",
            tree.call_stack_per_thread,
            if linear { "linear" } else { "aggregated" }
        );
    }

    if linear {
        RenderMode::Linear
    } else {
        RenderMode::Aggregated
    }
}

fn is_single_path(root: &Frame) -> bool {
    root.walk().all(|frame| frame.sub_frames.len() <= 1 && frame.sample_count.unwrap_or(1) <= 1)
}
