// Trace reconstruction for diagnostics.
// A trace is the root-to-frame chain of action names at a point in time.
// It is rendered for error reports and never consulted for control flow.

use std::sync::Arc;

use crate::stack::StackFrame;

/// Separator used when rendering a trace chain.
const TRACE_ARROW: &str = " → ";

/// A read-only root-to-frame chain of stack frames.
#[derive(Clone)]
pub struct ActionTrace {
    frames: Vec<Arc<StackFrame>>,
}

impl ActionTrace {
    /// Reconstruct the chain from the root down to `frame` by walking
    /// parent links.
    pub fn from_frame(frame: &Arc<StackFrame>) -> Self {
        let mut frames = vec![Arc::clone(frame)];
        let mut current = frame.parent();
        while let Some(parent) = current {
            current = parent.parent();
            frames.push(parent);
        }
        frames.reverse();
        Self { frames }
    }

    /// Drop frames whose action is a builder wrapper.
    pub fn without_builders(self) -> Self {
        Self {
            frames: self
                .frames
                .into_iter()
                .filter(|f| !f.kind().is_builder())
                .collect(),
        }
    }

    /// The frame chain, root first.
    pub fn frames(&self) -> &[Arc<StackFrame>] {
        &self.frames
    }

    /// The display names along the chain, root first.
    pub fn names(&self) -> Vec<String> {
        self.frames.iter().map(|f| f.display_name()).collect()
    }

    /// Render as an arrow-separated chain, e.g. `"main → build → sign"`.
    pub fn render(&self) -> String {
        self.names().join(TRACE_ARROW)
    }
}

impl std::fmt::Display for ActionTrace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render())
    }
}
