// Composition combinators.
// `Sequence` is the transient builder wrapper produced by composing
// actions; `ActionGroup` is an explicit, named collection. Both run their
// children strictly in order; each child completes fully (including its
// own nested actions) before the next starts.

use async_trait::async_trait;
use std::sync::Arc;

use crate::action::{Action, ActionKind, AnyAction};
use crate::context::RunContext;

/// An ordered, anonymous chain of actions. Builder-kind: excluded from
/// log grouping and from teardown cleanup.
#[derive(Default)]
pub struct Sequence {
    children: Vec<Arc<dyn AnyAction>>,
}

impl Sequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an action to the chain.
    pub fn then<A: Action>(mut self, action: A) -> Self {
        self.children.push(Arc::new(action));
        self
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

#[async_trait]
impl Action for Sequence {
    type Output = ();

    fn kind(&self) -> ActionKind {
        ActionKind::Builder
    }

    async fn run(&self, ctx: &RunContext) -> anyhow::Result<()> {
        for child in &self.children {
            ctx.run_dyn(child.clone()).await?;
        }
        Ok(())
    }
}

/// A named collection of child actions.
pub struct ActionGroup {
    name: String,
    children: Vec<Arc<dyn AnyAction>>,
}

impl ActionGroup {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
        }
    }

    /// Append a child action.
    pub fn action<A: Action>(mut self, action: A) -> Self {
        self.children.push(Arc::new(action));
        self
    }
}

#[async_trait]
impl Action for ActionGroup {
    type Output = ();

    fn display_name(&self) -> String {
        self.name.clone()
    }

    fn kind(&self) -> ActionKind {
        ActionKind::Group
    }

    async fn run(&self, ctx: &RunContext) -> anyhow::Result<()> {
        for child in &self.children {
            ctx.run_dyn(child.clone()).await?;
        }
        Ok(())
    }
}
