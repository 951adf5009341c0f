// The Action contract.
// An action is a named unit of work with a typed result and a compensating
// cleanup hook. The engine stores actions on the execution stack in an
// erased form so heterogeneous result types can share one stack.

use async_trait::async_trait;
use std::any::Any;
use std::sync::Arc;

use crate::context::RunContext;

/// How an action participates in logging and teardown.
///
/// Resolved once when the action is placed on the stack; the engine never
/// inspects concrete action types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    /// An ordinary unit of work.
    Regular,
    /// The pipeline's top-level entry point.
    Main,
    /// A transient wrapper produced by action composition. Never gets its
    /// own log scope and is skipped during teardown.
    Builder,
    /// An explicit named collection of child actions.
    Group,
}

impl ActionKind {
    /// Whether this kind is a composition wrapper with no resource ownership.
    pub fn is_builder(self) -> bool {
        matches!(self, ActionKind::Builder)
    }
}

/// A unit of work run by the engine.
///
/// Actions are owned by their caller for the duration of `run`; the stack
/// keeps a shared handle so `clean_up` can be invoked at teardown.
#[async_trait]
pub trait Action: Send + Sync + 'static {
    /// The value produced by a successful run.
    type Output: Send + Sync;

    /// Human-friendly name, defaulting to the type name.
    fn display_name(&self) -> String {
        short_type_name::<Self>().to_string()
    }

    /// The action's kind. Defaults to [`ActionKind::Regular`].
    fn kind(&self) -> ActionKind {
        ActionKind::Regular
    }

    /// Hook invoked at every action boundary when this action is the
    /// pipeline's Main root. Guarded against re-entrancy by the engine.
    async fn before(&self, _ctx: &RunContext) -> anyhow::Result<()> {
        Ok(())
    }

    /// Perform the work.
    async fn run(&self, ctx: &RunContext) -> anyhow::Result<Self::Output>;

    /// Compensating cleanup, invoked exactly once during teardown with the
    /// terminal error of the run (or `None` on success).
    async fn clean_up(
        &self,
        _ctx: &RunContext,
        _error: Option<&anyhow::Error>,
    ) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Object-safe form of [`Action`] held by stack frames.
///
/// Blanket-implemented for every `Action`; `run_erased` discards the typed
/// output so groups can run heterogeneous children.
#[async_trait]
pub trait AnyAction: Send + Sync {
    fn display_name(&self) -> String;

    fn kind(&self) -> ActionKind;

    async fn before(&self, ctx: &RunContext) -> anyhow::Result<()>;

    async fn run_erased(&self, ctx: &RunContext) -> anyhow::Result<()>;

    async fn clean_up(&self, ctx: &RunContext, error: Option<&anyhow::Error>)
        -> anyhow::Result<()>;

    /// Downcast support for the stack's inherit-by-type query.
    fn as_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

#[async_trait]
impl<A: Action> AnyAction for A {
    fn display_name(&self) -> String {
        Action::display_name(self)
    }

    fn kind(&self) -> ActionKind {
        Action::kind(self)
    }

    async fn before(&self, ctx: &RunContext) -> anyhow::Result<()> {
        Action::before(self, ctx).await
    }

    async fn run_erased(&self, ctx: &RunContext) -> anyhow::Result<()> {
        Action::run(self, ctx).await.map(|_| ())
    }

    async fn clean_up(
        &self,
        ctx: &RunContext,
        error: Option<&anyhow::Error>,
    ) -> anyhow::Result<()> {
        Action::clean_up(self, ctx, error).await
    }

    fn as_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// The unqualified name of a type, without module path or generics.
pub(crate) fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let without_generics = full.split('<').next().unwrap_or(full);
    without_generics.rsplit("::").next().unwrap_or(without_generics)
}
