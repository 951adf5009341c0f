// skylane-engine: Action execution engine for declarative CI/CD pipelines.
// Actions compose into pipelines; the engine runs them sequentially,
// tracks a call-stack for tracing and error reporting, propagates outputs
// between actions, and unwinds with guaranteed compensating cleanup.

pub mod action;
pub mod action_trace;
pub mod context;
pub mod engine;
pub mod error;
pub mod group;
pub mod outputs;
pub mod shell_action;
pub mod stack;
pub mod tools;
pub mod workflow;

// ---------------------------------------------------------------------------
// Re-exports for convenient access
// ---------------------------------------------------------------------------

pub use action::{Action, ActionKind, AnyAction};
pub use action_trace::ActionTrace;
pub use context::RunContext;
pub use error::MissingValueError;
pub use group::{ActionGroup, Sequence};
pub use outputs::{OutputKey, OutputStore};
pub use shell_action::ShellAction;
pub use stack::{ExecutionStack, StackFrame};
pub use tools::{Tool, ToolRegistry};
pub use workflow::WorkflowRunner;
