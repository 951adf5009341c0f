// Execution stack and stack frames.
// Frames form a tree via weak parent links; the stack itself is a flat
// push-only list during the happy path, popped only at teardown.

use parking_lot::Mutex;
use std::any::Any;
use std::sync::{Arc, Weak};
use uuid::Uuid;

use crate::action::{ActionKind, AnyAction};

/// One in-flight action execution.
pub struct StackFrame {
    id: Uuid,
    action: Arc<dyn AnyAction>,
    name_override: Option<String>,
    parent: Option<Weak<StackFrame>>,
}

impl StackFrame {
    /// Create a frame for `action`, linked to `parent` (or none for the
    /// pipeline root).
    pub fn new(
        action: Arc<dyn AnyAction>,
        name_override: Option<String>,
        parent: Option<&Arc<StackFrame>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            id: Uuid::new_v4(),
            action,
            name_override,
            parent: parent.map(Arc::downgrade),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn action(&self) -> &Arc<dyn AnyAction> {
        &self.action
    }

    /// The frame's display name: the override given at run time, or the
    /// action's own name.
    pub fn display_name(&self) -> String {
        self.name_override
            .clone()
            .unwrap_or_else(|| self.action.display_name())
    }

    pub fn kind(&self) -> ActionKind {
        self.action.kind()
    }

    /// The parent frame, if it is still alive.
    pub fn parent(&self) -> Option<Arc<StackFrame>> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    /// The nearest ancestor whose action is not a builder. Used only for
    /// log-group nesting decisions.
    pub fn nearest_non_builder_ancestor(&self) -> Option<Arc<StackFrame>> {
        let mut current = self.parent();
        while let Some(frame) = current {
            if !frame.kind().is_builder() {
                return Some(frame);
            }
            current = frame.parent();
        }
        None
    }
}

impl std::fmt::Debug for StackFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StackFrame")
            .field("id", &self.id)
            .field("name", &self.display_name())
            .field("kind", &self.kind())
            .finish()
    }
}

/// The global execution stack for a pipeline run.
///
/// Pushed on every action start; popped only during teardown, in strict
/// LIFO order.
#[derive(Default)]
pub struct ExecutionStack {
    frames: Mutex<Vec<Arc<StackFrame>>>,
}

impl ExecutionStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a frame.
    pub fn push(&self, frame: Arc<StackFrame>) {
        self.frames.lock().push(frame);
    }

    /// Remove and return the most recently pushed frame.
    pub fn pop(&self) -> Option<Arc<StackFrame>> {
        self.frames.lock().pop()
    }

    /// The most recently pushed frame, without removing it.
    pub fn peek(&self) -> Option<Arc<StackFrame>> {
        self.frames.lock().last().cloned()
    }

    /// The first frame pushed in this run (the pipeline root).
    pub fn root(&self) -> Option<Arc<StackFrame>> {
        self.frames.lock().first().cloned()
    }

    pub fn len(&self) -> usize {
        self.frames.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.lock().is_empty()
    }

    /// Find the nearest frame below `from` whose action is of concrete type
    /// `T`, scanning innermost to outermost. Never matches `from` itself.
    ///
    /// This backs dynamic-scope configuration inheritance: an action that
    /// needs contextual information its caller did not pass (say, which
    /// Xcode project a build targets) asks for the nearest qualifying
    /// ancestor instead of requiring every caller to re-thread the value.
    pub fn inherit<T: Any + Send + Sync>(&self, from: &StackFrame) -> Option<Arc<T>> {
        let frames = self.frames.lock();
        let position = frames.iter().rposition(|f| f.id() == from.id())?;
        frames[..position]
            .iter()
            .rev()
            .find_map(|frame| frame.action().clone().as_any_arc().downcast::<T>().ok())
    }
}
