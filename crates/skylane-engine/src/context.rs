// RunContext: the ambient context threaded through every action run.
// One explicit, cheaply-clonable handle replaces the source's task-local
// storage: each slot is an Arc, and a "scoped override" is a derived
// context with one slot replaced — the caller's context is untouched, so
// restoration on exit is automatic.

use std::any::Any;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use skylane_sdk::{
    Environment, FileSystem, HostFileSystem, InMemoryEnvironment, InMemoryFileSystem,
    NullTraceWriter, Platform, ProcessEnvironment, ProcessShellRunner, ScriptedShellRunner,
    ShellRunner, TraceWriter, TracingTraceWriter,
};

use crate::error::MissingValueError;
use crate::outputs::{OutputKey, OutputStore};
use crate::stack::{ExecutionStack, StackFrame};
use crate::tools::ToolRegistry;

/// Ambient configuration and services for a pipeline run.
///
/// Shared pieces (stack, outputs, tool registry, the before-hook flag) are
/// the same `Arc` in every derived context; service slots and the current
/// frame may differ per scope.
#[derive(Clone)]
pub struct RunContext {
    environment: Arc<dyn Environment>,
    file_system: Arc<dyn FileSystem>,
    shell: Arc<dyn ShellRunner>,
    logger: Arc<dyn TraceWriter>,
    platform: Arc<Platform>,
    tools: Arc<ToolRegistry>,
    outputs: Arc<OutputStore>,
    stack: Arc<ExecutionStack>,
    current_frame: Option<Arc<StackFrame>>,
    /// Set while the Main action's `before` hook executes, so the hook's
    /// own nested runs do not re-trigger it.
    pub(crate) in_before_hook: Arc<AtomicBool>,
}

impl RunContext {
    fn with_services(
        environment: Arc<dyn Environment>,
        file_system: Arc<dyn FileSystem>,
        shell: Arc<dyn ShellRunner>,
        logger: Arc<dyn TraceWriter>,
        platform: Platform,
    ) -> Self {
        Self {
            environment,
            file_system,
            shell,
            logger,
            platform: Arc::new(platform),
            tools: Arc::new(ToolRegistry::new()),
            outputs: Arc::new(OutputStore::new()),
            stack: Arc::new(ExecutionStack::new()),
            current_frame: None,
            in_before_hook: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Production context: real process environment, host file system,
    /// real subprocesses, `tracing`-backed logging.
    pub fn host() -> Self {
        let environment = Arc::new(ProcessEnvironment);
        let platform = Platform::detect(environment.as_ref());
        Self::with_services(
            environment,
            Arc::new(HostFileSystem),
            Arc::new(ProcessShellRunner::new()),
            Arc::new(TracingTraceWriter),
            platform,
        )
    }

    /// Fully in-memory context: virtual file system, scripted shell,
    /// silent logger. The starting point for tests and dry runs.
    pub fn in_memory() -> Self {
        Self::with_services(
            Arc::new(InMemoryEnvironment::new()),
            Arc::new(InMemoryFileSystem::new()),
            Arc::new(ScriptedShellRunner::new()),
            Arc::new(NullTraceWriter),
            Platform::fixed("test", false, "/"),
        )
    }

    // -----------------------------------------------------------------------
    // Scoped overrides
    // -----------------------------------------------------------------------

    pub fn with_environment(mut self, environment: Arc<dyn Environment>) -> Self {
        self.environment = environment;
        self
    }

    pub fn with_file_system(mut self, file_system: Arc<dyn FileSystem>) -> Self {
        self.file_system = file_system;
        self
    }

    pub fn with_shell(mut self, shell: Arc<dyn ShellRunner>) -> Self {
        self.shell = shell;
        self
    }

    pub fn with_logger(mut self, logger: Arc<dyn TraceWriter>) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = Arc::new(platform);
        self
    }

    pub(crate) fn with_current_frame(mut self, frame: Arc<StackFrame>) -> Self {
        self.current_frame = Some(frame);
        self
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn environment(&self) -> &Arc<dyn Environment> {
        &self.environment
    }

    pub fn file_system(&self) -> &Arc<dyn FileSystem> {
        &self.file_system
    }

    pub fn shell(&self) -> &Arc<dyn ShellRunner> {
        &self.shell
    }

    pub fn logger(&self) -> &Arc<dyn TraceWriter> {
        &self.logger
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    pub fn tools(&self) -> &Arc<ToolRegistry> {
        &self.tools
    }

    pub fn outputs(&self) -> &Arc<OutputStore> {
        &self.outputs
    }

    pub fn stack(&self) -> &Arc<ExecutionStack> {
        &self.stack
    }

    /// The frame whose action is currently running in this scope.
    pub fn current_frame(&self) -> Option<&Arc<StackFrame>> {
        self.current_frame.as_ref()
    }

    // -----------------------------------------------------------------------
    // Conveniences
    // -----------------------------------------------------------------------

    /// Find the nearest ancestor action of concrete type `T` on the stack,
    /// relative to the current frame. Never matches the current action.
    pub fn inherit<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        let frame = self.current_frame.as_ref()?;
        self.stack.inherit::<T>(frame)
    }

    /// Read an `Option`-valued output key, converting absence into a
    /// [`MissingValueError`] attributed to the currently running action.
    pub fn require_output<K, T>(&self) -> Result<T, MissingValueError>
    where
        K: OutputKey<Value = Option<T>>,
        T: Clone + Send + Sync + 'static,
    {
        let reader = self
            .current_frame
            .as_ref()
            .map(|f| f.display_name())
            .unwrap_or_else(|| "<no action>".to_string());
        self.outputs.require::<K, T>(&reader)
    }
}
