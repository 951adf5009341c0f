// Workflow runner and teardown.
// Runs a pipeline's top-level action to completion, then — success or
// failure — unwinds the stack exactly once: frames pop LIFO, builder
// wrappers are skipped, each action's cleanup runs with the terminal
// error, and cleanup failures never abort the unwind. Tools installed
// during the run are uninstalled afterwards.

use crate::action::Action;
use crate::action_trace::ActionTrace;
use crate::context::RunContext;

/// Top-level entry point for a pipeline run.
pub struct WorkflowRunner {
    ctx: RunContext,
}

impl WorkflowRunner {
    pub fn new(ctx: RunContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &RunContext {
        &self.ctx
    }

    /// Run the pipeline's main action, perform teardown, and return the
    /// action's result. The error (if any) has already been logged along
    /// with the reconstructed action trace.
    pub async fn run<A: Action>(&self, main: A) -> anyhow::Result<A::Output> {
        let name = Action::display_name(&main);
        self.ctx.logger().info(&format!("Starting pipeline '{name}'"));

        let result = self.ctx.run(main).await;

        match &result {
            Ok(_) => {
                self.ctx.logger().info(&format!("Pipeline '{name}' succeeded"));
                self.teardown(None).await;
            }
            Err(error) => {
                self.ctx
                    .logger()
                    .error(&format!("Pipeline '{name}' failed: {error:#}"));
                if let Some(frame) = self.ctx.stack().peek() {
                    let trace = ActionTrace::from_frame(&frame).without_builders();
                    self.ctx
                        .logger()
                        .error(&format!("Failed in: {}", trace.render()));
                }
                self.teardown(Some(error)).await;
            }
        }

        result
    }

    /// Run the pipeline and reduce the outcome to a process exit code.
    /// The embedding binary passes this to `std::process::exit`.
    pub async fn execute<A: Action>(&self, main: A) -> i32 {
        match self.run(main).await {
            Ok(_) => 0,
            Err(_) => 1,
        }
    }

    /// Unwind the stack in reverse-push order, then uninstall tools.
    /// A no-op on an empty stack.
    async fn teardown(&self, error: Option<&anyhow::Error>) {
        while let Some(frame) = self.ctx.stack().pop() {
            if frame.kind().is_builder() {
                continue;
            }
            self.ctx
                .logger()
                .verbose(&format!("Cleaning up '{}'", frame.display_name()));
            if let Err(e) = frame.action().clean_up(&self.ctx, error).await {
                self.ctx.logger().warning(&format!(
                    "Cleanup of '{}' failed: {:#}",
                    frame.display_name(),
                    e
                ));
            }
        }

        self.ctx.tools().uninstall_all(&self.ctx).await;
    }
}
