// The action execution engine.
// Every composition call reduces to one operation: run an action. Running
// pushes a stack frame, fires the Main action's before-hook once per
// boundary, scopes the working directory, decides log grouping, invokes
// the action, and propagates its result untouched. Frames are never
// popped here; that happens only during workflow teardown.

use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::action::{Action, ActionKind, AnyAction};
use crate::context::RunContext;
use crate::stack::StackFrame;

/// Per-run bookkeeping produced by the engine prologue.
struct RunScope {
    /// Context with the new frame installed as current.
    ctx: RunContext,
    /// Working directory captured before the action ran.
    saved_cwd: PathBuf,
    /// Whether a log group was opened and must be closed.
    opened_group: bool,
}

impl RunContext {
    /// Run an action, returning its typed output or propagating its
    /// failure unchanged.
    pub async fn run<A: Action>(&self, action: A) -> anyhow::Result<A::Output> {
        self.run_named(action, None).await
    }

    /// Run an action under a display-name override.
    pub async fn run_named<A: Action>(
        &self,
        action: A,
        name_override: Option<&str>,
    ) -> anyhow::Result<A::Output> {
        let action = Arc::new(action);
        let erased: Arc<dyn AnyAction> = action.clone();
        let scope = self.enter(erased, name_override).await?;
        let result = action.run(&scope.ctx).await;
        self.exit(&scope);
        result
    }

    /// Run an already-erased action. Group and sequence combinators use
    /// this for their children.
    pub async fn run_dyn(&self, action: Arc<dyn AnyAction>) -> anyhow::Result<()> {
        let scope = self.enter(action.clone(), None).await?;
        let result = action.run_erased(&scope.ctx).await;
        self.exit(&scope);
        result
    }

    /// Engine prologue: frame push, before-hook, cwd capture, log scope.
    async fn enter(
        &self,
        action: Arc<dyn AnyAction>,
        name_override: Option<&str>,
    ) -> anyhow::Result<RunScope> {
        let parent = self.current_frame().cloned();
        let frame = StackFrame::new(action, name_override.map(str::to_string), parent.as_ref());
        tracing::debug!(
            "Entering action '{}' (frame {}, depth {})",
            frame.display_name(),
            frame.id(),
            self.stack().len() + 1
        );
        self.stack().push(frame.clone());

        let ctx = self.clone().with_current_frame(frame.clone());

        // Fire the pipeline root's before-hook at this boundary, unless the
        // hook itself is what got us here.
        if !self.in_before_hook.load(Ordering::SeqCst) {
            if let Some(root) = self.stack().root() {
                if root.kind() == ActionKind::Main {
                    self.in_before_hook.store(true, Ordering::SeqCst);
                    let hook_result = root.action().before(&ctx).await;
                    self.in_before_hook.store(false, Ordering::SeqCst);
                    hook_result?;
                }
            }
        }

        let saved_cwd = self.file_system().current_dir()?;

        let display = frame.display_name();
        let opened_group = match frame.kind() {
            ActionKind::Regular => {
                let under_main = frame
                    .nearest_non_builder_ancestor()
                    .map(|ancestor| ancestor.kind() == ActionKind::Main)
                    .unwrap_or(false);
                if under_main {
                    self.logger().begin_group(&format!("Action: {display}"));
                    true
                } else {
                    self.logger().info(&format!("Running action '{display}'"));
                    false
                }
            }
            // Builder and group wrappers never get their own scope; Main
            // is announced by the workflow runner.
            _ => false,
        };

        Ok(RunScope {
            ctx,
            saved_cwd,
            opened_group,
        })
    }

    /// Engine epilogue: working-directory restore (logged, never
    /// escalated) and log-scope close. Runs on success and failure alike.
    fn exit(&self, scope: &RunScope) {
        if let Err(e) = self.file_system().set_current_dir(&scope.saved_cwd) {
            self.logger().warning(&format!(
                "Failed to restore working directory to {}: {:#}",
                scope.saved_cwd.display(),
                e
            ));
        }
        if scope.opened_group {
            self.logger().end_group();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action_trace::ActionTrace;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use skylane_sdk::{CollectingTraceWriter, FileSystem, InMemoryFileSystem, TraceLevel};
    use std::path::Path;
    use std::sync::atomic::AtomicUsize;

    type Recorded = Arc<Mutex<Vec<Vec<String>>>>;

    /// Records the builder-filtered trace visible at its own run.
    struct RecordTrace {
        name: &'static str,
        seen: Recorded,
        children: Vec<Arc<dyn AnyAction>>,
    }

    #[async_trait]
    impl Action for RecordTrace {
        type Output = ();

        fn display_name(&self) -> String {
            self.name.to_string()
        }

        async fn run(&self, ctx: &RunContext) -> anyhow::Result<()> {
            let frame = ctx.current_frame().expect("current frame is set during run");
            self.seen.lock().push(ActionTrace::from_frame(frame).names());
            for child in &self.children {
                ctx.run_dyn(child.clone()).await?;
            }
            Ok(())
        }
    }

    struct ChangeDirAndFail;

    #[async_trait]
    impl Action for ChangeDirAndFail {
        type Output = ();

        async fn run(&self, ctx: &RunContext) -> anyhow::Result<()> {
            ctx.file_system().create_dir_all(Path::new("/elsewhere"))?;
            ctx.file_system().set_current_dir(Path::new("/elsewhere"))?;
            anyhow::bail!("signing failed")
        }
    }

    struct MainWith {
        befores: Arc<AtomicUsize>,
        children: Vec<Arc<dyn AnyAction>>,
    }

    #[async_trait]
    impl Action for MainWith {
        type Output = ();

        fn display_name(&self) -> String {
            "main".to_string()
        }

        fn kind(&self) -> ActionKind {
            ActionKind::Main
        }

        async fn before(&self, _ctx: &RunContext) -> anyhow::Result<()> {
            self.befores.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn run(&self, ctx: &RunContext) -> anyhow::Result<()> {
            for child in &self.children {
                ctx.run_dyn(child.clone()).await?;
            }
            Ok(())
        }
    }

    struct Leaf(&'static str);

    #[async_trait]
    impl Action for Leaf {
        type Output = ();

        fn display_name(&self) -> String {
            self.0.to_string()
        }

        async fn run(&self, _ctx: &RunContext) -> anyhow::Result<()> {
            Ok(())
        }
    }

    struct Wrapping {
        child: Arc<dyn AnyAction>,
    }

    #[async_trait]
    impl Action for Wrapping {
        type Output = ();

        fn kind(&self) -> ActionKind {
            ActionKind::Builder
        }

        async fn run(&self, ctx: &RunContext) -> anyhow::Result<()> {
            ctx.run_dyn(self.child.clone()).await
        }
    }

    #[tokio::test]
    async fn parent_chain_matches_call_nesting() {
        let seen: Recorded = Arc::new(Mutex::new(Vec::new()));
        let leaf = RecordTrace {
            name: "leaf",
            seen: seen.clone(),
            children: vec![],
        };
        let mid = RecordTrace {
            name: "mid",
            seen: seen.clone(),
            children: vec![Arc::new(leaf)],
        };
        let outer = RecordTrace {
            name: "outer",
            seen: seen.clone(),
            children: vec![Arc::new(mid)],
        };

        RunContext::in_memory().run(outer).await.unwrap();

        let seen = seen.lock();
        assert_eq!(seen[0], vec!["outer"]);
        assert_eq!(seen[1], vec!["outer", "mid"]);
        assert_eq!(seen[2], vec!["outer", "mid", "leaf"]);
    }

    #[tokio::test]
    async fn stack_is_push_only_during_the_happy_path() {
        let ctx = RunContext::in_memory();
        let leaf = RecordTrace {
            name: "leaf",
            seen: Arc::new(Mutex::new(Vec::new())),
            children: vec![],
        };
        let outer = RecordTrace {
            name: "outer",
            seen: Arc::new(Mutex::new(Vec::new())),
            children: vec![Arc::new(leaf)],
        };

        ctx.run(outer).await.unwrap();
        // Both frames remain for teardown.
        assert_eq!(ctx.stack().len(), 2);
    }

    #[tokio::test]
    async fn working_directory_restored_after_failure() {
        let fs = Arc::new(InMemoryFileSystem::new());
        fs.create_dir_all(Path::new("/work")).unwrap();
        fs.set_current_dir(Path::new("/work")).unwrap();
        let ctx = RunContext::in_memory().with_file_system(fs.clone());

        let err = ctx.run(ChangeDirAndFail).await.unwrap_err();
        assert_eq!(err.to_string(), "signing failed");
        assert_eq!(fs.current_dir().unwrap(), PathBuf::from("/work"));
    }

    #[tokio::test]
    async fn restore_failure_is_logged_not_escalated() {
        /// A file system whose working directory cannot be changed, so
        /// the engine's restore step always fails.
        struct PinnedCwdFileSystem;

        impl FileSystem for PinnedCwdFileSystem {
            fn read_to_string(&self, path: &Path) -> anyhow::Result<String> {
                anyhow::bail!("no such file: {}", path.display())
            }

            fn write(&self, _path: &Path, _contents: &str) -> anyhow::Result<()> {
                Ok(())
            }

            fn remove(&self, path: &Path) -> anyhow::Result<()> {
                anyhow::bail!("no such file: {}", path.display())
            }

            fn create_dir_all(&self, _path: &Path) -> anyhow::Result<()> {
                Ok(())
            }

            fn exists(&self, _path: &Path) -> bool {
                false
            }

            fn current_dir(&self) -> anyhow::Result<PathBuf> {
                Ok(PathBuf::from("/pipeline"))
            }

            fn set_current_dir(&self, path: &Path) -> anyhow::Result<()> {
                anyhow::bail!("read-only mount: {}", path.display())
            }
        }

        let logger = Arc::new(CollectingTraceWriter::new());
        let ctx = RunContext::in_memory()
            .with_file_system(Arc::new(PinnedCwdFileSystem))
            .with_logger(logger.clone());

        // The action still succeeds; the failed restore only warns.
        ctx.run(Leaf("archive")).await.unwrap();

        let warnings = logger.messages_at(TraceLevel::Warning);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("Failed to restore working directory to /pipeline"));
        assert!(warnings[0].contains("read-only mount"));
    }

    #[tokio::test]
    async fn error_propagates_unchanged() {
        let ctx = RunContext::in_memory();
        let err = ctx.run(ChangeDirAndFail).await.unwrap_err();
        assert_eq!(err.to_string(), "signing failed");
    }

    #[tokio::test]
    async fn regular_action_under_main_gets_a_log_group() {
        let logger = Arc::new(CollectingTraceWriter::new());
        let ctx = RunContext::in_memory().with_logger(logger.clone());

        let main = MainWith {
            befores: Arc::new(AtomicUsize::new(0)),
            children: vec![Arc::new(Leaf("build"))],
        };
        ctx.run(main).await.unwrap();

        assert_eq!(
            logger.messages_at(TraceLevel::GroupStart),
            vec!["Action: build"]
        );
    }

    #[tokio::test]
    async fn regular_action_under_builder_under_main_still_gets_a_group() {
        let logger = Arc::new(CollectingTraceWriter::new());
        let ctx = RunContext::in_memory().with_logger(logger.clone());

        let wrapped = Wrapping {
            child: Arc::new(Leaf("sign")),
        };
        let main = MainWith {
            befores: Arc::new(AtomicUsize::new(0)),
            children: vec![Arc::new(wrapped)],
        };
        ctx.run(main).await.unwrap();

        assert_eq!(
            logger.messages_at(TraceLevel::GroupStart),
            vec!["Action: sign"]
        );
    }

    #[tokio::test]
    async fn nested_regular_action_logs_a_line_instead_of_a_group() {
        let logger = Arc::new(CollectingTraceWriter::new());
        let ctx = RunContext::in_memory().with_logger(logger.clone());

        let leaf = RecordTrace {
            name: "leaf",
            seen: Arc::new(Mutex::new(Vec::new())),
            children: vec![],
        };
        let outer = RecordTrace {
            name: "outer",
            seen: Arc::new(Mutex::new(Vec::new())),
            children: vec![Arc::new(leaf)],
        };
        ctx.run(outer).await.unwrap();

        assert!(logger.messages_at(TraceLevel::GroupStart).is_empty());
        assert_eq!(
            logger.messages_at(TraceLevel::Info),
            vec!["Running action 'outer'", "Running action 'leaf'"]
        );
    }

    #[tokio::test]
    async fn before_hook_fires_once_per_boundary() {
        let befores = Arc::new(AtomicUsize::new(0));
        let main = MainWith {
            befores: befores.clone(),
            children: vec![Arc::new(Leaf("a")), Arc::new(Leaf("b"))],
        };

        RunContext::in_memory().run(main).await.unwrap();

        // One boundary for the main itself plus one per child.
        assert_eq!(befores.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn before_hook_does_not_recurse() {
        struct RecursiveBefore {
            befores: Arc<AtomicUsize>,
        }

        #[async_trait]
        impl Action for RecursiveBefore {
            type Output = ();

            fn kind(&self) -> ActionKind {
                ActionKind::Main
            }

            async fn before(&self, ctx: &RunContext) -> anyhow::Result<()> {
                self.befores.fetch_add(1, Ordering::SeqCst);
                // Running an action inside the hook must not re-trigger it.
                ctx.run(Leaf("from-before")).await
            }

            async fn run(&self, _ctx: &RunContext) -> anyhow::Result<()> {
                Ok(())
            }
        }

        let befores = Arc::new(AtomicUsize::new(0));
        RunContext::in_memory()
            .run(RecursiveBefore {
                befores: befores.clone(),
            })
            .await
            .unwrap();

        assert_eq!(befores.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn name_override_shows_in_logs_and_trace() {
        let logger = Arc::new(CollectingTraceWriter::new());
        let ctx = RunContext::in_memory().with_logger(logger.clone());

        ctx.run_named(Leaf("ignored"), Some("Upload build 42"))
            .await
            .unwrap();

        assert_eq!(
            logger.messages_at(TraceLevel::Info),
            vec!["Running action 'Upload build 42'"]
        );
        assert_eq!(ctx.stack().peek().unwrap().display_name(), "Upload build 42");
    }
}
