// Shell command execution seam.
// Actions never spawn processes directly; they go through a `ShellRunner`
// so pipelines can be exercised in tests with scripted responses.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// Error type for non-zero process exit codes.
#[derive(Debug, thiserror::Error)]
#[error("exit code {exit_code} returned from command: '{program}' (stderr: {stderr})")]
pub struct ShellExitError {
    pub exit_code: i32,
    pub program: String,
    pub stderr: String,
}

/// Captured output of a completed shell command.
#[derive(Debug, Clone, Default)]
pub struct ShellOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

/// One recorded call into a shell runner, for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellInvocation {
    pub program: String,
    pub args: Vec<String>,
    pub working_directory: PathBuf,
}

/// Runs a command, captures its output, and fails on non-zero exit.
#[async_trait]
pub trait ShellRunner: Send + Sync {
    /// Execute `program` with `args` in `working_directory`, with optional
    /// environment overrides. Returns captured output, or an error carrying
    /// a [`ShellExitError`] if the process exits non-zero.
    async fn run(
        &self,
        program: &str,
        args: &[String],
        working_directory: &Path,
        environment: Option<&HashMap<String, String>>,
    ) -> anyhow::Result<ShellOutput>;
}

/// Production shell runner backed by `tokio::process::Command`.
#[derive(Debug, Clone, Default)]
pub struct ProcessShellRunner;

impl ProcessShellRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ShellRunner for ProcessShellRunner {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        working_directory: &Path,
        environment: Option<&HashMap<String, String>>,
    ) -> anyhow::Result<ShellOutput> {
        anyhow::ensure!(!program.is_empty(), "program must not be empty");

        tracing::debug!(
            "Running command: '{}' args={:?} cwd={}",
            program,
            args,
            working_directory.display()
        );

        let mut cmd = Command::new(program);
        cmd.args(args)
            .current_dir(working_directory)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if let Some(env) = environment {
            for (key, value) in env {
                cmd.env(key, value);
            }
        }

        let output = cmd
            .output()
            .await
            .map_err(|e| anyhow::anyhow!("failed to spawn '{}': {}", program, e))?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        let exit_code = output.status.code().unwrap_or(-1);

        if !output.status.success() {
            return Err(ShellExitError {
                exit_code,
                program: program.to_string(),
                stderr: stderr.clone(),
            }
            .into());
        }

        Ok(ShellOutput {
            stdout,
            stderr,
            exit_code,
        })
    }
}

/// Canned response for one expected command.
enum ScriptedResponse {
    Success(ShellOutput),
    Failure { exit_code: i32, stderr: String },
}

/// A shell runner for tests: returns scripted responses keyed by program
/// name and records every invocation.
#[derive(Default)]
pub struct ScriptedShellRunner {
    responses: parking_lot::Mutex<HashMap<String, ScriptedResponse>>,
    invocations: parking_lot::Mutex<Vec<ShellInvocation>>,
}

impl ScriptedShellRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a successful response with the given stdout for `program`.
    pub fn succeed_with(&self, program: &str, stdout: &str) {
        self.responses.lock().insert(
            program.to_string(),
            ScriptedResponse::Success(ShellOutput {
                stdout: stdout.to_string(),
                stderr: String::new(),
                exit_code: 0,
            }),
        );
    }

    /// Script a non-zero exit for `program`.
    pub fn fail_with(&self, program: &str, exit_code: i32, stderr: &str) {
        self.responses.lock().insert(
            program.to_string(),
            ScriptedResponse::Failure {
                exit_code,
                stderr: stderr.to_string(),
            },
        );
    }

    /// All invocations recorded so far, in call order.
    pub fn invocations(&self) -> Vec<ShellInvocation> {
        self.invocations.lock().clone()
    }
}

#[async_trait]
impl ShellRunner for ScriptedShellRunner {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        working_directory: &Path,
        _environment: Option<&HashMap<String, String>>,
    ) -> anyhow::Result<ShellOutput> {
        self.invocations.lock().push(ShellInvocation {
            program: program.to_string(),
            args: args.to_vec(),
            working_directory: working_directory.to_path_buf(),
        });

        match self.responses.lock().get(program) {
            Some(ScriptedResponse::Success(output)) => Ok(output.clone()),
            Some(ScriptedResponse::Failure { exit_code, stderr }) => Err(ShellExitError {
                exit_code: *exit_code,
                program: program.to_string(),
                stderr: stderr.clone(),
            }
            .into()),
            // Unscripted commands succeed with empty output.
            None => Ok(ShellOutput::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn scripted_runner_returns_canned_stdout() {
        let runner = ScriptedShellRunner::new();
        runner.succeed_with("git", "abc123\n");

        let output = runner
            .run("git", &args(&["rev-parse", "HEAD"]), Path::new("/tmp"), None)
            .await
            .unwrap();
        assert_eq!(output.stdout, "abc123\n");
        assert_eq!(output.exit_code, 0);

        let calls = runner.invocations();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].program, "git");
        assert_eq!(calls[0].args, args(&["rev-parse", "HEAD"]));
    }

    #[tokio::test]
    async fn scripted_runner_fails_with_exit_error() {
        let runner = ScriptedShellRunner::new();
        runner.fail_with("xcodebuild", 65, "build failed");

        let err = runner
            .run("xcodebuild", &args(&["build"]), Path::new("/tmp"), None)
            .await
            .unwrap_err();
        let exit = err.downcast_ref::<ShellExitError>().unwrap();
        assert_eq!(exit.exit_code, 65);
        assert_eq!(exit.stderr, "build failed");
    }

    #[tokio::test]
    async fn process_runner_captures_stdout() {
        let runner = ProcessShellRunner::new();
        let output = runner
            .run("echo", &args(&["hello"]), Path::new("."), None)
            .await
            .unwrap();
        assert_eq!(output.stdout.trim(), "hello");
        assert_eq!(output.exit_code, 0);
    }

    #[tokio::test]
    async fn process_runner_reports_nonzero_exit() {
        let runner = ProcessShellRunner::new();
        let err = runner
            .run("sh", &args(&["-c", "exit 3"]), Path::new("."), None)
            .await
            .unwrap_err();
        let exit = err.downcast_ref::<ShellExitError>().unwrap();
        assert_eq!(exit.exit_code, 3);
    }
}
