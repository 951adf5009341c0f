// A leaf action that runs one shell command through the context's
// `ShellRunner`. The generic escape hatch for everything the framework
// does not model: `xcodebuild`, `security`, `ssh-agent`, `xcrun`, etc.

use async_trait::async_trait;
use skylane_sdk::ShellOutput;

use crate::action::Action;
use crate::context::RunContext;

/// Runs a single command in the current working directory and captures
/// its output. Fails when the command exits non-zero.
pub struct ShellAction {
    name: String,
    program: String,
    args: Vec<String>,
}

impl ShellAction {
    pub fn new(name: impl Into<String>, program: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

#[async_trait]
impl Action for ShellAction {
    type Output = ShellOutput;

    fn display_name(&self) -> String {
        self.name.clone()
    }

    async fn run(&self, ctx: &RunContext) -> anyhow::Result<ShellOutput> {
        let cwd = ctx.file_system().current_dir()?;
        let output = ctx
            .shell()
            .run(&self.program, &self.args, &cwd, None)
            .await?;
        if !output.stdout.is_empty() {
            ctx.logger().verbose(output.stdout.trim_end());
        }
        Ok(output)
    }
}
