// skylane-sdk: Foundation layer for the Skylane pipeline engine.
// This crate has ZERO dependencies on other skylane crates and provides
// the collaborator seams (logging, shell, environment, file system,
// platform) used throughout the engine.

pub mod environment;
pub mod fs;
pub mod platform;
pub mod shell;
pub mod trace;

// Re-export commonly used items at crate root
pub use environment::{Environment, InMemoryEnvironment, ProcessEnvironment};
pub use fs::{FileSystem, HostFileSystem, InMemoryFileSystem};
pub use platform::Platform;
pub use shell::{ProcessShellRunner, ScriptedShellRunner, ShellExitError, ShellInvocation, ShellOutput, ShellRunner};
pub use trace::{CollectingTraceWriter, NullTraceWriter, TraceLevel, TraceRecord, TraceWriter, TracingTraceWriter};
