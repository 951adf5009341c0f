// Platform descriptor.
// Tells actions what host they are running on and whether the run is
// happening under a CI service.

use crate::environment::Environment;
use std::path::PathBuf;

/// Describes the host a pipeline runs on.
#[derive(Debug, Clone)]
pub struct Platform {
    /// Operating system name (e.g. "macos", "linux").
    pub os: String,

    /// Whether the process appears to be running under a CI service.
    pub is_ci: bool,

    /// The working directory the process started in.
    pub initial_working_directory: PathBuf,
}

impl Platform {
    /// Detect the platform from the given environment.
    pub fn detect(env: &dyn Environment) -> Self {
        let is_ci = env.is_truthy("CI") || env.get("GITHUB_ACTIONS").is_some();

        Self {
            os: std::env::consts::OS.to_string(),
            is_ci,
            initial_working_directory: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    /// A fixed platform for tests.
    pub fn fixed(os: &str, is_ci: bool, initial_working_directory: impl Into<PathBuf>) -> Self {
        Self {
            os: os.to_string(),
            is_ci,
            initial_working_directory: initial_working_directory.into(),
        }
    }
}
