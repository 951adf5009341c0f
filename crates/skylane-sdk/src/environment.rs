// Environment variable accessor seam.
// Pipelines read CI configuration (tokens, branch names, feature toggles)
// through this trait so tests can supply values without mutating the
// process environment.

use dashmap::DashMap;

/// Read/write access to environment variables.
pub trait Environment: Send + Sync {
    /// Get a variable, or `None` if unset or empty.
    fn get(&self, name: &str) -> Option<String>;

    /// Set a variable for the remainder of the run.
    fn set(&self, name: &str, value: &str);

    /// Whether a variable is set to a truthy value ("1", "true", "yes").
    fn is_truthy(&self, name: &str) -> bool {
        matches!(
            self.get(name).as_deref().map(|v| v.to_ascii_lowercase()),
            Some(ref v) if v == "1" || v == "true" || v == "yes"
        )
    }
}

/// Production environment backed by the real process environment.
#[derive(Debug, Clone, Default)]
pub struct ProcessEnvironment;

impl Environment for ProcessEnvironment {
    fn get(&self, name: &str) -> Option<String> {
        std::env::var(name).ok().filter(|v| !v.is_empty())
    }

    fn set(&self, name: &str, value: &str) {
        std::env::set_var(name, value);
    }
}

/// In-memory environment for tests.
#[derive(Debug, Default)]
pub struct InMemoryEnvironment {
    values: DashMap<String, String>,
}

impl InMemoryEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience constructor seeding initial variables.
    pub fn with_values<I, K, V>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let env = Self::new();
        for (key, value) in values {
            env.values.insert(key.into(), value.into());
        }
        env
    }
}

impl Environment for InMemoryEnvironment {
    fn get(&self, name: &str) -> Option<String> {
        self.values
            .get(name)
            .map(|v| v.value().clone())
            .filter(|v| !v.is_empty())
    }

    fn set(&self, name: &str, value: &str) {
        self.values.insert(name.to_string(), value.to_string());
    }
}
