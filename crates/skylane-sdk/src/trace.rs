// Trace / logging abstraction for pipeline output.
// Actions report progress through a `TraceWriter` rather than a concrete
// logger so tests can capture output and the engine can open named
// log-group scopes around action runs.

/// The structured logger every action writes to.
///
/// Beyond the usual levels, a trace writer understands *log groups*:
/// named, non-overlapping scopes the engine opens around top-level
/// action runs so CI log viewers can fold them.
pub trait TraceWriter: Send + Sync {
    /// Log an informational message.
    fn info(&self, message: &str);

    /// Log a verbose / debug message.
    fn verbose(&self, message: &str);

    /// Log a warning message.
    fn warning(&self, message: &str) {
        self.info(&format!("[warning] {message}"));
    }

    /// Log an error message.
    fn error(&self, message: &str) {
        self.info(&format!("[error] {message}"));
    }

    /// Open a named log group. Groups do not nest arbitrarily; the engine
    /// decides when opening one is appropriate.
    fn begin_group(&self, name: &str) {
        self.info(&format!("[group] {name}"));
    }

    /// Close the most recently opened log group.
    fn end_group(&self) {}
}

/// A trace writer that routes messages to the `tracing` crate.
#[derive(Debug, Clone, Default)]
pub struct TracingTraceWriter;

impl TraceWriter for TracingTraceWriter {
    fn info(&self, message: &str) {
        tracing::info!(target: "pipeline", "{}", message);
    }

    fn verbose(&self, message: &str) {
        tracing::debug!(target: "pipeline", "{}", message);
    }

    fn warning(&self, message: &str) {
        tracing::warn!(target: "pipeline", "{}", message);
    }

    fn error(&self, message: &str) {
        tracing::error!(target: "pipeline", "{}", message);
    }

    fn begin_group(&self, name: &str) {
        tracing::info!(target: "pipeline", "▸ {}", name);
    }

    fn end_group(&self) {}
}

/// A no-op trace writer that discards all messages. Useful for tests.
#[derive(Debug, Clone, Default)]
pub struct NullTraceWriter;

impl TraceWriter for NullTraceWriter {
    fn info(&self, _message: &str) {}
    fn verbose(&self, _message: &str) {}
    fn warning(&self, _message: &str) {}
    fn error(&self, _message: &str) {}
    fn begin_group(&self, _name: &str) {}
    fn end_group(&self) {}
}

/// The level of a collected trace record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceLevel {
    Info,
    Verbose,
    Warning,
    Error,
    GroupStart,
    GroupEnd,
}

/// One record captured by a [`CollectingTraceWriter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceRecord {
    pub level: TraceLevel,
    pub message: String,
}

impl TraceRecord {
    fn new(level: TraceLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

/// A trace writer that collects all records into a `Vec`, including
/// group open/close events. Useful for asserting on engine output.
#[derive(Debug, Default)]
pub struct CollectingTraceWriter {
    records: parking_lot::Mutex<Vec<TraceRecord>>,
}

impl CollectingTraceWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return all collected records.
    pub fn records(&self) -> Vec<TraceRecord> {
        self.records.lock().clone()
    }

    /// Return only the messages recorded at the given level.
    pub fn messages_at(&self, level: TraceLevel) -> Vec<String> {
        self.records
            .lock()
            .iter()
            .filter(|r| r.level == level)
            .map(|r| r.message.clone())
            .collect()
    }

    /// Clear collected records.
    pub fn clear(&self) {
        self.records.lock().clear();
    }
}

impl TraceWriter for CollectingTraceWriter {
    fn info(&self, message: &str) {
        self.records.lock().push(TraceRecord::new(TraceLevel::Info, message));
    }

    fn verbose(&self, message: &str) {
        self.records.lock().push(TraceRecord::new(TraceLevel::Verbose, message));
    }

    fn warning(&self, message: &str) {
        self.records.lock().push(TraceRecord::new(TraceLevel::Warning, message));
    }

    fn error(&self, message: &str) {
        self.records.lock().push(TraceRecord::new(TraceLevel::Error, message));
    }

    fn begin_group(&self, name: &str) {
        self.records.lock().push(TraceRecord::new(TraceLevel::GroupStart, name));
    }

    fn end_group(&self) {
        self.records.lock().push(TraceRecord::new(TraceLevel::GroupEnd, ""));
    }
}

/// Initialize a global `tracing` subscriber for an embedding binary.
/// Respects `RUST_LOG`; defaults to `info`.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
