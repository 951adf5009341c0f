// Tool registry.
// Lazy install/uninstall bookkeeping for external command-line tools.
// A tool is installed at most once per run and uninstalled at most once,
// at teardown. Tools already present on the host are left alone.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;

use crate::context::RunContext;

/// An external command-line dependency of one or more actions.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Identity used for registry bookkeeping.
    fn name(&self) -> &str;

    /// Whether the tool is already present on the host.
    async fn is_installed(&self, ctx: &RunContext) -> anyhow::Result<bool>;

    /// Install the tool.
    async fn install(&self, ctx: &RunContext) -> anyhow::Result<()>;

    /// Remove the tool.
    async fn uninstall(&self, ctx: &RunContext) -> anyhow::Result<()>;
}

struct ToolEntry {
    tool: Arc<dyn Tool>,
    /// Whether the registry performed the install (as opposed to finding
    /// the tool already on the host). Only these are uninstalled.
    installed_by_registry: bool,
}

/// Install-once / uninstall-at-end bookkeeping for [`Tool`]s.
#[derive(Default)]
pub struct ToolRegistry {
    entries: Mutex<Vec<ToolEntry>>,
    /// Serializes the registered-check / probe / install section so
    /// concurrent `acquire` calls cannot install the same tool twice.
    install_lock: tokio::sync::Mutex<()>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn is_registered(&self, name: &str) -> bool {
        self.entries.lock().iter().any(|e| e.tool.name() == name)
    }

    /// Ensure `tool` is available, installing it if the host does not have
    /// it. Requesting an already-registered tool is a no-op beyond the
    /// registry lookup. Safe to call from concurrent sub-operations of an
    /// action: the check-and-install path is one critical section.
    pub async fn acquire(&self, tool: Arc<dyn Tool>, ctx: &RunContext) -> anyhow::Result<()> {
        let _install_guard = self.install_lock.lock().await;

        if self.is_registered(tool.name()) {
            ctx.logger()
                .verbose(&format!("Tool '{}' already registered", tool.name()));
            return Ok(());
        }

        let mut installed_by_registry = false;
        if !tool.is_installed(ctx).await? {
            ctx.logger().info(&format!("Installing tool '{}'", tool.name()));
            tool.install(ctx).await?;
            installed_by_registry = true;
        }

        self.entries.lock().push(ToolEntry {
            tool,
            installed_by_registry,
        });
        Ok(())
    }

    /// Uninstall every tool the registry installed this run, most recent
    /// first. Individual failures are logged and do not stop the rest.
    /// A no-op when nothing was registered.
    pub async fn uninstall_all(&self, ctx: &RunContext) {
        let entries: Vec<ToolEntry> = std::mem::take(&mut *self.entries.lock());
        for entry in entries.into_iter().rev() {
            if !entry.installed_by_registry {
                continue;
            }
            ctx.logger()
                .info(&format!("Uninstalling tool '{}'", entry.tool.name()));
            if let Err(e) = entry.tool.uninstall(ctx).await {
                ctx.logger().warning(&format!(
                    "Failed to uninstall tool '{}': {:#}",
                    entry.tool.name(),
                    e
                ));
            }
        }
    }
}
