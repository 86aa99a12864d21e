use super::error::{RegistryError, ToolInvokeError};
use super::interface::ToolServerHandle;
use super::process::McpProcess;
use crate::config::ServerConfig;
use crate::constants::QUALIFIED_NAME_SEPARATOR;
use futures::future::join_all;
use std::collections::HashMap;
use tracing::{info, warn};

/// Server that could not be brought up during [`ServerRegistry::connect_all`].
#[derive(Debug)]
pub struct ConnectFailure {
    pub alias: String,
    pub error: ToolInvokeError,
}

/// Outcome of tearing down every registered handle.
#[derive(Debug, Default)]
pub struct ShutdownReport {
    pub closed: Vec<String>,
    pub failures: Vec<(String, ToolInvokeError)>,
}

impl ShutdownReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Alias → handle map, kept in registration order.
#[derive(Default)]
pub struct ServerRegistry {
    handles: Vec<Box<dyn ToolServerHandle>>,
    index: HashMap<String, usize>,
}

impl ServerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Launch every configured server concurrently and keep the ones whose
    /// handshake succeeds. Failed servers are shut down and reported.
    pub async fn connect_all(servers: &[ServerConfig]) -> (Self, Vec<ConnectFailure>) {
        let attempts = servers.iter().map(|server| async move {
            let process = McpProcess::new(server.clone());
            info!(server = %server.name, command = %server.launch_line(), "Starting MCP server");
            let outcome = process.initialize().await;
            (process, outcome)
        });

        let mut registry = Self::new();
        let mut failures = Vec::new();
        for (process, outcome) in join_all(attempts).await {
            let alias = process.alias().to_string();
            match outcome {
                Ok(()) => {
                    if let Err(err) = registry.register(Box::new(process.clone())) {
                        warn!(server = %alias, %err, "Rejected MCP server");
                        let _ = process.shutdown().await;
                    }
                }
                Err(error) => {
                    warn!(server = %alias, %error, "Failed to connect MCP server");
                    let _ = process.shutdown().await;
                    failures.push(ConnectFailure { alias, error });
                }
            }
        }
        (registry, failures)
    }

    pub fn register(&mut self, handle: Box<dyn ToolServerHandle>) -> Result<(), RegistryError> {
        let alias = handle.alias().to_string();
        if alias.trim().is_empty() {
            return Err(RegistryError::EmptyAlias);
        }
        if alias.contains(QUALIFIED_NAME_SEPARATOR) {
            return Err(RegistryError::InvalidAlias {
                alias,
                separator: QUALIFIED_NAME_SEPARATOR,
            });
        }
        if self.index.contains_key(&alias) {
            return Err(RegistryError::DuplicateAlias { alias });
        }
        self.index.insert(alias, self.handles.len());
        self.handles.push(handle);
        Ok(())
    }

    pub fn get(&self, alias: &str) -> Option<&dyn ToolServerHandle> {
        self.index
            .get(alias)
            .map(|&position| self.handles[position].as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn ToolServerHandle> {
        self.handles.iter().map(|handle| handle.as_ref())
    }

    pub fn aliases(&self) -> Vec<&str> {
        self.handles.iter().map(|handle| handle.alias()).collect()
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Shut every handle down concurrently. A failing handle does not stop
    /// the others from closing.
    pub async fn shutdown(self) -> ShutdownReport {
        let outcomes = join_all(self.handles.iter().map(|handle| async move {
            (handle.alias().to_string(), handle.shutdown().await)
        }))
        .await;

        let mut report = ShutdownReport::default();
        for (alias, outcome) in outcomes {
            match outcome {
                Ok(()) => report.closed.push(alias),
                Err(err) => {
                    warn!(server = %alias, %err, "MCP server did not shut down cleanly");
                    report.failures.push((alias, err));
                }
            }
        }
        info!(
            closed = report.closed.len(),
            failed = report.failures.len(),
            "MCP servers shut down"
        );
        report
    }
}
