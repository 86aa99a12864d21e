//! # Chat Session
//!
//! Owns everything one interactive conversation needs: the model provider,
//! the server registry, the merged catalog and the bounded history. Each
//! [`ChatSession::submit`] is one turn; a failed turn leaves the history
//! exactly as it was before the turn started.

use crate::application::catalog::ToolCatalog;
use crate::application::conversation::ConversationState;
use crate::application::resolver::{
    ResolveError, ResolvedTurn, ResolverOptions, ToolCallResolver, ToolStep,
};
use crate::application::tooling::{ConnectFailure, ServerRegistry, ShutdownReport};
use crate::config::AppConfig;
use crate::infrastructure::model::ModelProvider;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("query must not be empty")]
    EmptyQuery,
    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

impl SessionError {
    pub fn user_message(&self) -> String {
        match self {
            SessionError::EmptyQuery => "Please type a question.".to_string(),
            SessionError::Resolve(err) => err.user_message(),
        }
    }
}

/// What happened while bringing the session up.
#[derive(Debug)]
pub struct StartupReport {
    /// `(alias, launch line)` for every connected server.
    pub connected: Vec<(String, String)>,
    pub failures: Vec<ConnectFailure>,
    pub tools: Vec<String>,
}

pub struct ChatSession<P: ModelProvider> {
    provider: P,
    registry: ServerRegistry,
    catalog: ToolCatalog,
    conversation: ConversationState,
    options: ResolverOptions,
    last_steps: Vec<ToolStep>,
}

impl<P: ModelProvider> ChatSession<P> {
    pub fn new(
        provider: P,
        registry: ServerRegistry,
        catalog: ToolCatalog,
        options: ResolverOptions,
        history_limit: usize,
    ) -> Self {
        Self {
            provider,
            registry,
            catalog,
            conversation: ConversationState::new(history_limit),
            options,
            last_steps: Vec::new(),
        }
    }

    /// Launch every configured server, merge their catalogs and build a
    /// session. Servers that fail to start are reported and left out.
    pub async fn connect(provider: P, config: &AppConfig) -> (Self, StartupReport) {
        let (registry, failures) = ServerRegistry::connect_all(&config.servers).await;
        let catalog = ToolCatalog::merge(&registry).await;

        let connected = config
            .servers
            .iter()
            .filter(|server| registry.get(&server.name).is_some())
            .map(|server| (server.name.clone(), server.launch_line()))
            .collect();
        let report = StartupReport {
            connected,
            failures,
            tools: catalog.names().into_iter().map(str::to_string).collect(),
        };
        info!(
            servers = registry.len(),
            failed = report.failures.len(),
            tools = catalog.len(),
            "Chat session ready"
        );

        let options = ResolverOptions::new(config.model.model.clone())
            .with_system_prompt(config.system_prompt.clone())
            .with_max_tool_rounds(config.max_tool_rounds);
        let session = Self::new(provider, registry, catalog, options, config.history_limit);
        (session, report)
    }

    /// Run one user turn and return the final answer.
    pub async fn submit(&mut self, query: &str) -> Result<ResolvedTurn, SessionError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SessionError::EmptyQuery);
        }

        let checkpoint = self.conversation.len();
        self.conversation.push_user(query);

        let resolver = ToolCallResolver::new(
            &self.provider,
            &self.catalog,
            &self.registry,
            &self.options,
        );
        match resolver.resolve(&mut self.conversation).await {
            Ok(turn) => {
                self.conversation.push_assistant(turn.final_message.clone());
                self.conversation.truncate();
                self.last_steps = turn.steps.clone();
                debug!(history = self.conversation.len(), "Turn committed");
                Ok(turn)
            }
            Err(err) => {
                warn!(%err, "Turn failed; restoring conversation");
                self.conversation.rollback(checkpoint);
                Err(err.into())
            }
        }
    }

    pub fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }

    pub fn registry(&self) -> &ServerRegistry {
        &self.registry
    }

    pub fn conversation(&self) -> &ConversationState {
        &self.conversation
    }

    pub fn options(&self) -> &ResolverOptions {
        &self.options
    }

    /// Tool steps of the most recent successful turn.
    pub fn last_steps(&self) -> &[ToolStep] {
        &self.last_steps
    }

    pub fn reset(&mut self) {
        self.conversation.clear();
        self.last_steps.clear();
    }

    /// Tear down every server handle.
    pub async fn shutdown(self) -> ShutdownReport {
        self.registry.shutdown().await
    }
}
