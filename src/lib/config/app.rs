use super::error::ConfigError;
use super::model::ModelConfig;
use super::server::ServerConfig;
use std::path::Path;

/// Application configuration loaded from client.toml and the environment
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub model: ModelConfig,
    pub servers: Vec<ServerConfig>,
    pub system_prompt: Option<String>,
    pub history_limit: usize,
    pub max_tool_rounds: usize,
}

impl AppConfig {
    /// Load configuration from a file path (or default path if None)
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        super::loader::load_config(path)
    }

    /// Parse configuration from TOML text, resolving credentials through `env`.
    pub fn from_toml_str<F>(content: &str, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        super::loader::parse_config(content, Path::new("<inline>"), env)
    }
}
