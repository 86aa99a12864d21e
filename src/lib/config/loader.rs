use super::error::ConfigError;
use super::model::{ModelConfig, RawModel};
use super::server::{RawServer, ServerConfig};
use crate::constants::{
    CONFIG_PATH, DEFAULT_HISTORY_LIMIT, DEFAULT_MAX_TOOL_ROUNDS, ENV_PATH,
    QUALIFIED_NAME_SEPARATOR,
};
use dotenvy::from_filename;
use serde::Deserialize;
use std::collections::HashSet;
use std::env;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Once;
use tracing::debug;

static ENV_LOADER: Once = Once::new();

/// Raw configuration structure for deserialization from TOML
#[derive(Debug, Deserialize, Default)]
pub(super) struct RawConfig {
    #[serde(default)]
    pub model: RawModel,
    #[serde(default)]
    pub servers: Vec<RawServer>,
    pub system_prompt: Option<String>,
    pub history_limit: Option<usize>,
    pub max_tool_rounds: Option<usize>,
}

/// Ensures environment variables are loaded from config/.env and ./.env
pub fn ensure_env_loaded() {
    ENV_LOADER.call_once(|| {
        let _ = from_filename(ENV_PATH);
        let _ = dotenvy::dotenv();
    });
}

/// Load and validate configuration from a file path
pub fn load_config(path: Option<&Path>) -> Result<super::AppConfig, ConfigError> {
    ensure_env_loaded();
    let config_path = path.unwrap_or_else(|| Path::new(CONFIG_PATH));
    read_config(config_path)
}

fn read_config(path: &Path) -> Result<super::AppConfig, ConfigError> {
    debug!(path = %path.display(), "Reading client configuration file");

    let content = fs::read_to_string(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            ConfigError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    parse_config(&content, path, |key| env::var(key).ok())
}

pub(super) fn parse_config<F>(
    content: &str,
    path: &Path,
    env: F,
) -> Result<super::AppConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let parsed: RawConfig = toml::from_str(content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    validate_and_build(parsed, env)
}

fn validate_and_build<F>(parsed: RawConfig, env: F) -> Result<super::AppConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let history_limit = parsed.history_limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    if history_limit == 0 {
        return Err(ConfigError::ZeroLimit {
            field: "history_limit",
        });
    }
    let max_tool_rounds = parsed.max_tool_rounds.unwrap_or(DEFAULT_MAX_TOOL_ROUNDS);
    if max_tool_rounds == 0 {
        return Err(ConfigError::ZeroLimit {
            field: "max_tool_rounds",
        });
    }

    let mut servers = Vec::with_capacity(parsed.servers.len());
    let mut seen = HashSet::new();
    for raw in parsed.servers {
        let server = ServerConfig::try_from(raw)?;
        validate_server_name(&server.name)?;
        if !seen.insert(server.name.clone()) {
            return Err(ConfigError::DuplicateServer { name: server.name });
        }
        servers.push(server);
    }

    let model = ModelConfig::resolve(parsed.model, env)?;
    let system_prompt = parsed.system_prompt.filter(|p| !p.trim().is_empty());

    Ok(super::AppConfig {
        model,
        servers,
        system_prompt,
        history_limit,
        max_tool_rounds,
    })
}

/// Server names double as tool namespaces, so they must be splittable.
pub fn validate_server_name(name: &str) -> Result<(), ConfigError> {
    if name.trim().is_empty() {
        return Err(ConfigError::EmptyServerName);
    }
    if name.contains(QUALIFIED_NAME_SEPARATOR) {
        return Err(ConfigError::InvalidServerName {
            name: name.to_string(),
            separator: QUALIFIED_NAME_SEPARATOR,
        });
    }
    Ok(())
}
