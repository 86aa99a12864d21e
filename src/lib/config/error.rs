use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file not found at {path:?}")]
    NotFound { path: PathBuf },

    #[error("failed to read config from {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config from {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("model API key not found; set the {env} environment variable")]
    MissingApiKey { env: String },

    #[error("server entry has an empty name")]
    EmptyServerName,

    #[error("server '{name}' is declared more than once")]
    DuplicateServer { name: String },

    #[error("server name '{name}' must not contain '{separator}'")]
    InvalidServerName { name: String, separator: char },

    #[error("server '{name}' needs either 'command' or 'script'")]
    MissingCommand { name: String },

    #[error("server '{name}' script '{script}' must be a .py or .js file")]
    UnsupportedScript { name: String, script: String },

    #[error("'{field}' must be at least 1")]
    ZeroLimit { field: &'static str },
}
