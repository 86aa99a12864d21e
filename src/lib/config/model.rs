//! # Model Endpoint Configuration
//!
//! Settings for the OpenAI-compatible chat completion endpoint. Values from
//! the `[model]` table can be overridden by `BASE_URL` and `MODEL` in the
//! environment; the API key is only ever read from the environment.
//!
//! ```toml
//! [model]
//! base_url = "https://api.openai.com/v1"
//! model = "gpt-4o-mini"
//! api_key_env = "OPENAI_API_KEY"
//! ```

use super::error::ConfigError;
use crate::constants::{DEFAULT_API_KEY_ENV, DEFAULT_BASE_URL, DEFAULT_MODEL};
use serde::Deserialize;
use std::fmt;

#[derive(Clone, PartialEq, Eq)]
pub struct ModelConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: String,
}

// Keep the key out of logs and `/config`-style dumps.
impl fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelConfig")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &"***")
            .finish()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct RawModel {
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub api_key_env: Option<String>,
}

impl ModelConfig {
    pub(crate) fn resolve<F>(raw: RawModel, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |value: Option<String>| value.filter(|v| !v.trim().is_empty());

        let key_env = non_blank(raw.api_key_env).unwrap_or_else(|| DEFAULT_API_KEY_ENV.to_string());
        let api_key =
            non_blank(env(&key_env)).ok_or_else(|| ConfigError::MissingApiKey { env: key_env })?;
        let base_url = non_blank(env("BASE_URL"))
            .or(non_blank(raw.base_url))
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let model = non_blank(env("MODEL"))
            .or(non_blank(raw.model))
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        Ok(Self {
            base_url,
            model,
            api_key,
        })
    }
}
