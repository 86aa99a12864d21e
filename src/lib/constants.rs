//! Application constants
//!
//! Single source of truth for paths, protocol values and loop bounds.

/// Default configuration file path
pub const CONFIG_PATH: &str = "config/client.toml";

/// Default environment file path
pub const ENV_PATH: &str = "config/.env";

/// Joins a server alias and a tool's local name into its qualified name.
/// Server aliases may never contain it.
pub const QUALIFIED_NAME_SEPARATOR: char = '_';

/// Messages kept in conversation history after each turn
pub const DEFAULT_HISTORY_LIMIT: usize = 20;

/// Model round-trips allowed to request tools within one user turn
pub const DEFAULT_MAX_TOOL_ROUNDS: usize = 8;

/// MCP protocol revision sent during the initialize handshake
pub const PROTOCOL_VERSION: &str = "2025-06-18";

/// Default OpenAI-compatible endpoint
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default chat model
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Environment variable holding the model API key
pub const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Tool result text when a provider returns no text content
pub const EMPTY_TOOL_OUTPUT: &str = "tool produced no output";
