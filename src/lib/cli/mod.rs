use clap::Parser;

#[derive(Parser, Debug, Default)]
#[command(
    name = "multi-mcp",
    version,
    about = "Chat with a model that can call tools from several MCP servers"
)]
pub struct Cli {
    /// Configuration file path
    #[arg(long, short)]
    pub config: Option<String>,
    /// System prompt prepended to every model request
    #[arg(long)]
    pub system: Option<String>,
    /// Chat model name (overrides config and MODEL)
    #[arg(long)]
    pub model: Option<String>,
    /// OpenAI-compatible endpoint (overrides config and BASE_URL)
    #[arg(long)]
    pub base_url: Option<String>,
    /// Tool-call rounds allowed in one turn before it fails
    #[arg(long)]
    pub max_tool_rounds: Option<usize>,
    /// Messages kept in the conversation window
    #[arg(long)]
    pub history_limit: Option<usize>,
    /// Silence logs so they do not interleave with the chat
    #[arg(long, short)]
    pub quiet: bool,
}
