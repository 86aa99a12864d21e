pub mod application;
pub mod cli;
pub mod config;
pub mod constants;
pub mod domain;
pub mod infrastructure;

pub use application::{catalog, conversation, resolver, session, stdio, tooling};
pub use cli::Cli;
pub use config::{AppConfig, ConfigError};
pub use domain::types;
pub use infrastructure::model;

use application::session::{ChatSession, StartupReport};
use application::stdio::StdioError;
use infrastructure::model::{ModelProvider, OpenAIClient};
use std::error::Error;
use std::path::Path;
use tokio::io::{AsyncBufRead, AsyncWrite, BufReader};
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

pub async fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    init_tracing(cli.quiet);
    info!("Starting multi-mcp");
    debug!(
        config = ?cli.config,
        system = ?cli.system,
        model = ?cli.model,
        "CLI arguments parsed"
    );

    let config_path = cli.config.as_deref().map(Path::new);
    let mut config = AppConfig::load(config_path)?;
    if let Some(path) = config_path {
        info!(path = %path.display(), "Loaded configuration from file");
    } else {
        info!("Loaded configuration from default path");
    }
    apply_cli_overrides(&cli, &mut config)?;

    let provider = OpenAIClient::from_config(&config.model);
    let (session, report) = ChatSession::connect(provider, &config).await;
    let stdin = BufReader::new(tokio::io::stdin());
    run_console(session, &report, stdin, &mut tokio::io::stdout()).await?;

    info!("Client execution finished");
    Ok(())
}

/// Print the startup report and run the console loop. The servers are shut
/// down whatever the loop returns.
async fn run_console<P, R, W>(
    mut session: ChatSession<P>,
    report: &StartupReport,
    input: R,
    output: &mut W,
) -> Result<(), StdioError>
where
    P: ModelProvider,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let outcome = match stdio::print_startup_report(output, report).await {
        Ok(()) => stdio::run_with_io(&mut session, input, output).await,
        Err(err) => Err(err.into()),
    };

    let shutdown = session.shutdown().await;
    if !shutdown.is_clean() {
        warn!(
            failed = shutdown.failures.len(),
            "Some MCP servers did not shut down cleanly"
        );
    }

    outcome
}

fn init_tracing(quiet: bool) {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let filter = if quiet {
            EnvFilter::new("off")
        } else {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
        };
        fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_level(true)
            .with_writer(std::io::stderr)
            .init();
    });
}

fn apply_cli_overrides(cli: &Cli, config: &mut AppConfig) -> Result<(), ConfigError> {
    if let Some(model) = cli.model.as_deref().filter(|m| !m.trim().is_empty()) {
        info!(model, "Overriding model based on CLI flag");
        config.model.model = model.to_string();
    }
    if let Some(url) = cli.base_url.as_deref().filter(|u| !u.trim().is_empty()) {
        info!(url, "Overriding model endpoint based on CLI flag");
        config.model.base_url = url.to_string();
    }
    if let Some(prompt) = cli.system.clone() {
        config.system_prompt = Some(prompt).filter(|p| !p.trim().is_empty());
    }
    if let Some(rounds) = cli.max_tool_rounds {
        if rounds == 0 {
            return Err(ConfigError::ZeroLimit {
                field: "max_tool_rounds",
            });
        }
        config.max_tool_rounds = rounds;
    }
    if let Some(limit) = cli.history_limit {
        if limit == 0 {
            return Err(ConfigError::ZeroLimit {
                field: "history_limit",
            });
        }
        config.history_limit = limit;
    }
    Ok(())
}
