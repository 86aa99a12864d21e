use crate::application::resolver::ToolStep;
use crate::application::session::{ChatSession, StartupReport};
use crate::domain::types::ChatMessage;
use crate::infrastructure::model::ModelProvider;
use thiserror::Error;
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, error, info};

#[derive(Debug, Error)]
pub enum StdioError {
    #[error("stdin/stdout I/O error: {0}")]
    Io(#[from] std::io::Error),
}

enum LoopControl {
    Continue,
    Exit,
}

/// Interactive loop reading queries from `input` and writing replies to `output`.
pub async fn run_with_io<P, R, W>(
    session: &mut ChatSession<P>,
    input: R,
    output: &mut W,
) -> Result<(), StdioError>
where
    P: ModelProvider,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();

    print_banner(output).await?;

    loop {
        prompt(output).await?;
        let line = match lines.next_line().await? {
            Some(line) => line,
            None => {
                write_line(output, "\nInput closed. Leaving chat.").await?;
                break;
            }
        };

        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input.eq_ignore_ascii_case("quit") {
            break;
        }

        if input.starts_with('/') {
            match handle_command(input, session, output).await? {
                LoopControl::Continue => continue,
                LoopControl::Exit => break,
            }
        } else {
            handle_query(session, input, output).await?;
        }
    }

    output.flush().await?;
    Ok(())
}

async fn handle_command<P, W>(
    input: &str,
    session: &mut ChatSession<P>,
    output: &mut W,
) -> Result<LoopControl, StdioError>
where
    P: ModelProvider,
    W: AsyncWrite + Unpin,
{
    let command = input.trim_start_matches('/');
    let name = command
        .split_whitespace()
        .next()
        .unwrap_or("")
        .to_ascii_lowercase();

    debug!(command = %name, "Processing console command");

    match name.as_str() {
        "" => Ok(LoopControl::Continue),
        "help" | "?" => {
            print_help(output).await?;
            Ok(LoopControl::Continue)
        }
        "exit" | "quit" | "q" => Ok(LoopControl::Exit),
        "reset" | "clear" => {
            session.reset();
            write_line(output, "History cleared. Starting a new conversation.").await?;
            Ok(LoopControl::Continue)
        }
        "tools" => {
            let names = session.catalog().names();
            if names.is_empty() {
                write_line(output, "No tools available.").await?;
            } else {
                write_line(output, &format!("\nTools ({}):", names.len())).await?;
                for tool in session.catalog().iter() {
                    write_line(
                        output,
                        &format!("  - {}: {}", tool.qualified_name(), tool.description),
                    )
                    .await?;
                }
            }
            Ok(LoopControl::Continue)
        }
        "history" => {
            print_history(output, session.conversation().messages()).await?;
            Ok(LoopControl::Continue)
        }
        "steps" => {
            if session.last_steps().is_empty() {
                write_line(output, "No tool calls in the last turn.").await?;
            } else {
                print_tool_steps(output, session.last_steps()).await?;
            }
            Ok(LoopControl::Continue)
        }
        other => {
            write_line(
                output,
                &format!("Unknown command '{other}'. Type /help for the list."),
            )
            .await?;
            Ok(LoopControl::Continue)
        }
    }
}

async fn handle_query<P, W>(
    session: &mut ChatSession<P>,
    query: &str,
    output: &mut W,
) -> Result<(), StdioError>
where
    P: ModelProvider,
    W: AsyncWrite + Unpin,
{
    info!("Processing console query");
    match session.submit(query).await {
        Ok(turn) => {
            for step in &turn.steps {
                write_line(
                    output,
                    &format!("\n[calling tool {} with {}]", step.tool, step.arguments_text()),
                )
                .await?;
            }
            write_line(output, &format!("\nAI: {}", turn.answer)).await?;
        }
        Err(err) => {
            error!(%err, "Console turn failed");
            write_line(output, &format!("\n⚠️ {}", err.user_message())).await?;
        }
    }
    output.flush().await?;
    Ok(())
}

/// Print the connected servers, the ones that failed and the merged tools.
pub async fn print_startup_report<W>(output: &mut W, report: &StartupReport) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    if report.connected.is_empty() {
        write_line(output, "No MCP servers connected.").await?;
    } else {
        write_line(output, "Connected MCP servers:").await?;
        for (alias, launch) in &report.connected {
            write_line(output, &format!("  - {alias}: {launch}")).await?;
        }
    }
    for failure in &report.failures {
        write_line(
            output,
            &format!("  ! {} failed to start: {}", failure.alias, failure.error),
        )
        .await?;
    }
    if report.tools.is_empty() {
        write_line(output, "No tools merged.").await?;
    } else {
        write_line(output, &format!("Tools: {}", report.tools.join(", "))).await?;
    }
    output.flush().await
}

async fn print_history<W>(output: &mut W, messages: &[ChatMessage]) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    if messages.is_empty() {
        return write_line(output, "History is empty.").await;
    }
    write_line(output, &format!("\nHistory ({} messages):", messages.len())).await?;
    for message in messages {
        let line = match message {
            ChatMessage::Assistant { tool_calls, .. } if !tool_calls.is_empty() => {
                let names: Vec<&str> = tool_calls.iter().map(|call| call.name.as_str()).collect();
                format!("  assistant -> {}", names.join(", "))
            }
            ChatMessage::Tool { tool_call_id, content } => {
                format!("  tool[{tool_call_id}]: {}", preview(content))
            }
            other => format!(
                "  {}: {}",
                other.role().as_str(),
                preview(other.text().unwrap_or_default())
            ),
        };
        write_line(output, &line).await?;
    }
    Ok(())
}

async fn print_tool_steps<W>(output: &mut W, steps: &[ToolStep]) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    write_line(output, "\nTool steps:").await?;
    for (index, step) in steps.iter().enumerate() {
        let status = if step.success { "ok" } else { "failed" };
        write_line(
            output,
            &format!("  {}. {} [{}]", index + 1, step.tool, status),
        )
        .await?;
        write_line(output, &format!("     in : {}", step.arguments_text())).await?;
        for line in step.output.lines() {
            write_line(output, &format!("     out: {line}")).await?;
        }
    }
    Ok(())
}

async fn print_banner<W>(output: &mut W) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    write_line(output, "\nMCP client started. Type 'quit' to exit.").await?;
    write_line(output, "Type /help for commands.").await
}

async fn print_help<W>(output: &mut W) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    write_line(output, "\nAvailable commands:").await?;
    write_line(output, "  /help       Show this help").await?;
    write_line(output, "  /tools      List the merged tool catalog").await?;
    write_line(output, "  /history    Show the conversation history").await?;
    write_line(output, "  /steps      Show tool calls from the last turn").await?;
    write_line(output, "  /reset      Clear the conversation").await?;
    write_line(output, "  /exit       Leave (same as 'quit')").await?;
    write_line(output, "Anything else is sent to the model.").await
}

async fn prompt<W>(output: &mut W) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    output.write_all(b"\nYou: ").await?;
    output.flush().await
}

async fn write_line<W>(output: &mut W, line: &str) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    output.write_all(line.as_bytes()).await?;
    output.write_all(b"\n").await?;
    Ok(())
}

fn preview(text: &str) -> String {
    const LIMIT: usize = 120;
    let trimmed = text.trim();
    let mut result = String::new();
    for (idx, ch) in trimmed.chars().enumerate() {
        if idx >= LIMIT {
            result.push_str("...");
            break;
        }
        result.push(ch);
    }
    result
}
