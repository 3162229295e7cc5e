//! Line-oriented chat loop against a remote agent

use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

use courier_core::handler::RemoteAgent;
use courier_core::types::Message;

const PROMPT: &str = "You: ";
const EXIT_COMMAND: &str = "exit";
const NON_TEXT_PLACEHOLDER: &str = "[non-text reply]";

/// Run the REPL until `exit` or end of input.
///
/// A failed round prints the error and the loop continues.
pub async fn run<R, W>(agent: &dyn RemoteAgent, input: R, mut output: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();

    loop {
        output.write_all(PROMPT.as_bytes()).await?;
        output.flush().await?;

        let Some(line) = lines.next_line().await? else {
            output.write_all(b"\n").await?;
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == EXIT_COMMAND {
            break;
        }

        let rendered = match ask(agent, line).await {
            Ok(reply) => format!("Agent: {}", reply),
            Err(e) => format!("Error: {}", e),
        };
        output.write_all(rendered.as_bytes()).await?;
        output.write_all(b"\n").await?;
    }

    output.flush().await?;
    Ok(())
}

/// One round trip; returns the reply text or a placeholder for non-text replies
pub async fn ask(agent: &dyn RemoteAgent, text: &str) -> courier_core::Result<String> {
    let reply = agent.send(Message::user_text(text)).await?;
    debug!("Reply {} from {}", reply.id(), agent.endpoint());
    Ok(reply.text().unwrap_or(NON_TEXT_PLACEHOLDER).to_string())
}
