//! Newline-delimited JSON-RPC over stdin/stdout

use crate::mcp::handler::McpHandler;
use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};

/// Serve one message per line until the reader reaches EOF
pub async fn serve_lines<R, W>(handler: &McpHandler, reader: R, writer: W) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    let mut writer = writer;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(response) = handler.handle_message(line.as_bytes()).await {
            let mut payload = serde_json::to_vec(&response)?;
            payload.push(b'\n');
            writer.write_all(&payload).await?;
            writer.flush().await?;
        }
    }

    tracing::info!("Input closed, stopping stdio transport");
    Ok(())
}

/// Serve on the process's stdin and stdout
pub async fn serve_stdio(handler: &McpHandler) -> io::Result<()> {
    tracing::info!("Serving JSON-RPC on stdio");
    serve_lines(
        handler,
        BufReader::new(tokio::io::stdin()),
        BufWriter::new(tokio::io::stdout()),
    )
    .await
}
