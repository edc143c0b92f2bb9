//! Stdio transport: reads JSON-RPC from stdin, writes to stdout.
//!
//! Each request runs on its own task so a slow scrape does not hold up other
//! calls. Responses are funnelled through one channel to a single writer, so
//! lines never interleave.

use std::sync::Arc;

use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::protocol::ProtocolHandler;
use crate::types::{McpError, McpResult};

use super::framing;

const OUTBOUND_CAPACITY: usize = 64;

/// Stdio transport for desktop MCP clients.
pub struct StdioTransport {
    handler: Arc<ProtocolHandler>,
}

impl StdioTransport {
    pub fn new(handler: ProtocolHandler) -> Self {
        Self {
            handler: Arc::new(handler),
        }
    }

    /// Serve stdin/stdout until EOF.
    pub async fn run(&self) -> McpResult<()> {
        tracing::info!("Stdio transport started");
        self.serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
            .await
    }

    /// Serve any line-oriented reader and writer until the reader hits EOF.
    /// In-flight requests are drained before returning.
    pub async fn serve<R, W>(&self, mut reader: R, writer: W) -> McpResult<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<Value>(OUTBOUND_CAPACITY);
        let writer_task = tokio::spawn(write_responses(rx, writer));
        let mut in_flight = JoinSet::new();
        let mut line = String::new();

        loop {
            line.clear();
            let bytes_read = reader.read_line(&mut line).await?;
            if bytes_read == 0 {
                tracing::info!("EOF on input, shutting down");
                break;
            }
            if line.trim().is_empty() {
                continue;
            }

            match framing::parse_message(&line) {
                Ok(msg) => {
                    let handler = Arc::clone(&self.handler);
                    let tx = tx.clone();
                    in_flight.spawn(async move {
                        if let Some(response) = handler.handle_message(msg).await {
                            if tx.send(response).await.is_err() {
                                tracing::warn!("Writer closed before a response was sent");
                            }
                        }
                    });
                }
                Err(e) => {
                    tracing::warn!("Parse error: {e}");
                    tx.send(framing::parse_error_response(&e))
                        .await
                        .map_err(|_| McpError::Transport("writer closed".to_string()))?;
                }
            }

            // Reap finished tasks so the set does not grow without bound.
            while let Some(joined) = in_flight.try_join_next() {
                if let Err(e) = joined {
                    tracing::error!("Request task failed: {e}");
                }
            }
        }

        while let Some(joined) = in_flight.join_next().await {
            if let Err(e) = joined {
                tracing::error!("Request task failed: {e}");
            }
        }
        drop(tx);

        writer_task
            .await
            .map_err(|e| McpError::Transport(format!("writer task failed: {e}")))?
    }
}

async fn write_responses<W>(mut rx: mpsc::Receiver<Value>, mut writer: W) -> McpResult<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(response) = rx.recv().await {
        let framed = framing::frame_message(&response)?;
        writer.write_all(framed.as_bytes()).await?;
        writer.flush().await?;
    }
    Ok(())
}
