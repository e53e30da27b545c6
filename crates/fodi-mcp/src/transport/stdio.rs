// ABOUTME: Stdio transport reading newline-delimited JSON-RPC from stdin and writing to stdout
// ABOUTME: Standard MCP transport for desktop clients that spawn the server as a subprocess
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use std::sync::Arc;

use async_trait::async_trait;
use fodi::types::DriveError;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, error};

use crate::protocol::{JsonRpcRequest, JsonRpcResponse, PARSE_ERROR};
use crate::server::McpServer;
use crate::transport::McpTransport;

/// MCP transport over stdin/stdout using newline-delimited JSON-RPC
///
/// Each line on stdin is expected to be a complete JSON-RPC message.
/// Responses are written as single lines to stdout. Logs go to stderr
/// to avoid polluting the protocol channel.
pub struct StdioTransport;

#[async_trait]
impl McpTransport for StdioTransport {
    async fn serve(self, server: Arc<McpServer>) -> Result<(), DriveError> {
        let stdin = BufReader::new(tokio::io::stdin());
        let mut stdout = tokio::io::stdout();
        debug!("Stdio transport ready, waiting for JSON-RPC messages on stdin");
        serve_lines(&server, stdin, &mut stdout).await?;
        debug!("Stdin closed, shutting down stdio transport");
        Ok(())
    }
}

/// Answer every JSON-RPC line from `input` on `output` until EOF
pub async fn serve_lines<R, W>(
    server: &McpServer,
    input: R,
    output: &mut W,
) -> Result<(), DriveError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();

    while let Ok(Some(line)) = lines.next_line().await {
        if line.trim().is_empty() {
            continue;
        }

        let request: JsonRpcRequest = match serde_json::from_str(&line) {
            Ok(req) => req,
            Err(e) => {
                error!(error = %e, "Failed to parse JSON-RPC request");
                let resp = JsonRpcResponse::error(None, PARSE_ERROR, format!("Parse error: {e}"));
                write_response(output, &resp).await?;
                continue;
            }
        };

        debug!(method = %request.method, "Handling MCP request");

        if let Some(response) = server.handle_request(request).await {
            write_response(output, &response).await?;
        }
    }

    Ok(())
}

/// Serialize and write a JSON-RPC response as a single line
async fn write_response<W: AsyncWrite + Unpin>(
    output: &mut W,
    response: &JsonRpcResponse,
) -> Result<(), DriveError> {
    let mut json = serde_json::to_string(response)
        .map_err(|e| DriveError::internal(format!("JSON serialization failed: {e}")))?;
    json.push('\n');

    output
        .write_all(json.as_bytes())
        .await
        .map_err(|e| DriveError::internal(format!("stdout write failed: {e}")))?;

    output
        .flush()
        .await
        .map_err(|e| DriveError::internal(format!("stdout flush failed: {e}")))
}
