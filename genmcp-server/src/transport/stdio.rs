//! Stdio transport
//!
//! MCP stdio framing: one JSON-RPC message per line on stdin, one response
//! per line on stdout, stderr reserved for logging. Authentication and
//! health endpoints do not apply; header-sourced template variables are
//! unavailable and render as missing.

use crate::dispatch::{McpServer, RequestMeta};
use crate::error::{ServerError, ServerResult};
use genmcp_protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tracing::{debug, info, warn};

/// Serve the dispatcher over stdin/stdout until EOF or ctrl-c
pub async fn run_stdio(server: Arc<McpServer>) -> ServerResult<()> {
    let stdin = BufReader::new(tokio::io::stdin());
    let stdout = BufWriter::new(tokio::io::stdout());
    run_stdio_io(server, stdin, stdout).await
}

/// Transport loop over arbitrary reader/writer pairs; split out for tests
pub async fn run_stdio_io<R, W>(
    server: Arc<McpServer>,
    reader: BufReader<R>,
    mut writer: BufWriter<W>,
) -> ServerResult<()>
where
    R: tokio::io::AsyncRead + Unpin,
    W: tokio::io::AsyncWrite + Unpin,
{
    info!("stdio transport ready");

    let mut lines = reader.lines();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.map_err(ServerError::Io)?,
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received");
                break;
            }
        };

        let Some(line) = line else {
            info!("stdin closed, stopping");
            break;
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<JsonRpcRequest>(line) {
            Ok(request) => {
                debug!(method = %request.method, "stdio request");
                server.handle_request(request, RequestMeta::default()).await
            }
            Err(e) => {
                warn!(error = %e, "stdin line is not valid JSON-RPC");
                Some(JsonRpcResponse::error(JsonRpcError::parse_error(None), None))
            }
        };

        if let Some(response) = response {
            let encoded = serde_json::to_string(&response)
                .map_err(|e| ServerError::Transport(format!("response encoding failed: {}", e)))?;
            writer.write_all(encoded.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use genmcp_protocol::ServerInfo;

    fn test_server() -> Arc<McpServer> {
        Arc::new(McpServer::new(
            ServerInfo {
                name: "stdio-test".to_string(),
                version: "0.1.0".to_string(),
            },
            None,
            reqwest::Client::new(),
        ))
    }

    #[tokio::test]
    async fn test_request_response_lines() {
        let input = b"{\"jsonrpc\":\"2.0\",\"method\":\"ping\",\"id\":1}\n".to_vec();
        let mut output = Vec::new();

        run_stdio_io(
            test_server(),
            BufReader::new(std::io::Cursor::new(input)),
            BufWriter::new(&mut output),
        )
        .await
        .unwrap();

        let text = String::from_utf8(output).unwrap();
        let response: JsonRpcResponse = serde_json::from_str(text.trim()).unwrap();
        assert!(!response.is_error());
    }

    #[tokio::test]
    async fn test_notifications_produce_no_output() {
        let input = b"{\"jsonrpc\":\"2.0\",\"method\":\"notifications/initialized\"}\n".to_vec();
        let mut output = Vec::new();

        run_stdio_io(
            test_server(),
            BufReader::new(std::io::Cursor::new(input)),
            BufWriter::new(&mut output),
        )
        .await
        .unwrap();

        assert!(output.is_empty());
    }

    #[tokio::test]
    async fn test_garbage_line_yields_parse_error() {
        let input = b"this is not json\n".to_vec();
        let mut output = Vec::new();

        run_stdio_io(
            test_server(),
            BufReader::new(std::io::Cursor::new(input)),
            BufWriter::new(&mut output),
        )
        .await
        .unwrap();

        let text = String::from_utf8(output).unwrap();
        let response: JsonRpcResponse = serde_json::from_str(text.trim()).unwrap();
        assert_eq!(response.error.unwrap().code, -32700);
    }

    #[tokio::test]
    async fn test_blank_lines_are_skipped() {
        let input = b"\n\n{\"jsonrpc\":\"2.0\",\"method\":\"ping\",\"id\":2}\n\n".to_vec();
        let mut output = Vec::new();

        run_stdio_io(
            test_server(),
            BufReader::new(std::io::Cursor::new(input)),
            BufWriter::new(&mut output),
        )
        .await
        .unwrap();

        let text = String::from_utf8(output).unwrap();
        assert_eq!(text.trim().lines().count(), 1);
    }
}
