//! The GenMCP server binary
//!
//! Loads a tool-definitions document and a server-config document,
//! assembles the MCP server, and runs the configured transport. Exit code
//! 0 on orderly shutdown; 1 on validation, bind or other fatal load
//! failures.

use std::sync::Arc;

use clap::Parser;
use genmcp_config::{ConfigLoader, TransportProtocol};
use genmcp_defs::ToolDefinitions;
use genmcp_server::health::HealthState;
use genmcp_server::transport::{build_router, run_stdio, serve_http, AppState};
use genmcp_server::{JwksAuth, ServerAssembler};

#[derive(Parser)]
#[command(name = "genmcp-serve")]
#[command(about = "Serve an MCP server from declarative tool definitions")]
#[command(version)]
struct Cli {
    /// Tool-definitions file (YAML or JSON)
    #[arg(short, long)]
    file: String,

    /// Server-config file (YAML or JSON); defaults apply when omitted
    #[arg(short, long)]
    config: Option<String>,

    /// Validate both documents and exit without serving
    #[arg(long)]
    validate: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("genmcp-serve: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = ConfigLoader::new().load(cli.config.as_deref())?;

    // Under stdio, stdout belongs to the protocol
    let force_stderr = config.runtime.transport_protocol == TransportProtocol::Stdio;
    let _log_guards =
        genmcp_server::logging::init_logging(config.runtime.logging_config.as_ref(), force_stderr);

    tracing::info!(file = %cli.file, "loading tool definitions");
    let catalog = ToolDefinitions::from_file(&cli.file)?;

    let server = ServerAssembler::new().assemble(&catalog, &config)?;

    if cli.validate {
        tracing::info!(
            entries = server.entry_count(),
            "documents are valid, exiting (--validate)"
        );
        println!("Configuration validation successful!");
        return Ok(());
    }

    match config.runtime.transport_protocol {
        TransportProtocol::Stdio => {
            tracing::info!("MCP server ready on stdio");
            run_stdio(Arc::new(server)).await?;
        }
        TransportProtocol::StreamableHttp => {
            let http_config = config.runtime.http();

            let auth = match &http_config.auth {
                Some(auth_config) => {
                    tracing::info!(jwks = %auth_config.jwks_uri, "fetching JWKS for request authentication");
                    Some(Arc::new(
                        JwksAuth::from_config(auth_config, server.http_client()).await?,
                    ))
                }
                None => None,
            };

            let health = HealthState::new();
            let state = AppState {
                server: Arc::new(server),
                auth,
                health: health.clone(),
                stateless: http_config.stateless,
            };

            let router = build_router(state, &http_config);
            serve_http(router, &http_config, health).await?;
        }
    }

    tracing::info!("MCP server stopped");
    Ok(())
}
