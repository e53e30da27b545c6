// ABOUTME: CLI entry point for the FODI MCP server binary
// ABOUTME: Parses arguments, builds the drive collaborators, and serves over stdio or HTTP
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use fodi::auth::AuthProvider;
use fodi::types::FileStore;
use fodi::{FodiConfig, GraphClient, MemoryStore, NoAuth};

use fodi_mcp::events::{
    EventsConfig, LivenessSweeper, DEFAULT_CHANNEL_CAPACITY, DEFAULT_CLIENT_TIMEOUT,
    DEFAULT_PING_INTERVAL,
};
use fodi_mcp::server::McpServer;
use fodi_mcp::state::ServerState;
use fodi_mcp::tools::build_tool_registry;
use fodi_mcp::transport::http::HttpTransport;
use fodi_mcp::transport::stdio::StdioTransport;
use fodi_mcp::transport::McpTransport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Transport {
    /// Newline-delimited JSON-RPC on stdin/stdout
    Stdio,
    /// JSON-RPC over POST /mcp plus the SSE subscription routes
    Http,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Store {
    /// Sample drive held in memory
    Memory,
    /// OneDrive through Microsoft Graph
    Onedrive,
}

/// fodi-mcp: expose a cloud drive to MCP clients and stream file change events
#[derive(Parser)]
#[command(name = "fodi-mcp", version, about)]
struct Cli {
    /// Transport mode
    #[arg(long, value_enum, default_value_t = Transport::Stdio)]
    transport: Transport,

    /// HTTP listen port (only used with --transport http)
    #[arg(long, default_value_t = 3000)]
    port: u16,

    /// HTTP listen host (only used with --transport http)
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Drive backend
    #[arg(long, value_enum, default_value_t = Store::Memory)]
    store: Store,

    /// Seconds between liveness sweeps of SSE subscribers
    #[arg(long, default_value_t = DEFAULT_PING_INTERVAL.as_secs())]
    ping_interval_secs: u64,

    /// Seconds without a successful send before a subscriber is evicted
    #[arg(long, default_value_t = DEFAULT_CLIENT_TIMEOUT.as_secs())]
    client_timeout_secs: u64,

    /// Frames buffered per subscriber before it counts as stalled
    #[arg(long, default_value_t = DEFAULT_CHANNEL_CAPACITY)]
    channel_capacity: usize,

    /// TOML configuration file (defaults to <config dir>/fodi/config.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,
}

type Collaborators = (Arc<dyn FileStore>, Arc<dyn AuthProvider>);

async fn build_collaborators(
    store: Store,
    config: FodiConfig,
) -> Result<Collaborators, Box<dyn std::error::Error>> {
    match store {
        Store::Memory => {
            let store: Arc<dyn FileStore> = Arc::new(MemoryStore::demo().await?);
            let auth: Arc<dyn AuthProvider> = Arc::new(NoAuth::new(&config.oauth)?);
            Ok((store, auth))
        }
        Store::Onedrive => {
            let client = Arc::new(GraphClient::new(config)?);
            let store: Arc<dyn FileStore> = Arc::clone(&client) as Arc<dyn FileStore>;
            let auth: Arc<dyn AuthProvider> = client;
            Ok((store, auth))
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr to keep stdout clean for stdio transport
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let events_config = EventsConfig {
        ping_interval: Duration::from_secs(cli.ping_interval_secs),
        client_timeout: Duration::from_secs(cli.client_timeout_secs),
        channel_capacity: cli.channel_capacity,
    };
    events_config.validate()?;

    let config = FodiConfig::load(cli.config.as_deref())?;
    let (store, auth) = build_collaborators(cli.store, config).await?;
    let store_name = store.name().to_owned();

    let state = Arc::new(ServerState::new(store, auth, events_config));
    let registry = build_tool_registry()?;
    let server = Arc::new(McpServer::new(Arc::clone(&state), registry));

    tracing::info!(
        transport = ?cli.transport,
        store = %store_name,
        "Starting FODI MCP server"
    );

    match cli.transport {
        Transport::Stdio => StdioTransport.serve(server).await?,
        Transport::Http => {
            let sweeper =
                LivenessSweeper::spawn(Arc::clone(&state.events), events_config.ping_interval);
            let served = HttpTransport::new(cli.host, cli.port).serve(server).await;
            sweeper.shutdown().await;
            served?;
        }
    }

    Ok(())
}
