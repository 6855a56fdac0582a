// ABOUTME: CLI entry point for the llama-stream proxy binary
// ABOUTME: Loads configuration, builds the backend client and shared state, and serves the router
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use llama_stream::config::{ProxyConfig, RawConfig};
use llama_stream::types::ProxyError;
use llama_stream::ReqwestBackend;

use llama_stream_server::router;
use llama_stream_server::state::ServerState;

/// llama-stream-server: streaming `OpenAI` API in front of a non-streaming backend
#[derive(Parser)]
#[command(name = "llama-stream-server", version, about)]
struct Cli {
    /// TOML configuration file
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// HTTP listen port (overrides `proxy_port`)
    #[arg(long)]
    port: Option<u16>,

    /// HTTP listen host (overrides `host`)
    #[arg(long)]
    host: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut raw = RawConfig::load(&cli.config)?;
    if let Some(port) = cli.port {
        raw.proxy_port = Some(port);
    }
    if let Some(host) = cli.host {
        raw.host = Some(host);
    }
    let config = ProxyConfig::from_raw(raw)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .init();

    let backend = ReqwestBackend::new(&config)?;
    let addr = format!("{}:{}", config.host, config.port);

    tracing::info!(
        address = %addr,
        target = %config.target_url,
        chunk_size = config.synthesis.content_chunk_size.get(),
        argument_chunk_size = config.synthesis.argument_chunk_size.get(),
        timeout_secs = config.request_timeout.map(|t| t.as_secs_f64()),
        passthrough = ?config.forwarded_paths().collect::<Vec<_>>(),
        "Starting llama-stream proxy"
    );

    let state = Arc::new(ServerState::new(config, Arc::new(backend)));
    let app = router::build(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ProxyError::internal(format!("Failed to bind {addr}: {e}")))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ProxyError::internal(format!("Server error: {e}")))?;

    tracing::info!("Proxy stopped");
    Ok(())
}

/// Resolve on Ctrl-C so in-flight responses can finish
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
