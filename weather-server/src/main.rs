//! Binary crate for the `weather-gateway` HTTP server.
//!
//! This crate focuses on:
//! - Parsing CLI arguments
//! - Loading configuration and wiring the resolver
//! - Serving the HTTP API until shutdown

use anyhow::Context;
use clap::Parser;
use std::{net::SocketAddr, sync::Arc};
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;
use weather_gateway::{AppState, build_router};
use weather_gateway_core::{Config, WeatherResolver};

mod cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("weather_gateway=info,weather_gateway_core=info")
        }))
        .init();

    let args = cli::Cli::parse();

    let mut config = Config::load(args.config.as_deref())?;
    if let Some(listen) = args.listen {
        config.server.listen_addr = listen;
    }
    config.validate()?;

    let resolver = WeatherResolver::from_config(&config)?;
    let backend = match (&config.cache.url, &config.cache.token) {
        (Some(_), Some(_)) => "upstash",
        _ => "memory",
    };
    info!(cache = backend, ttl_secs = config.cache.ttl_secs, "resolver ready");

    let app = build_router(AppState {
        resolver: Arc::new(resolver),
    });

    let addr: SocketAddr = config
        .server
        .listen_addr
        .parse()
        .with_context(|| format!("Invalid listen address: {}", config.server.listen_addr))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Listening on {}", addr);

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
