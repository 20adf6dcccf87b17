//! capsule-api - Catalog and URL signing proxy for Capsule Radio
//!
//! Configuration priority: command line > environment > TOML file > defaults.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use capsule_api::{build_router, AppState};
use capsule_common::config::TomlConfig;
use clap::Parser;
use tokio::signal;
use tracing::{error, info, warn};

/// Command-line arguments for capsule-api
#[derive(Parser, Debug)]
#[command(name = "capsule-api")]
#[command(about = "Catalog and signed URL proxy for Capsule Radio")]
#[command(version)]
struct Args {
    /// Port to listen on (overrides config file)
    #[arg(short, long, env = "CAPSULE_PORT")]
    port: Option<u16>,

    /// Address to bind (overrides config file)
    #[arg(short, long, env = "CAPSULE_BIND")]
    bind: Option<String>,

    /// Path to TOML config file
    #[arg(short, long, env = "CAPSULE_CONFIG")]
    config: Option<PathBuf>,

    /// Check that required B2 settings are present, then exit
    #[arg(long)]
    check_config: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let mut config =
        TomlConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(bind) = args.bind {
        config.bind = bind;
    }

    if args.check_config {
        return Ok(check_config(&config));
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{},tower_http=debug", config.logging.level).into()),
        )
        .init();

    info!(
        "Starting Capsule Radio API (capsule-api) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let missing = config.missing_b2_settings();
    if !missing.is_empty() {
        warn!(
            "B2 settings missing ({}); API requests will fail until configured",
            missing.join(", ")
        );
    }

    let addr = format!("{}:{}", config.bind, config.port);
    let state = AppState::new(config).context("Failed to initialize application state")?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("capsule-api listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(ExitCode::SUCCESS)
}

/// `--check-config`: report missing B2 settings
fn check_config(config: &TomlConfig) -> ExitCode {
    let missing = config.missing_b2_settings();
    if missing.is_empty() {
        println!("Environment validation passed");
        ExitCode::SUCCESS
    } else {
        eprintln!("Missing required env vars: {}", missing.join(", "));
        ExitCode::FAILURE
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
