//! parkcast-live - live parking occupancy service
//!
//! Serves predictions over HTTP, or runs a single refresh/forecast from the
//! command line and prints the JSON report.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use parkcast_common::config::{resolve_config_path, ParkcastConfig};
use parkcast_common::time::now_local_minute;
use parkcast_live::api::predictions::parse_instant;
use parkcast_live::forecast::{forecast, ForecastRequest};
use parkcast_live::{build_router, AppState, RefreshCycle};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Command-line arguments for parkcast-live
#[derive(Parser, Debug)]
#[command(name = "parkcast-live")]
#[command(about = "Live parking occupancy acquisition and forecasting")]
#[command(version)]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long, global = true, env = "PARKCAST_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API (default)
    Serve {
        /// Address to listen on, overrides the configured one
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// Run one refresh cycle and print the report
    Refresh {
        /// Prediction instant, YYYY-MM-DDTHH:MM (default: now)
        #[arg(long)]
        at: Option<String>,
    },
    /// Forecast over a horizon and print the report
    Forecast {
        #[arg(long, default_value_t = 48)]
        hours: u32,
        #[arg(long, default_value_t = 5)]
        step_minutes: u32,
        /// Restrict to one lot
        #[arg(long)]
        lot: Option<String>,
        /// First instant, YYYY-MM-DDTHH:MM (default: now)
        #[arg(long)]
        start: Option<String>,
    },
    /// Print the effective configuration as TOML
    PrintConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = ParkcastConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level)),
        )
        .init();

    info!(
        "Starting parkcast-live v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    match resolve_config_path(args.config.as_deref()) {
        Some(path) => info!("Config: {}", path.display()),
        None => info!("Config: compiled defaults"),
    }

    match args.command.unwrap_or(Command::Serve { bind: None }) {
        Command::Serve { bind } => serve(config, bind).await,
        Command::Refresh { at } => {
            let at = parse_or_now(at.as_deref())?;
            let cycle = RefreshCycle::from_config(&config)?;
            let report = cycle.run(at, &CancellationToken::new()).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Command::Forecast {
            hours,
            step_minutes,
            lot,
            start,
        } => {
            let request = ForecastRequest {
                horizon_hours: hours,
                step_minutes,
            };
            request.validate().map_err(anyhow::Error::msg)?;
            let start = parse_or_now(start.as_deref())?;
            let cycle = RefreshCycle::from_config(&config)?;
            let report =
                forecast(&cycle, start, request, lot.as_deref(), &CancellationToken::new()).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Command::PrintConfig => {
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
    }
}

fn parse_or_now(raw: Option<&str>) -> Result<chrono::NaiveDateTime> {
    match raw {
        Some(raw) => parse_instant(raw).map_err(|e| anyhow::anyhow!("{}", e)),
        None => Ok(now_local_minute()),
    }
}

async fn serve(config: ParkcastConfig, bind: Option<String>) -> Result<()> {
    let bind = bind.unwrap_or_else(|| config.server.bind.clone());
    let cycle = RefreshCycle::from_config(&config)?;
    let (occupancy, weather) = cycle.source_ids();
    info!(
        lots = cycle.metadata().len(),
        predictor = cycle.predictor_name().unwrap_or("none"),
        occupancy = ?occupancy,
        weather = ?weather,
        "Refresh cycle ready"
    );

    let app = build_router(AppState::new(cycle));

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind to {}", bind))?;
    info!("Listening on http://{}", bind);
    info!("Health check: http://{}/health", bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
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
                warn!("Failed to install signal handler: {}", e);
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
