use anyhow::{Context, Result};
use boxoffice::config::EngineConfig;
use boxoffice::engine::{BookingEngine, spawn_reservation_expirer};
use boxoffice::web::{AppState, build_router};
use clap::Parser;
use std::net::SocketAddr;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";

/// In-memory seat inventory and booking server.
///
/// Configuration comes from `BOXOFFICE_*` environment variables (a `.env`
/// file is honored); command-line flags override both.
#[derive(Parser, Debug)]
#[command(name = "boxoffice", version, about)]
struct Cli {
    /// Address to listen on (overrides BOXOFFICE_BIND_ADDR)
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// Reservation time-to-live in seconds
    #[arg(long, value_name = "SECS")]
    reservation_ttl_secs: Option<u64>,

    /// Pause between expiry sweeps in seconds
    #[arg(long, value_name = "SECS")]
    sweep_interval_secs: Option<u64>,

    /// Number of theaters the availability cache retains
    #[arg(long, value_name = "N")]
    cache_capacity: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let mut config = EngineConfig::from_env()
        .map_err(anyhow::Error::msg)
        .context("failed to load configuration")?;
    if let Some(secs) = cli.reservation_ttl_secs {
        config.reservation_ttl = Duration::from_secs(secs);
    }
    if let Some(secs) = cli.sweep_interval_secs {
        config.sweep_interval = Duration::from_secs(secs);
    }
    if let Some(capacity) = cli.cache_capacity {
        config.cache_capacity =
            NonZeroUsize::new(capacity).context("cache capacity must be greater than zero")?;
    }

    let bind_addr: SocketAddr = match cli.bind {
        Some(addr) => addr,
        None => std::env::var("BOXOFFICE_BIND_ADDR")
            .unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string())
            .parse()
            .context("invalid BOXOFFICE_BIND_ADDR")?,
    };

    let engine =
        Arc::new(BookingEngine::with_config(config).context("failed to build booking engine")?);
    let sweep_interval = engine.config().sweep_interval;
    let expirer = spawn_reservation_expirer(engine.clone(), sweep_interval);

    let app = build_router(AppState::new(engine));
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;

    info!(
        bind_addr = %bind_addr,
        sweep_interval_secs = sweep_interval.as_secs(),
        "boxoffice started"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    expirer.stop().await.context("failed to stop expiry worker")?;
    info!("boxoffice stopped");

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("boxoffice=info,tower_http=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "unable to install ctrl+c handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "unable to install sigterm handler");
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
}
