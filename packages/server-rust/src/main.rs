use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use hcp_server::config::{load_from_file, FileConfig, Settings};
use hcp_server::network::{AppState, NetworkModule};
use hcp_server::service::{build_dispatcher, BackgroundWorker, ProofOfLife, RequestStats};
use hcp_server::telemetry::init_logging;
use tracing::{error, info};

/// NGSI command-actuation bridge between a Context Broker and field devices.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Path to a TOML config file. Environment variables override it.
    #[arg(long, env = "HCP_CONFIG_FILE")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let file = match &args.config {
        Some(path) => load_from_file(path)?,
        None => FileConfig::default(),
    };
    let settings = Settings::from_env(&file);

    let log = init_logging(settings.logging.format, settings.logging.level)?;
    info!(version = env!("CARGO_PKG_VERSION"), "Starting HCP server");
    settings.log_report();

    let stats = Arc::new(RequestStats::default());
    let state = AppState {
        dispatcher: Arc::new(
            build_dispatcher(&settings.service).context("failed to build the HTTP client")?,
        ),
        log: Arc::new(log),
        stats: Arc::clone(&stats),
    };

    let mut module = NetworkModule::new(settings.network.clone(), state);
    if let Err(e) = module.start().await {
        if e
            .downcast_ref::<std::io::Error>()
            .is_some_and(|io| io.kind() == std::io::ErrorKind::AddrInUse)
        {
            error!(
                port = settings.network.port,
                "port already in use; is another HCP instance running?"
            );
        }
        return Err(e);
    }

    let interval = settings.service.proof_of_life_interval;
    let mut proof_of_life = BackgroundWorker::start(ProofOfLife::new(stats, interval), interval);

    let served = module.serve(shutdown_signal()).await;
    proof_of_life.stop().await;
    info!("HCP server stopped");
    served
}

/// Resolves on Ctrl+C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }
}
