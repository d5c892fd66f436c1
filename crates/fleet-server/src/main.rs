//! # Fleet Server
//!
//! Runs the worker pool as a long-lived service until Ctrl-C or SIGTERM.

use fleet_config::ConfigLoader;
use fleet_core::{init_logging, FleetResult};
use fleet_jobs::register_metrics;
use fleet_server::app::{App, DEFAULT_HEARTBEAT_INTERVAL};
use fleet_server::startup;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!(code = e.error_code(), "Application error: {}", e);
        eprintln!("fleet-server: {e}");
        std::process::exit(1);
    }
}

async fn run() -> FleetResult<()> {
    // Load configuration
    let config_loader = ConfigLoader::from_default_location()?;
    let config = config_loader.get().await;

    init_logging(&config.logging, &config.app.environment)?;
    startup::print_banner();

    info!("Starting {} worker service...", config.app.name);
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    register_metrics();

    let app = App::new(config);
    startup::print_startup_info(app.config());

    let ctx = CancellationToken::new();
    app.start(&ctx).await?;

    let heartbeat_ctx = ctx.child_token();
    let heartbeat = app.spawn_heartbeat(&heartbeat_ctx, DEFAULT_HEARTBEAT_INTERVAL);

    shutdown_signal().await;

    heartbeat_ctx.cancel();
    if let Err(e) = heartbeat.await {
        error!(error = %e, "Heartbeat producer failed");
    }

    app.shutdown().await;
    ctx.cancel();

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
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
                error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        () = terminate => {
            info!("Received terminate signal, initiating graceful shutdown...");
        }
    }
}
