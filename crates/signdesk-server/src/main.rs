use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use signdesk_core::config::RootConfig;
use signdesk_infrastructure::ConfigService;
use signdesk_infrastructure::config_service::resolve_paths;
use signdesk_server::{AppBootstrap, bootstrap, logging, router};
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "signdesk", version)]
#[command(about = "SignDesk - sign language letter recognition server", long_about = None)]
struct Cli {
    /// Config file (default: <config dir>/signdesk/config.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    #[arg(long)]
    host: Option<String>,

    #[arg(long)]
    port: Option<u16>,

    /// Log filter, e.g. `info` or `signdesk_application=debug`
    #[arg(long, value_name = "FILTER")]
    log_level: Option<String>,

    /// Write a config file with defaults if none exists
    #[arg(long)]
    init_config: bool,
}

impl Cli {
    fn apply(&self, config: &mut RootConfig) {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(level) = &self.log_level {
            config.server.log_level = level.clone();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_service = ConfigService::new(cli.config.clone())?;
    let created = cli.init_config && config_service.init_config()?;
    let mut config = config_service.get_config()?;
    cli.apply(&mut config);
    resolve_paths(&mut config)?;

    let _log_guard =
        logging::init_logging(&config.server.log_level, config.server.log_dir.as_deref())?;
    if created {
        tracing::info!(path = %config_service.path().display(), "Wrote default config");
    }
    tracing::info!(path = %config_service.path().display(), "Configuration loaded");

    let AppBootstrap { app_state, sweeper } = bootstrap(&config)?;
    let shutdown = CancellationToken::new();
    let sweeper_task = sweeper.spawn(shutdown.clone());

    let listener = tokio::net::TcpListener::bind((config.server.host.as_str(), config.server.port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", config.server.host, config.server.port))?;
    let address = listener
        .local_addr()
        .context("Failed to read local listener address")?;
    tracing::info!(address = %address, "Server listening");

    axum::serve(
        listener,
        router(app_state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
    .await
    .context("Server error")?;

    shutdown.cancel();
    if let Err(e) = sweeper_task.await {
        tracing::warn!(error = %e, "Session sweeper did not stop cleanly");
    }
    tracing::info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM, then cancels `token`.
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
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
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    tracing::info!("Shutdown signal received");
    token.cancel();
}
