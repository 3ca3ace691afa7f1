//! Serve command - runs the HTTP server in a single process

use std::net::{IpAddr, SocketAddr};

use anyhow::Context;
use clap::Args;
use tokio::net::TcpListener;
use tokio::runtime::Runtime;
use tokio::signal;
use tracing::{error, info};

use crate::api::create_router;
use crate::config::AppConfig;
use crate::infrastructure::logging::init_logging;
use crate::infrastructure::observability::init_metrics;

/// Arguments for the serve command
#[derive(Args, Clone, Debug, Default)]
pub struct ServeArgs {
    /// Address to listen on (overrides config)
    #[arg(long)]
    pub bind: Option<SocketAddr>,

    /// Async runtime worker threads (overrides config)
    #[arg(long)]
    pub workers: Option<usize>,
}

/// Where and how the server runs, after CLI overrides
#[derive(Debug, Clone, PartialEq, Eq)]
struct ServeSettings {
    addr: SocketAddr,
    workers: usize,
}

impl ServeSettings {
    fn resolve(args: &ServeArgs, config: &AppConfig) -> anyhow::Result<Self> {
        let addr = match args.bind {
            Some(addr) => addr,
            None => build_socket_addr(config)?,
        };

        let workers = args.workers.unwrap_or(config.server.workers);
        if workers == 0 {
            anyhow::bail!("workers must be at least 1");
        }

        Ok(Self { addr, workers })
    }
}

/// Run the server until SIGTERM or Ctrl+C.
/// Start-up and serve failures are returned so the process exits non-zero.
pub fn run(args: ServeArgs) -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("failed to load configuration")?;
    let settings = ServeSettings::resolve(&args, &config)?;

    init_logging(&config.logging);

    build_runtime(settings.workers)?.block_on(serve(config, settings))
}

fn build_runtime(workers: usize) -> anyhow::Result<Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(workers)
        .enable_all()
        .build()
        .context("failed to build async runtime")
}

async fn serve(config: AppConfig, settings: ServeSettings) -> anyhow::Result<()> {
    let metrics = init_metrics(&config.metrics);
    let state = crate::create_app_state(&config)?;
    let app = create_router(state, metrics, &config.metrics.path);

    let listener = bind(settings.addr).await?;
    info!(
        addr = %settings.addr,
        workers = settings.workers,
        hospital_api = %config.hospital_api.base_url,
        "Starting hospital bulk import server"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server shutdown complete");
    Ok(())
}

async fn bind(addr: SocketAddr) -> anyhow::Result<TcpListener> {
    TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))
}

fn build_socket_addr(config: &AppConfig) -> anyhow::Result<SocketAddr> {
    let host = config
        .server
        .host
        .parse::<IpAddr>()
        .with_context(|| format!("invalid server host '{}'", config.server.host))?;

    Ok(SocketAddr::from((host, config.server.port)))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
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
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_from_config() {
        let settings = ServeSettings::resolve(&ServeArgs::default(), &AppConfig::default()).unwrap();

        assert_eq!(settings.addr, "0.0.0.0:8080".parse().unwrap());
        assert_eq!(settings.workers, 1);
    }

    #[test]
    fn test_args_override_config() {
        let args = ServeArgs {
            bind: Some("127.0.0.1:9000".parse().unwrap()),
            workers: Some(4),
        };
        let settings = ServeSettings::resolve(&args, &AppConfig::default()).unwrap();

        assert_eq!(settings.addr.port(), 9000);
        assert_eq!(settings.workers, 4);
    }

    #[test]
    fn test_zero_workers_rejected() {
        let args = ServeArgs {
            bind: None,
            workers: Some(0),
        };
        assert!(ServeSettings::resolve(&args, &AppConfig::default()).is_err());
    }

    #[test]
    fn test_invalid_host_rejected() {
        let mut config = AppConfig::default();
        config.server.host = "not-an-ip".to_string();

        let err = build_socket_addr(&config).unwrap_err();
        assert!(err.to_string().contains("not-an-ip"));
    }

    #[test]
    fn test_runtime_uses_requested_workers() {
        let runtime = build_runtime(2).unwrap();
        assert_eq!(runtime.metrics().num_workers(), 2);
        assert_eq!(runtime.block_on(async { 40 + 2 }), 42);
    }

    #[tokio::test]
    async fn test_bind_failure_is_an_error() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = taken.local_addr().unwrap();

        let err = bind(addr).await.unwrap_err();
        assert!(err.to_string().contains("failed to bind"));
    }
}
