//! Portico gateway binary.
//!
//! Loads the YAML config (`PORTICO_CONFIG`, default `portico.yaml`), mounts the
//! demo endpoints, and serves until Ctrl-C or SIGTERM.

use std::net::SocketAddr;
use std::process::ExitCode;

use tracing_subscriber::{fmt, EnvFilter};

use portico_core::{GatewayError, Result};
use portico_gateway::{config, services, transport, GatewayBuilder};

#[tokio::main]
async fn main() -> ExitCode {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "portico-gateway failed");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let cfg = config::load_from_env()?;
    let listen: SocketAddr = cfg
        .gateway
        .listen
        .parse()
        .map_err(|e| GatewayError::Config(format!("gateway.listen: {e}")))?;
    let socket_opts = cfg.gateway.socket.clone();

    let gateway = GatewayBuilder::new(cfg)
        .add_endpoints(services::demo_endpoints())
        .build()?;

    let listener = transport::socket::bind(listen, &socket_opts)?;
    tracing::info!(%listen, "portico-gateway starting");

    gateway.serve_with_shutdown(listener, shutdown_signal()).await?;
    tracing::info!("portico-gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
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
    tracing::info!("signal received, starting graceful shutdown");
}
