//! SakuraStack - local Secret Manager emulator
//!
//! Serves an in-memory stand-in for the Secret Manager API so the secrets CLI
//! can be developed and tested without the real service.

mod config;
mod router;

use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{Config, Overrides};

#[derive(Parser, Debug)]
#[command(name = "sakurastack")]
#[command(about = "Local Secret Manager emulator", long_about = None)]
struct Args {
    /// Configuration file (defaults to an optional ./sakurastack.toml)
    #[arg(short, long, env = "SAKURASTACK_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on [default: 8080]
    #[arg(short, long, env = "SAKURASTACK_PORT")]
    port: Option<u16>,

    /// Host to bind to [default: 0.0.0.0]
    #[arg(long, env = "SAKURASTACK_HOST")]
    host: Option<String>,

    /// URL path prefix [default: /api/cloud/1.1]
    #[arg(long, env = "SAKURASTACK_PREFIX")]
    prefix: Option<String>,

    /// Log level (trace, debug, info, warn, error) [default: info]
    #[arg(long, env = "SAKURASTACK_LOG_LEVEL")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref())?;
    config.apply(Overrides {
        host: args.host,
        port: args.port,
        prefix: args.prefix,
        log_level: args.log_level,
    });
    let config = config.finalize()?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "sakurastack={0},sakurastack_secretmanager={0},tower_http=debug",
                    config.log.level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = config.listen_addr()?;
    let state = router::AppState::new(&config.api.prefix);
    let app = router::create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", listener.local_addr()?);
    info!("To connect the secrets CLI to this server, set:");
    info!("  export SAKURA_API_ROOT_URL={}", config.api_root_url());
    info!("  export SAKURA_ACCESS_TOKEN=dummy");
    info!("  export SAKURA_ACCESS_TOKEN_SECRET=dummy");
    info!("  export VAULT_ID=your-vault-id");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Resolves on SIGINT or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
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
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("shutting down...");
}
