mod api;
mod cache;
mod config;
mod errors;
mod headers;
mod models;
mod openapi;
mod reconciler;
mod scopes;
mod state;
mod store;
#[cfg(test)]
mod test_utils;
mod tokens;

use crate::state::AppState;
use crate::store::ScopeStore;
use axum::Router;
use clap::{Parser, Subcommand};
use log::{error, info};
use std::net::SocketAddr;
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;
use utoipa_scalar::{Scalar, Servable};

#[derive(Parser, Debug)]
#[command(name = "scope-server")]
#[command(about = "Dynamic OAuth scope registry")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Reconcile the declared scopes, then serve the HTTP API (default)
    Serve {
        /// Start serving without reconciling the declared scopes
        #[arg(long)]
        skip_reconcile: bool,
    },
    /// Reconcile the declared scopes and exit
    Reconcile,
}

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let cli = Cli::parse();

    // Load configuration
    let config = match config::ServerConfig::new() {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let store = match store::create_store(&config.store).await {
        Ok(store) => store,
        Err(e) => {
            error!("Failed to initialize scope store: {}", e);
            std::process::exit(1);
        }
    };

    let skip_reconcile = match cli.command {
        Some(Command::Reconcile) => {
            run_reconcile(&config, &store).await;
            return;
        }
        Some(Command::Serve { skip_reconcile }) => skip_reconcile,
        None => false,
    };

    if skip_reconcile {
        info!("Skipping scope reconciliation");
    } else {
        run_reconcile(&config, &store).await;
    }

    // Initialize application state
    let state = match AppState::with_existing_store(&config, store) {
        Ok(state) => state,
        Err(e) => {
            error!("Failed to initialize application state: {}", e);
            std::process::exit(1);
        }
    };

    let app = create_app(state).await;

    // Build server address
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    // Start server
    let server = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    info!("Server running on {}, press Ctrl+C to stop", addr);
    let serve = axum::serve(server, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;
    if let Err(e) = serve {
        error!("Server error: {}", e);
        std::process::exit(1);
    }

    info!("Server shutdown complete");
}

/// Reconcile the declared scopes, exiting the process on failure
async fn run_reconcile(config: &config::ServerConfig, store: &ScopeStore) {
    match reconciler::reconcile_from_config(config, store).await {
        Ok(scopes) => info!("Reconciled {} scopes", scopes.len()),
        Err(e) => {
            error!("Scope reconciliation failed: {}", e);
            std::process::exit(1);
        }
    }
}

/// Create a new application instance with a given state
pub async fn create_app(state: AppState) -> Router {
    let (openapi_router, api_doc) =
        OpenApiRouter::with_openapi(openapi::ApiDoc::openapi()).split_for_parts();

    Router::new()
        .merge(api::router(&state))
        .merge(openapi_router)
        .merge(Scalar::with_url("/scalar", api_doc))
        .with_state(state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
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
            info!("Received SIGTERM, shutting down");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::parse_from(["scope-server", "serve", "--skip-reconcile"]);
        assert!(matches!(
            cli.command,
            Some(Command::Serve {
                skip_reconcile: true
            })
        ));

        let cli = Cli::parse_from(["scope-server", "reconcile"]);
        assert!(matches!(cli.command, Some(Command::Reconcile)));

        let cli = Cli::parse_from(["scope-server"]);
        assert!(cli.command.is_none());
    }
}
