//! Orgsearch - organization directory search gateway
//!
//! Serves query programs over the directory at /api/v1/search.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use orgsearch::cli::CliOptions;
use orgsearch::config::{Config, SearchBackend};
use orgsearch::repository::{ElasticsearchRepository, MemoryRepository, Repository};
use orgsearch::{AppState, build_app};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliOptions::from_args()?;
    match &cli.env_file {
        Some(path) => {
            dotenvy::from_path(path)
                .with_context(|| format!("Failed to load env file {}", path.display()))?;
        }
        None => {
            dotenvy::dotenv().ok();
        }
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "orgsearch=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    let mut config = Config::from_env()?;
    cli.apply(&mut config);
    config.validate()?;
    tracing::info!(backend = ?config.backend, "Configuration loaded");

    let repository: Arc<dyn Repository> = match config.backend {
        SearchBackend::Elasticsearch => {
            let repo = ElasticsearchRepository::new(config.elasticsearch())?;
            tracing::info!(url = %config.elasticsearch_url, "Using Elasticsearch backend");
            Arc::new(repo)
        }
        SearchBackend::Memory => {
            let path = config
                .fixtures_path
                .as_deref()
                .context("FIXTURES_PATH is required for the memory search backend")?;
            Arc::new(MemoryRepository::from_file(path)?)
        }
    };

    let port = config.port;
    let state = AppState::new(config, repository);
    let shutdown = state.shutdown.clone();
    let app = build_app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            tracing::info!("Shutting down, cancelling in-flight backend calls");
            shutdown.cancel();
        })
        .await?;

    Ok(())
}
