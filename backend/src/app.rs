//! Application state and HTTP router construction.
//!
//! Used by [main] and by the integration tests to build the Axum app.

use std::sync::Arc;

use axum::Router;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api;
use crate::config::Config;
use crate::query::{Binder, Executor, Resolvers};
use crate::repository::Repository;

/// Shared state for HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub repository: Arc<dyn Repository>,
    pub executor: Arc<Executor>,
    /// Fired on shutdown; every request's backend calls hang off a child token
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(config: Config, repository: Arc<dyn Repository>) -> Self {
        let executor = Executor::new(
            Resolvers::new(repository.clone()),
            Binder::new(config.paging()),
        );
        Self {
            config: Arc::new(config),
            repository,
            executor: Arc::new(executor),
            shutdown: CancellationToken::new(),
        }
    }
}

/// Build the full Axum router: probes, /api/v1 and layers.
/// Returns Router<()> (state fully applied) for use with axum::serve.
pub fn build_app(state: AppState) -> Router<()> {
    Router::new()
        .merge(api::health::router())
        .nest("/api/v1", api::search::router())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
