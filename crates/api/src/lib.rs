pub mod error;
pub mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use chrono::{DateTime, Utc};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use engine::Scanner;

/// Shared application state injected into every route handler.
#[derive(Clone)]
pub struct AppState {
    pub scanner: Arc<Scanner>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(scanner: Arc<Scanner>) -> Self {
        Self {
            scanner,
            started_at: Utc::now(),
        }
    }
}

/// All routes with CORS applied.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_headers(Any)
        .allow_methods(Any);

    Router::new()
        .merge(routes::health_router())
        .merge(routes::lookup_router())
        .with_state(state)
        .layer(cors)
}

/// Bind and run the lookup API until the process exits.
pub async fn serve(state: AppState, port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Lookup API listening");
    axum::serve(listener, app(state)).await
}
