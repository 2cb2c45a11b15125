//! HTTP and WebSocket surface.
//!
//! Routes:
//! - `/` health check
//! - `/ws/sensors`, `/ws/actuators` session upgrades
//! - `/sites`, `/sites/{company}/{location}` latest per-site state
//! - `/sessions` live session listing

mod handlers;
mod types;
mod ws;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tracing::info;

use crate::error::StartupError;
use crate::state::SharedState;

pub use types::{HealthResponse, SessionsResponse, SiteView, SitesResponse};

/// Application state shared across all request handlers.
pub struct AppState {
    pub shared: Arc<SharedState>,
}

/// Builds the axum router with all API routes.
///
/// # Arguments
///
/// * `state` - Shared application state
///
/// # Returns
///
/// Configured `Router` ready to serve.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::health))
        .route("/ws/sensors", get(handlers::sensor_socket))
        .route("/ws/actuators", get(handlers::actuator_socket))
        .route("/sites", get(handlers::get_sites))
        .route("/sites/{company}/{location}", get(handlers::get_site))
        .route("/sessions", get(handlers::get_sessions))
        .with_state(state)
}

/// Binds to `addr` and serves the API until `shutdown` resolves.
///
/// # Errors
///
/// Returns `StartupError::Bind` if the listener cannot bind, or
/// `StartupError::Serve` if the server fails while running.
pub async fn serve(
    shared: Arc<SharedState>,
    addr: SocketAddr,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), StartupError> {
    let app = router(Arc::new(AppState { shared }));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| StartupError::Bind {
            addr: addr.to_string(),
            source,
        })?;
    info!(%addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(StartupError::Serve)
}
