//! HTTP surface: inbound message transport and operator status routes.

pub mod inbound;
pub mod status;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};

use crate::config::{DEFAULT_MAX_MESSAGE_BYTES, RelayConfig, ServerConfig};
use crate::diagnostics::EndpointDiagnostics;
use crate::intake::IntakeController;
use crate::relay::RelayClient;

/// Shared, read-only handler state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<RelayConfig>,
    pub intake: Arc<IntakeController>,
    pub diagnostics: Arc<EndpointDiagnostics>,
    /// Body limit for `POST /inbound`.
    pub max_message_bytes: usize,
}

impl AppState {
    pub fn new(config: RelayConfig, intake: IntakeController, diagnostics: EndpointDiagnostics) -> Self {
        Self {
            config: Arc::new(config),
            intake: Arc::new(intake),
            diagnostics: Arc::new(diagnostics),
            max_message_bytes: DEFAULT_MAX_MESSAGE_BYTES,
        }
    }

    pub fn with_max_message_bytes(mut self, max: usize) -> Self {
        self.max_message_bytes = max;
        self
    }

    /// Production wiring: tracing observer, timeouts and body limit from
    /// `server`.
    pub fn from_config(config: RelayConfig, server: &ServerConfig) -> Self {
        Self::new(
            config,
            IntakeController::new(RelayClient::new(server.relay_timeout)),
            EndpointDiagnostics::new(server.probe_timeout),
        )
        .with_max_message_bytes(server.max_message_bytes)
    }
}

/// Build the router.
pub fn router(state: AppState) -> Router {
    let health = Router::new()
        .route("/health", get(status::health_json))
        .layer(CorsLayer::new().allow_origin(Any));

    Router::new()
        .route("/", get(status::status_page))
        .route(
            "/inbound",
            post(inbound::receive).layer(DefaultBodyLimit::max(state.max_message_bytes)),
        )
        .merge(health)
        .with_state(state)
}

/// Bind and serve until the process exits.
pub async fn serve(state: AppState, bind: SocketAddr) -> crate::error::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!(%bind, "Mail relay listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}
