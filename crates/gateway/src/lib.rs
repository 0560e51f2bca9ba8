//! HTTP chat gateway for Standin.
//!
//! Exposes the persona agent to a web front end:
//!
//! - `GET /health`: liveness
//! - `GET /v1/tools`: the tool definitions the model sees
//! - `POST /v1/chat`: one turn, with the caller supplying prior history
//!
//! The gateway keeps no conversation state. Each request seeds a fresh
//! conversation from the history it carries and returns the updated
//! transcript. A client that disconnects drops the request future, which
//! abandons the turn.

pub mod api_v1;

use axum::extract::DefaultBodyLimit;
use axum::{Router, response::Json, routing::get};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use standin_agent::AgentLoop;

/// Shared application state for the gateway.
pub struct GatewayState {
    pub agent: Arc<AgentLoop>,
}

pub type SharedState = Arc<GatewayState>;

/// Build the router with all gateway routes.
///
/// Layers applied:
/// - Request body size limit (1 MB)
/// - HTTP trace logging
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .nest("/v1", api_v1::v1_router(state))
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Serve the gateway on an already-bound listener.
pub async fn serve(
    listener: tokio::net::TcpListener,
    agent: Arc<AgentLoop>,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = build_router(Arc::new(GatewayState { agent }));
    axum::serve(listener, app).await?;
    Ok(())
}

/// Bind `host:port` and serve the gateway until the process stops.
pub async fn start(
    host: &str,
    port: u16,
    agent: Arc<AgentLoop>,
) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(
        addr = %addr,
        persona = %agent.persona().name,
        model = %agent.model(),
        "Gateway listening"
    );
    serve(listener, agent).await
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}
