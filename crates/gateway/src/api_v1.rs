//! Version 1 of the chat API.

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use standin_core::message::HistoryEntry;
use standin_core::provider::ToolDefinition;
use tracing::{error, info, warn};

use crate::SharedState;

pub fn v1_router(state: SharedState) -> Router {
    Router::new()
        .route("/tools", get(tools_handler))
        .route("/chat", post(chat_handler))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub reply: String,
    pub history: Vec<HistoryEntry>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, error: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
}

async fn tools_handler(State(state): State<SharedState>) -> Json<Vec<ToolDefinition>> {
    Json(state.agent.tools().definitions())
}

async fn chat_handler(
    State(state): State<SharedState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    if payload.message.trim().is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "message must not be empty"));
    }

    info!(
        message_len = payload.message.len(),
        history = payload.history.len(),
        "v1/chat request"
    );

    let mut conversation = state
        .agent
        .start_conversation(&payload.message, &payload.history);

    match state.agent.run(&mut conversation).await {
        Ok(outcome) => {
            if outcome.hit_round_limit {
                warn!(conversation_id = %conversation.id, "Turn ended at the tool round ceiling");
            }
            Ok(Json(ChatResponse {
                reply: outcome.reply,
                history: conversation.transcript(),
            }))
        }
        Err(standin_core::Error::Provider(e)) => {
            error!(error = %e, "Model request failed");
            Err(api_error(StatusCode::BAD_GATEWAY, e.to_string()))
        }
        Err(e) => {
            error!(error = %e, "Chat turn failed");
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}
