//! HTTP handlers for the chat front end.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{error, warn};

use sentient_core::ids::SessionId;
use sentient_engine::tools::CalendarEvent;

use crate::server::AppState;

/// Events returned by `GET /next-event`.
pub const NEXT_EVENT_LIMIT: u32 = 3;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    pub session_id: String,
}

pub async fn root() -> Json<Value> {
    Json(json!({
        "status": "active",
        "message": "Personal AI Agent Backend is Running"
    }))
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

/// Always answers 200 with a reply string, even when the request failed.
pub async fn chat(State(state): State<AppState>, Json(req): Json<ChatRequest>) -> Json<ChatResponse> {
    let session_id = req
        .session_id
        .filter(|s| !s.trim().is_empty())
        .map(SessionId::from_raw)
        .unwrap_or_else(SessionId::default_session);

    if req.message.trim().is_empty() {
        return Json(ChatResponse {
            response: "Please type a message first.".into(),
            session_id: session_id.to_string(),
        });
    }

    let response = match state.agent.submit_in(&session_id, &req.message).await {
        Ok(reply) => reply,
        Err(e) => {
            error!(session_id = %session_id, error = %e, kind = e.error_kind(), "chat request failed");
            e.apology()
        }
    };

    Json(ChatResponse {
        response,
        session_id: session_id.to_string(),
    })
}

/// Next few upcoming events; an empty list when the calendar is unavailable.
pub async fn next_event(State(state): State<AppState>) -> Json<Vec<CalendarEvent>> {
    match state.agent.upcoming_events(NEXT_EVENT_LIMIT).await {
        Ok(events) => Json(events),
        Err(e) => {
            warn!(error = %e, kind = e.error_kind(), "next-event lookup failed");
            Json(Vec::new())
        }
    }
}
