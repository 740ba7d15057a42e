//! AI chat endpoint / AI 聊天接口
//!
//! Deliberate soft-failure contract: every internal problem (bad key, AI
//! backend down, malformed response) comes back as `{"result":"error"}` with
//! HTTP 200, so no backend detail leaks to the client. Hard status codes are
//! used everywhere else in the API, but not here.

use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::state::AppState;
use knowledgebox_backend::ai::{self, HistoryMessage};
use knowledgebox_backend::config;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub key: String,
    pub language: Option<String>,
    #[serde(default)]
    pub history: Vec<HistoryMessage>,
}

fn soft_error() -> Json<Value> {
    Json(json!({"result": "error"}))
}

/// POST /api/ai/chat
pub async fn chat(State(state): State<Arc<AppState>>, Json(req): Json<ChatRequest>) -> Json<Value> {
    if state.chat_secret.is_empty() || req.key != state.chat_secret {
        tracing::warn!("chat request with wrong key rejected");
        return soft_error();
    }

    let cfg = config::config().ai;
    let language = req.language.unwrap_or(cfg.default_language);

    let reply = if cfg.fake_api {
        ai::fake_reply()
    } else {
        match state.ai.chat(&req.message, &language, &req.history).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!("chat backend failed: {}", e);
                return soft_error();
            }
        }
    };

    let mut body = match serde_json::to_value(&reply) {
        Ok(Value::Object(map)) => map,
        _ => return soft_error(),
    };
    body.insert("result".to_string(), json!("ok"));
    Json(Value::Object(body))
}
