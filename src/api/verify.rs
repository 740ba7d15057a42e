use axum::{extract::State, http::HeaderMap, http::StatusCode, Json};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::auth;
use crate::state::AppState;

/// GET /api/verify - bearer-token authenticated identity check
pub async fn verify(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let claims = auth::authenticate(&state.token_cache, state.verifier.as_ref(), &headers).await?;
    Ok(Json(json!({
        "uid": claims.uid,
        "email": claims.email,
        "message": "Token is valid",
    })))
}
