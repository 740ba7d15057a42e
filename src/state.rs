use sqlx::SqlitePool;
use std::sync::Arc;

use crate::auth::{IdentityVerifier, TokenCache};
use knowledgebox_backend::ai::GeminiClient;

/// Shared per-process state; handlers receive this instead of reading
/// process-wide singletons.
pub struct AppState {
    pub db: SqlitePool,
    pub token_cache: TokenCache,
    pub verifier: Arc<dyn IdentityVerifier>,
    pub ai: GeminiClient,
    /// Shared secret required by the chat endpoint.
    pub chat_secret: String,
}
