//! Bearer-token authentication with a TTL claims cache / 带TTL缓存的令牌认证
//!
//! A verified token's decoded claims are cached in-process for a fixed window
//! (15 minutes by default) so repeated requests do not hit the identity
//! provider. The provider itself sits behind the [`IdentityVerifier`] trait;
//! handlers receive it through `AppState` instead of a process-wide client.

use async_trait::async_trait;
use axum::http::{HeaderMap, StatusCode};
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;

/// Decoded identity claims / 解码后的用户信息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub uid: String,
    pub email: Option<String>,
}

/// Verifies a bearer token against the identity provider.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Claims, String>;
}

/// Google Identity Toolkit verifier (Firebase ID tokens).
pub struct GoogleIdentityVerifier {
    http: reqwest::Client,
    api_key: String,
}

impl GoogleIdentityVerifier {
    pub fn new(api_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
        }
    }
}

#[async_trait]
impl IdentityVerifier for GoogleIdentityVerifier {
    async fn verify(&self, token: &str) -> Result<Claims, String> {
        if self.api_key.is_empty() {
            return Err("identity provider API key not configured".to_string());
        }

        let url = format!(
            "https://identitytoolkit.googleapis.com/v1/accounts:lookup?key={}",
            self.api_key
        );
        let resp = self
            .http
            .post(&url)
            .json(&json!({ "idToken": token }))
            .send()
            .await
            .map_err(|e| format!("identity provider request failed: {}", e))?;

        if !resp.status().is_success() {
            return Err(format!("token rejected: HTTP {}", resp.status()));
        }

        let body: Value = resp
            .json()
            .await
            .map_err(|e| format!("invalid identity provider response: {}", e))?;

        let user = body
            .get("users")
            .and_then(|u| u.as_array())
            .and_then(|u| u.first())
            .ok_or_else(|| "token valid but no user record returned".to_string())?;

        let uid = user
            .get("localId")
            .and_then(|v| v.as_str())
            .ok_or_else(|| "user record missing localId".to_string())?
            .to_string();
        let email = user
            .get("email")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());

        Ok(Claims { uid, email })
    }
}

struct CacheEntry {
    claims: Claims,
    cached_at: DateTime<Utc>,
}

/// TTL cache of decoded claims, keyed by token value / 按令牌缓存的用户信息
pub struct TokenCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
}

impl TokenCache {
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl: Duration::seconds(ttl_secs as i64),
        }
    }

    /// Return cached claims if the entry is still within its TTL.
    pub fn get(&self, token: &str) -> Option<Claims> {
        let entries = self.entries.read();
        let entry = entries.get(token)?;
        if Utc::now().signed_duration_since(entry.cached_at) < self.ttl {
            Some(entry.claims.clone())
        } else {
            None
        }
    }

    /// Cache freshly verified claims, dropping expired entries on the way.
    pub fn insert(&self, token: String, claims: Claims) {
        let now = Utc::now();
        let mut entries = self.entries.write();
        entries.retain(|_, e| now.signed_duration_since(e.cached_at) < self.ttl);
        entries.insert(
            token,
            CacheEntry {
                claims,
                cached_at: now,
            },
        );
    }

    #[cfg(test)]
    fn insert_aged(&self, token: String, claims: Claims, age_secs: i64) {
        self.entries.write().insert(
            token,
            CacheEntry {
                claims,
                cached_at: Utc::now() - Duration::seconds(age_secs),
            },
        );
    }
}

/// Extract the bearer token from the Authorization header.
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Authenticate a request: cache first, identity provider on a miss.
/// Failures surface as 401 with a JSON error body, never as a crash.
pub async fn authenticate(
    cache: &TokenCache,
    verifier: &dyn IdentityVerifier,
    headers: &HeaderMap,
) -> Result<Claims, (StatusCode, axum::Json<Value>)> {
    let token = extract_bearer_token(headers).ok_or_else(|| {
        (
            StatusCode::UNAUTHORIZED,
            axum::Json(json!({"error": "Missing or invalid token"})),
        )
    })?;

    if let Some(claims) = cache.get(&token) {
        tracing::debug!("token cache hit for uid {}", claims.uid);
        return Ok(claims);
    }

    match verifier.verify(&token).await {
        Ok(claims) => {
            cache.insert(token, claims.clone());
            Ok(claims)
        }
        Err(msg) => {
            tracing::debug!("token verification failed: {}", msg);
            Err((StatusCode::UNAUTHORIZED, axum::Json(json!({"error": msg}))))
        }
    }
}
