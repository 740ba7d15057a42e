//! Collection browse/search handlers / 合集浏览与搜索接口
//!
//! Thin read paths over the collections tables. Database failures become a
//! generic 500 with no partial results; missing rows are a structured 404.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::state::AppState;
use knowledgebox_backend::config;
use knowledgebox_backend::models::{Card, Collection, CollectionGroup, Group};
use knowledgebox_backend::search::search_collections;

fn db_error(e: sqlx::Error) -> (StatusCode, Json<Value>) {
    tracing::error!("database error: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"error": "internal server error"})),
    )
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub query: String,
}

/// GET /collections/search?query=<text>
pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let min_exact_hits = config::config().search.min_exact_hits;
    let results = search_collections(&state.db, &params.query, min_exact_hits)
        .await
        .map_err(|e| {
            tracing::error!("search failed for {:?}: {}", params.query, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"results": null})),
            )
        })?;
    Ok(Json(json!({ "results": results })))
}

/// GET /collections/preview/:id - collection plus the first N cards
pub async fn preview(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let collection = fetch_collection(&state, id).await?;
    let limit = config::config().media.preview_cards;
    let cards: Vec<Card> = sqlx::query_as("SELECT * FROM cards WHERE collectionId = ? LIMIT ?")
        .bind(id)
        .bind(limit)
        .fetch_all(&state.db)
        .await
        .map_err(db_error)?;

    Ok(Json(json!({ "collection": collection, "cards": cards })))
}

/// GET /collections/download/:id - collection with every card
pub async fn download(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let collection = fetch_collection(&state, id).await?;
    let cards: Vec<Card> = sqlx::query_as("SELECT * FROM cards WHERE collectionId = ?")
        .bind(id)
        .fetch_all(&state.db)
        .await
        .map_err(db_error)?;

    Ok(Json(json!({ "collection": collection, "cards": cards })))
}

/// GET /collections/library - everything the library screen needs in one call
pub async fn library(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let collections: Vec<Collection> = sqlx::query_as("SELECT * FROM collections")
        .fetch_all(&state.db)
        .await
        .map_err(db_error)?;
    let groups: Vec<Group> = sqlx::query_as("SELECT * FROM groups")
        .fetch_all(&state.db)
        .await
        .map_err(db_error)?;
    let collection_groups: Vec<CollectionGroup> =
        sqlx::query_as("SELECT * FROM collection_groups")
            .fetch_all(&state.db)
            .await
            .map_err(db_error)?;

    Ok(Json(json!({
        "collections": collections,
        "groups": groups,
        "collection_groups": collection_groups,
    })))
}

async fn fetch_collection(
    state: &AppState,
    id: i64,
) -> Result<Collection, (StatusCode, Json<Value>)> {
    sqlx::query_as::<_, Collection>("SELECT * FROM collections WHERE id = ?")
        .bind(id)
        .fetch_optional(&state.db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                Json(json!({"error": "Collection not found"})),
            )
        })
}
