//! Two-tier collection matching / 两级合集匹配
//!
//! Tier 1 runs the sanitized query as an FTS5 MATCH expression and keeps the
//! engine's native relevance order. Tier 2 only runs when tier 1 yields fewer
//! hits than the configured threshold: it returns the union of collections
//! containing any query term as a case-insensitive substring of name,
//! description or tags, in storage order and unscored. No ranking fusion
//! between tiers.

use sqlx::SqlitePool;

use crate::models::Collection;
use crate::search::query::{query_terms, sanitize_query};

/// Search collections for a raw user query.
///
/// `min_exact_hits` is the fallback threshold: with the default of 1 the fuzzy
/// tier runs only when the full-text tier returns nothing.
pub async fn search_collections(
    db: &SqlitePool,
    raw_query: &str,
    min_exact_hits: usize,
) -> Result<Vec<Collection>, sqlx::Error> {
    let sanitized = sanitize_query(raw_query);
    let terms = query_terms(&sanitized);
    if terms.is_empty() {
        // Nothing left after sanitation: empty result, never "match everything"
        return Ok(Vec::new());
    }

    let exact = exact_match(db, sanitized.trim()).await?;
    if exact.len() >= min_exact_hits {
        return Ok(exact);
    }

    tracing::debug!(
        "full-text search returned {} hit(s) for {:?}, falling back to fuzzy",
        exact.len(),
        sanitized
    );
    let all: Vec<Collection> = sqlx::query_as("SELECT * FROM collections ORDER BY id")
        .fetch_all(db)
        .await?;
    Ok(fuzzy_filter(all, &terms))
}

/// Full-text tier: MATCH against the collections_fts index, ranked by the
/// engine's relevance order.
async fn exact_match(db: &SqlitePool, query: &str) -> Result<Vec<Collection>, sqlx::Error> {
    let result = sqlx::query_as::<_, Collection>(
        r#"
        SELECT c.id, c.name, c.description, c.tags, c.cardsNumber, c.createdBy, c.createdAt
        FROM collections_fts
        JOIN collections c ON collections_fts.rowid = c.id
        WHERE collections_fts MATCH ?
        ORDER BY rank
        "#,
    )
    .bind(query)
    .fetch_all(db)
    .await;

    match result {
        Ok(rows) => Ok(rows),
        // Sanitation strips query syntax, but bare operator tokens (AND, OR,
        // NOT in first/last position) still make fts5 reject the expression.
        // Treat that as zero hits so the fuzzy tier gets its turn.
        Err(e) if is_fts_syntax_error(&e) => {
            tracing::debug!("fts query rejected ({}), treating as no hits", e);
            Ok(Vec::new())
        }
        Err(e) => Err(e),
    }
}

fn is_fts_syntax_error(e: &sqlx::Error) -> bool {
    let msg = e.to_string();
    msg.contains("fts5") || msg.contains("syntax error")
}

/// Fuzzy tier: union over all terms and all three text fields. Case folding
/// happens in Rust so Cyrillic and other non-Latin scripts compare correctly
/// (SQLite LIKE only folds ASCII).
fn fuzzy_filter(collections: Vec<Collection>, terms: &[String]) -> Vec<Collection> {
    collections
        .into_iter()
        .filter(|c| {
            let name = c.name.to_lowercase();
            let description = c.description.as_deref().unwrap_or("").to_lowercase();
            let tags = c.tags.as_deref().unwrap_or("").to_lowercase();
            terms.iter().any(|t| {
                name.contains(t.as_str())
                    || description.contains(t.as_str())
                    || tags.contains(t.as_str())
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        crate::db::run_migrations(&pool).await.unwrap();
        pool
    }

    async fn insert_collection(pool: &SqlitePool, name: &str, description: &str, tags: &str) -> i64 {
        sqlx::query(
            "INSERT INTO collections (name, description, tags, cardsNumber) VALUES (?, ?, ?, 0)",
        )
        .bind(name)
        .bind(description)
        .bind(tags)
        .execute(pool)
        .await
        .unwrap()
        .last_insert_rowid()
    }

    #[tokio::test]
    async fn test_exact_hit_suppresses_fuzzy() {
        let pool = test_pool().await;
        let dog_id = insert_collection(&pool, "Dog Training", "Basic commands", "#pets").await;
        // Would match via the fuzzy substring tier ("dog" in "dogs"), but the
        // full-text tier already has a hit so it must never run.
        insert_collection(&pool, "Cats", "About cats and dogs", "#pets").await;

        let results = search_collections(&pool, "Dog", 1).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, dog_id);
    }

    #[tokio::test]
    async fn test_fuzzy_union_across_terms_and_fields() {
        let pool = test_pool().await;
        let a = insert_collection(&pool, "Spanish Words", "Common phrases", "#language").await;
        let b = insert_collection(&pool, "Capitals", "World vocabulary trainer", "#geo").await;
        insert_collection(&pool, "Flags", "Country flags", "#geo").await;

        // Both terms are partial tokens, so the full-text tier finds nothing;
        // "pan" hits collection A by name, "vocab" hits B by description.
        let results = search_collections(&pool, "pan vocab", 1).await.unwrap();
        let ids: Vec<i64> = results.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![a, b]);
    }

    #[tokio::test]
    async fn test_fuzzy_matches_by_tags() {
        let pool = test_pool().await;
        let id = insert_collection(&pool, "Flags", "Country flags", "#geography #world").await;

        let results = search_collections(&pool, "geog", 1).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, id);
    }

    #[tokio::test]
    async fn test_fuzzy_case_folds_cyrillic() {
        let pool = test_pool().await;
        let id = insert_collection(&pool, "Русские Слова", "Для начинающих", "#russian").await;

        // Partial token, uppercase: full-text misses, fuzzy must fold case
        let results = search_collections(&pool, "РУССК", 1).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, id);
    }

    #[tokio::test]
    async fn test_empty_after_sanitation_returns_nothing() {
        let pool = test_pool().await;
        insert_collection(&pool, "Anything", "at all", "#tag").await;

        assert!(search_collections(&pool, "!!!", 1).await.unwrap().is_empty());
        assert!(search_collections(&pool, "   ", 1).await.unwrap().is_empty());
        assert!(search_collections(&pool, "", 1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_no_match_anywhere_returns_empty() {
        let pool = test_pool().await;
        insert_collection(&pool, "Spanish Words", "Common phrases", "#language").await;

        assert!(search_collections(&pool, "zzzzzz", 1)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_threshold_forces_fallback() {
        let pool = test_pool().await;
        insert_collection(&pool, "Dog Training", "Basic commands", "#pets").await;
        insert_collection(&pool, "Cats", "About cats and dogs", "#pets").await;

        // One full-text hit is below a threshold of 2, so the permissive tier
        // answers instead and picks up the substring match too.
        let results = search_collections(&pool, "Dog", 2).await.unwrap();
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn test_bare_operator_token_is_not_an_error() {
        let pool = test_pool().await;
        let id = insert_collection(&pool, "Grandma's recipes", "Cooking", "#food").await;

        // "AND" alone is an fts5 syntax error; it must degrade to the fuzzy
        // tier, where it matches nothing here except by substring.
        let results = search_collections(&pool, "AND grandma", 1).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, id);
    }

    #[test]
    fn test_fuzzy_filter_ignores_empty_fields() {
        let collections = vec![Collection {
            id: 1,
            name: "Only name".into(),
            description: None,
            tags: None,
            cards_number: 0,
            created_by: None,
            created_at: None,
        }];
        let hits = fuzzy_filter(collections, &["name".to_string()]);
        assert_eq!(hits.len(), 1);
    }
}
