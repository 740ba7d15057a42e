//! Collection import pipeline / 合集导入
//!
//! Batch ingestion of delimited front/back card data. Each collection is
//! imported in a single transaction: collection row, cards, the denormalized
//! card count and any media backfill either all commit or none of them do.

use serde::{Deserialize, Serialize};
use sqlx::{Sqlite, SqlitePool, Transaction};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("line {line}: expected {expected} columns, got {got}")]
    BadRow {
        line: usize,
        expected: usize,
        got: usize,
    },
    #[error("no cards to import")]
    Empty,
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

/// One front/back pair ready for insertion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardRow {
    pub front: String,
    pub back: String,
}

/// Which media table a ref/comment/file row lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Sound,
    Image,
}

impl MediaKind {
    fn table(self) -> &'static str {
        match self {
            MediaKind::Sound => "sounds",
            MediaKind::Image => "images",
        }
    }
}

/// Import tuning knobs, one struct per collection / 每个合集一份导入选项
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// Swap front and back sides / 交换正反面
    pub reverse: bool,
    pub created_by: Option<String>,
    /// Backfill card sides with media whose `comment` starts with the given
    /// prefix and whose `ref` equals the card text (case-insensitive).
    pub sound_prefix_front: Option<String>,
    pub sound_prefix_back: Option<String>,
    pub image_prefix_front: Option<String>,
    pub image_prefix_back: Option<String>,
}

/// Parse comma-delimited text into rows of exactly `columns` fields.
///
/// With `skip_errors` malformed lines are logged and dropped instead of
/// aborting the whole parse (some source files have stray commas).
pub fn parse_delimited(
    text: &str,
    columns: usize,
    skip_errors: bool,
) -> Result<Vec<Vec<String>>, ImportError> {
    let mut rows = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<String> = line.split(',').map(|f| f.trim().to_string()).collect();
        if fields.len() != columns {
            if skip_errors {
                tracing::warn!("skipping malformed line {}: {:?}", idx + 1, line);
                continue;
            }
            return Err(ImportError::BadRow {
                line: idx + 1,
                expected: columns,
                got: fields.len(),
            });
        }
        rows.push(fields);
    }
    Ok(rows)
}

/// Turn parsed rows into card pairs, taking the first two columns.
pub fn card_rows(rows: &[Vec<String>]) -> Vec<CardRow> {
    rows.iter()
        .filter(|r| r.len() >= 2)
        .map(|r| CardRow {
            front: r[0].clone(),
            back: r[1].clone(),
        })
        .collect()
}

/// Drop rows whose case-folded front side was already seen; the first
/// occurrence wins.
pub fn dedupe_by_front(rows: Vec<CardRow>) -> Vec<CardRow> {
    let mut seen = std::collections::HashSet::new();
    rows.into_iter()
        .filter(|r| seen.insert(r.front.to_lowercase()))
        .collect()
}

/// Import one collection and its cards atomically. Returns the collection id.
///
/// The transaction covers the collection row, all card rows, the recomputed
/// `cardsNumber` and the optional media backfill; any failure rolls the whole
/// import back.
pub async fn import_collection(
    pool: &SqlitePool,
    name: &str,
    description: &str,
    tags: &str,
    cards: &[CardRow],
    opts: &ImportOptions,
) -> Result<i64, ImportError> {
    let cards = dedupe_by_front(cards.to_vec());
    if cards.is_empty() {
        return Err(ImportError::Empty);
    }

    let mut tx = pool.begin().await?;

    let collection_id = sqlx::query(
        "INSERT INTO collections (name, description, tags, cardsNumber, createdBy, createdAt) \
         VALUES (?, ?, ?, 0, ?, ?)",
    )
    .bind(name)
    .bind(description)
    .bind(tags)
    .bind(opts.created_by.as_deref())
    .bind(chrono::Utc::now().timestamp())
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    for card in &cards {
        let (front, back) = if opts.reverse {
            (&card.back, &card.front)
        } else {
            (&card.front, &card.back)
        };
        sqlx::query("INSERT INTO cards (collectionId, front, back) VALUES (?, ?, ?)")
            .bind(collection_id)
            .bind(front)
            .bind(back)
            .execute(&mut *tx)
            .await?;
    }

    // Recompute from the actual rows rather than trusting the input length
    sqlx::query(
        "UPDATE collections SET cardsNumber = \
         (SELECT COUNT(*) FROM cards WHERE collectionId = ?) WHERE id = ?",
    )
    .bind(collection_id)
    .bind(collection_id)
    .execute(&mut *tx)
    .await?;

    if let Some(prefix) = &opts.sound_prefix_front {
        backfill(&mut tx, collection_id, "front", "frontSound", MediaKind::Sound, prefix).await?;
    }
    if let Some(prefix) = &opts.sound_prefix_back {
        backfill(&mut tx, collection_id, "back", "backSound", MediaKind::Sound, prefix).await?;
    }
    if let Some(prefix) = &opts.image_prefix_front {
        backfill(&mut tx, collection_id, "front", "frontImg", MediaKind::Image, prefix).await?;
    }
    if let Some(prefix) = &opts.image_prefix_back {
        backfill(&mut tx, collection_id, "back", "backImg", MediaKind::Image, prefix).await?;
    }

    tx.commit().await?;
    tracing::info!(
        "imported collection {} ({:?}) with {} cards",
        collection_id,
        name,
        cards.len()
    );
    Ok(collection_id)
}

/// Join card text against media refs (case-insensitive) within a comment
/// namespace and fill the given media column. Column/table names come from a
/// fixed set above, never from input.
async fn backfill(
    tx: &mut Transaction<'_, Sqlite>,
    collection_id: i64,
    text_column: &str,
    media_column: &str,
    kind: MediaKind,
    comment_prefix: &str,
) -> Result<(), ImportError> {
    let query = format!(
        "UPDATE cards SET {media_column} = r.mediaId FROM ( \
            SELECT cards.id AS cardId, m.id AS mediaId \
            FROM cards INNER JOIN {table} m ON lower(cards.{text_column}) = lower(m.ref) \
            WHERE m.comment LIKE ? || '%' AND cards.collectionId = ? \
         ) AS r WHERE cards.id = r.cardId",
        media_column = media_column,
        table = kind.table(),
        text_column = text_column,
    );
    let result = sqlx::query(&query)
        .bind(comment_prefix)
        .bind(collection_id)
        .execute(&mut **tx)
        .await?;
    tracing::debug!(
        "backfilled {} on {} card(s) for collection {}",
        media_column,
        result.rows_affected(),
        collection_id
    );
    Ok(())
}

/// Check whether a media row already exists for `(ref, comment-prefix)`, so
/// importers can skip regenerating files.
pub async fn media_exists(
    pool: &SqlitePool,
    kind: MediaKind,
    media_ref: &str,
    comment_prefix: &str,
) -> Result<bool, ImportError> {
    let query = format!(
        "SELECT COUNT(*) FROM {} WHERE lower(ref) = lower(?) AND comment LIKE ? || '%'",
        kind.table()
    );
    let count: i64 = sqlx::query_scalar(&query)
        .bind(media_ref)
        .bind(comment_prefix)
        .fetch_one(pool)
        .await?;
    Ok(count > 0)
}

/// Insert a media row and return its id.
pub async fn register_media(
    pool: &SqlitePool,
    kind: MediaKind,
    media_ref: &str,
    comment: &str,
    file: &str,
) -> Result<i64, ImportError> {
    let query = format!(
        "INSERT INTO {} (ref, comment, file) VALUES (?, ?, ?)",
        kind.table()
    );
    let id = sqlx::query(&query)
        .bind(media_ref)
        .bind(comment)
        .bind(file)
        .execute(pool)
        .await?
        .last_insert_rowid();
    Ok(id)
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

    fn rows(pairs: &[(&str, &str)]) -> Vec<CardRow> {
        pairs
            .iter()
            .map(|(f, b)| CardRow {
                front: f.to_string(),
                back: b.to_string(),
            })
            .collect()
    }

    #[test]
    fn test_parse_delimited() {
        let rows = parse_delimited("dog,perro\ncat,gato\n\n", 2, false).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], vec!["dog", "perro"]);

        let err = parse_delimited("dog,perro\noops", 2, false).unwrap_err();
        assert!(matches!(err, ImportError::BadRow { line: 2, .. }));

        let lenient = parse_delimited("dog,perro\noops\ncat,gato", 2, true).unwrap();
        assert_eq!(lenient.len(), 2);
    }

    #[test]
    fn test_dedupe_by_front_keeps_first() {
        let deduped = dedupe_by_front(rows(&[("Dog", "perro"), ("dog", "chien"), ("cat", "gato")]));
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].back, "perro");
    }

    #[tokio::test]
    async fn test_import_sets_cards_number_to_deduped_count() {
        let pool = test_pool().await;
        let cards = rows(&[("dog", "perro"), ("DOG", "chien"), ("cat", "gato")]);

        let id = import_collection(
            &pool,
            "Spanish",
            "Animals",
            "#spanish",
            &cards,
            &ImportOptions::default(),
        )
        .await
        .unwrap();

        let cards_number: i64 =
            sqlx::query_scalar("SELECT cardsNumber FROM collections WHERE id = ?")
                .bind(id)
                .fetch_one(&pool)
                .await
                .unwrap();
        let actual: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cards WHERE collectionId = ?")
            .bind(id)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(cards_number, 2);
        assert_eq!(cards_number, actual);
    }

    #[tokio::test]
    async fn test_import_reverse_swaps_sides() {
        let pool = test_pool().await;
        let id = import_collection(
            &pool,
            "Reversed",
            "",
            "",
            &rows(&[("dog", "perro")]),
            &ImportOptions {
                reverse: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let (front, back): (String, String) =
            sqlx::query_as("SELECT front, back FROM cards WHERE collectionId = ?")
                .bind(id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(front, "perro");
        assert_eq!(back, "dog");
    }

    #[tokio::test]
    async fn test_media_backfill_joins_case_insensitively() {
        let pool = test_pool().await;
        let sound_id = register_media(&pool, MediaKind::Sound, "perro", "es-voice-1", "perro.wav")
            .await
            .unwrap();
        // Different namespace: must not be picked up
        register_media(&pool, MediaKind::Sound, "perro", "fr-voice-1", "perro_fr.wav")
            .await
            .unwrap();

        let id = import_collection(
            &pool,
            "Spanish",
            "",
            "",
            &rows(&[("Perro", "dog"), ("gato", "cat")]),
            &ImportOptions {
                sound_prefix_front: Some("es-voice".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let sounds: Vec<(String, Option<i64>)> =
            sqlx::query_as("SELECT front, frontSound FROM cards WHERE collectionId = ? ORDER BY id")
                .bind(id)
                .fetch_all(&pool)
                .await
                .unwrap();
        assert_eq!(sounds[0], ("Perro".to_string(), Some(sound_id)));
        assert_eq!(sounds[1], ("gato".to_string(), None));
    }

    #[tokio::test]
    async fn test_failed_backfill_rolls_back_everything() {
        let pool = test_pool().await;
        // Simulate a failure in the middle of the import unit
        sqlx::query("DROP TABLE sounds").execute(&pool).await.unwrap();

        let result = import_collection(
            &pool,
            "Doomed",
            "",
            "",
            &rows(&[("dog", "perro")]),
            &ImportOptions {
                sound_prefix_front: Some("es-voice".to_string()),
                ..Default::default()
            },
        )
        .await;
        assert!(result.is_err());

        let collections: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM collections")
            .fetch_one(&pool)
            .await
            .unwrap();
        let cards: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cards")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(collections, 0);
        assert_eq!(cards, 0);
    }

    #[tokio::test]
    async fn test_media_exists_respects_namespace() {
        let pool = test_pool().await;
        register_media(&pool, MediaKind::Image, "France", "flags-2024", "fr.png")
            .await
            .unwrap();

        assert!(media_exists(&pool, MediaKind::Image, "france", "flags")
            .await
            .unwrap());
        assert!(!media_exists(&pool, MediaKind::Image, "france", "photos")
            .await
            .unwrap());
        assert!(!media_exists(&pool, MediaKind::Sound, "france", "flags")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_imported_collection_is_searchable() {
        let pool = test_pool().await;
        import_collection(
            &pool,
            "Spanish Words",
            "Common phrases",
            "#language #spanish",
            &rows(&[("dog", "perro")]),
            &ImportOptions::default(),
        )
        .await
        .unwrap();

        // The FTS triggers must have indexed the new row
        let results = crate::search::search_collections(&pool, "spanish", 1)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, "Spanish Words");
    }
}
