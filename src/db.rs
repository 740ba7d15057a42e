use anyhow::Result;
use sqlx::SqlitePool;

/// Run database migrations / 运行数据库迁移
///
/// All statements are idempotent; the schema is created on first start and
/// left untouched afterwards.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS collections (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            description TEXT,
            tags TEXT,
            cardsNumber INTEGER NOT NULL DEFAULT 0,
            createdBy TEXT,
            createdAt INTEGER
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS cards (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            collectionId INTEGER NOT NULL,
            front TEXT NOT NULL,
            back TEXT NOT NULL,
            frontSound INTEGER,
            backSound INTEGER,
            frontImg INTEGER,
            backImg INTEGER,
            FOREIGN KEY (collectionId) REFERENCES collections(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_cards_collection ON cards(collectionId)")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sounds (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            ref TEXT NOT NULL,
            comment TEXT,
            file TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS images (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            ref TEXT NOT NULL,
            comment TEXT,
            file TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Media lookups during import join on lower(ref) filtered by comment prefix
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_sounds_ref ON sounds(ref)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_images_ref ON images(ref)")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS groups (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            description TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS collection_groups (
            collection_id INTEGER NOT NULL,
            group_id INTEGER NOT NULL,
            PRIMARY KEY (collection_id, group_id),
            FOREIGN KEY (collection_id) REFERENCES collections(id) ON DELETE CASCADE,
            FOREIGN KEY (group_id) REFERENCES groups(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Full-text index over collection metadata, kept in sync with the
    // collections table by triggers (external-content FTS5 table).
    sqlx::query(
        r#"
        CREATE VIRTUAL TABLE IF NOT EXISTS collections_fts USING fts5(
            name, description, tags,
            content='collections', content_rowid='id'
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TRIGGER IF NOT EXISTS collections_fts_ai AFTER INSERT ON collections BEGIN
            INSERT INTO collections_fts(rowid, name, description, tags)
            VALUES (new.id, new.name, new.description, new.tags);
        END
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TRIGGER IF NOT EXISTS collections_fts_ad AFTER DELETE ON collections BEGIN
            INSERT INTO collections_fts(collections_fts, rowid, name, description, tags)
            VALUES ('delete', old.id, old.name, old.description, old.tags);
        END
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TRIGGER IF NOT EXISTS collections_fts_au AFTER UPDATE ON collections BEGIN
            INSERT INTO collections_fts(collections_fts, rowid, name, description, tags)
            VALUES ('delete', old.id, old.name, old.description, old.tags);
            INSERT INTO collections_fts(rowid, name, description, tags)
            VALUES (new.id, new.name, new.description, new.tags);
        END
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Database migrations completed");
    Ok(())
}
