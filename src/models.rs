use serde::{Deserialize, Serialize};

/// A named set of flashcards. `cards_number` is a denormalized aggregate the
/// import pipeline keeps equal to the actual card count.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
#[sqlx(rename_all = "camelCase")]
pub struct Collection {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub tags: Option<String>,
    pub cards_number: i64,
    pub created_by: Option<String>,
    pub created_at: Option<i64>,
}

/// A single front/back flashcard. Media columns are nullable references into
/// the sounds/images tables.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
#[sqlx(rename_all = "camelCase")]
pub struct Card {
    pub id: i64,
    pub collection_id: i64,
    pub front: String,
    pub back: String,
    pub front_sound: Option<i64>,
    pub back_sound: Option<i64>,
    pub front_img: Option<i64>,
    pub back_img: Option<i64>,
}

/// Audio or image row. `media_ref` is the lookup key (e.g. the spoken word or
/// the country name), `comment` a namespace/provenance tag (voice name, import
/// batch), `file` a path relative to the media directory.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Media {
    pub id: i64,
    #[serde(rename = "ref")]
    #[sqlx(rename = "ref")]
    pub media_ref: String,
    pub comment: Option<String>,
    pub file: String,
}

/// Library shelf / 合集分组
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Group {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
}

/// Membership of a collection in a group.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CollectionGroup {
    pub collection_id: i64,
    pub group_id: i64,
}
