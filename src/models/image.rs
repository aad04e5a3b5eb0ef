use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ids::ContentHash;

/// Content-addressed image, many-to-many with News through `news_images`.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Image {
    pub id: Uuid,
    pub digest: ContentHash,
    pub content_type: String,
    pub byte_len: i64,
    pub thumbnail_digest: Option<ContentHash>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewImage {
    pub bytes: Vec<u8>,
    pub content_type: String,
}
