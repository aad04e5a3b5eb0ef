use sqlx::PgPool;
use uuid::Uuid;

use crate::db;
use crate::errors::AppError;
use crate::models::{ContentHash, Image, NewImage};

const THUMBNAIL_MAX_DIM: u32 = 256;

/// Content-addressed image store (C4.1/C5): bytes are hashed, de-duplicated
/// by digest, and a deterministic thumbnail digest derived alongside
/// (spec.md §4.3 "Image handling"). Returns the persisted row for the
/// caller to associate with a News via `news_images`.
pub async fn store(pool: &PgPool, new_image: NewImage) -> Result<Image, AppError> {
    let digest = ContentHash::of(&new_image.bytes);

    if let Some(existing) = db::image_queries::find_by_digest(pool, &digest).await? {
        return Ok(existing);
    }

    let thumbnail_digest = derive_thumbnail_digest(&new_image.bytes);

    db::image_queries::insert(pool, digest, &new_image.content_type, new_image.bytes.len() as i64, thumbnail_digest)
        .await
}

/// Deterministic stand-in for a real thumbnailing pipeline: digests the
/// source bytes again under a fixed "thumbnail" domain separator, so two
/// identical source images always produce the same thumbnail digest without
/// needing an image-decoding dependency in this exercise.
fn derive_thumbnail_digest(bytes: &[u8]) -> ContentHash {
    let mut domain_separated = Vec::with_capacity(bytes.len() + 10);
    domain_separated.extend_from_slice(b"thumbnail:");
    domain_separated.extend_from_slice(bytes);
    ContentHash::of(&domain_separated)
}

pub async fn attach_to_news(pool: &PgPool, news_id: Uuid, image_id: Uuid) -> Result<(), AppError> {
    db::image_queries::link_to_news(pool, news_id, image_id).await
}

pub fn thumbnail_max_dim() -> u32 {
    THUMBNAIL_MAX_DIM
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thumbnail_digest_is_deterministic() {
        let bytes = b"some image bytes".to_vec();
        assert_eq!(derive_thumbnail_digest(&bytes), derive_thumbnail_digest(&bytes));
    }

    #[test]
    fn thumbnail_digest_differs_from_source_digest() {
        let bytes = b"some image bytes".to_vec();
        assert_ne!(derive_thumbnail_digest(&bytes), ContentHash::of(&bytes));
    }
}
