//! Font image repository
//!
//! Images are written together with their font by
//! [`FontRepository::replace_with_assets`](super::FontRepository::replace_with_assets)
//! and removed by cascade, so this repository is read-only.

use crate::error::Result;
use crate::models::{FontId, FontImage};
use async_trait::async_trait;
use sqlx::{query_as, SqlitePool};

#[async_trait]
pub trait FontImageRepository: Send + Sync {
    /// Images of a font in insertion order
    async fn find_by_font(&self, font_id: FontId) -> Result<Vec<FontImage>>;

    /// Count all stored images
    async fn count(&self) -> Result<i64>;
}

/// SQLite implementation of FontImageRepository
pub struct SqliteFontImageRepository {
    pool: SqlitePool,
}

impl SqliteFontImageRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FontImageRepository for SqliteFontImageRepository {
    async fn find_by_font(&self, font_id: FontId) -> Result<Vec<FontImage>> {
        let images = query_as::<_, FontImage>(
            r#"
            SELECT font_id, position, image_url, image_data
            FROM font_images
            WHERE font_id = ?
            ORDER BY position
            "#,
        )
        .bind(font_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(images)
    }

    async fn count(&self) -> Result<i64> {
        let count: i64 = query_as("SELECT COUNT(*) FROM font_images")
            .fetch_one(&self.pool)
            .await
            .map(|row: (i64,)| row.0)?;

        Ok(count)
    }
}
