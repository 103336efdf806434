//! Font repository trait and implementation

use crate::error::{LibraryError, Result};
use crate::models::{CategoryId, Font, FontId, NewFont};
use async_trait::async_trait;
use sqlx::{query, query_as, query_scalar, SqlitePool};
use tracing::debug;

/// Font repository interface for data access operations
///
/// Every mutating method is a single statement or a single transaction, so a
/// font's category and deletion timestamp are never observed half-written.
#[async_trait]
pub trait FontRepository: Send + Sync {
    /// Find a font by its ID
    ///
    /// # Returns
    /// - `Ok(Some(font))` if found
    /// - `Ok(None)` if not found
    /// - `Err` if database error occurs
    async fn find_by_id(&self, id: FontId) -> Result<Option<Font>>;

    /// Find the oldest font whose title matches case-insensitively
    async fn find_by_title(&self, title: &str) -> Result<Option<Font>>;

    /// Find every font in a category whose title matches case-insensitively
    async fn find_by_title_in_category(
        &self,
        title: &str,
        category_id: CategoryId,
    ) -> Result<Vec<Font>>;

    /// Find a font by its exact source URL
    async fn find_by_url(&self, url: &str) -> Result<Option<Font>>;

    /// List the fonts of a category, newest first
    async fn find_by_category(&self, category_id: CategoryId) -> Result<Vec<Font>>;

    /// Atomically replace any font with the same URL by a new one
    ///
    /// Deletes the existing font with `font.url` (cascading to its images),
    /// inserts the new font into `category_id` and stores its images, all in
    /// one transaction.
    ///
    /// # Errors
    /// Returns error if:
    /// - Font validation fails
    /// - Database error occurs (nothing is written)
    async fn replace_with_assets(
        &self,
        font: &NewFont,
        category_id: CategoryId,
        created_at: i64,
        images: &[(String, Vec<u8>)],
    ) -> Result<Font>;

    /// Set a font's category and deletion timestamp in one statement
    ///
    /// With `from` set, the row is only updated while it still belongs to that
    /// category.
    ///
    /// # Returns
    /// - `Ok(true)` if the font was updated
    /// - `Ok(false)` if the font was not found or is no longer in `from`
    async fn update_membership(
        &self,
        id: FontId,
        from: Option<CategoryId>,
        category_id: CategoryId,
        deletion_timestamp: Option<i64>,
    ) -> Result<bool>;

    /// Delete a font only if it currently belongs to `category_id`
    ///
    /// # Returns
    /// - `Ok(true)` if the font was deleted
    /// - `Ok(false)` if it was missing or in another category
    async fn delete_in_category(&self, id: FontId, category_id: CategoryId) -> Result<bool>;

    /// Delete every font of a category, returning how many were removed
    async fn delete_by_category(&self, category_id: CategoryId) -> Result<u64>;

    /// Delete the fonts of `category_id` whose deadline is at or before `now`
    ///
    /// One statement selects and deletes, so a font that leaves the category
    /// concurrently is never removed. Returns the deleted ids in ascending order.
    async fn delete_expired(&self, category_id: CategoryId, now: i64) -> Result<Vec<FontId>>;

    /// Count the fonts of a category
    async fn count_in_category(&self, category_id: CategoryId) -> Result<i64>;
}

/// SQLite implementation of FontRepository
pub struct SqliteFontRepository {
    pool: SqlitePool,
}

impl SqliteFontRepository {
    /// Create a new SQLite font repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FontRepository for SqliteFontRepository {
    async fn find_by_id(&self, id: FontId) -> Result<Option<Font>> {
        let font = query_as::<_, Font>("SELECT * FROM fonts WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(font)
    }

    async fn find_by_title(&self, title: &str) -> Result<Option<Font>> {
        let font = query_as::<_, Font>(
            "SELECT * FROM fonts WHERE normalized_title = ? ORDER BY id ASC LIMIT 1",
        )
        .bind(NewFont::normalize(title))
        .fetch_optional(&self.pool)
        .await?;

        Ok(font)
    }

    async fn find_by_title_in_category(
        &self,
        title: &str,
        category_id: CategoryId,
    ) -> Result<Vec<Font>> {
        let fonts = query_as::<_, Font>(
            "SELECT * FROM fonts WHERE normalized_title = ? AND category_id = ? ORDER BY id ASC",
        )
        .bind(NewFont::normalize(title))
        .bind(category_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(fonts)
    }

    async fn find_by_url(&self, url: &str) -> Result<Option<Font>> {
        let font = query_as::<_, Font>("SELECT * FROM fonts WHERE url = ? LIMIT 1")
            .bind(url)
            .fetch_optional(&self.pool)
            .await?;

        Ok(font)
    }

    async fn find_by_category(&self, category_id: CategoryId) -> Result<Vec<Font>> {
        let fonts = query_as::<_, Font>(
            "SELECT * FROM fonts WHERE category_id = ? ORDER BY created_at DESC, id DESC",
        )
        .bind(category_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(fonts)
    }

    async fn replace_with_assets(
        &self,
        font: &NewFont,
        category_id: CategoryId,
        created_at: i64,
        images: &[(String, Vec<u8>)],
    ) -> Result<Font> {
        font.validate().map_err(|msg| LibraryError::InvalidInput {
            field: "font".to_string(),
            message: msg,
        })?;

        let mut tx = self.pool.begin().await?;

        let replaced = query("DELETE FROM fonts WHERE url = ?")
            .bind(&font.url)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if replaced > 0 {
            debug!(url = %font.url, replaced, "Replacing font with identical URL");
        }

        let inserted = query(
            r#"
            INSERT INTO fonts (
                title, normalized_title, url, category_id, deletion_timestamp, created_at
            )
            VALUES (?, ?, ?, ?, NULL, ?)
            "#,
        )
        .bind(&font.title)
        .bind(NewFont::normalize(&font.title))
        .bind(&font.url)
        .bind(category_id)
        .bind(created_at)
        .execute(&mut *tx)
        .await?;

        let id = FontId(inserted.last_insert_rowid());

        for (position, (image_url, image_data)) in images.iter().enumerate() {
            query(
                "INSERT INTO font_images (font_id, position, image_url, image_data) VALUES (?, ?, ?, ?)",
            )
            .bind(id)
            .bind(position as i64)
            .bind(image_url)
            .bind(image_data)
            .execute(&mut *tx)
            .await?;
        }

        let stored = query_as::<_, Font>("SELECT * FROM fonts WHERE id = ?")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(stored)
    }

    async fn update_membership(
        &self,
        id: FontId,
        from: Option<CategoryId>,
        category_id: CategoryId,
        deletion_timestamp: Option<i64>,
    ) -> Result<bool> {
        let result = query(
            r#"
            UPDATE fonts
            SET category_id = ?, deletion_timestamp = ?
            WHERE id = ? AND (? IS NULL OR category_id = ?)
            "#,
        )
        .bind(category_id)
        .bind(deletion_timestamp)
        .bind(id)
        .bind(from)
        .bind(from)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_in_category(&self, id: FontId, category_id: CategoryId) -> Result<bool> {
        let result = query("DELETE FROM fonts WHERE id = ? AND category_id = ?")
            .bind(id)
            .bind(category_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_by_category(&self, category_id: CategoryId) -> Result<u64> {
        let result = query("DELETE FROM fonts WHERE category_id = ?")
            .bind(category_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn delete_expired(&self, category_id: CategoryId, now: i64) -> Result<Vec<FontId>> {
        let mut ids: Vec<FontId> = query_scalar(
            r#"
            DELETE FROM fonts
            WHERE category_id = ?
              AND deletion_timestamp IS NOT NULL
              AND deletion_timestamp <= ?
            RETURNING id
            "#,
        )
        .bind(category_id)
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        ids.sort_unstable();
        Ok(ids)
    }

    async fn count_in_category(&self, category_id: CategoryId) -> Result<i64> {
        let count: i64 = query_as("SELECT COUNT(*) FROM fonts WHERE category_id = ?")
            .bind(category_id)
            .fetch_one(&self.pool)
            .await
            .map(|row: (i64,)| row.0)?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;
    use crate::repositories::{CategoryRepository, SqliteCategoryRepository};

    async fn setup() -> (SqliteFontRepository, CategoryId, CategoryId) {
        let pool = create_test_pool().await.unwrap();
        let categories = SqliteCategoryRepository::new(pool.clone());
        let favorites = categories.get_or_create("Favorites", 0).await.unwrap().id;
        let recycle_bin = categories.get_or_create("Recycle Bin", 0).await.unwrap().id;
        (SqliteFontRepository::new(pool), favorites, recycle_bin)
    }

    fn images(n: usize) -> Vec<(String, Vec<u8>)> {
        (0..n)
            .map(|i| (format!("https://img.example/{}.png", i), vec![i as u8; 4]))
            .collect()
    }

    #[tokio::test]
    async fn test_replace_inserts_and_finds() {
        let (repo, favorites, _) = setup().await;

        let stored = repo
            .replace_with_assets(&NewFont::new("Roboto", "u1"), favorites, 100, &images(2))
            .await
            .unwrap();

        assert_eq!(stored.title, "Roboto");
        assert_eq!(stored.normalized_title, "roboto");
        assert_eq!(stored.category_id, favorites);
        assert_eq!(stored.deletion_timestamp, None);

        let found = repo.find_by_id(stored.id).await.unwrap();
        assert_eq!(found, Some(stored));
    }

    #[tokio::test]
    async fn test_replace_removes_previous_font_with_same_url() {
        let (repo, favorites, _) = setup().await;

        let first = repo
            .replace_with_assets(&NewFont::new("Roboto", "u1"), favorites, 100, &images(1))
            .await
            .unwrap();
        let second = repo
            .replace_with_assets(&NewFont::new("Roboto Mono", "u1"), favorites, 200, &[])
            .await
            .unwrap();

        assert_ne!(first.id, second.id);
        assert!(repo.find_by_id(first.id).await.unwrap().is_none());
        assert_eq!(repo.count_in_category(favorites).await.unwrap(), 1);
        assert_eq!(repo.find_by_url("u1").await.unwrap().unwrap().id, second.id);
    }

    #[tokio::test]
    async fn test_find_by_title_is_case_insensitive() {
        let (repo, favorites, _) = setup().await;
        repo.replace_with_assets(&NewFont::new("Open Sans", "u1"), favorites, 1, &[])
            .await
            .unwrap();

        let found = repo.find_by_title("  OPEN sans ").await.unwrap();
        assert_eq!(found.unwrap().url, "u1");
        assert!(repo.find_by_title("Lato").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_membership_missing_font() {
        let (repo, _, recycle_bin) = setup().await;

        let updated = repo
            .update_membership(FontId(999), None, recycle_bin, Some(10))
            .await
            .unwrap();
        assert!(!updated);
    }

    #[tokio::test]
    async fn test_delete_in_category_guards_other_categories() {
        let (repo, favorites, recycle_bin) = setup().await;
        let font = repo
            .replace_with_assets(&NewFont::new("Lato", "u2"), favorites, 1, &[])
            .await
            .unwrap();

        assert!(!repo.delete_in_category(font.id, recycle_bin).await.unwrap());
        assert!(repo.find_by_id(font.id).await.unwrap().is_some());

        assert!(repo.delete_in_category(font.id, favorites).await.unwrap());
        assert!(repo.find_by_id(font.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_membership_guarded_by_source_category() {
        let (repo, favorites, recycle_bin) = setup().await;
        let font = repo
            .replace_with_assets(&NewFont::new("Lato", "u1"), favorites, 1, &[])
            .await
            .unwrap();
        repo.update_membership(font.id, None, recycle_bin, Some(50))
            .await
            .unwrap();

        // Already in the Recycle Bin, so a move expecting Favorites is refused
        let updated = repo
            .update_membership(font.id, Some(favorites), recycle_bin, Some(90))
            .await
            .unwrap();
        assert!(!updated);
        let stored = repo.find_by_id(font.id).await.unwrap().unwrap();
        assert_eq!(stored.deletion_timestamp, Some(50));

        let updated = repo
            .update_membership(font.id, Some(recycle_bin), favorites, None)
            .await
            .unwrap();
        assert!(updated);
        let stored = repo.find_by_id(font.id).await.unwrap().unwrap();
        assert_eq!(stored.category_id, favorites);
        assert_eq!(stored.deletion_timestamp, None);
    }

    #[tokio::test]
    async fn test_delete_by_category() {
        let (repo, favorites, recycle_bin) = setup().await;
        let mut ids = Vec::new();
        for i in 0..3 {
            let font = repo
                .replace_with_assets(&NewFont::new("F", format!("u{}", i)), favorites, i, &[])
                .await
                .unwrap();
            ids.push(font.id);
        }
        repo.update_membership(ids[0], None, recycle_bin, Some(5))
            .await
            .unwrap();

        assert_eq!(repo.delete_by_category(recycle_bin).await.unwrap(), 1);
        assert_eq!(repo.count_in_category(favorites).await.unwrap(), 2);
        assert_eq!(repo.count_in_category(recycle_bin).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_expired_only_touches_expired_recycled_fonts() {
        let (repo, favorites, recycle_bin) = setup().await;
        let mut ids = Vec::new();
        for i in 0..4 {
            let font = repo
                .replace_with_assets(&NewFont::new("F", format!("u{}", i)), favorites, i, &[])
                .await
                .unwrap();
            ids.push(font.id);
        }
        repo.update_membership(ids[0], None, recycle_bin, Some(100))
            .await
            .unwrap();
        repo.update_membership(ids[1], None, recycle_bin, Some(90))
            .await
            .unwrap();
        repo.update_membership(ids[2], None, recycle_bin, Some(101))
            .await
            .unwrap();
        // Stale deadline on a Favorites row must not make it deletable
        repo.update_membership(ids[3], None, favorites, Some(10))
            .await
            .unwrap();

        let deleted = repo.delete_expired(recycle_bin, 100).await.unwrap();
        assert_eq!(deleted, vec![ids[0], ids[1]]);
        assert!(repo.find_by_id(ids[2]).await.unwrap().is_some());
        assert!(repo.find_by_id(ids[3]).await.unwrap().is_some());

        assert!(repo.delete_expired(recycle_bin, 100).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_font_validation() {
        let (repo, favorites, _) = setup().await;
        let result = repo
            .replace_with_assets(&NewFont::new("Roboto", "  "), favorites, 1, &[])
            .await;
        assert!(matches!(result, Err(LibraryError::InvalidInput { .. })));
    }
}
