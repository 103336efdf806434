//! Category repository trait and implementation

use crate::error::{LibraryError, Result};
use crate::models::{Category, CategoryId};
use async_trait::async_trait;
use sqlx::{query, query_as, SqlitePool};

/// Category repository interface
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// Find a category by ID
    async fn find_by_id(&self, id: CategoryId) -> Result<Option<Category>>;

    /// Find a category by name, ignoring case
    async fn find_by_name(&self, name: &str) -> Result<Option<Category>>;

    /// Return the category named `name`, creating it if absent
    ///
    /// Safe under concurrent first use: the insert is a no-op when another
    /// caller won the race, and the row is always re-read afterwards.
    async fn get_or_create(&self, name: &str, created_at: i64) -> Result<Category>;

    /// List all categories by ID
    async fn list(&self) -> Result<Vec<Category>>;
}

/// SQLite implementation of CategoryRepository
pub struct SqliteCategoryRepository {
    pool: SqlitePool,
}

impl SqliteCategoryRepository {
    /// Create a new SQLite category repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CategoryRepository for SqliteCategoryRepository {
    async fn find_by_id(&self, id: CategoryId) -> Result<Option<Category>> {
        let category = query_as::<_, Category>("SELECT * FROM categories WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(category)
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Category>> {
        // `name` is declared COLLATE NOCASE
        let category = query_as::<_, Category>("SELECT * FROM categories WHERE name = ?")
            .bind(name.trim())
            .fetch_optional(&self.pool)
            .await?;

        Ok(category)
    }

    async fn get_or_create(&self, name: &str, created_at: i64) -> Result<Category> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LibraryError::InvalidInput {
                field: "category".to_string(),
                message: "Category name cannot be empty".to_string(),
            });
        }

        query("INSERT OR IGNORE INTO categories (name, created_at) VALUES (?, ?)")
            .bind(name)
            .bind(created_at)
            .execute(&self.pool)
            .await?;

        self.find_by_name(name)
            .await?
            .ok_or_else(|| LibraryError::NotFound {
                entity_type: "Category".to_string(),
                id: name.to_string(),
            })
    }

    async fn list(&self) -> Result<Vec<Category>> {
        let categories = query_as::<_, Category>("SELECT * FROM categories ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        Ok(categories)
    }
}
