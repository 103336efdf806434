//! Category registry
//!
//! Resolves category names to stable ids. Categories are created lazily on
//! first use and never deleted.

use crate::error::Result;
use crate::models::{CategoryId, WellKnownCategories, FAVORITES, RECYCLE_BIN};
use crate::repositories::CategoryRepository;
use bridge_traits::time::Clock;
use std::sync::Arc;
use tracing::{debug, info};

pub struct CategoryRegistry {
    repository: Arc<dyn CategoryRepository>,
    clock: Arc<dyn Clock>,
}

impl CategoryRegistry {
    pub fn new(repository: Arc<dyn CategoryRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    /// Resolve a category name to its id, creating the category if absent
    ///
    /// Lookup ignores case. Concurrent first use of the same name yields a
    /// single row.
    pub async fn resolve(&self, name: &str) -> Result<CategoryId> {
        if let Some(existing) = self.repository.find_by_name(name).await? {
            return Ok(existing.id);
        }

        let created = self
            .repository
            .get_or_create(name, self.clock.unix_timestamp())
            .await?;

        info!(category = %created.name, id = %created.id, "Resolved category");
        Ok(created.id)
    }

    /// Resolve Favorites and the Recycle Bin
    pub async fn well_known(&self) -> Result<WellKnownCategories> {
        let favorites = self.resolve(FAVORITES).await?;
        let recycle_bin = self.resolve(RECYCLE_BIN).await?;

        Ok(WellKnownCategories {
            favorites,
            recycle_bin,
        })
    }

    /// Hook for category data migrations; currently nothing to migrate
    pub async fn run_migration_hook(&self) -> Result<()> {
        debug!("No category migrations pending");
        Ok(())
    }
}
