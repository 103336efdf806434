//! Core service façade and bootstrap helpers.
//!
//! [`FontService`] wires the SQLite storage, the category registry, the
//! lifecycle engine and the ingestion policy together behind one handle for
//! the UI layer. Every mutation refreshes the observable Favorites and
//! Recycle Bin lists and publishes a [`FontEvent`] on the event bus.
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use core_service::FontService;
//!
//! let config = CoreConfig::builder().database_path("fonts.db").build()?;
//! let service = FontService::bootstrap(config).await?;
//! let mut favorites = service.watch_favorites();
//! let sweeper = service.spawn_eviction_sweeper();
//! ```

pub mod error;
pub mod sweeper;

pub use error::{CoreError, Result};
pub use sweeper::SweeperHandle;

use core_library::db::{create_pool, DatabaseConfig};
use core_library::repositories::{
    FontImageRepository, FontRepository, SqliteCategoryRepository, SqliteFontImageRepository,
    SqliteFontRepository,
};
use core_library::{
    CategoryRegistry, Font, FontId, FontImage, IngestOutcome, IngestionPolicy, LifecycleEngine,
    NewFont, WellKnownCategories,
};
use core_runtime::config::{CoreConfig, DatabaseLocation};
use core_runtime::events::{CoreEvent, EventBus, EventStream, FontEvent, Receiver};
use core_runtime::logging::strip_path;
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

struct ServiceInner {
    config: CoreConfig,
    pool: SqlitePool,
    fonts: Arc<dyn FontRepository>,
    images: Arc<dyn FontImageRepository>,
    categories: WellKnownCategories,
    lifecycle: Arc<LifecycleEngine>,
    ingestion: IngestionPolicy,
    events: EventBus,
    favorites: watch::Sender<Vec<Font>>,
    recycle_bin: watch::Sender<Vec<Font>>,
}

/// Primary façade exposed to host applications.
///
/// Cheap to clone; clones share the same storage, buffers and streams.
#[derive(Clone)]
pub struct FontService {
    inner: Arc<ServiceInner>,
}

impl FontService {
    /// Open the configured database and build the service.
    pub async fn bootstrap(config: CoreConfig) -> Result<Self> {
        let db_config = match &config.database {
            DatabaseLocation::File(path) => {
                info!(
                    database = %strip_path(&path.to_string_lossy()),
                    "Opening font database"
                );
                DatabaseConfig::new(path).max_connections(config.max_connections)
            }
            DatabaseLocation::InMemory => {
                info!("Opening in-memory font database");
                DatabaseConfig::in_memory()
            }
        };

        let pool = create_pool(db_config)
            .await
            .map_err(|e| CoreError::InitializationFailed(e.to_string()))?;

        Self::new(pool, config).await
    }

    /// Build the service over an existing, migrated pool.
    pub async fn new(pool: SqlitePool, config: CoreConfig) -> Result<Self> {
        config.validate()?;

        let clock = config.clock.clone();
        let fonts: Arc<dyn FontRepository> = Arc::new(SqliteFontRepository::new(pool.clone()));
        let images: Arc<dyn FontImageRepository> =
            Arc::new(SqliteFontImageRepository::new(pool.clone()));

        let registry = CategoryRegistry::new(
            Arc::new(SqliteCategoryRepository::new(pool.clone())),
            clock.clone(),
        );
        registry.run_migration_hook().await?;
        let categories = registry.well_known().await?;

        let lifecycle = Arc::new(
            LifecycleEngine::new(fonts.clone(), clock.clone(), categories)
                .with_retention_secs(config.retention_secs()),
        );
        let ingestion = IngestionPolicy::new(fonts.clone(), lifecycle.clone(), clock);

        let (favorites, _) = watch::channel(Vec::new());
        let (recycle_bin, _) = watch::channel(Vec::new());

        let service = Self {
            inner: Arc::new(ServiceInner {
                events: EventBus::new(config.event_buffer_size),
                config,
                pool,
                fonts,
                images,
                categories,
                lifecycle,
                ingestion,
                favorites,
                recycle_bin,
            }),
        };

        service.refresh_streams().await?;

        info!(
            favorites = %categories.favorites,
            recycle_bin = %categories.recycle_bin,
            retention_secs = service.inner.lifecycle.retention_secs(),
            "Font service ready"
        );

        Ok(service)
    }

    pub fn config(&self) -> &CoreConfig {
        &self.inner.config
    }

    pub fn categories(&self) -> WellKnownCategories {
        self.inner.categories
    }

    // =========================================================================
    // Observation
    // =========================================================================

    /// Current Favorites list, refreshed after every mutation
    pub fn watch_favorites(&self) -> watch::Receiver<Vec<Font>> {
        self.inner.favorites.subscribe()
    }

    /// Current Recycle Bin list, refreshed after every mutation
    pub fn watch_recycle_bin(&self) -> watch::Receiver<Vec<Font>> {
        self.inner.recycle_bin.subscribe()
    }

    pub fn subscribe_events(&self) -> Receiver<CoreEvent> {
        self.inner.events.subscribe()
    }

    pub fn event_stream(&self) -> EventStream {
        EventStream::new(self.inner.events.subscribe())
    }

    pub async fn favorites(&self) -> Result<Vec<Font>> {
        Ok(self
            .inner
            .fonts
            .find_by_category(self.inner.categories.favorites)
            .await?)
    }

    pub async fn recycle_bin(&self) -> Result<Vec<Font>> {
        Ok(self
            .inner
            .fonts
            .find_by_category(self.inner.categories.recycle_bin)
            .await?)
    }

    pub async fn font(&self, id: FontId) -> Result<Option<Font>> {
        Ok(self.inner.fonts.find_by_id(id).await?)
    }

    /// Preview images of a font in insertion order
    pub async fn font_images(&self, id: FontId) -> Result<Vec<FontImage>> {
        Ok(self.inner.images.find_by_font(id).await?)
    }

    pub async fn pending_recycling(&self) -> Vec<Font> {
        self.inner.lifecycle.pending_recycling().await
    }

    pub async fn pending_restoration(&self) -> Vec<Font> {
        self.inner.lifecycle.pending_restoration().await
    }

    // =========================================================================
    // Pending buffers
    // =========================================================================

    pub async fn mark_for_recycling(&self, font: Font) -> bool {
        let added = self.inner.lifecycle.mark_for_recycling(font).await;
        self.emit_pending().await;
        added
    }

    pub async fn mark_for_restoration(&self, font: Font) -> bool {
        let added = self.inner.lifecycle.mark_for_restoration(font).await;
        self.emit_pending().await;
        added
    }

    pub async fn dismiss_recycling(&self) -> usize {
        let cleared = self.inner.lifecycle.dismiss_recycling().await;
        self.emit_pending().await;
        cleared
    }

    pub async fn dismiss_restoration(&self) -> usize {
        let cleared = self.inner.lifecycle.dismiss_restoration().await;
        self.emit_pending().await;
        cleared
    }

    // =========================================================================
    // Membership moves
    // =========================================================================

    /// Confirm staged recycling; returns the fonts that moved
    ///
    /// On a storage failure the moves committed before it are still
    /// published and reflected in the streams.
    pub async fn attempt_recycling(&self) -> Result<Vec<Font>> {
        let report = self.inner.lifecycle.attempt_recycling().await;
        self.emit_pending().await;

        for font in &report.moved {
            self.emit_recycled(font);
        }
        self.refresh_after_mutation().await;
        Ok(report.into_result()?)
    }

    /// Confirm staged restoration; returns the fonts that moved
    ///
    /// Failure handling matches [`FontService::attempt_recycling`].
    pub async fn attempt_restoration(&self) -> Result<Vec<Font>> {
        let report = self.inner.lifecycle.attempt_restoration().await;
        self.emit_pending().await;

        for font in &report.moved {
            self.emit(FontEvent::FontRestored { font_id: font.id.0 });
        }
        self.refresh_after_mutation().await;
        Ok(report.into_result()?)
    }

    pub async fn move_to_recycle_bin(&self, id: FontId) -> Result<Option<Font>> {
        let moved = self.inner.lifecycle.move_to_recycle_bin(id).await?;
        if let Some(font) = &moved {
            self.emit_recycled(font);
            self.refresh_after_mutation().await;
        }
        Ok(moved)
    }

    pub async fn move_to_favorites(&self, id: FontId) -> Result<Option<Font>> {
        let moved = self.inner.lifecycle.move_to_favorites(id).await?;
        if let Some(font) = &moved {
            self.emit(FontEvent::FontRestored { font_id: font.id.0 });
            self.refresh_after_mutation().await;
        }
        Ok(moved)
    }

    // =========================================================================
    // Permanent deletion
    // =========================================================================

    pub async fn wipe_recycle_bin(&self) -> Result<u64> {
        let deleted = self.inner.lifecycle.wipe_recycle_bin().await?;
        self.emit(FontEvent::RecycleBinWiped { deleted });
        self.emit_pending().await;
        self.refresh_after_mutation().await;
        Ok(deleted)
    }

    pub async fn delete_recycled_font(&self, id: FontId) -> Result<bool> {
        let deleted = self.inner.lifecycle.delete_recycled_font(id).await?;
        if deleted {
            self.emit(FontEvent::FontDeleted { font_id: id.0 });
            self.refresh_after_mutation().await;
        }
        self.emit_pending().await;
        Ok(deleted)
    }

    /// Evict Recycle Bin fonts whose deadline has passed
    pub async fn delete_old_recycled_fonts(&self) -> Result<Vec<FontId>> {
        let evicted = self.inner.lifecycle.delete_old_recycled_fonts().await?;
        if !evicted.is_empty() {
            self.emit(FontEvent::ExpiredFontsEvicted {
                font_ids: evicted.iter().map(|id| id.0).collect(),
            });
            self.refresh_after_mutation().await;
        }
        Ok(evicted)
    }

    // =========================================================================
    // Ingestion
    // =========================================================================

    /// Whether `new_font` should start liked; may stage a superseded font
    pub async fn should_start_liked(&self, new_font: &NewFont) -> Result<bool> {
        let liked = self.inner.ingestion.should_start_liked(new_font).await?;
        self.emit_pending().await;
        Ok(liked)
    }

    pub async fn font_before_insertion(&self, new_font: &NewFont) -> Result<bool> {
        self.should_start_liked(new_font).await
    }

    pub async fn insert_font_with_assets(
        &self,
        new_font: &NewFont,
        image_urls: &[String],
        image_blobs: &[Vec<u8>],
    ) -> Result<Font> {
        let font = self
            .inner
            .ingestion
            .insert_font_with_assets(new_font, image_urls, image_blobs)
            .await?;

        self.emit(FontEvent::FontAdded {
            font_id: font.id.0,
            title: font.title.clone(),
            liked: None,
        });
        self.refresh_after_mutation().await;
        Ok(font)
    }

    /// Run the liked decision, the insertion and the Recycle Bin twin check
    pub async fn ingest(
        &self,
        new_font: &NewFont,
        image_urls: &[String],
        image_blobs: &[Vec<u8>],
    ) -> Result<IngestOutcome> {
        let outcome = self
            .inner
            .ingestion
            .ingest(new_font, image_urls, image_blobs)
            .await?;

        self.emit(FontEvent::FontAdded {
            font_id: outcome.font.id.0,
            title: outcome.font.title.clone(),
            liked: Some(outcome.liked),
        });
        self.emit_pending().await;
        self.refresh_after_mutation().await;
        Ok(outcome)
    }

    // =========================================================================
    // Background variants
    // =========================================================================

    pub fn spawn_attempt_recycling(&self) -> JoinHandle<Result<Vec<Font>>> {
        let service = self.clone();
        tokio::spawn(async move { service.attempt_recycling().await })
    }

    pub fn spawn_attempt_restoration(&self) -> JoinHandle<Result<Vec<Font>>> {
        let service = self.clone();
        tokio::spawn(async move { service.attempt_restoration().await })
    }

    pub fn spawn_wipe_recycle_bin(&self) -> JoinHandle<Result<u64>> {
        let service = self.clone();
        tokio::spawn(async move { service.wipe_recycle_bin().await })
    }

    pub fn spawn_delete_old_recycled_fonts(&self) -> JoinHandle<Result<Vec<FontId>>> {
        let service = self.clone();
        tokio::spawn(async move { service.delete_old_recycled_fonts().await })
    }

    /// Start the periodic eviction sweep at the configured interval
    pub fn spawn_eviction_sweeper(&self) -> SweeperHandle {
        sweeper::spawn(self.clone(), self.inner.config.sweep_interval)
    }

    /// Close the connection pool; further storage calls fail
    pub async fn close(&self) {
        self.inner.pool.close().await;
        info!("Font service closed");
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    pub(crate) fn emit_core(&self, event: CoreEvent) {
        self.inner.events.emit(event).ok();
    }

    fn emit(&self, event: FontEvent) {
        self.emit_core(CoreEvent::Fonts(event));
    }

    fn emit_recycled(&self, font: &Font) {
        if let Some(deletion_timestamp) = font.deletion_timestamp {
            self.emit(FontEvent::FontRecycled {
                font_id: font.id.0,
                deletion_timestamp,
            });
        }
    }

    async fn emit_pending(&self) {
        let recycling = self.inner.lifecycle.pending_recycling().await.len();
        let restoration = self.inner.lifecycle.pending_restoration().await.len();
        self.emit(FontEvent::PendingChanged {
            recycling,
            restoration,
        });
    }

    async fn refresh_streams(&self) -> Result<()> {
        let favorites = self.favorites().await?;
        let recycle_bin = self.recycle_bin().await?;

        self.inner.favorites.send_replace(favorites);
        self.inner.recycle_bin.send_replace(recycle_bin);
        Ok(())
    }

    /// The mutation already committed, so a failed refresh is only logged
    async fn refresh_after_mutation(&self) {
        if let Err(e) = self.refresh_streams().await {
            warn!(error = %e, "Failed to refresh font lists");
        }
    }
}
