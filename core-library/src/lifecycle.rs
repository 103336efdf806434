//! # Lifecycle Engine
//!
//! Moves fonts between Favorites and the Recycle Bin and evicts Recycle Bin
//! fonts once their deadline passes.
//!
//! ## State machine
//!
//! ```text
//!  Favorites, no deadline ──move_to_recycle_bin──▶ Recycle Bin, deadline = now + retention
//!          ▲                                              │
//!          └───────────────move_to_favorites──────────────┤
//!                                                         ▼
//!                              deleted (sweep, wipe or delete_recycled_font)
//! ```
//!
//! There is no direct path from Favorites to deletion.
//!
//! ## Pending actions
//!
//! Bulk moves are staged in [`PendingActions`] until the user confirms them.
//! The buffers live only in this engine's memory: they are not persisted and
//! are lost when the process exits. Each `attempt_*` call moves a staged font
//! only while it is still in its source category, checked in the same UPDATE
//! that moves it, so fonts that changed in the meantime are skipped.
//!
//! ## Failure semantics
//!
//! A font that no longer exists is a logged no-op. Only storage failures are
//! returned as errors. Bulk moves commit font by font and report the moves
//! that landed before a failure in [`MoveReport`].

use crate::error::{LibraryError, Result};
use crate::models::{CategoryId, Font, FontId, WellKnownCategories};
use crate::repositories::FontRepository;
use bridge_traits::time::Clock;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

/// Default Recycle Bin retention: 7 days
pub const DEFAULT_RETENTION_SECS: i64 = 604_800;

/// Result of confirming a staged bulk move
#[derive(Debug, Default)]
pub struct MoveReport {
    /// Fonts that moved, in their post-move state
    pub moved: Vec<Font>,
    /// Storage failure that stopped the batch; earlier moves stay committed
    pub error: Option<LibraryError>,
}

impl MoveReport {
    pub fn into_result(self) -> Result<Vec<Font>> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.moved),
        }
    }
}

/// Fonts staged for a confirmed bulk move
///
/// Both buffers are keyed by font id, so staging the same font twice keeps a
/// single entry. The two buffers are independent; a font may sit in both.
#[derive(Debug, Clone, Default)]
pub struct PendingActions {
    marked_for_recycling: BTreeMap<FontId, Font>,
    marked_for_restoration: BTreeMap<FontId, Font>,
}

impl PendingActions {
    /// Stage a font for recycling; returns false if it was already staged
    pub fn mark_for_recycling(&mut self, font: Font) -> bool {
        self.marked_for_recycling.insert(font.id, font).is_none()
    }

    /// Stage a font for restoration; returns false if it was already staged
    pub fn mark_for_restoration(&mut self, font: Font) -> bool {
        self.marked_for_restoration.insert(font.id, font).is_none()
    }

    pub fn recycling(&self) -> Vec<Font> {
        self.marked_for_recycling.values().cloned().collect()
    }

    pub fn restoration(&self) -> Vec<Font> {
        self.marked_for_restoration.values().cloned().collect()
    }

    pub fn is_marked_for_recycling(&self, id: FontId) -> bool {
        self.marked_for_recycling.contains_key(&id)
    }

    pub fn is_marked_for_restoration(&self, id: FontId) -> bool {
        self.marked_for_restoration.contains_key(&id)
    }

    /// Empty the recycling buffer, returning the staged ids
    pub fn take_recycling(&mut self) -> Vec<FontId> {
        std::mem::take(&mut self.marked_for_recycling)
            .into_keys()
            .collect()
    }

    /// Empty the restoration buffer, returning the staged ids
    pub fn take_restoration(&mut self) -> Vec<FontId> {
        std::mem::take(&mut self.marked_for_restoration)
            .into_keys()
            .collect()
    }

    pub fn clear_recycling(&mut self) -> usize {
        let cleared = self.marked_for_recycling.len();
        self.marked_for_recycling.clear();
        cleared
    }

    pub fn clear_restoration(&mut self) -> usize {
        let cleared = self.marked_for_restoration.len();
        self.marked_for_restoration.clear();
        cleared
    }

    /// Drop a font from the restoration buffer
    pub fn unmark_restoration(&mut self, id: FontId) -> bool {
        self.marked_for_restoration.remove(&id).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.marked_for_recycling.is_empty() && self.marked_for_restoration.is_empty()
    }
}

/// Category membership transitions and Recycle Bin eviction
pub struct LifecycleEngine {
    fonts: Arc<dyn FontRepository>,
    clock: Arc<dyn Clock>,
    categories: WellKnownCategories,
    retention_secs: i64,
    pending: Mutex<PendingActions>,
}

impl LifecycleEngine {
    /// Create an engine with the default 7-day retention
    pub fn new(
        fonts: Arc<dyn FontRepository>,
        clock: Arc<dyn Clock>,
        categories: WellKnownCategories,
    ) -> Self {
        Self {
            fonts,
            clock,
            categories,
            retention_secs: DEFAULT_RETENTION_SECS,
            pending: Mutex::new(PendingActions::default()),
        }
    }

    /// Override the Recycle Bin retention period
    pub fn with_retention_secs(mut self, retention_secs: i64) -> Self {
        self.retention_secs = retention_secs;
        self
    }

    pub fn categories(&self) -> WellKnownCategories {
        self.categories
    }

    pub fn retention_secs(&self) -> i64 {
        self.retention_secs
    }

    // =========================================================================
    // Pending buffers
    // =========================================================================

    /// Stage a font for recycling; no storage side effect
    pub async fn mark_for_recycling(&self, font: Font) -> bool {
        let font_id = font.id;
        let added = self.pending.lock().await.mark_for_recycling(font);
        debug!(font_id = %font_id, added, "Marked font for recycling");
        added
    }

    /// Stage a font for restoration; no storage side effect
    pub async fn mark_for_restoration(&self, font: Font) -> bool {
        let font_id = font.id;
        let added = self.pending.lock().await.mark_for_restoration(font);
        debug!(font_id = %font_id, added, "Marked font for restoration");
        added
    }

    /// Discard staged recycling without touching storage
    pub async fn dismiss_recycling(&self) -> usize {
        let cleared = self.pending.lock().await.clear_recycling();
        debug!(cleared, "Dismissed pending recycling");
        cleared
    }

    /// Discard staged restoration without touching storage
    pub async fn dismiss_restoration(&self) -> usize {
        let cleared = self.pending.lock().await.clear_restoration();
        debug!(cleared, "Dismissed pending restoration");
        cleared
    }

    /// Fonts currently staged for recycling
    pub async fn pending_recycling(&self) -> Vec<Font> {
        self.pending.lock().await.recycling()
    }

    /// Fonts currently staged for restoration
    pub async fn pending_restoration(&self) -> Vec<Font> {
        self.pending.lock().await.restoration()
    }

    // =========================================================================
    // Confirmed moves
    // =========================================================================

    /// Move every staged font still in Favorites to the Recycle Bin
    ///
    /// The buffer is emptied whether or not each move happens.
    #[instrument(skip(self))]
    pub async fn attempt_recycling(&self) -> MoveReport {
        let staged = self.pending.lock().await.take_recycling();
        let report = self
            .move_staged(
                staged,
                self.categories.favorites,
                self.categories.recycle_bin,
                Some(self.deadline()),
            )
            .await;

        info!(
            moved = report.moved.len(),
            failed = report.error.is_some(),
            "Recycling attempt finished"
        );
        report
    }

    /// Move every staged font still in the Recycle Bin back to Favorites
    ///
    /// The buffer is emptied whether or not each move happens.
    #[instrument(skip(self))]
    pub async fn attempt_restoration(&self) -> MoveReport {
        let staged = self.pending.lock().await.take_restoration();
        let report = self
            .move_staged(
                staged,
                self.categories.recycle_bin,
                self.categories.favorites,
                None,
            )
            .await;

        info!(
            moved = report.moved.len(),
            failed = report.error.is_some(),
            "Restoration attempt finished"
        );
        report
    }

    /// Move a font to the Recycle Bin with a deadline of now + retention
    ///
    /// Returns the updated font, or `None` if it no longer exists.
    pub async fn move_to_recycle_bin(&self, id: FontId) -> Result<Option<Font>> {
        let deadline = self.deadline();
        self.set_membership(id, None, self.categories.recycle_bin, Some(deadline))
            .await
    }

    /// Move a font to Favorites and clear its deadline
    ///
    /// Returns the updated font, or `None` if it no longer exists.
    pub async fn move_to_favorites(&self, id: FontId) -> Result<Option<Font>> {
        self.set_membership(id, None, self.categories.favorites, None).await
    }

    // =========================================================================
    // Permanent deletion
    // =========================================================================

    /// Delete every Recycle Bin font and clear the restoration buffer
    #[instrument(skip(self))]
    pub async fn wipe_recycle_bin(&self) -> Result<u64> {
        let deleted = self
            .fonts
            .delete_by_category(self.categories.recycle_bin)
            .await?;
        self.pending.lock().await.clear_restoration();

        info!(deleted, "Wiped Recycle Bin");
        Ok(deleted)
    }

    /// Delete one font, but only while it is in the Recycle Bin
    ///
    /// The font is also dropped from the restoration buffer. Returns whether a
    /// row was deleted.
    pub async fn delete_recycled_font(&self, id: FontId) -> Result<bool> {
        let deleted = self
            .fonts
            .delete_in_category(id, self.categories.recycle_bin)
            .await?;
        self.pending.lock().await.unmark_restoration(id);

        if deleted {
            info!(font_id = %id, "Permanently deleted recycled font");
        } else {
            debug!(font_id = %id, "Font not in Recycle Bin; nothing deleted");
        }
        Ok(deleted)
    }

    /// Evict Recycle Bin fonts whose deadline has passed
    ///
    /// Returns the ids of the evicted fonts.
    #[instrument(skip(self))]
    pub async fn delete_old_recycled_fonts(&self) -> Result<Vec<FontId>> {
        let now = self.clock.unix_timestamp();
        let evicted = self
            .fonts
            .delete_expired(self.categories.recycle_bin, now)
            .await?;

        if evicted.is_empty() {
            debug!(now, "No expired fonts in Recycle Bin");
        } else {
            info!(evicted = evicted.len(), now, "Evicted expired fonts");
        }
        Ok(evicted)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn deadline(&self) -> i64 {
        self.clock
            .unix_timestamp()
            .saturating_add(self.retention_secs)
    }

    async fn move_staged(
        &self,
        staged: Vec<FontId>,
        from: CategoryId,
        to: CategoryId,
        deletion_timestamp: Option<i64>,
    ) -> MoveReport {
        let mut report = MoveReport::default();

        for id in staged {
            match self
                .set_membership(id, Some(from), to, deletion_timestamp)
                .await
            {
                Ok(Some(font)) => report.moved.push(font),
                Ok(None) => {
                    debug!(font_id = %id, from = %from, "Staged font left its category; skipped")
                }
                Err(e) => {
                    report.error = Some(e);
                    break;
                }
            }
        }

        report
    }

    /// Move one font; with `from` set the move only happens while the font is
    /// still in that category
    async fn set_membership(
        &self,
        id: FontId,
        from: Option<CategoryId>,
        category_id: CategoryId,
        deletion_timestamp: Option<i64>,
    ) -> Result<Option<Font>> {
        let Some(font) = self.fonts.find_by_id(id).await? else {
            debug!(font_id = %id, "Font not found; move skipped");
            return Ok(None);
        };

        if from.is_some_and(|from| font.category_id != from) {
            return Ok(None);
        }

        if !self
            .fonts
            .update_membership(id, from, category_id, deletion_timestamp)
            .await?
        {
            debug!(font_id = %id, "Font moved or removed before update; skipped");
            return Ok(None);
        }

        info!(
            font_id = %id,
            from = %font.category_id,
            to = %category_id,
            deletion_timestamp = ?deletion_timestamp,
            "Moved font"
        );

        Ok(Some(Font {
            category_id,
            deletion_timestamp,
            ..font
        }))
    }
}
