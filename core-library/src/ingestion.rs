//! # Ingestion Policy
//!
//! Decides whether a newly recognized font starts liked and stores it with
//! its preview images.
//!
//! The liked decision looks up existing fonts by title only, while the
//! comparison itself also considers the URL. Every inserted font lands in
//! Favorites whatever the liked decision says.

use crate::comparator::{compare, FontKey, Relationship};
use crate::error::{LibraryError, Result};
use crate::lifecycle::LifecycleEngine;
use crate::models::{Font, NewFont};
use crate::repositories::FontRepository;
use bridge_traits::time::Clock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Result of a full ingestion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestOutcome {
    /// The stored font
    pub font: Font,
    /// Whether the font should be presented as liked
    pub liked: bool,
}

pub struct IngestionPolicy {
    fonts: Arc<dyn FontRepository>,
    lifecycle: Arc<LifecycleEngine>,
    clock: Arc<dyn Clock>,
}

impl IngestionPolicy {
    pub fn new(
        fonts: Arc<dyn FontRepository>,
        lifecycle: Arc<LifecycleEngine>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            fonts,
            lifecycle,
            clock,
        }
    }

    /// Decide, before insertion, whether `new_font` starts liked
    ///
    /// When the new font supersedes a Favorites font with the same title, the
    /// existing font is staged for recycling.
    #[instrument(skip(self, new_font), fields(title = %new_font.title))]
    pub async fn should_start_liked(&self, new_font: &NewFont) -> Result<bool> {
        let Some(existing) = self.fonts.find_by_title(&new_font.title).await? else {
            debug!("No font with this title; starts unliked");
            return Ok(false);
        };

        let categories = self.lifecycle.categories();
        let relationship = compare(
            FontKey::incoming(new_font, categories.favorites),
            FontKey::from(&existing),
            categories.recycle_bin,
        );
        let existing_is_favorite = categories.is_favorites(existing.category_id);

        let liked = match relationship {
            Relationship::SameTitleDifferentUrl => {
                if existing_is_favorite {
                    self.lifecycle.mark_for_recycling(existing.clone()).await;
                }
                true
            }
            Relationship::DifferentTitleSameUrl => true,
            Relationship::IdenticalSameCategory => {
                if existing_is_favorite {
                    self.lifecycle.mark_for_recycling(existing.clone()).await;
                }
                existing_is_favorite
            }
            Relationship::IdenticalOneInRecycleBin | Relationship::NoMatch => false,
        };

        debug!(existing_id = %existing.id, ?relationship, liked, "Liked decision");
        Ok(liked)
    }

    /// Alias of [`should_start_liked`](Self::should_start_liked)
    pub async fn font_before_insertion(&self, new_font: &NewFont) -> Result<bool> {
        self.should_start_liked(new_font).await
    }

    /// Store a font in Favorites together with its preview images
    ///
    /// Any font with the exact same URL is replaced. `image_urls[i]` is
    /// paired with `image_blobs[i]`.
    ///
    /// # Errors
    /// - [`LibraryError::AssetCountMismatch`] if the lists differ in length;
    ///   nothing is written
    /// - Storage errors, in which case nothing is written either
    #[instrument(skip_all, fields(url = %new_font.url))]
    pub async fn insert_font_with_assets(
        &self,
        new_font: &NewFont,
        image_urls: &[String],
        image_blobs: &[Vec<u8>],
    ) -> Result<Font> {
        check_asset_counts(image_urls, image_blobs)?;

        let images: Vec<(String, Vec<u8>)> = image_urls
            .iter()
            .cloned()
            .zip(image_blobs.iter().cloned())
            .collect();

        let font = self
            .fonts
            .replace_with_assets(
                new_font,
                self.lifecycle.categories().favorites,
                self.clock.unix_timestamp(),
                &images,
            )
            .await?;

        info!(font_id = %font.id, title = %font.title, images = images.len(), "Inserted font");
        Ok(font)
    }

    /// Stage Recycle Bin twins of a just-inserted font for restoration
    ///
    /// A Recycle Bin font is a twin when it compares identical to `font`
    /// placed in the Recycle Bin. Returns how many fonts were staged.
    pub async fn handle_identical_in_recycle_bin(&self, font: &Font) -> Result<usize> {
        let recycle_bin = self.lifecycle.categories().recycle_bin;
        let candidate = FontKey::new(&font.title, &font.url, recycle_bin);

        let mut staged = 0;
        for existing in self
            .fonts
            .find_by_title_in_category(&font.title, recycle_bin)
            .await?
        {
            if existing.id == font.id {
                continue;
            }

            match compare(candidate, FontKey::from(&existing), recycle_bin) {
                Relationship::IdenticalSameCategory => {
                    debug!(existing_id = %existing.id, "Identical font in Recycle Bin");
                    if self.lifecycle.mark_for_restoration(existing).await {
                        staged += 1;
                    }
                }
                Relationship::IdenticalOneInRecycleBin
                | Relationship::SameTitleDifferentUrl
                | Relationship::DifferentTitleSameUrl
                | Relationship::NoMatch => {}
            }
        }

        Ok(staged)
    }

    /// Decide liked, insert, then check the Recycle Bin for twins
    pub async fn ingest(
        &self,
        new_font: &NewFont,
        image_urls: &[String],
        image_blobs: &[Vec<u8>],
    ) -> Result<IngestOutcome> {
        check_asset_counts(image_urls, image_blobs)?;

        let liked = self.should_start_liked(new_font).await?;
        let font = self
            .insert_font_with_assets(new_font, image_urls, image_blobs)
            .await?;
        self.handle_identical_in_recycle_bin(&font).await?;

        Ok(IngestOutcome { font, liked })
    }
}

fn check_asset_counts(image_urls: &[String], image_blobs: &[Vec<u8>]) -> Result<()> {
    if image_urls.len() != image_blobs.len() {
        return Err(LibraryError::AssetCountMismatch {
            urls: image_urls.len(),
            blobs: image_blobs.len(),
        });
    }
    Ok(())
}
