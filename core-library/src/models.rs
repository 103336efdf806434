//! Domain models for the font library
//!
//! Rows map directly onto the `fonts`, `categories` and `font_images` tables
//! through `sqlx::FromRow`.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

/// Name of the category holding liked fonts
pub const FAVORITES: &str = "Favorites";

/// Name of the category holding soft-deleted fonts
pub const RECYCLE_BIN: &str = "Recycle Bin";

// =============================================================================
// ID Types
// =============================================================================

/// Storage-assigned identifier of a font
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(transparent)]
pub struct FontId(pub i64);

impl fmt::Display for FontId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Storage-assigned identifier of a category
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(transparent)]
pub struct CategoryId(pub i64);

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Domain Models
// =============================================================================

/// A stored font record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Font {
    pub id: FontId,
    /// Display title
    pub title: String,
    /// Trimmed, lower-cased title used for case-insensitive lookups
    pub normalized_title: String,
    /// Source URL; canonical identity of the recognized font
    pub url: String,
    pub category_id: CategoryId,
    /// Epoch second at which a Recycle Bin font becomes eligible for eviction
    pub deletion_timestamp: Option<i64>,
    pub created_at: i64,
}

impl Font {
    /// Whether the Recycle Bin deadline has passed at `now`
    pub fn is_expired(&self, now: i64) -> bool {
        matches!(self.deletion_timestamp, Some(deadline) if deadline <= now)
    }
}

/// A recognized font that has not been stored yet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewFont {
    pub title: String,
    pub url: String,
}

impl NewFont {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
        }
    }

    /// Normalize a title or URL for comparison
    pub fn normalize(s: &str) -> String {
        s.trim().to_lowercase()
    }

    /// Validate font data before insertion
    pub fn validate(&self) -> Result<(), String> {
        if self.url.trim().is_empty() {
            return Err("Font URL cannot be empty".to_string());
        }

        Ok(())
    }
}

/// Named grouping of fonts (Favorites, Recycle Bin, ...)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub created_at: i64,
}

/// Preview image owned by a font; deleted together with it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct FontImage {
    pub font_id: FontId,
    /// Index of the image within the font's asset list
    pub position: i64,
    pub image_url: String,
    pub image_data: Vec<u8>,
}

/// Identifiers of the well-known categories, resolved once at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WellKnownCategories {
    pub favorites: CategoryId,
    pub recycle_bin: CategoryId,
}

impl WellKnownCategories {
    pub fn is_favorites(&self, category_id: CategoryId) -> bool {
        category_id == self.favorites
    }

    pub fn is_recycle_bin(&self, category_id: CategoryId) -> bool {
        category_id == self.recycle_bin
    }
}
