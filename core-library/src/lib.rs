//! # Font Library Module
//!
//! Owns the font library database and the rules that move fonts between
//! Favorites and the Recycle Bin.
//!
//! ## Overview
//!
//! This module manages:
//! - SQLite database schema and migrations
//! - Repository patterns for fonts, categories and preview images
//! - Font comparison and the ingestion-time "liked" decision
//! - Recycle Bin scheduling, pending confirmations and timed eviction
//!
//! ## Components
//!
//! - [`comparator`] - Pure classification of two fonts
//! - [`categories::CategoryRegistry`] - Resolves well-known categories
//! - [`lifecycle::LifecycleEngine`] - Membership moves and eviction
//! - [`ingestion::IngestionPolicy`] - Replace-by-URL insertion

pub mod categories;
pub mod comparator;
pub mod db;
pub mod error;
pub mod ingestion;
pub mod lifecycle;
pub mod models;
pub mod repositories;

pub use categories::CategoryRegistry;
pub use comparator::{compare, FontKey, Relationship};
pub use error::{LibraryError, Result};
pub use ingestion::{IngestOutcome, IngestionPolicy};
pub use lifecycle::{LifecycleEngine, MoveReport, PendingActions, DEFAULT_RETENTION_SECS};
pub use models::{Category, CategoryId, Font, FontId, FontImage, NewFont, WellKnownCategories};
