//! # Repository Pattern Implementation
//!
//! Storage primitives for the font lifecycle core.
//!
//! ## Architecture
//!
//! - Traits define the interface for each repository
//! - SQLite implementations use sqlx for async database access
//! - All operations return `Result<T>`; storage failures propagate unchanged
//!
//! ## Available Repositories
//!
//! - `FontRepository` - Font records, replace-by-URL insertion, membership moves
//! - `CategoryRepository` - Case-insensitive, race-free category creation
//! - `FontImageRepository` - Read access to preview images

pub mod category;
pub mod font;
pub mod image;

pub use category::{CategoryRepository, SqliteCategoryRepository};
pub use font::{FontRepository, SqliteFontRepository};
pub use image::{FontImageRepository, SqliteFontImageRepository};
