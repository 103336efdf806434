//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the font lifecycle core:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Event bus system
//!
//! ## Overview
//!
//! This crate contains the runtime utilities that the library and service
//! layers depend on. It establishes the logging conventions, the validated
//! configuration and the event broadcasting used throughout the system.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
