//! # Core Configuration Module
//!
//! Provides configuration management for the font lifecycle core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! instance holding the storage location, the Recycle Bin retention policy and
//! the injected time source. Validation is fail-fast: `build()` rejects any
//! combination the lifecycle engine could not honor.
//!
//! ## Usage
//!
//! ```
//! use core_runtime::config::CoreConfig;
//! use std::time::Duration;
//!
//! let config = CoreConfig::builder()
//!     .database_path("/path/to/fonts.db")
//!     .retention_period(Duration::from_secs(3 * 24 * 60 * 60))
//!     .build()
//!     .expect("valid config");
//!
//! assert_eq!(config.retention_secs(), 259_200);
//! ```
//!
//! ## Error Handling
//!
//! ```should_panic
//! use core_runtime::config::CoreConfig;
//!
//! // No database location configured
//! let config = CoreConfig::builder()
//!     .build()
//!     .expect("Should fail - missing database location");
//! ```

use crate::error::{Error, Result};
use bridge_traits::time::{Clock, SystemClock};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Recycle Bin retention when none is configured: 7 days
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Eviction sweep interval when none is configured: 24 hours
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Default capacity of the event broadcast channel
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

/// Where the font database lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseLocation {
    /// SQLite file on disk
    File(PathBuf),
    /// Private in-memory database, discarded on shutdown
    InMemory,
}

/// Core configuration for the font lifecycle core.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    pub database: DatabaseLocation,

    /// Upper bound on pooled connections (ignored for in-memory databases)
    pub max_connections: u32,

    /// How long a font stays in the Recycle Bin before eviction
    pub retention_period: Duration,

    /// Period of the background eviction sweep
    pub sweep_interval: Duration,

    /// Capacity of the event broadcast channel
    pub event_buffer_size: usize,

    /// Time source for deadlines and creation timestamps
    pub clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("database", &self.database)
            .field("max_connections", &self.max_connections)
            .field("retention_period", &self.retention_period)
            .field("sweep_interval", &self.sweep_interval)
            .field("event_buffer_size", &self.event_buffer_size)
            .field("clock", &"Clock { ... }")
            .finish()
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Retention period in whole seconds
    pub fn retention_secs(&self) -> i64 {
        i64::try_from(self.retention_period.as_secs()).unwrap_or(i64::MAX)
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Database path is not empty
    /// - Retention period is at least one second
    /// - Sweep interval is non-zero and shorter than the retention period
    /// - Event buffer size and connection limit are non-zero
    pub fn validate(&self) -> Result<()> {
        if let DatabaseLocation::File(path) = &self.database {
            if path.as_os_str().is_empty() {
                return Err(Error::Config("Database path cannot be empty".to_string()));
            }
        }

        if self.retention_period.as_secs() == 0 {
            return Err(Error::Config(
                "Retention period must be at least one second".to_string(),
            ));
        }

        if self.sweep_interval.is_zero() {
            return Err(Error::Config(
                "Sweep interval must be greater than zero".to_string(),
            ));
        }

        if self.sweep_interval >= self.retention_period {
            return Err(Error::Config(format!(
                "Sweep interval ({:?}) must be shorter than the retention period ({:?}) \
                 so expired fonts are evicted on time",
                self.sweep_interval, self.retention_period
            )));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        if self.max_connections == 0 {
            return Err(Error::Config(
                "Connection pool needs at least one connection".to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder for constructing [`CoreConfig`] instances.
///
/// Call [`build()`](CoreConfigBuilder::build) to validate and create the
/// final config.
#[derive(Default)]
pub struct CoreConfigBuilder {
    database: Option<DatabaseLocation>,
    max_connections: Option<u32>,
    retention_period: Option<Duration>,
    sweep_interval: Option<Duration>,
    event_buffer_size: Option<usize>,
    clock: Option<Arc<dyn Clock>>,
}

impl CoreConfigBuilder {
    /// Sets the database path.
    ///
    /// # Examples
    ///
    /// ```
    /// use core_runtime::config::CoreConfig;
    ///
    /// let builder = CoreConfig::builder()
    ///     .database_path("/path/to/fonts.db");
    /// ```
    pub fn database_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.database = Some(DatabaseLocation::File(path.into()));
        self
    }

    /// Use a private in-memory database.
    pub fn in_memory(mut self) -> Self {
        self.database = Some(DatabaseLocation::InMemory);
        self
    }

    /// Sets the maximum number of pooled connections.
    ///
    /// Default: 5
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = Some(max);
        self
    }

    /// Sets how long fonts stay in the Recycle Bin.
    ///
    /// Default: 7 days. Sub-second precision is discarded.
    pub fn retention_period(mut self, period: Duration) -> Self {
        self.retention_period = Some(period);
        self
    }

    /// Sets how often the background sweep evicts expired fonts.
    ///
    /// Default: 24 hours
    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = Some(interval);
        self
    }

    /// Sets the capacity of the event broadcast channel.
    ///
    /// Default: 100
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Sets the time source.
    ///
    /// Default: [`SystemClock`]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if no database location was set or if
    /// [`CoreConfig::validate`] fails.
    pub fn build(self) -> Result<CoreConfig> {
        let database = self.database.ok_or_else(|| {
            Error::Config(
                "Database location is required. Call database_path() or in_memory() \
                 before build()."
                    .to_string(),
            )
        })?;

        let config = CoreConfig {
            database,
            max_connections: self.max_connections.unwrap_or(5),
            retention_period: self.retention_period.unwrap_or(DEFAULT_RETENTION),
            sweep_interval: self.sweep_interval.unwrap_or(DEFAULT_SWEEP_INTERVAL),
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
        };

        config.validate()?;

        Ok(config)
    }
}
