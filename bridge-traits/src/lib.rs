//! # Host Bridge Traits
//!
//! Capabilities the font lifecycle core needs from its host but does not own.
//!
//! ## Traits
//!
//! - [`Clock`](time::Clock) - Epoch-seconds time source. Deletion deadlines and
//!   the eviction sweep are computed against it, so tests inject a
//!   [`ManualClock`](time::ManualClock) instead of waiting a week.
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to the host
//!   logging pipeline (Logcat, OSLog, console).
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! should convert platform-specific failures into it with an actionable message.
//!
//! ## Thread Safety
//!
//! Every bridge trait requires `Send + Sync` so a single instance can be shared
//! between the lifecycle engine, the service façade and the background sweeper.

pub mod error;
pub mod time;

pub use error::BridgeError;

pub use time::{Clock, ConsoleLogger, LogEntry, LogLevel, LoggerSink, ManualClock, SystemClock};
