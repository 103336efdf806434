//! Workspace umbrella crate.
//!
//! Host applications can depend on `fontkeep-workspace` alone and reach the
//! font lifecycle core through the re-exports below instead of wiring each
//! workspace crate individually.

pub use bridge_traits;
pub use core_library;
pub use core_runtime;
pub use core_service;

pub use core_service::{CoreError, FontService, Result};
