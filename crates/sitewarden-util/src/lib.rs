//! Shared utilities for sitewardend
//!
//! This crate provides:
//! - ID types (TabId, WindowId, SessionId)
//! - Time utilities (monotonic time, local date stamps)
//! - Default paths for config and data directories

mod ids;
mod paths;
mod time;

pub use ids::*;
pub use paths::*;
pub use time::*;
