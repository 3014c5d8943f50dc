//! Protocol types for the sitewardend bridge
//!
//! This crate defines the stable API between sitewardend and the browser
//! extension it is paired with:
//! - Domains and tab descriptions
//! - Browser events (extension -> service)
//! - Management commands and responses
//! - The bridge wire envelopes
//! - Versioning

mod commands;
mod events;
mod types;
mod wire;

pub use commands::*;
pub use events::*;
pub use types::*;
pub use wire::*;

/// Current API version
pub const API_VERSION: u32 = 1;
