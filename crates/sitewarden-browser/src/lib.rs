//! Browser adapter boundary for sitewardend
//!
//! The service never talks to a browser directly; it goes through the
//! [`BrowserAdapter`] trait. Two implementations live here:
//! - [`StdioBridge`], the production transport speaking newline-delimited
//!   JSON with the extension's native-messaging host
//! - [`MockBrowser`], an in-memory fake for tests

mod bridge;
mod mock;
mod traits;

pub use bridge::*;
pub use mock::*;
pub use traits::*;
