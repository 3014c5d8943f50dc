//! Core tracking and enforcement logic for sitewardend
//!
//! Pure decision-making over the store: no browser I/O happens here. The
//! engine consumes tab events and clock readings, mutates the tracker
//! state machine, and emits [`CoreEvent`]s the daemon turns into redirects
//! and tick scheduling.

mod engine;
mod events;
mod gate;
mod interstitial;
mod reset;
mod tracker;

pub use engine::*;
pub use events::*;
pub use gate::*;
pub use interstitial::*;
pub use reset::*;
pub use tracker::*;
