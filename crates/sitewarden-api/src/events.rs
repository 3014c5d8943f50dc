//! Browser event types (extension -> service)

use serde::{Deserialize, Serialize};
use sitewarden_util::{TabId, WindowId};

/// Tab and navigation events forwarded by the extension.
///
/// These mirror the browser's own event surface closely; the service treats
/// them as hints and re-queries tab state where the browser is authoritative.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BrowserEvent {
    /// A different tab became active in some window
    TabActivated {
        tab_id: TabId,
        window_id: Option<WindowId>,
    },

    /// A tab finished loading a new URL
    TabUpdated {
        tab_id: TabId,
        url: Option<String>,
        active: bool,
    },

    /// A tab was closed
    TabRemoved { tab_id: TabId },

    /// Window focus moved; `None` means the browser lost focus entirely
    WindowFocusChanged { window_id: Option<WindowId> },

    /// A navigation is about to commit in a tab
    BeforeNavigate {
        tab_id: TabId,
        /// 0 for the main frame; sub-frames are ignored
        frame_id: i64,
        url: String,
    },
}
