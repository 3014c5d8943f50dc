//! Wire envelopes for the stdio bridge
//!
//! One JSON object per line in each direction. Inbound lines carry browser
//! events, management requests, and replies to tab queries; outbound lines
//! carry actions the extension should perform plus management responses.

use serde::{Deserialize, Serialize};
use sitewarden_util::{TabId, WindowId};

use crate::{BrowserEvent, Request, Response, TabInfo};

/// Messages from the extension to the service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BridgeInbound {
    /// A browser event the extension observed
    Event { event: BrowserEvent },

    /// A management command from the options/popup UI
    Request(Request),

    /// Reply to an outbound `GetTab`/`GetActiveTab` query.
    /// `tab` is `None` when the tab no longer exists.
    TabReply {
        query_id: u64,
        tab: Option<TabInfo>,
    },
}

/// Messages from the service to the extension
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BridgeOutbound {
    /// Response to a management request
    Response(Response),

    /// Navigate a tab to the given URL (used for interstitial redirects)
    Redirect { tab_id: TabId, url: String },

    /// Open the extension's options page
    OpenManagementPage,

    /// Look up a tab by ID; the extension answers with `TabReply`
    GetTab { query_id: u64, tab_id: TabId },

    /// Look up the active tab, optionally in a specific window
    GetActiveTab {
        query_id: u64,
        window_id: Option<WindowId>,
    },
}
