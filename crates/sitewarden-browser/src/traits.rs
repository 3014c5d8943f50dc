//! Browser adapter traits

use async_trait::async_trait;
use sitewarden_api::{BrowserEvent, TabInfo};
use sitewarden_util::{TabId, WindowId};
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors from browser adapter operations
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("Tab not found: {0}")]
    TabNotFound(TabId),

    #[error("Bridge closed")]
    Closed,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type BrowserResult<T> = Result<T, BrowserError>;

/// Browser adapter trait - the service's only view of the browser.
///
/// Tab state is queried rather than cached: the browser is authoritative
/// and tabs disappear at any time, so every lookup can fail with
/// [`BrowserError::TabNotFound`].
#[async_trait]
pub trait BrowserAdapter: Send + Sync {
    /// Look up a tab by ID
    async fn get_tab(&self, tab_id: TabId) -> BrowserResult<TabInfo>;

    /// The active tab, optionally constrained to one window.
    /// `None` when no window has an active tab (browser minimized, etc.)
    async fn active_tab(&self, window_id: Option<WindowId>) -> BrowserResult<Option<TabInfo>>;

    /// Navigate a tab to the given URL
    async fn redirect(&self, tab_id: TabId, url: &str) -> BrowserResult<()>;

    /// Open the extension's options page
    async fn open_management_page(&self) -> BrowserResult<()>;

    /// Subscribe to browser events. Can only be called once.
    fn subscribe(&self) -> mpsc::UnboundedReceiver<BrowserEvent>;

    /// Optional: check if the adapter is healthy
    fn is_healthy(&self) -> bool {
        true
    }
}
