//! Mock browser adapter for testing

use async_trait::async_trait;
use sitewarden_api::{BrowserEvent, TabInfo};
use sitewarden_util::{TabId, WindowId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

use crate::{BrowserAdapter, BrowserError, BrowserResult};

/// Mock browser adapter for unit/integration testing
pub struct MockBrowser {
    tabs: Arc<Mutex<HashMap<TabId, TabInfo>>>,
    redirects: Arc<Mutex<Vec<(TabId, String)>>>,
    management_opens: Arc<Mutex<usize>>,
    event_tx: mpsc::UnboundedSender<BrowserEvent>,
    event_rx: Arc<Mutex<Option<mpsc::UnboundedReceiver<BrowserEvent>>>>,

    /// Configure tab lookups to fail (simulates a crashed bridge)
    pub fail_get_tab: Arc<Mutex<bool>>,
}

impl MockBrowser {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();

        Self {
            tabs: Arc::new(Mutex::new(HashMap::new())),
            redirects: Arc::new(Mutex::new(Vec::new())),
            management_opens: Arc::new(Mutex::new(0)),
            event_tx: tx,
            event_rx: Arc::new(Mutex::new(Some(rx))),
            fail_get_tab: Arc::new(Mutex::new(false)),
        }
    }

    /// Add or replace a tab
    pub fn insert_tab(&self, tab: TabInfo) {
        self.tabs.lock().unwrap().insert(tab.id, tab);
    }

    /// Remove a tab (as if the user closed it)
    pub fn remove_tab(&self, tab_id: TabId) {
        self.tabs.lock().unwrap().remove(&tab_id);
    }

    /// Emit a browser event to the subscriber
    pub fn emit(&self, event: BrowserEvent) {
        let _ = self.event_tx.send(event);
    }

    /// Redirects performed so far, oldest first
    pub fn redirects(&self) -> Vec<(TabId, String)> {
        self.redirects.lock().unwrap().clone()
    }

    /// How many times the management page was opened
    pub fn management_opens(&self) -> usize {
        *self.management_opens.lock().unwrap()
    }
}

impl Default for MockBrowser {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BrowserAdapter for MockBrowser {
    async fn get_tab(&self, tab_id: TabId) -> BrowserResult<TabInfo> {
        if *self.fail_get_tab.lock().unwrap() {
            return Err(BrowserError::Transport("Mock lookup failure".into()));
        }

        self.tabs
            .lock()
            .unwrap()
            .get(&tab_id)
            .cloned()
            .ok_or(BrowserError::TabNotFound(tab_id))
    }

    async fn active_tab(&self, window_id: Option<WindowId>) -> BrowserResult<Option<TabInfo>> {
        if *self.fail_get_tab.lock().unwrap() {
            return Err(BrowserError::Transport("Mock lookup failure".into()));
        }

        let tabs = self.tabs.lock().unwrap();
        Ok(tabs
            .values()
            .find(|t| t.active && (window_id.is_none() || t.window_id == window_id))
            .cloned())
    }

    async fn redirect(&self, tab_id: TabId, url: &str) -> BrowserResult<()> {
        let mut tabs = self.tabs.lock().unwrap();
        match tabs.get_mut(&tab_id) {
            Some(tab) => {
                tab.url = Some(url.to_string());
                self.redirects
                    .lock()
                    .unwrap()
                    .push((tab_id, url.to_string()));
                Ok(())
            }
            None => Err(BrowserError::TabNotFound(tab_id)),
        }
    }

    async fn open_management_page(&self) -> BrowserResult<()> {
        *self.management_opens.lock().unwrap() += 1;
        Ok(())
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<BrowserEvent> {
        self.event_rx
            .lock()
            .unwrap()
            .take()
            .expect("subscribe() can only be called once")
    }
}
