//! Stdio bridge implementation
//!
//! The extension side launches this process as a native-messaging host and
//! exchanges one JSON object per line: [`BridgeInbound`] on stdin,
//! [`BridgeOutbound`] on stdout. Tab lookups are request/response pairs
//! correlated by `query_id`; everything else is fire-and-forget.

use async_trait::async_trait;
use sitewarden_api::{BridgeInbound, BridgeOutbound, BrowserEvent, Request, Response, TabInfo};
use sitewarden_util::{TabId, WindowId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::{BrowserAdapter, BrowserError, BrowserResult};

/// How long to wait for the extension to answer a tab query
const QUERY_TIMEOUT: Duration = Duration::from_secs(2);

/// Newline-delimited JSON bridge to the extension
pub struct StdioBridge {
    out_tx: mpsc::UnboundedSender<BridgeOutbound>,
    out_rx: Mutex<Option<mpsc::UnboundedReceiver<BridgeOutbound>>>,

    event_tx: mpsc::UnboundedSender<BrowserEvent>,
    event_rx: Mutex<Option<mpsc::UnboundedReceiver<BrowserEvent>>>,

    request_tx: mpsc::UnboundedSender<Request>,
    request_rx: Mutex<Option<mpsc::UnboundedReceiver<Request>>>,

    pending: Arc<Mutex<HashMap<u64, oneshot::Sender<Option<TabInfo>>>>>,
    next_query_id: AtomicU64,
}

impl StdioBridge {
    pub fn new() -> Self {
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (request_tx, request_rx) = mpsc::unbounded_channel();

        Self {
            out_tx,
            out_rx: Mutex::new(Some(out_rx)),
            event_tx,
            event_rx: Mutex::new(Some(event_rx)),
            request_tx,
            request_rx: Mutex::new(Some(request_rx)),
            pending: Arc::new(Mutex::new(HashMap::new())),
            next_query_id: AtomicU64::new(1),
        }
    }

    /// Drive the bridge over the given transport. Can only be called once.
    ///
    /// Spawns a reader and a writer task; both finish when the transport
    /// closes. In production the transport is stdin/stdout; tests hand in
    /// a duplex pipe.
    pub fn run<R, W>(&self, reader: R, writer: W) -> BrowserResult<(JoinHandle<()>, JoinHandle<()>)>
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let mut out_rx = self
            .out_rx
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| BrowserError::Transport("Bridge already running".into()))?;

        let event_tx = self.event_tx.clone();
        let request_tx = self.request_tx.clone();
        let pending = self.pending.clone();

        let reader_handle = tokio::spawn(async move {
            let mut reader = BufReader::new(reader);
            let mut line = String::new();

            loop {
                line.clear();
                match reader.read_line(&mut line).await {
                    Ok(0) => {
                        debug!("Bridge closed (EOF)");
                        break;
                    }
                    Ok(_) => {
                        let line = line.trim();
                        if line.is_empty() {
                            continue;
                        }

                        match serde_json::from_str::<BridgeInbound>(line) {
                            Ok(BridgeInbound::Event { event }) => {
                                let _ = event_tx.send(event);
                            }
                            Ok(BridgeInbound::Request(request)) => {
                                let _ = request_tx.send(request);
                            }
                            Ok(BridgeInbound::TabReply { query_id, tab }) => {
                                let sender = pending.lock().unwrap().remove(&query_id);
                                match sender {
                                    Some(tx) => {
                                        let _ = tx.send(tab);
                                    }
                                    None => {
                                        debug!(query_id, "Reply for expired tab query");
                                    }
                                }
                            }
                            Err(e) => {
                                warn!(error = %e, "Invalid bridge message");
                            }
                        }
                    }
                    Err(e) => {
                        debug!(error = %e, "Bridge read error");
                        break;
                    }
                }
            }
        });

        let writer_handle = tokio::spawn(async move {
            let mut writer = writer;

            while let Some(msg) = out_rx.recv().await {
                let mut json = match serde_json::to_string(&msg) {
                    Ok(json) => json,
                    Err(e) => {
                        warn!(error = %e, "Failed to encode bridge message");
                        continue;
                    }
                };
                json.push('\n');

                if let Err(e) = writer.write_all(json.as_bytes()).await {
                    debug!(error = %e, "Bridge write error");
                    break;
                }
            }
        });

        Ok((reader_handle, writer_handle))
    }

    /// Receiver for management requests. Can only be taken once.
    pub fn take_request_receiver(&self) -> Option<mpsc::UnboundedReceiver<Request>> {
        self.request_rx.lock().unwrap().take()
    }

    /// Send a response to a management request
    pub fn send_response(&self, response: Response) -> BrowserResult<()> {
        self.out_tx
            .send(BridgeOutbound::Response(response))
            .map_err(|_| BrowserError::Closed)
    }

    async fn query_tab(
        &self,
        query_id: u64,
        msg: BridgeOutbound,
    ) -> BrowserResult<Option<TabInfo>> {
        let (tx, rx) = oneshot::channel();
        self.pending.lock().unwrap().insert(query_id, tx);

        if self.out_tx.send(msg).is_err() {
            self.pending.lock().unwrap().remove(&query_id);
            return Err(BrowserError::Closed);
        }

        match tokio::time::timeout(QUERY_TIMEOUT, rx).await {
            Ok(Ok(tab)) => Ok(tab),
            Ok(Err(_)) => Err(BrowserError::Closed),
            Err(_) => {
                self.pending.lock().unwrap().remove(&query_id);
                Err(BrowserError::Transport("Tab query timed out".into()))
            }
        }
    }

    fn next_query_id(&self) -> u64 {
        self.next_query_id.fetch_add(1, Ordering::SeqCst)
    }
}

impl Default for StdioBridge {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BrowserAdapter for StdioBridge {
    async fn get_tab(&self, tab_id: TabId) -> BrowserResult<TabInfo> {
        let query_id = self.next_query_id();
        let tab = self
            .query_tab(query_id, BridgeOutbound::GetTab { query_id, tab_id })
            .await?;
        tab.ok_or(BrowserError::TabNotFound(tab_id))
    }

    async fn active_tab(&self, window_id: Option<WindowId>) -> BrowserResult<Option<TabInfo>> {
        let query_id = self.next_query_id();
        self.query_tab(
            query_id,
            BridgeOutbound::GetActiveTab {
                query_id,
                window_id,
            },
        )
        .await
    }

    async fn redirect(&self, tab_id: TabId, url: &str) -> BrowserResult<()> {
        self.out_tx
            .send(BridgeOutbound::Redirect {
                tab_id,
                url: url.to_string(),
            })
            .map_err(|_| BrowserError::Closed)
    }

    async fn open_management_page(&self) -> BrowserResult<()> {
        self.out_tx
            .send(BridgeOutbound::OpenManagementPage)
            .map_err(|_| BrowserError::Closed)
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<BrowserEvent> {
        self.event_rx
            .lock()
            .unwrap()
            .take()
            .expect("subscribe() can only be called once")
    }
}
