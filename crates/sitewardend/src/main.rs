//! sitewardend - The site warden background service
//!
//! Native-messaging host for the companion browser extension. It wires
//! together:
//! - Configuration loading
//! - Store initialization
//! - The tracker engine
//! - The stdio bridge to the extension

use anyhow::{Context, Result};
use clap::Parser;
use sitewarden_api::{
    BrowserEvent, Command, ErrorCode, ErrorInfo, Request, Response, ResponsePayload, TabInfo,
    API_VERSION,
};
use sitewarden_browser::{BrowserAdapter, StdioBridge};
use sitewarden_core::{interstitial_url, CoreEvent, ManagementError, TrackerEngine};
use sitewarden_policy::{load_settings_or_default, InputError, Settings};
use sitewarden_store::{AuditEvent, AuditEventType, SqliteStore, Store};
use sitewarden_util::{default_config_path, MonotonicInstant, WindowId};
use sitewarden_util::SITEWARDEN_DATA_DIR_ENV;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// sitewardend - Site time tracking and blocking service
#[derive(Parser, Debug)]
#[command(name = "sitewardend")]
#[command(about = "Site time tracking and blocking service", long_about = None)]
struct Args {
    /// Configuration file path (default: ~/.config/sitewarden/config.toml)
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Data directory override (or set SITEWARDEN_DATA_DIR env var)
    #[arg(short, long, env = SITEWARDEN_DATA_DIR_ENV)]
    data_dir: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

/// Cancellable periodic flush tick.
///
/// A task is spawned when tracking starts and aborted when it stops, so
/// the timer never outlives the session it belongs to. A tick already
/// queued when the task is aborted may still be drained; the engine
/// ignores ticks while idle.
struct TickScheduler {
    tx: mpsc::UnboundedSender<()>,
    task: Option<JoinHandle<()>>,
}

impl TickScheduler {
    fn new() -> (Self, mpsc::UnboundedReceiver<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx, task: None }, rx)
    }

    /// (Re)start the tick. Any previous task is aborted first.
    fn start(&mut self, period: Duration) {
        self.stop();

        let tx = self.tx.clone();
        self.task = Some(tokio::spawn(async move {
            let mut timer = tokio::time::interval(period);
            // The first tick of a fresh interval fires immediately
            timer.tick().await;
            loop {
                timer.tick().await;
                if tx.send(()).is_err() {
                    break;
                }
            }
        }));
    }

    fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Main service state
struct Service {
    engine: TrackerEngine,
    browser: Arc<StdioBridge>,
    store: Arc<dyn Store>,
    settings: Settings,
    ticks: TickScheduler,
    tick_rx: Option<mpsc::UnboundedReceiver<()>>,
}

impl Service {
    fn new(args: &Args) -> Result<Self> {
        // Load configuration
        let settings = load_settings_or_default(&args.config)
            .with_context(|| format!("Failed to load config from {:?}", args.config))?;

        info!(
            config_path = %args.config.display(),
            tick_secs = settings.tick_interval.as_secs(),
            "Configuration loaded"
        );

        let data_dir = args.data_dir.clone().unwrap_or_else(|| settings.data_dir.clone());

        // Create data directory
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory {:?}", data_dir))?;

        // Initialize store
        let db_path = data_dir.join("sitewardend.db");
        let store: Arc<dyn Store> = Arc::new(
            SqliteStore::open(&db_path)
                .with_context(|| format!("Failed to open database {:?}", db_path))?,
        );

        info!(db_path = %db_path.display(), "Store initialized");

        // Log service start
        store.append_audit(AuditEvent::new(AuditEventType::ServiceStarted))?;

        let engine = TrackerEngine::new(store.clone());
        let browser = Arc::new(StdioBridge::new());
        let (ticks, tick_rx) = TickScheduler::new();

        Ok(Self {
            engine,
            browser,
            store,
            settings,
            ticks,
            tick_rx: Some(tick_rx),
        })
    }

    async fn run(mut self) -> Result<()> {
        // Drive the bridge over stdin/stdout (we are a native-messaging host)
        let _bridge_tasks = self
            .browser
            .run(tokio::io::stdin(), tokio::io::stdout())
            .context("Failed to start bridge")?;

        let mut browser_events = self.browser.subscribe();
        let mut requests = self
            .browser
            .take_request_receiver()
            .context("Request receiver should be available")?;

        // Set up signal handlers
        let mut sigterm =
            signal(SignalKind::terminate()).context("Failed to create SIGTERM handler")?;
        let mut sigint =
            signal(SignalKind::interrupt()).context("Failed to create SIGINT handler")?;

        // Catch up on a missed daily reset before processing anything
        let startup_events = self.engine.startup(sitewarden_util::now());
        self.apply_core_events(startup_events).await;

        // The flush tick only runs while a session is tracked; the
        // scheduler task is spawned and aborted from apply_core_events.
        let mut tick_rx = self
            .tick_rx
            .take()
            .context("Tick receiver should be available")?;

        // Slow backstop for the daily reset so an idle browser still
        // rolls over at midnight
        let mut reset_timer = tokio::time::interval(self.settings.reset_check_interval);

        info!("Service running");

        loop {
            tokio::select! {
                // Signal: SIGTERM or SIGINT - graceful shutdown
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down gracefully");
                    break;
                }
                _ = sigint.recv() => {
                    info!("Received SIGINT, shutting down gracefully");
                    break;
                }

                // Flush tick - flush usage and enforce limits. A tick
                // that was already queued when tracking stopped is a
                // no-op in the engine.
                Some(_) = tick_rx.recv() => {
                    let events = self.engine.tick(MonotonicInstant::now());
                    self.apply_core_events(events).await;
                }

                // Daily reset backstop
                _ = reset_timer.tick() => {
                    let events = self.engine.check_daily_reset(sitewarden_util::now());
                    self.apply_core_events(events).await;
                }

                // Browser events from the extension
                event = browser_events.recv() => {
                    match event {
                        Some(event) => self.handle_browser_event(event).await,
                        None => {
                            // The extension went away; a native-messaging
                            // host exits with its browser
                            info!("Bridge closed, shutting down");
                            break;
                        }
                    }
                }

                // Management requests from the options/popup UI
                Some(request) = requests.recv() => {
                    self.handle_request(request).await;
                }
            }
        }

        // Graceful shutdown: stop the tick and flush whatever is in flight
        self.ticks.stop();
        let events = self.engine.handle_focus_lost(MonotonicInstant::now());
        self.apply_core_events(events).await;

        if let Err(e) = self
            .store
            .append_audit(AuditEvent::new(AuditEventType::ServiceStopped))
        {
            warn!(error = %e, "Failed to log service shutdown");
        }

        info!("Shutdown complete");
        Ok(())
    }

    async fn handle_browser_event(&mut self, event: BrowserEvent) {
        let now = sitewarden_util::now();
        let now_mono = MonotonicInstant::now();

        let events = match event {
            BrowserEvent::TabActivated { tab_id, .. } => {
                match self.browser.get_tab(tab_id).await {
                    Ok(tab) => self.engine.handle_tab_focused(&tab, now, now_mono),
                    Err(e) => {
                        debug!(tab_id = %tab_id, error = %e, "Activated tab lookup failed");
                        self.engine.handle_focus_lost(now_mono)
                    }
                }
            }

            BrowserEvent::TabUpdated { tab_id, url, active } => {
                if !active {
                    return;
                }
                let tab = TabInfo {
                    id: tab_id,
                    window_id: None,
                    url,
                    active: true,
                };
                self.engine.handle_tab_focused(&tab, now, now_mono)
            }

            BrowserEvent::TabRemoved { tab_id } => self.engine.handle_tab_closed(tab_id, now_mono),

            BrowserEvent::WindowFocusChanged { window_id } => {
                self.handle_window_focus(window_id, now_mono).await
            }

            BrowserEvent::BeforeNavigate {
                tab_id,
                frame_id,
                url,
            } => self.engine.handle_before_navigate(tab_id, frame_id, &url),
        };

        self.apply_core_events(events).await;
    }

    async fn handle_window_focus(
        &mut self,
        window_id: Option<WindowId>,
        now_mono: MonotonicInstant,
    ) -> Vec<CoreEvent> {
        let Some(window_id) = window_id else {
            // All browser windows lost focus
            return self.engine.handle_focus_lost(now_mono);
        };

        match self.browser.active_tab(Some(window_id)).await {
            Ok(Some(tab)) => {
                self.engine
                    .handle_tab_focused(&tab, sitewarden_util::now(), now_mono)
            }
            Ok(None) => self.engine.handle_focus_lost(now_mono),
            Err(e) => {
                debug!(window_id = %window_id, error = %e, "Active tab lookup failed");
                self.engine.handle_focus_lost(now_mono)
            }
        }
    }

    /// Turn engine output into browser actions and tick scheduling
    async fn apply_core_events(&mut self, events: Vec<CoreEvent>) {
        for event in events {
            match event {
                CoreEvent::RedirectRequested {
                    tab_id,
                    original_url,
                    reason,
                    domain,
                } => {
                    let url = interstitial_url(
                        &self.settings.interstitial_url,
                        &original_url,
                        reason,
                        &domain,
                    );
                    if let Err(e) = self.browser.redirect(tab_id, &url).await {
                        warn!(tab_id = %tab_id, error = %e, "Redirect failed");
                    }
                }

                CoreEvent::TrackingStarted {
                    session_id,
                    domain,
                    ..
                } => {
                    self.ticks.start(self.settings.tick_interval);
                    debug!(session_id = %session_id, domain = %domain, "Session active");
                }

                CoreEvent::TrackingStopped {
                    session_id,
                    flushed_secs,
                    ..
                } => {
                    self.ticks.stop();
                    debug!(session_id = %session_id, flushed_secs, "Session ended");
                }

                CoreEvent::DailyReset { date } => {
                    info!(date, "New day, usage counters cleared");
                }
            }
        }
    }

    async fn handle_request(&mut self, request: Request) {
        let response = self.dispatch_command(&request).await;
        if let Err(e) = self.browser.send_response(response) {
            warn!(request_id = request.request_id, error = %e, "Failed to send response");
        }
    }

    async fn dispatch_command(&mut self, request: &Request) -> Response {
        let request_id = request.request_id;

        if request.api_version != API_VERSION {
            return Response::error(
                request_id,
                ErrorInfo::new(
                    ErrorCode::InvalidRequest,
                    format!("Unsupported API version {}", request.api_version),
                ),
            );
        }

        match &request.command {
            Command::GetState => match self.engine.snapshot() {
                Ok(state) => Response::success(request_id, ResponsePayload::State(state)),
                Err(e) => store_error(request_id, e),
            },

            Command::ListRules => match self.engine.rules() {
                Ok((blocked, limits)) => {
                    Response::success(request_id, ResponsePayload::Rules { blocked, limits })
                }
                Err(e) => store_error(request_id, e),
            },

            Command::GetStats => match self.engine.stats() {
                Ok(entries) => Response::success(request_id, ResponsePayload::Stats { entries }),
                Err(e) => store_error(request_id, e),
            },

            Command::AddBlockedSite { site } => {
                match self.engine.add_blocked_site(site, MonotonicInstant::now()) {
                    Ok(events) => {
                        // An active session on the now-blocked domain gets
                        // redirected right away
                        self.apply_core_events(events).await;
                        Response::success(request_id, ResponsePayload::Ack)
                    }
                    Err(e) => management_error(request_id, e),
                }
            }

            Command::RemoveBlockedSite { site } => {
                match self.engine.remove_blocked_site(site) {
                    Ok(true) => Response::success(request_id, ResponsePayload::Ack),
                    Ok(false) => Response::error(
                        request_id,
                        ErrorInfo::new(ErrorCode::RuleNotFound, "Site is not blocked"),
                    ),
                    Err(e) => management_error(request_id, e),
                }
            }

            Command::SetTimeLimit { site, minutes } => {
                match self.engine.set_time_limit(site, *minutes) {
                    Ok(()) => Response::success(request_id, ResponsePayload::Ack),
                    Err(e) => management_error(request_id, e),
                }
            }

            Command::RemoveTimeLimit { site } => match self.engine.remove_time_limit(site) {
                Ok(true) => Response::success(request_id, ResponsePayload::Ack),
                Ok(false) => Response::error(
                    request_id,
                    ErrorInfo::new(ErrorCode::RuleNotFound, "Site has no time limit"),
                ),
                Err(e) => management_error(request_id, e),
            },

            Command::ResetStats => match self.engine.reset_usage(sitewarden_util::now()) {
                Ok(()) => Response::success(request_id, ResponsePayload::Ack),
                Err(e) => store_error(request_id, e),
            },

            Command::OpenManagementPage => match self.browser.open_management_page().await {
                Ok(()) => Response::success(request_id, ResponsePayload::Ack),
                Err(e) => Response::error(
                    request_id,
                    ErrorInfo::new(ErrorCode::InternalError, e.to_string()),
                ),
            },

            Command::Ping => Response::success(request_id, ResponsePayload::Pong),
        }
    }
}

fn store_error(request_id: u64, e: sitewarden_store::StoreError) -> Response {
    Response::error(request_id, ErrorInfo::new(ErrorCode::StoreError, e.to_string()))
}

fn management_error(request_id: u64, e: ManagementError) -> Response {
    let code = match &e {
        ManagementError::Input(InputError::InvalidLimit(_)) => ErrorCode::InvalidLimit,
        ManagementError::Input(_) => ErrorCode::InvalidSite,
        ManagementError::Store(_) => ErrorCode::StoreError,
    };
    Response::error(request_id, ErrorInfo::new(code, e.to_string()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging. Stdout belongs to the bridge protocol, so logs
    // go to stderr.
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "sitewardend starting");

    if sitewarden_util::is_mock_time_active() {
        warn!("Mock time is active, usage accounting will not match real time");
    }

    let service = Service::new(&args)?;
    service.run().await
}
