//! Integration tests for sitewardend
//!
//! These tests drive the engine end to end against a real SQLite store and
//! the mock browser adapter, simulating a day of browsing with explicit
//! clock readings.

use chrono::{Local, TimeZone};
use sitewarden_api::{BlockReason, Domain, TabInfo};
use sitewarden_browser::{BrowserAdapter, MockBrowser};
use sitewarden_core::{interstitial_url, CoreEvent, TrackerEngine};
use sitewarden_store::{SqliteStore, Store};
use sitewarden_util::{MonotonicInstant, TabId, WindowId};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn tab(id: i64, url: &str) -> TabInfo {
    TabInfo {
        id: TabId::new(id),
        window_id: Some(WindowId::new(1)),
        url: Some(url.to_string()),
        active: true,
    }
}

/// Apply engine output the way the daemon does: redirects go to the browser
async fn apply(browser: &MockBrowser, interstitial_base: &str, events: Vec<CoreEvent>) {
    for event in events {
        if let CoreEvent::RedirectRequested {
            tab_id,
            original_url,
            reason,
            domain,
        } = event
        {
            let url = interstitial_url(interstitial_base, &original_url, reason, &domain);
            browser.redirect(tab_id, &url).await.unwrap();
        }
    }
}

#[tokio::test]
async fn blocked_site_is_redirected_to_interstitial() {
    let store = Arc::new(SqliteStore::in_memory().unwrap());
    let mut engine = TrackerEngine::new(store);
    let browser = MockBrowser::new();
    let t0 = MonotonicInstant::now();

    browser.insert_tab(tab(1, "https://reddit.com/r/all"));
    engine.add_blocked_site("reddit.com", t0).unwrap();

    let events = engine.handle_tab_focused(&tab(1, "https://reddit.com/r/all"), Local::now(), t0);
    apply(&browser, "blocked.html", events).await;

    let redirects = browser.redirects();
    assert_eq!(redirects.len(), 1);
    let (tab_id, url) = &redirects[0];
    assert_eq!(*tab_id, TabId::new(1));
    assert!(url.starts_with("blocked.html?url="));
    assert!(url.contains("&reason=blocked&"));
    assert!(url.ends_with("&domain=reddit.com"));
}

#[tokio::test]
async fn time_limit_exhausts_over_ticks() {
    let store = Arc::new(SqliteStore::in_memory().unwrap());
    let mut engine = TrackerEngine::new(store.clone());
    let browser = MockBrowser::new();
    let t0 = MonotonicInstant::now();

    // 2 minutes of youtube per day
    browser.insert_tab(tab(1, "https://youtube.com/watch?v=abc"));
    engine.set_time_limit("youtube.com", 2).unwrap();

    let events = engine.handle_tab_focused(
        &tab(1, "https://youtube.com/watch?v=abc"),
        Local::now(),
        t0,
    );
    apply(&browser, "blocked.html", events).await;
    assert!(browser.redirects().is_empty());

    // One tick per second until the limit trips
    let mut tripped_at = None;
    for secs in 1..=130 {
        let events = engine.tick(t0 + Duration::from_secs(secs));
        let had_redirect = events
            .iter()
            .any(|e| matches!(e, CoreEvent::RedirectRequested { .. }));
        apply(&browser, "blocked.html", events).await;
        if had_redirect {
            tripped_at = Some(secs);
            break;
        }
    }

    assert_eq!(tripped_at, Some(120));
    assert!(!engine.is_tracking());

    let redirects = browser.redirects();
    assert_eq!(redirects.len(), 1);
    assert!(redirects[0].1.contains("&reason=time-limit&"));

    // All 120 seconds were flushed
    assert_eq!(
        store.usage().unwrap().get(&Domain::new("youtube.com")),
        120
    );
}

#[tokio::test]
async fn switching_tabs_splits_usage_between_domains() {
    let store = Arc::new(SqliteStore::in_memory().unwrap());
    let mut engine = TrackerEngine::new(store.clone());
    let now = Local::now();
    let t0 = MonotonicInstant::now();

    engine.handle_tab_focused(&tab(1, "https://news.example/"), now, t0);
    engine.handle_tab_focused(&tab(2, "https://docs.example/"), now, t0 + Duration::from_secs(10));
    engine.handle_tab_focused(&tab(1, "https://news.example/"), now, t0 + Duration::from_secs(25));
    engine.handle_focus_lost(t0 + Duration::from_secs(31));

    let usage = store.usage().unwrap();
    assert_eq!(usage.get(&Domain::new("news.example")), 16);
    assert_eq!(usage.get(&Domain::new("docs.example")), 15);
}

#[tokio::test]
async fn returning_after_limit_hits_interstitial_immediately() {
    let store = Arc::new(SqliteStore::in_memory().unwrap());
    let mut engine = TrackerEngine::new(store);
    let browser = MockBrowser::new();
    let t0 = MonotonicInstant::now();

    browser.insert_tab(tab(1, "https://youtube.com/"));
    browser.insert_tab(tab(5, "https://www.youtube.com/feed"));
    engine.set_time_limit("youtube.com", 1).unwrap();
    engine.handle_tab_focused(&tab(1, "https://youtube.com/"), Local::now(), t0);
    let events = engine.tick(t0 + Duration::from_secs(60));
    apply(&browser, "blocked.html", events).await;
    assert_eq!(browser.redirects().len(), 1);

    // A fresh visit the same day is denied before any tracking starts
    let events = engine.handle_tab_focused(
        &tab(5, "https://www.youtube.com/feed"),
        Local::now(),
        t0 + Duration::from_secs(300),
    );
    apply(&browser, "blocked.html", events).await;

    assert!(!engine.is_tracking());
    assert_eq!(browser.redirects().len(), 2);
}

#[tokio::test]
async fn daily_reset_restores_access() {
    let store = Arc::new(SqliteStore::in_memory().unwrap());
    let mut engine = TrackerEngine::new(store.clone());
    let t0 = MonotonicInstant::now();

    let day_one = Local.with_ymd_and_hms(2026, 3, 7, 22, 0, 0).unwrap();
    let day_two = Local.with_ymd_and_hms(2026, 3, 8, 9, 0, 0).unwrap();

    engine.set_time_limit("youtube.com", 1).unwrap();
    engine.handle_tab_focused(&tab(1, "https://youtube.com/"), day_one, t0);
    engine.tick(t0 + Duration::from_secs(60));
    assert!(!engine.is_tracking());

    // Next morning the first focus event performs the reset and tracking
    // starts again
    let events = engine.handle_tab_focused(
        &tab(2, "https://youtube.com/"),
        day_two,
        t0 + Duration::from_secs(40_000),
    );

    assert!(events
        .iter()
        .any(|e| matches!(e, CoreEvent::DailyReset { .. })));
    assert!(engine.is_tracking());
    assert_eq!(store.usage().unwrap().get(&Domain::new("youtube.com")), 0);
}

#[tokio::test]
async fn losing_browser_focus_pauses_the_clock() {
    let store = Arc::new(SqliteStore::in_memory().unwrap());
    let mut engine = TrackerEngine::new(store.clone());
    let now = Local::now();
    let t0 = MonotonicInstant::now();

    engine.handle_tab_focused(&tab(1, "https://example.com/"), now, t0);
    engine.handle_focus_lost(t0 + Duration::from_secs(5));

    // A long unfocused stretch accrues nothing
    let t_back = t0 + Duration::from_secs(1000);
    engine.handle_tab_focused(&tab(1, "https://example.com/"), now, t_back);
    engine.handle_focus_lost(t_back + Duration::from_secs(3));

    assert_eq!(store.usage().unwrap().get(&Domain::new("example.com")), 8);
}

#[tokio::test]
async fn before_navigate_denies_without_waiting_for_load() {
    let store = Arc::new(SqliteStore::in_memory().unwrap());
    let mut engine = TrackerEngine::new(store);
    let browser = MockBrowser::new();
    let t0 = MonotonicInstant::now();

    browser.insert_tab(tab(3, "https://start.example/"));
    engine.add_blocked_site("reddit.com", t0).unwrap();

    // Subframe navigations are not gated
    let events = engine.handle_before_navigate(TabId::new(3), 2, "https://reddit.com/embed");
    apply(&browser, "blocked.html", events).await;
    assert!(browser.redirects().is_empty());

    let events = engine.handle_before_navigate(TabId::new(3), 0, "https://reddit.com/");
    apply(&browser, "blocked.html", events).await;
    assert_eq!(browser.redirects().len(), 1);
}

#[tokio::test]
async fn usage_survives_restart_same_day() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("sitewardend.db");
    let now = Local::now();
    let t0 = MonotonicInstant::now();

    {
        let store = Arc::new(SqliteStore::open(&db_path).unwrap());
        let mut engine = TrackerEngine::new(store);
        engine.set_time_limit("youtube.com", 5).unwrap();
        engine.handle_tab_focused(&tab(1, "https://youtube.com/"), now, t0);
        engine.handle_focus_lost(t0 + Duration::from_secs(90));
    }

    // New process, same database
    let store = Arc::new(SqliteStore::open(&db_path).unwrap());
    let mut engine = TrackerEngine::new(store.clone());
    engine.startup(now);

    assert_eq!(store.usage().unwrap().get(&Domain::new("youtube.com")), 90);
    let (_, limits) = engine.rules().unwrap();
    assert_eq!(limits.len(), 1);
    assert_eq!(limits[0].used_secs, 90);
}

#[tokio::test]
async fn management_edits_apply_to_next_navigation() {
    let store = Arc::new(SqliteStore::in_memory().unwrap());
    let mut engine = TrackerEngine::new(store);
    let browser = MockBrowser::new();
    let now = Local::now();
    let t0 = MonotonicInstant::now();

    // Allowed at first
    browser.insert_tab(tab(1, "https://twitter.com/"));
    let events = engine.handle_tab_focused(&tab(1, "https://twitter.com/"), now, t0);
    apply(&browser, "blocked.html", events).await;
    assert!(engine.is_tracking());

    // Blocking the tracked domain evicts the session and redirects its tab
    let events = engine
        .add_blocked_site("twitter.com", t0 + Duration::from_secs(30))
        .unwrap();
    apply(&browser, "blocked.html", events).await;
    assert!(!engine.is_tracking());
    assert_eq!(browser.redirects().len(), 1);

    // Unblocking lets the next visit through
    assert!(engine.remove_blocked_site("twitter.com").unwrap());
    let events = engine.handle_tab_focused(
        &tab(1, "https://twitter.com/"),
        now,
        t0 + Duration::from_secs(60),
    );
    apply(&browser, "blocked.html", events).await;
    assert!(engine.is_tracking());
    assert_eq!(browser.redirects().len(), 1);

    // The evicted 30 seconds were flushed before the redirect
    let stats = engine.stats().unwrap();
    assert_eq!(stats[0].domain.as_str(), "twitter.com");
    assert_eq!(stats[0].used_secs, 30);
}

#[tokio::test]
async fn redirect_lands_the_mock_tab_on_the_interstitial() {
    let store = Arc::new(SqliteStore::in_memory().unwrap());
    let mut engine = TrackerEngine::new(store);
    let browser = MockBrowser::new();
    let t0 = MonotonicInstant::now();

    browser.insert_tab(tab(1, "https://reddit.com/"));
    engine.add_blocked_site("reddit.com", t0).unwrap();

    let events = engine.handle_tab_focused(&tab(1, "https://reddit.com/"), Local::now(), t0);
    apply(&browser, "blocked.html", events).await;

    let moved = browser.get_tab(TabId::new(1)).await.unwrap();
    assert!(moved
        .url
        .as_deref()
        .unwrap()
        .starts_with("blocked.html?url="));
    assert_eq!(moved.reason_param(), Some(BlockReason::Blocked));
}

/// Pull the `reason` query parameter back out of a redirected tab URL
trait ReasonParam {
    fn reason_param(&self) -> Option<BlockReason>;
}

impl ReasonParam for TabInfo {
    fn reason_param(&self) -> Option<BlockReason> {
        let url = self.url.as_deref()?;
        if url.contains("reason=blocked") {
            Some(BlockReason::Blocked)
        } else if url.contains("reason=time-limit") {
            Some(BlockReason::TimeLimit)
        } else {
            None
        }
    }
}
