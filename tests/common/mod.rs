// tests/common/mod.rs
#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use notice_watch::error::ExtractError;
use notice_watch::render::document::{DocumentRenderer, Fetch};
use notice_watch::{AppConfig, Notifier};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const PAGE_URL: &str = "https://notices.test/thong-bao";
pub const NOTICE_PAGE: &str = include_str!("../fixtures/notice_page.html");
pub const LOADING_PAGE: &str = "<html><body><p>Đang tải…</p></body></html>";

/// Config for the fixture page: scenario A filter, ledger at `ledger`.
pub fn config(ledger: &Path, extra: &[(&str, &str)]) -> AppConfig {
    let mut map: HashMap<String, String> = [
        ("BOT_TOKEN", "123:test"),
        ("CHAT_ID", "42"),
        ("NOTICE_URL", PAGE_URL),
        ("REQUIRED_TAGS", "hệ thống,5 sao"),
        ("KEYWORD", "chitogejo"),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    map.insert("LEDGER_PATH".into(), ledger.display().to_string());
    for (k, v) in extra {
        map.insert(k.to_string(), v.to_string());
    }
    AppConfig::from_lookup(move |k: &str| map.get(k).cloned()).expect("test config")
}

/// One URL whose body can be swapped between cycles.
pub struct SwappablePage {
    html: Mutex<String>,
    pub loads: AtomicUsize,
}

impl SwappablePage {
    pub fn new(html: &str) -> Arc<Self> {
        Arc::new(Self {
            html: Mutex::new(html.to_string()),
            loads: AtomicUsize::new(0),
        })
    }

    pub fn set(&self, html: &str) {
        *self.html.lock().unwrap() = html.to_string();
    }
}

#[async_trait]
impl Fetch for SwappablePage {
    async fn get(&self, _url: &str, _timeout_ms: u64) -> Result<String, ExtractError> {
        self.loads.fetch_add(1, Ordering::Relaxed);
        Ok(self.html.lock().unwrap().clone())
    }
}

pub fn renderer(page: &Arc<SwappablePage>) -> Box<DocumentRenderer<SwappablePage>> {
    Box::new(DocumentRenderer::shared(Arc::clone(page)))
}

/// Records every message; can be switched into failure mode.
#[derive(Default)]
pub struct MockNotifier {
    sent: Mutex<Vec<String>>,
    failing: AtomicBool,
    pub attempts: AtomicUsize,
}

impl MockNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_failing(&self, on: bool) {
        self.failing.store(on, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    /// Only notice messages (not error reports).
    pub fn notices(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter(|m| m.starts_with("🔔"))
            .collect()
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn send(&self, text: &str) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            anyhow::bail!("simulated network error");
        }
        self.sent.lock().unwrap().push(text.to_string());
        Ok(())
    }
}
