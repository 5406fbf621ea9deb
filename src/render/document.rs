// src/render/document.rs
//! Document backend: the page is whatever the server returns for a GET.
//!
//! Navigation steps are resolved against the fetched DOM. When the chosen
//! control is a link, the link is followed; otherwise the page is assumed to
//! already show that selection. Used for server-rendered notice pages and,
//! through `StaticPages`, for fixtures.

use async_trait::async_trait;
use reqwest::{Client, Url};
use scraper::Html;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::dom::{self, Lookup};
use super::{PageRenderer, PageSession};
use crate::error::ExtractError;
use crate::ingest::types::NavigationStep;

/// Where documents come from.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn get(&self, url: &str, timeout_ms: u64) -> Result<String, ExtractError>;
}

pub struct HttpFetch {
    client: Client,
}

impl HttpFetch {
    pub fn new() -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent("Mozilla/5.0 (compatible; notice-watch)")
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetch for HttpFetch {
    async fn get(&self, url: &str, timeout_ms: u64) -> Result<String, ExtractError> {
        let map_err = |e: reqwest::Error| {
            if e.is_timeout() {
                ExtractError::timeout(format!("page {url}"), timeout_ms)
            } else {
                ExtractError::backend(format!("GET {url}: {e}"))
            }
        };
        let rsp = self
            .client
            .get(url)
            .timeout(Duration::from_millis(timeout_ms))
            .send()
            .await
            .map_err(map_err)?
            .error_for_status()
            .map_err(map_err)?;
        rsp.text().await.map_err(map_err)
    }
}

/// In-memory pages keyed by URL. Counts loads so callers can see that each
/// session starts from a fresh page.
#[derive(Debug, Default)]
pub struct StaticPages {
    pages: HashMap<String, String>,
    loads: AtomicUsize,
}

impl StaticPages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.pages.insert(url.into(), html.into());
        self
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Fetch for StaticPages {
    async fn get(&self, url: &str, _timeout_ms: u64) -> Result<String, ExtractError> {
        self.loads.fetch_add(1, Ordering::Relaxed);
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| ExtractError::backend(format!("no page for {url}")))
    }
}

pub struct DocumentRenderer<F> {
    fetch: Arc<F>,
}

impl<F: Fetch + 'static> DocumentRenderer<F> {
    pub fn new(fetch: F) -> Self {
        Self {
            fetch: Arc::new(fetch),
        }
    }

    /// Share an existing fetcher (tests keep a handle to inspect it).
    pub fn shared(fetch: Arc<F>) -> Self {
        Self { fetch }
    }
}

#[async_trait]
impl<F: Fetch + 'static> PageRenderer for DocumentRenderer<F> {
    async fn new_session(&self) -> Result<Box<dyn PageSession>, ExtractError> {
        Ok(Box::new(DocumentSession {
            fetch: Arc::clone(&self.fetch),
            url: None,
            html: None,
        }))
    }

    fn name(&self) -> &'static str {
        "document"
    }
}

pub struct DocumentSession<F> {
    fetch: Arc<F>,
    url: Option<String>,
    html: Option<String>,
}

impl<F> DocumentSession<F> {
    fn current(&self) -> Result<(&str, &str), ExtractError> {
        match (&self.url, &self.html) {
            (Some(u), Some(h)) => Ok((u.as_str(), h.as_str())),
            _ => Err(ExtractError::backend("no page loaded")),
        }
    }
}

fn locate_in(html: &str, step: &NavigationStep) -> Result<Lookup, ExtractError> {
    let doc = Html::parse_document(html);
    dom::locate(&doc, step)
}

fn has_match(html: &str, selector: &str) -> Result<bool, ExtractError> {
    let sel = dom::selector(selector)?;
    let doc = Html::parse_document(html);
    let found = doc.select(&sel).next().is_some();
    Ok(found)
}

#[async_trait]
impl<F: Fetch + 'static> PageSession for DocumentSession<F> {
    async fn open(&mut self, url: &str, timeout_ms: u64) -> Result<(), ExtractError> {
        let html = self.fetch.get(url, timeout_ms).await?;
        self.url = Some(url.to_string());
        self.html = Some(html);
        Ok(())
    }

    async fn select(
        &mut self,
        step: &NavigationStep,
        timeout_ms: u64,
    ) -> Result<(), ExtractError> {
        let (base, html) = self.current()?;
        let next = match locate_in(html, step)? {
            Lookup::Missing(what) => return Err(ExtractError::timeout(what, timeout_ms)),
            Lookup::NoLabel(found) => {
                return Err(ExtractError::navigation(
                    &step.name,
                    format!(
                        "no `{}` labelled {:?} (found: {})",
                        step.target,
                        step.label,
                        found.join(" | ")
                    ),
                ))
            }
            Lookup::Found { href: None } => None,
            Lookup::Found { href: Some(h) } => {
                let joined = Url::parse(base)
                    .and_then(|b| b.join(&h))
                    .map_err(|e| ExtractError::navigation(&step.name, format!("bad link {h:?}: {e}")))?;
                Some(joined.to_string())
            }
        };

        if let Some(url) = next {
            tracing::debug!(step = %step.name, %url, "following selection link");
            self.open(&url, timeout_ms).await?;
        }
        Ok(())
    }

    async fn wait_for(&mut self, selector: &str, timeout_ms: u64) -> Result<(), ExtractError> {
        let (_, html) = self.current()?;
        if has_match(html, selector)? {
            Ok(())
        } else {
            Err(ExtractError::timeout(format!("selector `{selector}`"), timeout_ms))
        }
    }

    async fn html(&mut self) -> Result<String, ExtractError> {
        self.current().map(|(_, h)| h.to_string())
    }

    async fn close(self: Box<Self>) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://notices.test/thong-bao";

    fn step() -> NavigationStep {
        NavigationStep {
            name: "server".into(),
            label: "5 sao".into(),
            scope: None,
            scope_text: None,
            opener: None,
            target: "a.server".into(),
            settle_ms: 0,
        }
    }

    #[tokio::test]
    async fn select_follows_relative_link() {
        let pages = Arc::new(
            StaticPages::new()
                .with_page(URL, r#"<a class="server" href="?server=5">5 sao</a>"#)
                .with_page(format!("{URL}?server=5"), "<div class='list'>ok</div>"),
        );
        let renderer = DocumentRenderer::shared(Arc::clone(&pages));
        let mut s = renderer.new_session().await.unwrap();
        s.open(URL, 1000).await.unwrap();
        s.select(&step(), 1000).await.unwrap();
        s.wait_for("div.list", 1000).await.unwrap();
        assert_eq!(pages.loads(), 2);
    }

    #[tokio::test]
    async fn missing_control_is_timeout_and_wrong_label_is_navigation() {
        let pages = StaticPages::new()
            .with_page(URL, r#"<a class="server" href="?server=4">4 sao</a>"#)
            .with_page("https://notices.test/empty", "<p></p>");
        let renderer = DocumentRenderer::new(pages);

        let mut s = renderer.new_session().await.unwrap();
        s.open(URL, 1000).await.unwrap();
        let err = s.select(&step(), 1000).await.unwrap_err();
        assert!(matches!(err, ExtractError::Navigation { ref step, .. } if step == "server"));

        let mut s = renderer.new_session().await.unwrap();
        s.open("https://notices.test/empty", 1000).await.unwrap();
        let err = s.select(&step(), 750).await.unwrap_err();
        assert!(matches!(err, ExtractError::RenderTimeout { timeout_ms: 750, .. }));
        let err = s.wait_for("div.list", 750).await.unwrap_err();
        assert!(matches!(err, ExtractError::RenderTimeout { .. }));
    }

    #[tokio::test]
    async fn select_before_open_is_backend_error() {
        let renderer = DocumentRenderer::new(StaticPages::new());
        let mut s = renderer.new_session().await.unwrap();
        assert!(matches!(
            s.select(&step(), 10).await,
            Err(ExtractError::Backend(_))
        ));
    }
}
