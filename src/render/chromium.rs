// src/render/chromium.rs
//! Headless Chromium backend (feature `browser`) driven through chromiumoxide.
//!
//! Client-rendered notice pages only show their list after real clicks, so
//! this backend clicks controls with CDP mouse events and polls the DOM until
//! the wanted elements appear or the wait bound runs out.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use serde_json::json;
use std::path::PathBuf;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::{PageRenderer, PageSession};
use crate::error::ExtractError;
use crate::ingest::types::NavigationStep;

const POLL_EVERY: Duration = Duration::from_millis(250);
const MARK_ATTR: &str = "data-notice-watch-pick";

pub struct ChromiumRenderer {
    browser: Browser,
    _handler: JoinHandle<()>,
}

impl ChromiumRenderer {
    /// Launch headless Chromium. Without an explicit path chromiumoxide looks
    /// for an installed Chrome/Chromium.
    pub async fn launch(executable: Option<PathBuf>) -> Result<Self> {
        let mut builder = BrowserConfig::builder()
            .arg("--headless=new")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu")
            .window_size(1280, 900);
        if let Some(path) = executable {
            builder = builder.chrome_executable(path);
        }
        let config = builder
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("failed to launch Chromium")?;

        let handle = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        tracing::info!("chromium launched");
        Ok(Self {
            browser,
            _handler: handle,
        })
    }
}

#[async_trait]
impl PageRenderer for ChromiumRenderer {
    async fn new_session(&self) -> Result<Box<dyn PageSession>, ExtractError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| ExtractError::backend(format!("new page: {e}")))?;
        Ok(Box::new(ChromiumSession { page }))
    }

    fn name(&self) -> &'static str {
        "chromium"
    }
}

pub struct ChromiumSession {
    page: Page,
}

impl ChromiumSession {
    async fn eval<T: serde::de::DeserializeOwned>(&self, script: String) -> Result<T, ExtractError> {
        self.page
            .evaluate(script)
            .await
            .map_err(|e| ExtractError::backend(format!("js: {e}")))?
            .into_value::<T>()
            .map_err(|e| ExtractError::backend(format!("js result: {e}")))
    }

    /// Poll `probe` until it yields `Some`, or fail with `RenderTimeout`.
    async fn poll<T, Fut>(
        &self,
        what: &str,
        timeout_ms: u64,
        mut probe: impl FnMut() -> Fut + Send,
    ) -> Result<T, ExtractError>
    where
        Fut: std::future::Future<Output = Result<Option<T>, ExtractError>> + Send,
        T: Send,
    {
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);
        loop {
            if let Some(v) = probe().await? {
                return Ok(v);
            }
            if Instant::now() >= deadline {
                return Err(ExtractError::timeout(what, timeout_ms));
            }
            tokio::time::sleep(POLL_EVERY).await;
        }
    }

    /// Click the (first) element matching `selector` with real mouse events.
    async fn click(&self, selector: &str) -> Result<(), ExtractError> {
        let el = self
            .page
            .find_element(selector)
            .await
            .map_err(|e| ExtractError::backend(format!("find {selector}: {e}")))?;
        el.click()
            .await
            .map_err(|e| ExtractError::backend(format!("click {selector}: {e}")))?;
        Ok(())
    }

    async fn exists(&self, selector: &str) -> Result<bool, ExtractError> {
        let script = format!(
            "document.querySelector({}) !== null",
            json!(selector)
        );
        self.eval::<bool>(script).await
    }
}

/// Marks the control matching the label with `MARK_ATTR` and reports
/// `"missing"`, `"nolabel:<texts>"` or `"marked"`.
fn mark_script(step: &NavigationStep) -> String {
    let args = json!({
        "scope": step.scope,
        "scopeText": step.scope_text,
        "target": step.target,
        "label": step.label,
        "mark": MARK_ATTR,
    });
    format!(
        r#"(() => {{
  const a = {args};
  const norm = s => (s || "").replace(/\s+/g, " ").trim();
  document.querySelectorAll("[" + a.mark + "]").forEach(el => el.removeAttribute(a.mark));
  let roots = [document];
  if (a.scope) {{
    const want = a.scopeText ? norm(a.scopeText).toLowerCase() : null;
    roots = [...document.querySelectorAll(a.scope)]
      .filter(el => !want || norm(el.innerText).toLowerCase().includes(want));
    if (!roots.length) return "missing";
  }}
  const cands = roots.flatMap(r => [...r.querySelectorAll(a.target)]);
  if (!cands.length) return "missing";
  const label = norm(a.label);
  let hit = cands.find(el => norm(el.innerText) === label);
  if (!hit) hit = cands.find(el => norm(el.innerText).toLowerCase().includes(label.toLowerCase()));
  if (!hit) return "nolabel:" + cands.slice(0, 20).map(el => norm(el.innerText)).join(" | ");
  hit.scrollIntoView({{ block: "center" }});
  hit.setAttribute(a.mark, "1");
  return "marked";
}})()"#
    )
}

#[async_trait]
impl PageSession for ChromiumSession {
    async fn open(&mut self, url: &str, timeout_ms: u64) -> Result<(), ExtractError> {
        match tokio::time::timeout(Duration::from_millis(timeout_ms), self.page.goto(url)).await
        {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => return Err(ExtractError::backend(format!("goto {url}: {e}"))),
            Err(_) => return Err(ExtractError::timeout(format!("page {url}"), timeout_ms)),
        }
        match tokio::time::timeout(
            Duration::from_millis(timeout_ms),
            self.page.wait_for_navigation(),
        )
        .await
        {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => tracing::debug!(%url, error = %e, "wait for navigation failed"),
            Err(_) => tracing::debug!(%url, timeout_ms, "navigation still settling"),
        }
        Ok(())
    }

    async fn select(
        &mut self,
        step: &NavigationStep,
        timeout_ms: u64,
    ) -> Result<(), ExtractError> {
        let this = &*self;
        if let Some(opener) = step.opener.as_deref() {
            let what = format!("opener `{opener}`");
            this.poll(&what, timeout_ms, || async move {
                this.exists(opener).await.map(|b| b.then_some(()))
            })
            .await?;
            this.click(opener).await?;
        }

        let script = mark_script(step);
        let what = format!("target `{}`", step.target);
        let status: String = this
            .poll(&what, timeout_ms, || {
                let script = script.clone();
                async move {
                    this.eval::<String>(script)
                        .await
                        .map(|s| (s != "missing").then_some(s))
                }
            })
            .await?;

        if let Some(found) = status.strip_prefix("nolabel:") {
            return Err(ExtractError::navigation(
                &step.name,
                format!(
                    "no `{}` labelled {:?} (found: {found})",
                    step.target, step.label
                ),
            ));
        }

        this.click(&format!("[{MARK_ATTR}]")).await?;
        tracing::debug!(step = %step.name, label = %step.label, "selected");
        tokio::time::sleep(Duration::from_millis(step.settle_ms)).await;
        Ok(())
    }

    async fn wait_for(&mut self, selector: &str, timeout_ms: u64) -> Result<(), ExtractError> {
        let this = &*self;
        let what = format!("selector `{selector}`");
        this.poll(&what, timeout_ms, || async move {
            this.exists(selector).await.map(|b| b.then_some(()))
        })
        .await
    }

    async fn html(&mut self) -> Result<String, ExtractError> {
        self.eval("document.documentElement.outerHTML".to_string())
            .await
    }

    async fn close(self: Box<Self>) {
        if let Err(e) = self.page.close().await {
            tracing::debug!(error = %e, "page close failed");
        }
    }
}
