// src/render/mod.rs
//! Page renderer abstraction: open a page, interact with it, read it back.
//!
//! `PageRenderer` hands out one fresh `PageSession` per cycle so navigation
//! always starts from a clean page load.

pub mod document;
pub mod dom;

#[cfg(feature = "browser")]
pub mod chromium;

use anyhow::Result;
use async_trait::async_trait;

use crate::config::{AppConfig, RendererKind};
use crate::error::ExtractError;
use crate::ingest::types::NavigationStep;

/// A page source that can create sessions.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn new_session(&self) -> Result<Box<dyn PageSession>, ExtractError>;
    fn name(&self) -> &'static str;
}

/// One loaded page. Methods mutate remote page state; nothing here is
/// idempotent across calls.
#[async_trait]
pub trait PageSession: Send {
    /// Load `url`, bounded by `timeout_ms`.
    async fn open(&mut self, url: &str, timeout_ms: u64) -> Result<(), ExtractError>;

    /// Pick the control labelled `step.label`.
    /// `RenderTimeout` when the controls never show up,
    /// `Navigation` when they do but none carries the label.
    async fn select(&mut self, step: &NavigationStep, timeout_ms: u64)
        -> Result<(), ExtractError>;

    /// Wait until `selector` matches at least one element.
    async fn wait_for(&mut self, selector: &str, timeout_ms: u64) -> Result<(), ExtractError>;

    /// Current document HTML.
    async fn html(&mut self) -> Result<String, ExtractError>;

    async fn close(self: Box<Self>);
}

/// Build the renderer selected by `RENDERER`.
pub async fn build_renderer(cfg: &AppConfig) -> Result<Box<dyn PageRenderer>> {
    match cfg.renderer {
        RendererKind::Http => Ok(Box::new(document::DocumentRenderer::new(
            document::HttpFetch::new()?,
        ))),
        #[cfg(feature = "browser")]
        RendererKind::Chromium => Ok(Box::new(
            chromium::ChromiumRenderer::launch(cfg.chromium_path.clone()).await?,
        )),
        #[cfg(not(feature = "browser"))]
        RendererKind::Chromium => {
            anyhow::bail!("RENDERER=chromium requires building with `--features browser`")
        }
    }
}
