// src/config/selectors.rs
//! Where things live on the notice page: navigation controls and notice cards.
//!
//! Defaults describe the Ant Design notice page. A TOML file can override any
//! field; omitted fields keep their default and an empty string clears an
//! optional selector.

use scraper::Selector;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::ConfigError;
use crate::ingest::types::NavigationStep;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepSelectors {
    pub scope: Option<String>,
    pub scope_text: Option<String>,
    pub opener: Option<String>,
    pub target: String,
    pub settle_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentSelectors {
    /// Must be present before the list is read.
    pub ready: String,
    /// One element per notice.
    pub card: String,
    /// Text fragments inside a card; `None` reads the whole card text.
    pub text: Option<String>,
    pub tags: Option<String>,
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorConfig {
    pub server: StepSelectors,
    pub category: StepSelectors,
    pub content: ContentSelectors,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            server: StepSelectors {
                scope: Some("div.ant-card".into()),
                scope_text: Some("Máy chủ".into()),
                opener: None,
                target: "button.ant-btn span".into(),
                settle_ms: 1000,
            },
            category: StepSelectors {
                scope: None,
                scope_text: None,
                opener: Some("div.ant-select-selector".into()),
                target: "div.ant-select-item-option-content".into(),
                settle_ms: 1000,
            },
            content: ContentSelectors {
                ready: "div.ant-card".into(),
                card: "div[style*='border-bottom']".into(),
                text: Some("span.ant-typography".into()),
                tags: Some("span.ant-tag".into()),
                timestamp: None,
            },
        }
    }
}

// --- TOML overlay ---

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct StepPatch {
    scope: Option<String>,
    scope_text: Option<String>,
    opener: Option<String>,
    target: Option<String>,
    settle_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ContentPatch {
    ready: Option<String>,
    card: Option<String>,
    text: Option<String>,
    tags: Option<String>,
    timestamp: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SelectorPatch {
    #[serde(default)]
    server: StepPatch,
    #[serde(default)]
    category: StepPatch,
    #[serde(default)]
    content: ContentPatch,
}

fn optional(v: String) -> Option<String> {
    let t = v.trim();
    (!t.is_empty()).then(|| t.to_string())
}

impl StepSelectors {
    fn apply(&mut self, p: StepPatch) {
        if let Some(v) = p.scope {
            self.scope = optional(v);
        }
        if let Some(v) = p.scope_text {
            self.scope_text = optional(v);
        }
        if let Some(v) = p.opener {
            self.opener = optional(v);
        }
        if let Some(v) = p.target {
            self.target = v.trim().to_string();
        }
        if let Some(v) = p.settle_ms {
            self.settle_ms = v;
        }
    }

    fn step(&self, name: &str, label: &str) -> NavigationStep {
        NavigationStep {
            name: name.to_string(),
            label: label.to_string(),
            scope: self.scope.clone(),
            scope_text: self.scope_text.clone(),
            opener: self.opener.clone(),
            target: self.target.clone(),
            settle_ms: self.settle_ms,
        }
    }
}

impl ContentSelectors {
    fn apply(&mut self, p: ContentPatch) {
        if let Some(v) = p.ready {
            self.ready = v.trim().to_string();
        }
        if let Some(v) = p.card {
            self.card = v.trim().to_string();
        }
        if let Some(v) = p.text {
            self.text = optional(v);
        }
        if let Some(v) = p.tags {
            self.tags = optional(v);
        }
        if let Some(v) = p.timestamp {
            self.timestamp = optional(v);
        }
    }
}

impl SelectorConfig {
    /// Defaults overlaid with the TOML at `path`, validated.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::Selectors(format!("reading {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let patch: SelectorPatch =
            toml::from_str(s).map_err(|e| ConfigError::Selectors(e.to_string()))?;
        let mut cfg = Self::default();
        cfg.server.apply(patch.server);
        cfg.category.apply(patch.category);
        cfg.content.apply(patch.content);
        cfg.validate()?;
        Ok(cfg)
    }

    /// Every selector must parse; required ones must be non-empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("server.target", Some(&self.server.target)),
            ("category.target", Some(&self.category.target)),
            ("content.ready", Some(&self.content.ready)),
            ("content.card", Some(&self.content.card)),
        ];
        let optional = [
            ("server.scope", self.server.scope.as_ref()),
            ("server.opener", self.server.opener.as_ref()),
            ("category.scope", self.category.scope.as_ref()),
            ("category.opener", self.category.opener.as_ref()),
            ("content.text", self.content.text.as_ref()),
            ("content.tags", self.content.tags.as_ref()),
            ("content.timestamp", self.content.timestamp.as_ref()),
        ];

        for (key, sel) in required.into_iter().chain(optional) {
            let Some(sel) = sel else { continue };
            if sel.is_empty() {
                return Err(ConfigError::Selectors(format!("{key} must not be empty")));
            }
            Selector::parse(sel)
                .map_err(|e| ConfigError::Selectors(format!("{key} = {sel:?}: {e}")))?;
        }
        Ok(())
    }

    /// Steps to run before reading the list. An empty label skips its step.
    pub fn navigation_steps(&self, server: &str, category: &str) -> Vec<NavigationStep> {
        let mut steps = Vec::with_capacity(2);
        if !server.trim().is_empty() {
            steps.push(self.server.step("server", server.trim()));
        }
        if !category.trim().is_empty() {
            steps.push(self.category.step("category", category.trim()));
        }
        steps
    }
}
