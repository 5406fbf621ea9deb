// src/ingest/types.rs
use std::collections::BTreeSet;

/// One entry of the notice list as read from the rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawNotice {
    pub content: String,
    pub tags: BTreeSet<String>,          // lowercase
    pub occurred_at: Option<String>,     // as shown on the page
}

impl RawNotice {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    /// Builder for tests and fixtures; tags are lowercased on the way in.
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.tags = tags
            .into_iter()
            .map(|t| t.as_ref().trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        self
    }

    pub fn with_timestamp(mut self, ts: impl Into<String>) -> Self {
        self.occurred_at = Some(ts.into());
        self
    }
}

/// A "pick this option" interaction performed before the list is read,
/// e.g. choosing the server button or the category dropdown entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationStep {
    /// Step name for logs/errors ("server", "category").
    pub name: String,
    /// Visible text of the control to select.
    pub label: String,
    /// Container the target must live in.
    pub scope: Option<String>,
    /// Text the container must contain (e.g. the card title).
    pub scope_text: Option<String>,
    /// Control to click first so the options become visible (dropdowns).
    pub opener: Option<String>,
    /// Candidate controls; the one whose text matches `label` is clicked.
    pub target: String,
    /// Pause after the click so client-side content can refresh.
    pub settle_ms: u64,
}
