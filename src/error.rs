// src/error.rs
//! Error taxonomy shared by the extractor, the pipeline and startup.

use thiserror::Error;

/// Why a cycle could not read the notice list. Any of these aborts the cycle.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExtractError {
    #[error("render timeout: {what} did not appear within {timeout_ms} ms")]
    RenderTimeout { what: String, timeout_ms: u64 },

    #[error("navigation error at step `{step}`: {reason}")]
    Navigation { step: String, reason: String },

    #[error("page backend failure: {0}")]
    Backend(String),
}

impl ExtractError {
    pub fn timeout(what: impl Into<String>, timeout_ms: u64) -> Self {
        Self::RenderTimeout {
            what: what.into(),
            timeout_ms,
        }
    }

    pub fn navigation(step: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Navigation {
            step: step.into(),
            reason: reason.into(),
        }
    }

    /// Wrap a transport/driver error, keeping the whole context chain.
    pub fn backend(err: impl std::fmt::Display) -> Self {
        Self::Backend(format!("{err:#}"))
    }

    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RenderTimeout { .. } => "render_timeout",
            Self::Navigation { .. } => "navigation",
            Self::Backend(_) => "backend",
        }
    }
}

/// Startup configuration problems. Fatal: the cycle never runs.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("selector config: {0}")]
    Selectors(String),
}

/// Outcome of a cycle that did not run to completion.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error("ledger append failed after delivery: {0}")]
    Ledger(#[from] std::io::Error),
}
