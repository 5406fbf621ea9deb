// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod config;
pub mod error;
pub mod filter;
pub mod ingest;
pub mod ledger;
pub mod notify;
pub mod pipeline;
pub mod render;
pub mod telemetry;

// ---- Re-exports for stable public API ----
pub use crate::config::AppConfig;
pub use crate::error::{ConfigError, CycleError, ExtractError};
pub use crate::filter::{matches, FilterConfig};
pub use crate::ingest::types::RawNotice;
pub use crate::ledger::{fingerprint, Fingerprint, FingerprintBasis, Ledger};
pub use crate::notify::{Notifier, TelegramNotifier};
pub use crate::pipeline::{CyclePhase, CycleReport, Pipeline};
