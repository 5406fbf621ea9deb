// src/config/mod.rs
//! Process-wide configuration, read once from the environment at startup and
//! passed by reference from then on.

pub mod selectors;

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::ConfigError;
use crate::filter::FilterConfig;
use crate::ledger::FingerprintBasis;
use crate::notify::telegram::MAX_SEND_ATTEMPTS;
use selectors::SelectorConfig;

pub const DEFAULT_NOTICE_URL: &str = "https://service.dungpham.com.vn/thong-bao";
pub const DEFAULT_SERVER_NAME: &str = "5 sao";
pub const DEFAULT_CATEGORY_NAME: &str = "Hệ thống";
pub const DEFAULT_LEDGER_PATH: &str = "sent.txt";
pub const DEFAULT_TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Credential wrapper that never shows up in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RendererKind {
    Http,
    Chromium,
}

impl FromStr for RendererKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "http" | "static" => Ok(Self::Http),
            "chromium" | "browser" => Ok(Self::Chromium),
            other => Err(format!("unknown renderer `{other}` (expected http|chromium)")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "compact" | "text" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format `{other}` (expected compact|json)")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub notice_url: String,
    pub server_name: String,
    pub category_name: String,
    pub filter: FilterConfig,

    pub bot_token: Secret,
    pub chat_id: String,
    pub telegram_api_base: String,
    pub notify_timeout_secs: u64,
    pub notify_retries: u8,
    pub notify_on_start: bool,

    pub ledger_path: PathBuf,
    pub fingerprint_basis: FingerprintBasis,

    pub selectors: SelectorConfig,
    pub renderer: RendererKind,
    pub chromium_path: Option<PathBuf>,
    pub render_timeout_ms: u64,
    pub step_timeout_ms: u64,

    /// 0 = run a single cycle and exit.
    pub poll_interval_secs: u64,
    pub metrics_addr: Option<SocketAddr>,
    pub log_format: LogFormat,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Build from any key → value source (the environment in production,
    /// a map in tests).
    pub fn from_lookup<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| -> Result<String, ConfigError> {
            get(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::Missing(key))
        };
        let or_default = |key: &str, default: &str| -> String {
            get(key)
                .map(|v| v.trim().to_string())
                .unwrap_or_else(|| default.to_string())
        };

        let bot_token = Secret::new(required("BOT_TOKEN")?);
        let chat_id = required("CHAT_ID")?;

        let required_tags = get("REQUIRED_TAGS").unwrap_or_default();
        let keyword = get("KEYWORD").unwrap_or_default();
        let filter = FilterConfig::new(required_tags.split(','), keyword);

        let selectors = match get("SELECTORS_PATH").filter(|p| !p.trim().is_empty()) {
            Some(p) => SelectorConfig::load_from(&PathBuf::from(p.trim()))?,
            None => SelectorConfig::default(),
        };

        Ok(Self {
            notice_url: or_default("NOTICE_URL", DEFAULT_NOTICE_URL),
            server_name: or_default("SERVER_NAME", DEFAULT_SERVER_NAME),
            category_name: or_default("CATEGORY_NAME", DEFAULT_CATEGORY_NAME),
            filter,

            bot_token,
            chat_id,
            telegram_api_base: or_default("TELEGRAM_API_BASE", DEFAULT_TELEGRAM_API_BASE)
                .trim_end_matches('/')
                .to_string(),
            notify_timeout_secs: parse_or(&get, "NOTIFY_TIMEOUT_SECS", 10)?,
            notify_retries: parse_retries(&get)?,
            notify_on_start: parse_flag(&get, "NOTIFY_ON_START")?,

            ledger_path: PathBuf::from(or_default("LEDGER_PATH", DEFAULT_LEDGER_PATH)),
            fingerprint_basis: parse_or(&get, "FINGERPRINT_BASIS", FingerprintBasis::Content)?,

            selectors,
            renderer: parse_or(&get, "RENDERER", RendererKind::Http)?,
            chromium_path: get("CHROMIUM_PATH")
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
            render_timeout_ms: parse_or(&get, "RENDER_TIMEOUT_MS", 30_000)?,
            step_timeout_ms: parse_or(&get, "STEP_TIMEOUT_MS", 20_000)?,

            poll_interval_secs: parse_or(&get, "POLL_INTERVAL_SECS", 0)?,
            metrics_addr: match get("METRICS_ADDR").filter(|v| !v.trim().is_empty()) {
                Some(v) => Some(parse_value("METRICS_ADDR", &v)?),
                None => None,
            },
            log_format: parse_or(&get, "LOG_FORMAT", LogFormat::Compact)?,
        })
    }
}

fn parse_value<T>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    raw.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
        key,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

fn parse_or<T, F>(get: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match get(key).filter(|v| !v.trim().is_empty()) {
        Some(v) => parse_value(key, &v),
        None => Ok(default),
    }
}

/// `NOTIFY_RETRIES`: total attempts per message, `1..=MAX_SEND_ATTEMPTS`.
fn parse_retries<F>(get: &F) -> Result<u8, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let n: u8 = parse_or(get, "NOTIFY_RETRIES", 2)?;
    if !(1..=MAX_SEND_ATTEMPTS).contains(&n) {
        return Err(ConfigError::Invalid {
            key: "NOTIFY_RETRIES",
            value: n.to_string(),
            reason: format!("expected 1..={MAX_SEND_ATTEMPTS}"),
        });
    }
    Ok(n)
}

fn parse_flag<F>(get: &F, key: &'static str) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = get(key) else {
        return Ok(false);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "" | "0" | "false" | "no" | "off" => Ok(false),
        "1" | "true" | "yes" | "on" => Ok(true),
        _ => Err(ConfigError::Invalid {
            key,
            value: raw,
            reason: "expected a boolean".into(),
        }),
    }
}
