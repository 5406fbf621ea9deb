// src/notify/mod.rs
pub mod telegram;

use anyhow::Result;

use crate::config::AppConfig;
use crate::ingest::types::RawNotice;

pub use telegram::TelegramNotifier;

#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, text: &str) -> Result<()>;
}

/// Fixed header context embedded in every notice message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoticeContext {
    pub server: String,
    pub category: String,
    pub keyword: String,
}

impl NoticeContext {
    pub fn from_config(cfg: &AppConfig) -> Self {
        Self {
            server: cfg.server_name.clone(),
            category: cfg.category_name.clone(),
            keyword: cfg.filter.keyword.clone(),
        }
    }

    fn scope_label(&self) -> String {
        match (self.server.trim(), self.category.trim()) {
            ("", "") => String::new(),
            (s, "") => s.to_uppercase(),
            ("", c) => c.to_string(),
            (s, c) => format!("{} – {}", s.to_uppercase(), c),
        }
    }
}

pub fn format_notice(ctx: &NoticeContext, notice: &RawNotice) -> String {
    let scope = ctx.scope_label();
    let mut msg = if scope.is_empty() {
        "🔔 THÔNG BÁO".to_string()
    } else {
        format!("🔔 THÔNG BÁO {scope}")
    };
    if !ctx.keyword.is_empty() {
        msg.push_str(&format!("\nKeyword: {}", ctx.keyword.trim()));
    }
    msg.push_str("\n\n");
    msg.push_str(&notice.content);
    if let Some(ts) = notice.occurred_at.as_deref() {
        msg.push_str(&format!("\n🕒 {ts}"));
    }
    msg
}

pub fn format_error(err: &dyn std::fmt::Display) -> String {
    format!("⚠️ notice-watch error: {err}")
}

pub fn format_startup(ctx: &NoticeContext) -> String {
    let scope = ctx.scope_label();
    if scope.is_empty() {
        "🤖 notice-watch started".to_string()
    } else {
        format!("🤖 notice-watch started: {scope}")
    }
}

/// Send and forget: failures are logged, never returned.
pub async fn notify_best_effort(notifier: &dyn Notifier, text: &str) {
    if let Err(e) = notifier.send(text).await {
        tracing::debug!(error = %format!("{e:#}"), "best-effort notification dropped");
    }
}
