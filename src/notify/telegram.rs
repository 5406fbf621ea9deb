// src/notify/telegram.rs
use anyhow::{anyhow, Result};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use super::Notifier;
use crate::config::{AppConfig, Secret};

/// Upper bound on attempts per message.
pub const MAX_SEND_ATTEMPTS: u8 = 10;
const BACKOFF_BASE_MS: u64 = 500;
// 500 ms doubling, capped at 8 s
const BACKOFF_MAX_SHIFT: u8 = 4;

/// Pause after failed attempt `attempt` (1-based).
pub fn backoff_delay(attempt: u8) -> Duration {
    let shift = attempt.saturating_sub(1).min(BACKOFF_MAX_SHIFT);
    Duration::from_millis(BACKOFF_BASE_MS << shift)
}

/// Telegram Bot API `sendMessage` client.
#[derive(Clone)]
pub struct TelegramNotifier {
    api_base: String,
    token: Secret,
    chat_id: String,
    client: Client,
    timeout: Duration,
    max_attempts: u8,
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
}

impl TelegramNotifier {
    pub fn new(token: Secret, chat_id: impl Into<String>) -> Self {
        Self {
            api_base: crate::config::DEFAULT_TELEGRAM_API_BASE.to_string(),
            token,
            chat_id: chat_id.into(),
            client: Client::new(),
            timeout: Duration::from_secs(10),
            max_attempts: 2,
        }
    }

    pub fn from_config(cfg: &AppConfig) -> Self {
        Self::new(cfg.bot_token.clone(), cfg.chat_id.clone())
            .with_api_base(&cfg.telegram_api_base)
            .with_timeout(cfg.notify_timeout_secs)
            .with_retries(cfg.notify_retries)
    }

    pub fn with_api_base(mut self, base: &str) -> Self {
        self.api_base = base.trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    /// Total attempts per message, clamped to `1..=MAX_SEND_ATTEMPTS`.
    pub fn with_retries(mut self, attempts: u8) -> Self {
        self.max_attempts = attempts.clamp(1, MAX_SEND_ATTEMPTS);
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base, self.token.expose())
    }
}

#[async_trait::async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, text: &str) -> Result<()> {
        let payload = SendMessage {
            chat_id: &self.chat_id,
            text,
        };
        let url = self.endpoint();

        let mut attempt: u8 = 0;
        loop {
            attempt += 1;
            let res = self
                .client
                .post(&url)
                .timeout(self.timeout)
                .json(&payload)
                .send()
                .await;

            // Errors are rendered without the URL so the token never hits the logs.
            let err = match res {
                Ok(rsp) => match rsp.error_for_status() {
                    Ok(_) => return Ok(()),
                    Err(e) => anyhow!(
                        "telegram HTTP error: {}",
                        e.status().map(|s| s.to_string()).unwrap_or_default()
                    ),
                },
                Err(e) if e.is_timeout() => {
                    anyhow!("telegram request timed out after {:?}", self.timeout)
                }
                Err(e) => anyhow!("telegram request failed: {}", e.without_url()),
            };

            if attempt >= self.max_attempts {
                return Err(err);
            }
            tracing::debug!(attempt, error = %err, "telegram send failed, retrying");
            tokio::time::sleep(backoff_delay(attempt)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_then_caps() {
        assert_eq!(backoff_delay(1), Duration::from_millis(500));
        assert_eq!(backoff_delay(2), Duration::from_millis(1_000));
        assert_eq!(backoff_delay(5), Duration::from_secs(8));
        assert_eq!(backoff_delay(6), Duration::from_secs(8));
        // no overflow at the top of the range
        assert_eq!(backoff_delay(u8::MAX), Duration::from_secs(8));
        assert_eq!(backoff_delay(0), Duration::from_millis(500));
    }

    #[test]
    fn attempts_are_clamped() {
        let n = TelegramNotifier::new(Secret::new("t"), "1");
        assert_eq!(n.clone().with_retries(0).max_attempts, 1);
        assert_eq!(n.clone().with_retries(70).max_attempts, MAX_SEND_ATTEMPTS);
        assert_eq!(n.with_retries(3).max_attempts, 3);
    }
}
