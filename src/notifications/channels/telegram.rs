//! Telegram Bot API channel
//!
//! Posts alerts with `sendMessage` into a group, optionally into a forum
//! topic. Messages are never retried; the next cycle is the retry.

use async_trait::async_trait;
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use reqwest::Client;
use std::num::NonZeroU32;
use std::time::Duration;

use super::{Channel, ChannelError, ChannelResult, DeliveryStatus};
use crate::config::TelegramConfig;
use crate::notifications::Alert;
use crate::utils::truncate_text;

const CHANNEL_NAME: &str = "telegram";
const MAX_ERROR_BODY_CHARS: usize = 500;

/// Telegram notification channel
///
/// One instance is shared by every store task so the rate limiter covers
/// the whole group.
pub struct TelegramChannel {
    config: TelegramConfig,
    client: Client,
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
}

impl TelegramChannel {
    /// Create a new Telegram channel
    ///
    /// Missing token or chat id is not an error here: sends are then
    /// reported as failed deliveries so the rest of the cycle still runs.
    pub fn new(config: TelegramConfig) -> ChannelResult<Self> {
        if !config.api_base.starts_with("http://") && !config.api_base.starts_with("https://") {
            return Err(ChannelError::InvalidConfig(format!(
                "Telegram API base must start with http:// or https://, got '{}'",
                config.api_base
            )));
        }

        if config.timeout_secs == 0 {
            return Err(ChannelError::InvalidConfig(
                "Timeout must be greater than 0".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ChannelError::Client(e.to_string()))?;

        let per_minute = NonZeroU32::new(config.messages_per_minute).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = RateLimiter::direct(Quota::per_minute(per_minute));

        Ok(Self {
            config,
            client,
            rate_limiter,
        })
    }

    /// Whether both the bot token and the chat id are set
    pub fn is_configured(&self) -> bool {
        self.credentials().is_some()
    }

    fn credentials(&self) -> Option<(&str, &str)> {
        let token = self.config.bot_token.as_deref().filter(|t| !t.trim().is_empty())?;
        let chat = self.config.chat_id.as_deref().filter(|c| !c.trim().is_empty())?;
        Some((token, chat))
    }

    fn send_url(&self, token: &str) -> String {
        format!(
            "{}/bot{}/sendMessage",
            self.config.api_base.trim_end_matches('/'),
            token
        )
    }

    /// Build the `sendMessage` body
    ///
    /// A thread id that is not an integer is dropped, so the message lands
    /// in the main group instead.
    pub fn build_payload(chat_id: &str, alert: &Alert) -> serde_json::Value {
        let mut payload = serde_json::json!({
            "chat_id": chat_id,
            "text": alert.text,
            "parse_mode": "Markdown",
            "disable_web_page_preview": true,
        });

        if let Some(thread) = alert.thread_id.as_deref().map(str::trim) {
            match thread.parse::<i64>() {
                Ok(id) => payload["message_thread_id"] = serde_json::json!(id),
                Err(_) => tracing::warn!(
                    store = %alert.store,
                    thread_id = thread,
                    "Invalid topic id, sending to main group"
                ),
            }
        }

        payload
    }
}

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        CHANNEL_NAME
    }

    async fn send(&self, alert: &Alert) -> ChannelResult<DeliveryStatus> {
        let Some((token, chat_id)) = self.credentials() else {
            tracing::warn!(store = %alert.store, "Telegram bot token or chat id not set, alert not sent");
            return Ok(DeliveryStatus::failed(
                alert,
                "bot token or chat id not configured",
            ));
        };

        let payload = Self::build_payload(chat_id, alert);
        self.rate_limiter.until_ready().await;

        match self.client.post(self.send_url(token)).json(&payload).send().await {
            Ok(response) if response.status().is_success() => {
                tracing::info!(store = %alert.store, "Telegram alert sent");
                Ok(DeliveryStatus::delivered(alert))
            }
            Ok(response) => {
                let status = response.status();
                let body = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unable to read response body".to_string());
                let body = truncate_text(&body, MAX_ERROR_BODY_CHARS);
                tracing::error!(store = %alert.store, status = %status, "Telegram rejected alert: {}", body);
                Ok(DeliveryStatus::failed(alert, format!("HTTP {status}: {body}")))
            }
            Err(e) => {
                // reqwest errors carry the URL, which contains the token
                let e = e.without_url();
                tracing::error!(store = %alert.store, "Failed to send Telegram alert: {}", e);
                Ok(DeliveryStatus::failed(alert, e.to_string()))
            }
        }
    }

    fn config(&self) -> serde_json::Value {
        serde_json::json!({
            "name": self.name(),
            "api_base": self.config.api_base,
            "has_token": self.config.bot_token.is_some(),
            "chat_id": self.config.chat_id,
            "topics": self.config.topics,
            "timeout_secs": self.config.timeout_secs,
            "messages_per_minute": self.config.messages_per_minute,
        })
    }
}
