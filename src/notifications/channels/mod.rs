//! Delivery channels for stock alerts

pub mod telegram;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;

use crate::models::StoreType;
use crate::notifications::Alert;

pub type ChannelResult<T> = Result<T, ChannelError>;

/// Problems with the channel itself, as opposed to one undelivered alert
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("HTTP client unavailable: {0}")]
    Client(String),
}

/// What happened to one alert
#[derive(Debug, Clone)]
pub struct DeliveryStatus {
    pub store: StoreType,
    /// Topic the alert was addressed to; `None` is the main group
    pub thread_id: Option<String>,
    pub delivered: bool,
    /// Failure reason, already stripped of secrets
    pub detail: Option<String>,
    pub attempted_at: DateTime<Utc>,
}

impl DeliveryStatus {
    pub fn delivered(alert: &Alert) -> Self {
        Self {
            store: alert.store,
            thread_id: alert.thread_id.clone(),
            delivered: true,
            detail: None,
            attempted_at: Utc::now(),
        }
    }

    pub fn failed(alert: &Alert, reason: impl Into<String>) -> Self {
        Self {
            delivered: false,
            detail: Some(reason.into()),
            ..Self::delivered(alert)
        }
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let outcome = if self.delivered { "delivered" } else { "not delivered" };
        write!(f, "{} alert {outcome}", self.store.display_name())?;
        match &self.thread_id {
            Some(thread) => write!(f, " (topic {thread})")?,
            None => write!(f, " (main group)")?,
        }
        if let Some(detail) = &self.detail {
            write!(f, ": {detail}")?;
        }
        Ok(())
    }
}

/// Somewhere alerts can be posted
///
/// Undeliverable alerts come back as a failed [`DeliveryStatus`]; `Err`
/// means the channel itself is unusable.
#[async_trait]
pub trait Channel: Send + Sync {
    fn name(&self) -> &str;

    async fn send(&self, alert: &Alert) -> ChannelResult<DeliveryStatus>;

    /// Settings for diagnostics, secrets redacted
    fn config(&self) -> serde_json::Value {
        serde_json::json!({ "name": self.name() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alert(thread_id: Option<&str>) -> Alert {
        Alert {
            store: StoreType::VijaySales,
            text: "🔥 *Stock Alert: Vijay Sales* 🛍️\n\n[X](u)".to_string(),
            thread_id: thread_id.map(str::to_string),
        }
    }

    #[test]
    fn test_status_carries_store_and_topic() {
        let status = DeliveryStatus::delivered(&alert(Some("17")));
        assert!(status.delivered);
        assert_eq!(status.store, StoreType::VijaySales);
        assert_eq!(status.thread_id.as_deref(), Some("17"));
        assert_eq!(status.to_string(), "Vijay Sales alert delivered (topic 17)");
    }

    #[test]
    fn test_failed_status_display() {
        let status = DeliveryStatus::failed(&alert(None), "HTTP 400");
        assert!(!status.delivered);
        assert_eq!(
            status.to_string(),
            "Vijay Sales alert not delivered (main group): HTTP 400"
        );
    }
}
