//! Common test utilities

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use stockwatch::catalog::ProductSource;
use stockwatch::config::{Config, EndpointConfig};
use stockwatch::error::CatalogError;
use stockwatch::models::Product;
use stockwatch::notifications::{Alert, Channel, ChannelResult, DeliveryStatus};

/// Config with every vendor pointed at `base` and pacing disabled
pub fn test_config(base: &str, pincodes: &[&str]) -> Config {
    let mut config = Config::default();
    config.endpoints = EndpointConfig::all(base);
    config.pincodes = pincodes.iter().map(|p| p.to_string()).collect();
    config.schedule.pacing_min_ms = 0;
    config.schedule.pacing_max_ms = 0;
    config.http.request_timeout_secs = 5;
    config.http.slow_request_timeout_secs = 5;
    config
}

/// Channel that records every alert instead of sending it
#[derive(Default)]
pub struct RecordingChannel {
    alerts: Mutex<Vec<Alert>>,
}

#[allow(dead_code)]
impl RecordingChannel {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn alerts(&self) -> Vec<Alert> {
        self.alerts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Channel for RecordingChannel {
    fn name(&self) -> &str {
        "recording"
    }

    async fn send(&self, alert: &Alert) -> ChannelResult<DeliveryStatus> {
        self.alerts.lock().unwrap().push(alert.clone());
        Ok(DeliveryStatus::delivered(alert))
    }
}

/// Catalog that is always down
#[allow(dead_code)]
pub struct FailingCatalog {
    pub calls: AtomicUsize,
}

#[allow(dead_code)]
impl FailingCatalog {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProductSource for FailingCatalog {
    fn describe(&self) -> String {
        "failing".to_string()
    }

    async fn load_products(&self) -> Result<Vec<Product>, CatalogError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(CatalogError::Connection("connection refused".to_string()))
    }
}

/// Catalog whose loads never finish, like a database that accepted the
/// connection and went quiet
#[allow(dead_code)]
pub struct HangingCatalog {
    started: Mutex<Vec<tokio::time::Instant>>,
    /// Signalled once `stop_after` loads have begun
    pub reached: Arc<tokio::sync::Notify>,
    stop_after: usize,
}

#[allow(dead_code)]
impl HangingCatalog {
    pub fn new(stop_after: usize) -> Arc<Self> {
        Arc::new(Self {
            started: Mutex::new(Vec::new()),
            reached: Arc::new(tokio::sync::Notify::new()),
            stop_after,
        })
    }

    pub fn starts(&self) -> Vec<tokio::time::Instant> {
        self.started.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProductSource for HangingCatalog {
    fn describe(&self) -> String {
        "hanging".to_string()
    }

    async fn load_products(&self) -> Result<Vec<Product>, CatalogError> {
        let begun = {
            let mut started = self.started.lock().unwrap();
            started.push(tokio::time::Instant::now());
            started.len()
        };
        if begun >= self.stop_after {
            self.reached.notify_one();
        }
        std::future::pending().await
    }
}
