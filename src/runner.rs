//! Per-store check loop
//!
//! A [`StoreRunner`] walks one store's products, applies the checker's
//! pacing and pincode policy, and sends at most one alert for the store.

use rand::Rng;
use std::sync::Arc;
use std::time::Duration;

use crate::checker::{Pacing, StockChecker};
use crate::error::Error;
use crate::metrics;
use crate::models::{CheckResult, Product, StoreType};
use crate::notifications::{Alert, Channel};

/// Runs every check for one store and reports the result
pub struct StoreRunner {
    checker: Arc<dyn StockChecker>,
    notifier: Arc<dyn Channel>,
    pincodes: Arc<[String]>,
    pacing: (Duration, Duration),
    thread_id: Option<String>,
}

impl StoreRunner {
    pub fn new(checker: Arc<dyn StockChecker>, notifier: Arc<dyn Channel>) -> Self {
        Self {
            checker,
            notifier,
            pincodes: Arc::from(Vec::new()),
            pacing: (Duration::ZERO, Duration::ZERO),
            thread_id: None,
        }
    }

    /// Candidate pincodes, tried in order
    pub fn with_pincodes(mut self, pincodes: Arc<[String]>) -> Self {
        self.pincodes = pincodes;
        self
    }

    /// Range of the randomized delay between vendor requests
    pub fn with_pacing(mut self, min: Duration, max: Duration) -> Self {
        self.pacing = (min, max.max(min));
        self
    }

    /// Telegram topic for this store's alerts
    pub fn with_thread_id(mut self, thread_id: Option<String>) -> Self {
        self.thread_id = thread_id;
        self
    }

    pub fn store(&self) -> StoreType {
        self.checker.store()
    }

    /// Check every product, then send one alert if anything was found
    ///
    /// Never fails: vendor and delivery problems are logged.
    pub async fn run(&self, products: &[Product]) -> CheckResult {
        let store = self.store();
        tracing::debug!(store = %store, products = products.len(), "Starting store checks");

        let mut blocks = Vec::new();
        for product in products {
            if let Some(block) = self.check_product(product).await {
                blocks.push(block);
            }
        }

        let found = blocks.len();
        match Alert::compose(store, &blocks, self.thread_id.clone()) {
            Some(alert) => self.deliver(&alert).await,
            None => tracing::info!(store = %store, "No stock found, skipping alert"),
        }

        CheckResult::new(products.len(), found)
    }

    /// One product: a single call, or a pincode sweep that stops at the
    /// first available pincode
    async fn check_product(&self, product: &Product) -> Option<String> {
        if !self.checker.pincode_sensitive() {
            return self.checker.check(product, None).await;
        }

        if self.checker.pacing() == Pacing::PerProduct {
            self.pause().await;
        }

        for pincode in self.pincodes.iter() {
            if self.checker.pacing() == Pacing::PerRequest {
                self.pause().await;
            }
            if let Some(block) = self.checker.check(product, Some(pincode)).await {
                return Some(block);
            }
        }
        None
    }

    async fn deliver(&self, alert: &Alert) {
        match self.notifier.send(alert).await {
            Ok(status) => {
                if !status.delivered {
                    tracing::warn!(store = %status.store, "{}", status);
                }
                metrics::record_alert(status.store, status.delivered);
            }
            Err(e) => {
                let e = Error::from(e);
                tracing::error!(
                    store = %alert.store,
                    recoverable = e.is_recoverable(),
                    "Alert channel error: {}",
                    e
                );
                metrics::record_alert(alert.store, false);
            }
        }
    }

    async fn pause(&self) {
        let delay = pacing_delay(self.pacing.0, self.pacing.1);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

/// Uniform random delay in `[min, max]`
pub fn pacing_delay(min: Duration, max: Duration) -> Duration {
    let (lo, hi) = (min.as_millis() as u64, max.as_millis() as u64);
    if hi <= lo {
        return min;
    }
    Duration::from_millis(rand::thread_rng().gen_range(lo..=hi))
}
