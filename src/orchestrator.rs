//! One check cycle across every store
//!
//! The catalog is loaded once under the database timeout, partitioned by store, and each store is
//! handed to its own [`StoreRunner`] task. At most eight store tasks run at
//! a time. A task that panics is logged and counted as `found = 0` for its
//! store; the rest of the cycle is unaffected.

use async_trait::async_trait;
use futures::FutureExt;
use std::any::Any;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::catalog::ProductSource;
use crate::checker::{self, StockChecker};
use crate::config::Config;
use crate::error::{CatalogError, Error, Result};
use crate::metrics::{self, CycleStatus};
use crate::models::{CheckResult, CycleReport, Product, StoreType};
use crate::notifications::Channel;
use crate::runner::StoreRunner;

/// Upper bound on concurrently running store tasks
pub const MAX_CONCURRENT_STORES: usize = 8;

/// Result of a cycle that did not fail
#[derive(Debug, Clone)]
pub enum CycleOutcome {
    Completed(CycleReport),
    /// Nothing was checked (e.g. empty catalog)
    Skipped(String),
}

/// Anything the daemon can run once per cycle
#[async_trait]
pub trait CycleRunner: Send + Sync {
    async fn run_cycle(&self) -> Result<CycleOutcome>;
}

/// Coordinates catalog loading, store runners and result aggregation
pub struct Orchestrator {
    catalog: Arc<dyn ProductSource>,
    notifier: Arc<dyn Channel>,
    checkers: BTreeMap<StoreType, Arc<dyn StockChecker>>,
    topics: BTreeMap<StoreType, String>,
    pincodes: Arc<[String]>,
    pacing: (Duration, Duration),
    catalog_timeout: Duration,
    max_concurrency: usize,
}

impl Orchestrator {
    /// Build an orchestrator with a checker for every store
    pub fn new(
        config: &Config,
        catalog: Arc<dyn ProductSource>,
        notifier: Arc<dyn Channel>,
    ) -> Result<Self> {
        let client = checker::build_client(&config.http)?;
        let checkers = StoreType::all()
            .into_iter()
            .map(|store| (store, checker::checker_for(store, &client, config)))
            .collect();

        let topics = StoreType::all()
            .into_iter()
            .filter_map(|store| {
                config
                    .telegram
                    .topic_for(store)
                    .map(|topic| (store, topic.to_string()))
            })
            .collect();

        Ok(Self {
            catalog,
            notifier,
            checkers,
            topics,
            pincodes: Arc::from(config.pincodes.clone()),
            pacing: config.schedule.pacing(),
            catalog_timeout: config.database.timeout(),
            max_concurrency: MAX_CONCURRENT_STORES,
        })
    }

    /// Replace the checker used for its store
    pub fn with_checker(mut self, checker: Arc<dyn StockChecker>) -> Self {
        self.checkers.insert(checker.store(), checker);
        self
    }

    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max.max(1);
        self
    }

    fn runner_for(&self, store: StoreType) -> Option<StoreRunner> {
        let checker = self.checkers.get(&store)?.clone();
        Some(
            StoreRunner::new(checker, self.notifier.clone())
                .with_pincodes(self.pincodes.clone())
                .with_pacing(self.pacing.0, self.pacing.1)
                .with_thread_id(self.topics.get(&store).cloned()),
        )
    }

    /// Group catalog products by catalog-driven store
    pub fn partition(products: Vec<Product>) -> BTreeMap<StoreType, Vec<Product>> {
        let mut by_store: BTreeMap<StoreType, Vec<Product>> = StoreType::CATALOG
            .iter()
            .map(|store| (*store, Vec::new()))
            .collect();

        for product in products {
            if !product.store_type.is_catalog_driven() {
                tracing::debug!(
                    store = %product.store_type,
                    product = %product.name,
                    "Ignoring catalog row for non-catalog store"
                );
                continue;
            }
            by_store.entry(product.store_type).or_default().push(product);
        }
        by_store
    }

    async fn load_catalog(&self) -> std::result::Result<Vec<Product>, CatalogError> {
        match tokio::time::timeout(self.catalog_timeout, self.catalog.load_products()).await {
            Ok(loaded) => loaded,
            Err(_) => Err(CatalogError::Timeout(self.catalog_timeout.as_secs())),
        }
    }

    /// Run one full cycle
    pub async fn run_cycle(&self) -> Result<CycleOutcome> {
        let started = Instant::now();
        tracing::info!(catalog = %self.catalog.describe(), "Starting stock check cycle");

        let products = match self.load_catalog().await {
            Ok(products) => products,
            Err(e) => {
                tracing::error!("Could not load catalog: {}", e);
                metrics::record_cycle_status(CycleStatus::Failed);
                return Err(e.into());
            }
        };

        if products.is_empty() {
            let reason = "no products loaded from catalog".to_string();
            tracing::info!("Skipping cycle: {}", reason);
            metrics::record_cycle_status(CycleStatus::Skipped);
            return Ok(CycleOutcome::Skipped(reason));
        }

        let mut work: Vec<(StoreType, Vec<Product>)> = Vec::new();
        let mut report = CycleReport::default();

        for (store, list) in Self::partition(products) {
            report.stores.insert(store, CheckResult::new(list.len(), 0));
            if !list.is_empty() {
                work.push((store, list));
            }
        }
        for store in StoreType::FIXED {
            let list = checker::fixed_products(store);
            report.stores.insert(store, CheckResult::new(list.len(), 0));
            work.push((store, list));
        }

        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut tasks: JoinSet<(StoreType, std::result::Result<CheckResult, String>)> =
            JoinSet::new();

        for (store, list) in work {
            let Some(runner) = self.runner_for(store) else {
                tracing::warn!(store = %store, "No checker registered, skipping store");
                continue;
            };
            let semaphore = semaphore.clone();

            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                let result = AssertUnwindSafe(runner.run(&list))
                    .catch_unwind()
                    .await
                    .map_err(panic_message);
                (store, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((store, Ok(result))) => {
                    report.stores.insert(store, result);
                }
                Ok((store, Err(panic))) => {
                    tracing::error!(store = %store, "Store check panicked: {}", panic);
                }
                Err(e) => {
                    let e = Error::from(e);
                    tracing::error!(category = %e.category(), "Store task failed: {}", e);
                }
            }
        }

        report.duration = started.elapsed();
        tracing::info!(
            stores_with_stock = ?report.stores_with_stock(),
            found = report.total_found(),
            tracked = report.total_tracked(),
            duration_secs = report.duration.as_secs_f64(),
            "Finished check: found {}/{} products available",
            report.total_found(),
            report.total_tracked()
        );
        metrics::record_cycle(&report);

        Ok(CycleOutcome::Completed(report))
    }
}

#[async_trait]
impl CycleRunner for Orchestrator {
    async fn run_cycle(&self) -> Result<CycleOutcome> {
        Orchestrator::run_cycle(self).await
    }
}

/// Readable text from a panic payload
pub fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
