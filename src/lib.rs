//! stockwatch - stock availability watcher for Indian e-commerce stores
//!
//! Polls vendor APIs for a catalog of tracked products and posts one
//! Telegram alert per store whenever something is in stock.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Configuration loaded once at startup
//! - [`models`] - Stores, products and cycle results
//! - [`catalog`] - Product catalog sources (PostgreSQL, JSON file)
//! - [`checker`] - One availability checker per vendor API
//! - [`signer`] - AWS Signature Version 4 for the Amazon PA-API
//! - [`runner`] - Per-store check loop with pincode fallback and pacing
//! - [`orchestrator`] - One cycle across all stores, in parallel
//! - [`scheduler`] - The long-running daemon loop
//! - [`notifications`] - Alert composition and the Telegram channel
//! - [`metrics`] - Prometheus metrics and the `/metrics` endpoint
//! - [`utils`] - Common utilities and error types
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use stockwatch::catalog::open_catalog;
//! use stockwatch::config::Config;
//! use stockwatch::notifications::TelegramChannel;
//! use stockwatch::orchestrator::Orchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let notifier = Arc::new(TelegramChannel::new(config.telegram.clone())?);
//!     let catalog = open_catalog(&config.database, None)?;
//!     let orchestrator = Orchestrator::new(&config, catalog, notifier)?;
//!     orchestrator.run_cycle().await?;
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod checker;
pub mod config;
pub mod error;
pub mod metrics;
pub mod models;
pub mod notifications;
pub mod orchestrator;
pub mod runner;
pub mod scheduler;
pub mod signer;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::catalog::{open_catalog, ProductSource};
    pub use crate::checker::StockChecker;
    pub use crate::config::Config;
    pub use crate::error::{Error, ErrorCategory, Result};
    pub use crate::models::{CheckResult, CycleReport, Product, StoreType};
    pub use crate::notifications::{Alert, Channel, TelegramChannel};
    pub use crate::orchestrator::{CycleOutcome, CycleRunner, Orchestrator};
    pub use crate::scheduler::Daemon;
}

// Direct re-exports for convenience
pub use models::{CheckResult, CycleReport, Product, StoreType};
