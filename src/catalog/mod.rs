//! Product catalog sources
//!
//! The catalog is read once per cycle. Three sources exist:
//!
//! - [`PostgresCatalog`]: the `products` table of the shared database
//! - [`FileCatalog`]: a JSON array on disk, for local runs
//! - [`StaticCatalog`]: an in-memory list
//!
//! Rows whose store type is not recognized are skipped with a warning.
//! Every pool operation against the database is bounded by
//! [`DatabaseConfig::timeout_secs`].

use async_trait::async_trait;
use deadpool_postgres::{
    Config as PoolConfig, ManagerConfig, Pool, PoolError, RecyclingMethod, Runtime, Timeouts,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_postgres::NoTls;

use crate::config::DatabaseConfig;
use crate::models::{Product, StoreType};
use crate::utils::error::CatalogError;

const PRODUCTS_QUERY: &str =
    "SELECT name, url, product_id, store_type, affiliate_link, part_number FROM products";

/// A source of tracked products
#[async_trait]
pub trait ProductSource: Send + Sync {
    /// Short description for logs
    fn describe(&self) -> String;

    /// Load every tracked product
    async fn load_products(&self) -> Result<Vec<Product>, CatalogError>;
}

/// One catalog row before validation
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogRecord {
    pub name: Option<String>,
    pub url: Option<String>,
    #[serde(alias = "product_id")]
    pub product_id: Option<String>,
    #[serde(alias = "store_type")]
    pub store_type: Option<String>,
    #[serde(default, alias = "affiliate_link")]
    pub affiliate_link: Option<String>,
    #[serde(default, alias = "part_number")]
    pub part_number: Option<String>,
}

impl CatalogRecord {
    /// Convert into a product; `None` when a required column is missing
    /// or the store type is unknown
    pub fn into_product(self) -> Option<Product> {
        let store_raw = self.store_type?;
        let Some(store_type) = StoreType::parse(&store_raw) else {
            tracing::debug!(store_type = %store_raw, "Skipping product with unknown store type");
            return None;
        };

        let name = self.name.filter(|s| !s.trim().is_empty())?;
        let url = self.url.unwrap_or_default();
        let product_id = self.product_id.filter(|s| !s.trim().is_empty())?;

        Some(Product {
            name,
            url,
            product_id,
            store_type,
            affiliate_link: self.affiliate_link,
            part_number: self.part_number,
        })
    }
}

fn collect_products(records: Vec<CatalogRecord>) -> Vec<Product> {
    let total = records.len();
    let products: Vec<Product> = records
        .into_iter()
        .filter_map(CatalogRecord::into_product)
        .collect();

    if products.len() < total {
        tracing::warn!(
            skipped = total - products.len(),
            "Some catalog rows were skipped"
        );
    }
    products
}

/// Catalog backed by the PostgreSQL `products` table
pub struct PostgresCatalog {
    pool: Pool,
    timeout_secs: u64,
}

impl PostgresCatalog {
    /// Create the connection pool; connections are opened lazily
    ///
    /// Waiting for a slot, opening a connection and recycling one are all
    /// bounded, so a server that accepts TCP but never answers surfaces as
    /// [`CatalogError::Timeout`].
    pub fn new(config: &DatabaseConfig) -> Result<Self, CatalogError> {
        let url = config
            .url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| CatalogError::NotConfigured("DATABASE_URL is not set".to_string()))?;

        let timeout = config.timeout();
        let mut pool_config = PoolConfig::new();
        pool_config.url = Some(url.to_string());
        pool_config.connect_timeout = Some(timeout);
        pool_config.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });

        let mut pool_settings = deadpool_postgres::PoolConfig::new(config.pool_size);
        pool_settings.timeouts = Timeouts {
            wait: Some(timeout),
            create: Some(timeout),
            recycle: Some(timeout),
        };
        pool_config.pool = Some(pool_settings);

        let pool = pool_config
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| CatalogError::Connection(format!("Failed to create pool: {e}")))?;

        Ok(Self {
            pool,
            timeout_secs: config.timeout_secs,
        })
    }

    fn pool_error(&self, err: PoolError) -> CatalogError {
        match err {
            PoolError::Timeout(_) => CatalogError::Timeout(self.timeout_secs),
            other => CatalogError::Connection(other.to_string()),
        }
    }
}

#[async_trait]
impl ProductSource for PostgresCatalog {
    fn describe(&self) -> String {
        "postgres".to_string()
    }

    async fn load_products(&self) -> Result<Vec<Product>, CatalogError> {
        tracing::info!("Connecting to database...");
        let client = self
            .pool
            .get()
            .await
            .map_err(|e| self.pool_error(e))?;

        let rows = client.query(PRODUCTS_QUERY, &[]).await?;

        let records = rows
            .iter()
            .map(|row| {
                Ok(CatalogRecord {
                    name: row.try_get(0)?,
                    url: row.try_get(1)?,
                    product_id: row.try_get(2)?,
                    store_type: row.try_get(3)?,
                    affiliate_link: row.try_get(4)?,
                    part_number: row.try_get(5)?,
                })
            })
            .collect::<Result<Vec<_>, tokio_postgres::Error>>()?;

        let products = collect_products(records);
        tracing::info!(count = products.len(), "Loaded products from database");
        Ok(products)
    }
}

/// Catalog read from a JSON file (array of products)
pub struct FileCatalog {
    path: PathBuf,
}

impl FileCatalog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ProductSource for FileCatalog {
    fn describe(&self) -> String {
        format!("file:{}", self.path.display())
    }

    async fn load_products(&self) -> Result<Vec<Product>, CatalogError> {
        let bytes = tokio::fs::read(&self.path).await?;
        let records: Vec<CatalogRecord> = serde_json::from_slice(&bytes)?;

        let products = collect_products(records);
        tracing::info!(
            count = products.len(),
            path = %self.path.display(),
            "Loaded products from file"
        );
        Ok(products)
    }
}

/// In-memory catalog
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    products: Vec<Product>,
}

impl StaticCatalog {
    pub fn new(products: Vec<Product>) -> Self {
        Self { products }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProductSource for StaticCatalog {
    fn describe(&self) -> String {
        format!("static({} products)", self.products.len())
    }

    async fn load_products(&self) -> Result<Vec<Product>, CatalogError> {
        Ok(self.products.clone())
    }
}

/// Pick the catalog source: an explicit file wins over the database
///
/// With neither configured the catalog is empty and every cycle is skipped.
pub fn open_catalog(
    config: &DatabaseConfig,
    catalog_file: Option<&Path>,
) -> Result<Arc<dyn ProductSource>, CatalogError> {
    if let Some(path) = catalog_file {
        return Ok(Arc::new(FileCatalog::new(path)));
    }

    if config.url.is_some() {
        return Ok(Arc::new(PostgresCatalog::new(config)?));
    }

    tracing::warn!("No DATABASE_URL or catalog file configured, catalog is empty");
    Ok(Arc::new(StaticCatalog::empty()))
}
