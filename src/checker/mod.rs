//! Vendor availability checkers
//!
//! Each vendor integration implements [`StockChecker`]. A checker takes one
//! product (and, for serviceability APIs, one pincode), performs a single
//! HTTP call and turns the vendor's response into an alert block or nothing.
//!
//! Checkers never fail outward: [`StockChecker::check`] logs any transport,
//! status or decoding problem and reports "not available".

pub mod amazon;
pub mod croma;
pub mod flipkart;
pub mod mshop;
pub mod reliance;
pub mod unicorn;
pub mod vijay_sales;

use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE, USER_AGENT},
    Client, Proxy, Response,
};
use serde::de::DeserializeOwned;
use std::sync::Arc;

use crate::config::{Config, HttpConfig};
use crate::metrics;
use crate::models::{Product, StoreType};
use crate::utils::error::CheckError;

pub use amazon::AmazonChecker;
pub use croma::CromaChecker;
pub use flipkart::FlipkartChecker;
pub use mshop::{MshopBrand, MshopChecker};
pub use reliance::RelianceDigitalChecker;
pub use unicorn::UnicornChecker;
pub use vijay_sales::VijaySalesChecker;

/// Result of a single probe: an alert block when available
pub type ProbeResult = Result<Option<String>, CheckError>;

/// Where the runner inserts randomized pacing delays
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pacing {
    /// No delay
    None,
    /// One delay before each product's pincode sweep
    PerProduct,
    /// One delay before every request
    PerRequest,
}

/// Contract shared by every vendor integration
#[async_trait]
pub trait StockChecker: Send + Sync {
    /// Store this checker talks to
    fn store(&self) -> StoreType;

    /// Whether availability depends on a delivery pincode
    fn pincode_sensitive(&self) -> bool {
        false
    }

    /// Pacing policy applied by the runner
    fn pacing(&self) -> Pacing {
        if self.pincode_sensitive() {
            Pacing::PerProduct
        } else {
            Pacing::None
        }
    }

    /// Query the vendor once
    async fn probe(&self, product: &Product, pincode: Option<&str>) -> ProbeResult;

    /// Query the vendor once, converting every failure into "not available"
    async fn check(&self, product: &Product, pincode: Option<&str>) -> Option<String> {
        let store = self.store();
        let pin = pincode.unwrap_or("-");

        match self.probe(product, pincode).await {
            Ok(Some(message)) => {
                tracing::info!(store = %store, product = %product.name, pincode = %pin, "✅ available");
                metrics::record_check(store, metrics::CheckOutcome::Available);
                Some(message)
            }
            Ok(None) => {
                tracing::info!(store = %store, product = %product.name, pincode = %pin, "❌ not available");
                metrics::record_check(store, metrics::CheckOutcome::Unavailable);
                None
            }
            Err(e) if e.is_configuration() => {
                tracing::warn!(store = %store, product = %product.name, "Skipping check: {}", e);
                metrics::record_check(store, metrics::CheckOutcome::Unconfigured);
                None
            }
            Err(e) => {
                tracing::error!(
                    store = %store,
                    product = %product.name,
                    pincode = %pin,
                    "Check failed: {}",
                    e
                );
                metrics::record_check(store, metrics::CheckOutcome::Error);
                None
            }
        }
    }
}

/// Build the HTTP client shared by all checkers
///
/// Timeouts are applied per request since vendors differ.
pub fn build_client(http: &HttpConfig) -> Result<Client, CheckError> {
    let mut builder = Client::builder().gzip(true);

    if let Some(proxy_url) = &http.proxy_url {
        let proxy = Proxy::all(proxy_url.as_str())
            .map_err(|_| CheckError::InvalidUrl(proxy_url.clone()))?;
        builder = builder.proxy(proxy);
    }

    Ok(builder.build()?)
}

/// Browser-like headers sent to every vendor
pub fn default_headers(user_agent: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();

    if let Ok(ua) = HeaderValue::from_str(user_agent) {
        headers.insert(USER_AGENT, ua);
    }
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("application/json, text/plain, */*"),
    );
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    headers
}

/// Insert a header, ignoring values that are not valid header text
pub(crate) fn set_header(headers: &mut HeaderMap, name: &str, value: &str) {
    if let (Ok(name), Ok(value)) = (
        HeaderName::from_bytes(name.as_bytes()),
        HeaderValue::from_str(value),
    ) {
        headers.insert(name, value);
    }
}

/// Check the status and decode a JSON body
pub(crate) async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, CheckError> {
    let status = response.status();
    if !status.is_success() {
        return Err(CheckError::Status(status.as_u16()));
    }

    let bytes = response.bytes().await.map_err(CheckError::from_transport)?;
    serde_json::from_slice(&bytes).map_err(|e| CheckError::Decode(e.to_string()))
}

/// Render a JSON scalar for display (strings without quotes)
pub(crate) fn display_value(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Interpret a JSON number or numeric string as an integer
pub(crate) fn as_integer(value: &serde_json::Value) -> Option<i64> {
    match value {
        serde_json::Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        serde_json::Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f as i64))
        }
        _ => None,
    }
}

/// Format an integer with comma thousands separators (`79900` -> `79,900`)
pub fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    if value < 0 {
        format!("-{out}")
    } else {
        out
    }
}

/// Create the checker for a store
pub fn checker_for(store: StoreType, client: &Client, config: &Config) -> Arc<dyn StockChecker> {
    match store {
        StoreType::Flipkart => Arc::new(FlipkartChecker::new(client.clone(), config)),
        StoreType::RelianceDigital => Arc::new(RelianceDigitalChecker::new(client.clone(), config)),
        StoreType::Amazon => Arc::new(AmazonChecker::new(client.clone(), config)),
        StoreType::Croma => Arc::new(CromaChecker::new(client.clone(), config)),
        StoreType::Iqoo => Arc::new(MshopChecker::new(client.clone(), config, MshopBrand::Iqoo)),
        StoreType::Vivo => Arc::new(MshopChecker::new(client.clone(), config, MshopBrand::Vivo)),
        StoreType::Unicorn => Arc::new(UnicornChecker::new(client.clone(), config)),
        StoreType::VijaySales => Arc::new(VijaySalesChecker::new(client.clone(), config)),
    }
}

/// Hardcoded products for stores that are not catalog-driven
pub fn fixed_products(store: StoreType) -> Vec<Product> {
    match store {
        StoreType::Unicorn => unicorn::VARIANTS
            .iter()
            .map(|v| v.to_product(StoreType::Unicorn))
            .collect(),
        StoreType::VijaySales => vijay_sales::VARIANTS
            .iter()
            .map(|v| v.to_product(StoreType::VijaySales))
            .collect(),
        _ => Vec::new(),
    }
}
