// Core data structures for stockwatch

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Store (vendor) enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreType {
    Flipkart,
    RelianceDigital,
    Amazon,
    Croma,
    Iqoo,
    Vivo,
    Unicorn,
    VijaySales,
}

impl StoreType {
    /// Stores whose products come from the catalog
    pub const CATALOG: [StoreType; 6] = [
        Self::Flipkart,
        Self::RelianceDigital,
        Self::Amazon,
        Self::Croma,
        Self::Iqoo,
        Self::Vivo,
    ];

    /// Stores with a hardcoded variant list
    pub const FIXED: [StoreType; 2] = [Self::Unicorn, Self::VijaySales];

    /// Get all stores
    pub fn all() -> Vec<Self> {
        Self::CATALOG.iter().chain(Self::FIXED.iter()).copied().collect()
    }

    /// Get string representation (matches the catalog `store_type` column)
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Flipkart => "flipkart",
            Self::RelianceDigital => "reliance_digital",
            Self::Amazon => "amazon",
            Self::Croma => "croma",
            Self::Iqoo => "iqoo",
            Self::Vivo => "vivo",
            Self::Unicorn => "unicorn",
            Self::VijaySales => "vijay_sales",
        }
    }

    /// Human readable name used in alert headers
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Flipkart => "Flipkart",
            Self::RelianceDigital => "Reliance Digital",
            Self::Amazon => "Amazon",
            Self::Croma => "Croma",
            Self::Iqoo => "Iqoo",
            Self::Vivo => "Vivo",
            Self::Unicorn => "Unicorn",
            Self::VijaySales => "Vijay Sales",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Self::Croma => "🟢",
            Self::Flipkart => "🟣",
            Self::Amazon => "🟡",
            Self::Unicorn => "🦄",
            Self::Iqoo => "📱",
            Self::Vivo => "🤳",
            Self::RelianceDigital => "🌐",
            Self::VijaySales => "🛍️",
        }
    }

    /// Environment variable holding the Telegram topic for this store
    pub fn topic_env_key(&self) -> &'static str {
        match self {
            Self::Flipkart => "FLIPKART_TOPIC_ID",
            Self::RelianceDigital => "RELIANCE_TOPIC_ID",
            Self::Amazon => "AMAZON_TOPIC_ID",
            Self::Croma => "CROMA_TOPIC_ID",
            Self::Iqoo => "IQOO_TOPIC_ID",
            Self::Vivo => "VIVO_TOPIC_ID",
            Self::Unicorn => "UNICORN_TOPIC_ID",
            Self::VijaySales => "VIJAY_SALES_TOPIC_ID",
        }
    }

    /// Whether products for this store are read from the catalog
    pub fn is_catalog_driven(&self) -> bool {
        Self::CATALOG.contains(self)
    }

    /// Create from the catalog string
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "flipkart" => Some(Self::Flipkart),
            "reliance_digital" => Some(Self::RelianceDigital),
            "amazon" => Some(Self::Amazon),
            "croma" => Some(Self::Croma),
            "iqoo" => Some(Self::Iqoo),
            "vivo" => Some(Self::Vivo),
            "unicorn" => Some(Self::Unicorn),
            "vijay_sales" => Some(Self::VijaySales),
            _ => None,
        }
    }
}

impl std::fmt::Display for StoreType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A tracked product loaded from the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub name: String,
    pub url: String,
    pub product_id: String, // Vendor-side id: FSN, article id, ASIN, SPU id...
    pub store_type: StoreType,
    #[serde(default)]
    pub affiliate_link: Option<String>,
    #[serde(default)]
    pub part_number: Option<String>,
}

impl Product {
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        product_id: impl Into<String>,
        store_type: StoreType,
    ) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            product_id: product_id.into(),
            store_type,
            affiliate_link: None,
            part_number: None,
        }
    }

    pub fn with_affiliate_link(mut self, link: impl Into<String>) -> Self {
        self.affiliate_link = Some(link.into());
        self
    }

    /// Link used in alerts: affiliate link when set, product url otherwise
    pub fn link(&self) -> &str {
        match self.affiliate_link.as_deref() {
            Some(link) if !link.trim().is_empty() => link,
            _ => &self.url,
        }
    }

    /// Markdown link `[name](link)` used as the first line of every alert block
    pub fn markdown_link(&self) -> String {
        format!("[{}]({})", self.name, self.link())
    }
}

/// Hardcoded product descriptor for stores without catalog entries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedVariant {
    pub name: &'static str,
    pub url: &'static str,
    /// Store-specific id: color option id (Unicorn) or van number (Vijay Sales)
    pub variant_id: &'static str,
}

impl FixedVariant {
    pub fn to_product(&self, store_type: StoreType) -> Product {
        Product::new(self.name, self.url, self.variant_id, store_type)
    }
}

/// Per-store result of one cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    pub total: usize,
    pub found: usize,
}

impl CheckResult {
    pub fn new(total: usize, found: usize) -> Self {
        Self { total, found }
    }
}

/// Summary of one full cycle across every store
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub stores: BTreeMap<StoreType, CheckResult>,
    pub duration: Duration,
}

impl CycleReport {
    pub fn total_tracked(&self) -> usize {
        self.stores.values().map(|r| r.total).sum()
    }

    pub fn total_found(&self) -> usize {
        self.stores.values().map(|r| r.found).sum()
    }

    /// Stores that reported at least one available product
    pub fn stores_with_stock(&self) -> Vec<StoreType> {
        self.stores
            .iter()
            .filter(|(_, r)| r.found > 0)
            .map(|(s, _)| *s)
            .collect()
    }
}
