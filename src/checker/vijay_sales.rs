//! Vijay Sales serviceability checker for the fixed iPhone 17 256GB variants

use async_trait::async_trait;
use reqwest::{header::HeaderMap, Client};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

use super::{read_json, set_header, Pacing, ProbeResult, StockChecker};
use crate::config::Config;
use crate::models::{FixedVariant, Product, StoreType};
use crate::utils::error::CheckError;

const SERVICEABILITY_PATH: &str = "/web/api/oms/check-servicibility/v1";

/// Storage variants; `variant_id` is the van number
pub const VARIANTS: [FixedVariant; 5] = [
    FixedVariant {
        name: "iPhone 17 Mist Blue 256GB",
        url: "https://www.vijaysales.com/p/P245179/245181/apple-iphone-17-256gb-storage-mist-blue",
        variant_id: "245181",
    },
    FixedVariant {
        name: "iPhone 17 Black 256GB",
        url: "https://www.vijaysales.com/p/P245179/245179/apple-iphone-17-256gb-storage-black",
        variant_id: "245179",
    },
    FixedVariant {
        name: "iPhone 17 White 256GB",
        url: "https://www.vijaysales.com/p/P245179/245180/apple-iphone-17-256gb-storage-white",
        variant_id: "245180",
    },
    FixedVariant {
        name: "iPhone 17 Lavender 256GB",
        url: "https://www.vijaysales.com/p/P245179/245182/apple-iphone-17-256gb-storage-lavender",
        variant_id: "245182",
    },
    FixedVariant {
        name: "iPhone 17 Sage 256GB",
        url: "https://www.vijaysales.com/p/P245179/245183/apple-iphone-17-256gb-storage-sage",
        variant_id: "245183",
    },
];

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ServiceabilityResponse {
    data: HashMap<String, VanDetail>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct VanDetail {
    is_serviceable: Value,
    store_pickup_list: Vec<Value>,
}

impl VanDetail {
    fn delivery(&self) -> bool {
        truthy(&self.is_serviceable)
    }

    fn pickup(&self) -> bool {
        !self.store_pickup_list.is_empty()
    }
}

/// Loose flag reading: the API has sent booleans, `1` and `"true"`
fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "YES"
    } else {
        "NO"
    }
}

/// Checks Vijay Sales home delivery and store pickup for one van number
pub struct VijaySalesChecker {
    client: Client,
    endpoint: String,
    user_agent: String,
    timeout: Duration,
}

impl VijaySalesChecker {
    pub fn new(client: Client, config: &Config) -> Self {
        Self {
            client,
            endpoint: format!(
                "{}{}",
                config.endpoints.vijay_sales.trim_end_matches('/'),
                SERVICEABILITY_PATH
            ),
            user_agent: config.http.user_agent.clone(),
            timeout: config.request_timeout(),
        }
    }
}

#[async_trait]
impl StockChecker for VijaySalesChecker {
    fn store(&self) -> StoreType {
        StoreType::VijaySales
    }

    fn pincode_sensitive(&self) -> bool {
        true
    }

    fn pacing(&self) -> Pacing {
        Pacing::PerRequest
    }

    async fn probe(&self, product: &Product, pincode: Option<&str>) -> ProbeResult {
        let pincode = pincode.ok_or_else(|| CheckError::Api("pincode required".to_string()))?;
        let van = product.product_id.as_str();

        let mut headers = HeaderMap::new();
        set_header(&mut headers, "accept", "*/*");
        set_header(&mut headers, "origin", "https://www.vijaysales.com");
        set_header(&mut headers, "referer", "https://www.vijaysales.com/");
        set_header(&mut headers, "user-agent", &self.user_agent);

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("pincode", pincode), ("vanNo", van), ("storeList", "true")])
            .headers(headers)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(CheckError::from_transport)?;

        let body: ServiceabilityResponse = read_json(response).await?;
        let detail = match body.data.get(van) {
            Some(detail) => detail,
            None => return Ok(None),
        };

        let (delivery, pickup) = (detail.delivery(), detail.pickup());
        if !delivery && !pickup {
            return Ok(None);
        }

        Ok(Some(format!(
            "{}\n📦 Delivery: {}, 🏬 Pickup: {}\n📍 Pincode: {}",
            product.markdown_link(),
            yes_no(delivery),
            yes_no(pickup),
            pincode
        )))
    }
}
