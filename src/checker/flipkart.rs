//! Flipkart serviceability checker

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;

use super::{default_headers, display_value, read_json, set_header, ProbeResult, StockChecker};
use crate::config::Config;
use crate::models::{Product, StoreType};
use crate::utils::error::CheckError;

const SERVICEABILITY_PATH: &str = "/api/3/product/serviceability";
const MOBILE_USER_AGENT: &str = "Mozilla/5.0 (Linux; Android 6.0; Nexus 5 Build/MRA58N)";
const FKUA: &str = "Mozilla/5.0 FKUA/msite/0.0.3/msite/Mobile";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ServiceabilityResponse {
    #[serde(rename = "RESPONSE")]
    response: HashMap<String, ProductServiceability>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ProductServiceability {
    listing_summary: ListingSummary,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ListingSummary {
    available: Option<bool>,
    pricing: Value,
}

impl ListingSummary {
    fn final_price(&self) -> Option<String> {
        self.pricing
            .get("finalPrice")
            .and_then(|p| p.get("decimalValue"))
            .and_then(display_value)
    }
}

/// Checks Flipkart delivery serviceability for one product and pincode
pub struct FlipkartChecker {
    client: Client,
    endpoint: String,
    user_agent: String,
    timeout: Duration,
}

impl FlipkartChecker {
    pub fn new(client: Client, config: &Config) -> Self {
        Self {
            client,
            endpoint: format!(
                "{}{}",
                config.endpoints.flipkart.trim_end_matches('/'),
                SERVICEABILITY_PATH
            ),
            user_agent: config.http.user_agent.clone(),
            timeout: config.slow_request_timeout(),
        }
    }

    fn payload(product_id: &str, pincode: &str) -> Value {
        json!({
            "requestContext": {
                "products": [{ "productId": product_id }],
                "marketplace": "FLIPKART"
            },
            "locationContext": { "pincode": pincode }
        })
    }
}

#[async_trait]
impl StockChecker for FlipkartChecker {
    fn store(&self) -> StoreType {
        StoreType::Flipkart
    }

    fn pincode_sensitive(&self) -> bool {
        true
    }

    async fn probe(&self, product: &Product, pincode: Option<&str>) -> ProbeResult {
        let pincode = pincode.ok_or_else(|| CheckError::Api("pincode required".to_string()))?;

        let mut headers = default_headers(&self.user_agent);
        set_header(&mut headers, "origin", "https://www.flipkart.com");
        set_header(&mut headers, "referer", "https://www.flipkart.com");
        set_header(&mut headers, "x-user-agent", FKUA);
        set_header(&mut headers, "flipkart_secure", "true");
        set_header(&mut headers, "user-agent", MOBILE_USER_AGENT);
        set_header(&mut headers, "accept", "application/json");
        set_header(&mut headers, "content-type", "application/json");

        let response = self
            .client
            .post(&self.endpoint)
            .headers(headers)
            .timeout(self.timeout)
            .json(&Self::payload(&product.product_id, pincode))
            .send()
            .await
            .map_err(CheckError::from_transport)?;

        let body: ServiceabilityResponse = read_json(response).await?;
        let listing = match body.response.get(&product.product_id) {
            Some(entry) => &entry.listing_summary,
            None => return Ok(None),
        };

        if listing.available != Some(true) {
            return Ok(None);
        }

        let mut message = format!("{}\n📍 Pincode: {}", product.markdown_link(), pincode);
        if let Some(price) = listing.final_price() {
            message.push_str(&format!(", 💰 Price: ₹{price}"));
        }
        Ok(Some(message))
    }
}
