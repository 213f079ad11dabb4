//! Reliance Digital inventory checker

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use super::{default_headers, read_json, set_header, ProbeResult, StockChecker};
use crate::config::Config;
use crate::models::{Product, StoreType};
use crate::utils::error::CheckError;

const INVENTORY_PATH: &str = "/ext/raven-api/inventory/multi/articles-v2";
const SITE: &str = "https://www.reliancedigital.in";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct InventoryResponse {
    data: InventoryData,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct InventoryData {
    articles: Vec<Article>,
}

/// Raw article object; `error` must be told apart when absent vs `null`
#[derive(Debug, Default, Deserialize)]
struct Article(serde_json::Map<String, Value>);

impl Article {
    /// No `error` key, or an error object without a `type`
    fn is_clean(&self) -> bool {
        match self.0.get("error") {
            None => true,
            Some(Value::Object(error)) => error.get("type").map_or(true, Value::is_null),
            Some(_) => false,
        }
    }
}

impl InventoryResponse {
    /// The first article must exist and carry no error type
    fn is_available(&self) -> bool {
        self.data.articles.first().is_some_and(Article::is_clean)
    }
}

/// Checks Reliance Digital article inventory for one pincode
pub struct RelianceDigitalChecker {
    client: Client,
    endpoint: String,
    user_agent: String,
    timeout: Duration,
}

impl RelianceDigitalChecker {
    pub fn new(client: Client, config: &Config) -> Self {
        Self {
            client,
            endpoint: format!(
                "{}{}",
                config.endpoints.reliance_digital.trim_end_matches('/'),
                INVENTORY_PATH
            ),
            user_agent: config.http.user_agent.clone(),
            timeout: config.slow_request_timeout(),
        }
    }

    fn payload(article_id: &str, pincode: &str) -> Value {
        json!({
            "articles": [{
                "article_id": article_id,
                "custom_json": {},
                "quantity": 1
            }],
            "phone_number": "0",
            "pincode": pincode,
            "request_page": "pdp"
        })
    }
}

#[async_trait]
impl StockChecker for RelianceDigitalChecker {
    fn store(&self) -> StoreType {
        StoreType::RelianceDigital
    }

    fn pincode_sensitive(&self) -> bool {
        true
    }

    async fn probe(&self, product: &Product, pincode: Option<&str>) -> ProbeResult {
        let pincode = pincode.ok_or_else(|| CheckError::Api("pincode required".to_string()))?;

        let mut headers = default_headers(&self.user_agent);
        set_header(&mut headers, "origin", SITE);
        set_header(&mut headers, "referer", &format!("{SITE}/"));
        set_header(&mut headers, "accept-language", "en-US,en;q=0.9");
        set_header(&mut headers, "accept", "application/json");

        let response = self
            .client
            .post(&self.endpoint)
            .headers(headers)
            .timeout(self.timeout)
            .json(&Self::payload(&product.product_id, pincode))
            .send()
            .await
            .map_err(CheckError::from_transport)?;

        let body: InventoryResponse = read_json(response).await?;
        if !body.is_available() {
            return Ok(None);
        }

        Ok(Some(format!(
            "{}\n📍 Pincode: {}",
            product.markdown_link(),
            pincode
        )))
    }
}
