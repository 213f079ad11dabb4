//! Croma promise (delivery) checker

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use super::{default_headers, read_json, set_header, ProbeResult, StockChecker};
use crate::config::Config;
use crate::models::{Product, StoreType};
use crate::utils::error::CheckError;

const PROMISE_PATH: &str = "/inventory/oms/v2/tms/details-pwa/";
const SUBSCRIPTION_KEY: &str = "1131858141634e2abe2efb2b3a2a2a5d";

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct PromiseResponse {
    promise: Promise,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct Promise {
    suggested_option: SuggestedOption,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SuggestedOption {
    option: PromiseOption,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct PromiseOption {
    promise_lines: PromiseLines,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct PromiseLines {
    promise_line: Vec<Value>,
}

/// Checks Croma home delivery promise for one pincode
pub struct CromaChecker {
    client: Client,
    endpoint: String,
    user_agent: String,
    timeout: Duration,
}

impl CromaChecker {
    pub fn new(client: Client, config: &Config) -> Self {
        Self {
            client,
            endpoint: format!(
                "{}{}",
                config.endpoints.croma.trim_end_matches('/'),
                PROMISE_PATH
            ),
            user_agent: config.http.user_agent.clone(),
            timeout: config.request_timeout(),
        }
    }

    fn payload(item_id: &str, pincode: &str) -> Value {
        json!({
            "promise": {
                "allocationRuleID": "SYSTEM",
                "checkInventory": "Y",
                "organizationCode": "CROMA",
                "sourcingClassification": "EC",
                "promiseLines": {
                    "promiseLine": [{
                        "fulfillmentType": "HDEL",
                        "itemID": item_id,
                        "lineId": "1",
                        "requiredQty": "1",
                        "shipToAddress": { "zipCode": pincode },
                        "extn": { "widerStoreFlag": "N" }
                    }]
                }
            }
        })
    }
}

#[async_trait]
impl StockChecker for CromaChecker {
    fn store(&self) -> StoreType {
        StoreType::Croma
    }

    fn pincode_sensitive(&self) -> bool {
        true
    }

    async fn probe(&self, product: &Product, pincode: Option<&str>) -> ProbeResult {
        let pincode = pincode.ok_or_else(|| CheckError::Api("pincode required".to_string()))?;

        let mut headers = default_headers(&self.user_agent);
        set_header(&mut headers, "oms-apim-subscription-key", SUBSCRIPTION_KEY);
        set_header(&mut headers, "origin", "https://www.croma.com");
        set_header(&mut headers, "referer", "https://www.croma.com/");

        let response = self
            .client
            .post(&self.endpoint)
            .headers(headers)
            .timeout(self.timeout)
            .json(&Self::payload(&product.product_id, pincode))
            .send()
            .await
            .map_err(CheckError::from_transport)?;

        let body: PromiseResponse = read_json(response).await?;
        let lines = &body.promise.suggested_option.option.promise_lines.promise_line;
        if lines.is_empty() {
            return Ok(None);
        }

        Ok(Some(format!(
            "{}\n📍 Pincode: {}",
            product.markdown_link(),
            pincode
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_carries_item_and_zip() {
        let payload = CromaChecker::payload("300652", "560001");
        let line = &payload["promise"]["promiseLines"]["promiseLine"][0];
        assert_eq!(line["fulfillmentType"], "HDEL");
        assert_eq!(line["itemID"], "300652");
        assert_eq!(line["shipToAddress"]["zipCode"], "560001");
    }

    #[test]
    fn test_suggested_lines_parsed() {
        let body: PromiseResponse = serde_json::from_str(
            r#"{"promise":{"suggestedOption":{"option":{"promiseLines":{"promiseLine":[{"itemID":"1"}]}}}}}"#,
        )
        .unwrap();
        assert_eq!(
            body.promise.suggested_option.option.promise_lines.promise_line.len(),
            1
        );

        let empty: PromiseResponse = serde_json::from_str(r#"{"promise":{}}"#).unwrap();
        assert!(empty
            .promise
            .suggested_option
            .option
            .promise_lines
            .promise_line
            .is_empty());
    }
}
