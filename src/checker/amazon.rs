//! Amazon Product Advertising API (v5) checker
//!
//! Requests are signed with SigV4 using the configured credential triple.
//! Without complete credentials the check is skipped before any network call.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{header::HeaderMap, Client};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use super::{read_json, set_header, ProbeResult, StockChecker};
use crate::config::{AmazonConfig, Config};
use crate::models::{Product, StoreType};
use crate::signer::{SigV4, SigningRequest};
use crate::utils::error::CheckError;

const GET_ITEMS_PATH: &str = "/paapi5/getitems";
const TARGET: &str = "com.amazon.paapi5.v1.ProductAdvertisingAPIv1.GetItems";
const CONTENT_TYPE: &str = "application/json; charset=UTF-8";
const IN_STOCK: &str = "IN_STOCK";

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct GetItemsResponse {
    items_result: ItemsResult,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct ItemsResult {
    items: Vec<Item>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct Item {
    #[serde(rename = "OffersV2")]
    offers: Offers,
    item_info: ItemInfo,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct Offers {
    listings: Vec<Listing>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct Listing {
    availability: Availability,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct Availability {
    #[serde(rename = "Type")]
    kind: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct ItemInfo {
    title: Title,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct Title {
    display_value: Option<String>,
}

impl GetItemsResponse {
    fn first_item(&self) -> Option<&Item> {
        self.items_result.items.first()
    }
}

impl Item {
    fn availability(&self) -> &str {
        self.offers
            .listings
            .first()
            .and_then(|l| l.availability.kind.as_deref())
            .unwrap_or("OUT_OF_STOCK")
    }

    fn title(&self) -> Option<&str> {
        self.item_info
            .title
            .display_value
            .as_deref()
            .filter(|t| !t.trim().is_empty())
    }
}

/// Checks Amazon offer availability through PA-API
pub struct AmazonChecker {
    client: Client,
    endpoint: String,
    amazon: AmazonConfig,
    timeout: Duration,
}

impl AmazonChecker {
    pub fn new(client: Client, config: &Config) -> Self {
        Self {
            client,
            endpoint: format!(
                "{}{}",
                config.endpoints.amazon.trim_end_matches('/'),
                GET_ITEMS_PATH
            ),
            amazon: config.amazon.clone(),
            timeout: config.request_timeout(),
        }
    }

    fn payload(&self, asin: &str, partner_tag: &str) -> String {
        json!({
            "ItemIds": [asin],
            "PartnerTag": partner_tag,
            "PartnerType": "Associates",
            "Marketplace": self.amazon.marketplace,
            "Resources": [
                "OffersV2.Listings.Availability",
                "ItemInfo.Title"
            ]
        })
        .to_string()
    }
}

#[async_trait]
impl StockChecker for AmazonChecker {
    fn store(&self) -> StoreType {
        StoreType::Amazon
    }

    async fn probe(&self, product: &Product, _pincode: Option<&str>) -> ProbeResult {
        let credentials = self.amazon.credentials().ok_or_else(|| {
            CheckError::NotConfigured(
                "Amazon API credentials (access key, secret key, partner tag) are not set"
                    .to_string(),
            )
        })?;

        let payload = self.payload(&product.product_id, &credentials.partner_tag);
        let signer = SigV4::new(
            &credentials.access_key,
            &credentials.secret_key,
            &self.amazon.region,
            &self.amazon.service,
        );
        let signed = signer.sign(
            &SigningRequest {
                method: "POST",
                path: GET_ITEMS_PATH,
                host: &self.amazon.host,
                content_type: CONTENT_TYPE,
                target: TARGET,
                payload: &payload,
            },
            Utc::now(),
        )?;

        let mut headers = HeaderMap::new();
        set_header(&mut headers, "content-type", CONTENT_TYPE);
        set_header(&mut headers, "x-amz-date", &signed.amz_date);
        set_header(&mut headers, "x-amz-target", TARGET);
        set_header(&mut headers, "authorization", &signed.authorization);
        set_header(&mut headers, "content-encoding", "amz-1.0");

        let response = self
            .client
            .post(&self.endpoint)
            .headers(headers)
            .timeout(self.timeout)
            .body(payload)
            .send()
            .await
            .map_err(CheckError::from_transport)?;

        let body: GetItemsResponse = read_json(response).await?;
        let item = match body.first_item() {
            Some(item) => item,
            None => return Ok(None),
        };

        let availability = item.availability();
        if availability != IN_STOCK {
            tracing::debug!(product = %product.name, availability, "Amazon listing not in stock");
            return Ok(None);
        }

        let title = item.title().unwrap_or(&product.name);
        Ok(Some(format!("[{}]({})", title, product.link())))
    }
}
