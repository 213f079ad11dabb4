//! Unicorn store checker for the fixed iPhone 17 256GB variants

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use super::{
    as_integer, default_headers, display_value, group_thousands, read_json, set_header,
    ProbeResult, StockChecker,
};
use crate::config::Config;
use crate::models::{FixedVariant, Product, StoreType};
use crate::utils::error::CheckError;

const PRODUCT_PATH: &str = "/get_product_by_option_id";
const STOREFRONT: &str = "https://shop.unicornstore.in";
const PRODUCT_URL: &str = "https://shop.unicornstore.in/iphone-17";

const CATEGORY_ID: &str = "456";
const FAMILY_ID: &str = "94";
const GROUP_IDS: &str = "57,58";
const STORAGE_256GB_OPTION: &str = "250";

/// Color variants; `variant_id` is the color option id
pub const VARIANTS: [FixedVariant; 5] = [
    FixedVariant {
        name: "iPhone 17 Lavender 256GB",
        url: PRODUCT_URL,
        variant_id: "313",
    },
    FixedVariant {
        name: "iPhone 17 Sage 256GB",
        url: PRODUCT_URL,
        variant_id: "311",
    },
    FixedVariant {
        name: "iPhone 17 Mist Blue 256GB",
        url: PRODUCT_URL,
        variant_id: "312",
    },
    FixedVariant {
        name: "iPhone 17 White 256GB",
        url: PRODUCT_URL,
        variant_id: "314",
    },
    FixedVariant {
        name: "iPhone 17 Black 256GB",
        url: PRODUCT_URL,
        variant_id: "315",
    },
];

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OptionResponse {
    data: OptionData,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OptionData {
    product: OptionProduct,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OptionProduct {
    quantity: Value,
    price: Value,
    sku: Value,
    custom_column_4: Value,
}

impl OptionProduct {
    fn quantity(&self) -> i64 {
        as_integer(&self.quantity).unwrap_or(0)
    }

    fn price(&self) -> String {
        match as_integer(&self.price) {
            Some(price) if price != 0 => format!("₹{}", group_thousands(price)),
            _ => "N/A".to_string(),
        }
    }

    fn sku(&self) -> String {
        display_value(&self.sku).unwrap_or_else(|| "N/A".to_string())
    }

    fn dispatch_note(&self) -> String {
        display_value(&self.custom_column_4).unwrap_or_else(|| "Out of Stock".to_string())
    }
}

/// Checks Unicorn stock for one color option
pub struct UnicornChecker {
    client: Client,
    endpoint: String,
    user_agent: String,
    timeout: Duration,
}

impl UnicornChecker {
    pub fn new(client: Client, config: &Config) -> Self {
        Self {
            client,
            endpoint: format!(
                "{}{}",
                config.endpoints.unicorn.trim_end_matches('/'),
                PRODUCT_PATH
            ),
            user_agent: config.http.user_agent.clone(),
            timeout: config.request_timeout(),
        }
    }

    fn payload(color_option: &str) -> Value {
        json!({
            "category_id": CATEGORY_ID,
            "family_id": FAMILY_ID,
            "group_ids": GROUP_IDS,
            "option_ids": format!("{color_option},{STORAGE_256GB_OPTION}")
        })
    }
}

#[async_trait]
impl StockChecker for UnicornChecker {
    fn store(&self) -> StoreType {
        StoreType::Unicorn
    }

    async fn probe(&self, product: &Product, _pincode: Option<&str>) -> ProbeResult {
        let mut headers = default_headers(&self.user_agent);
        set_header(&mut headers, "customer-id", "unicorn");
        set_header(&mut headers, "origin", STOREFRONT);
        set_header(&mut headers, "referer", &format!("{STOREFRONT}/"));

        let response = self
            .client
            .post(&self.endpoint)
            .headers(headers)
            .timeout(self.timeout)
            .json(&Self::payload(&product.product_id))
            .send()
            .await
            .map_err(CheckError::from_transport)?;

        let body: OptionResponse = read_json(response).await?;
        let item = body.data.product;
        let quantity = item.quantity();

        if quantity <= 0 {
            tracing::debug!(variant = %product.name, note = %item.dispatch_note(), "Unicorn variant unavailable");
            return Ok(None);
        }

        Ok(Some(format!(
            "[{} - {}]({})\n💰 Price: {}, Qty: {}",
            product.name,
            item.sku(),
            product.link(),
            item.price(),
            quantity
        )))
    }
}
