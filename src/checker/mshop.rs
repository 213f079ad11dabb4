//! iQOO and Vivo storefront checker
//!
//! Both brands run the same mshop platform, so one implementation serves
//! both, parameterised by [`MshopBrand`].

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use super::{default_headers, read_json, set_header, ProbeResult, StockChecker};
use crate::config::Config;
use crate::models::{Product, StoreType};
use crate::utils::error::CheckError;

const MOBILE_USER_AGENT: &str = "Mozilla/5.0 (Linux; Android 6.0; Nexus 5 Build/MRA58N) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/142.0.0.0 Mobile Safari/5.36";

/// Reservation id the platform reports for a purchasable SKU
const RESERVABLE_IN_STOCK: i64 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MshopBrand {
    Iqoo,
    Vivo,
}

impl MshopBrand {
    pub fn store(&self) -> StoreType {
        match self {
            Self::Iqoo => StoreType::Iqoo,
            Self::Vivo => StoreType::Vivo,
        }
    }

    /// Public storefront, used for the referer
    pub fn site(&self) -> &'static str {
        match self {
            Self::Iqoo => "https://mshop.iqoo.com",
            Self::Vivo => "https://mshop.vivo.com",
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ActivityResponse {
    success: Value,
    data: Option<ActivityData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ActivityData {
    activity_sku_list: Vec<ActivitySku>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ActivitySku {
    activity_info: ActivityInfo,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ActivityInfo {
    reservable_id: Value,
}

impl ActivityResponse {
    fn into_data(self) -> Result<ActivityData, CheckError> {
        let ok = matches!(&self.success, Value::String(s) if s == "1");
        match (ok, self.data) {
            (true, Some(data)) => Ok(data),
            _ => Err(CheckError::Api(format!(
                "unsuccessful response (success = {})",
                self.success
            ))),
        }
    }
}

impl ActivityData {
    fn any_reservable(&self) -> bool {
        self.activity_sku_list
            .iter()
            .any(|sku| sku.activity_info.reservable_id.as_i64() == Some(RESERVABLE_IN_STOCK))
    }
}

/// Checks SKU reservability on the iQOO or Vivo storefront
pub struct MshopChecker {
    client: Client,
    brand: MshopBrand,
    base_url: String,
    user_agent: String,
    timeout: Duration,
}

impl MshopChecker {
    pub fn new(client: Client, config: &Config, brand: MshopBrand) -> Self {
        let base_url = match brand {
            MshopBrand::Iqoo => &config.endpoints.iqoo,
            MshopBrand::Vivo => &config.endpoints.vivo,
        };
        Self {
            client,
            brand,
            base_url: base_url.trim_end_matches('/').to_string(),
            user_agent: config.http.user_agent.clone(),
            timeout: config.request_timeout(),
        }
    }

    fn activity_url(&self, product_id: &str) -> String {
        format!("{}/in/api/product/activityInfo/all/{}", self.base_url, product_id)
    }
}

#[async_trait]
impl StockChecker for MshopChecker {
    fn store(&self) -> StoreType {
        self.brand.store()
    }

    async fn probe(&self, product: &Product, _pincode: Option<&str>) -> ProbeResult {
        let mut headers = default_headers(&self.user_agent);
        set_header(
            &mut headers,
            "referer",
            &format!("{}/in/product/{}", self.brand.site(), product.product_id),
        );
        set_header(&mut headers, "user-agent", MOBILE_USER_AGENT);

        let response = self
            .client
            .get(self.activity_url(&product.product_id))
            .headers(headers)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(CheckError::from_transport)?;

        let body: ActivityResponse = read_json(response).await?;
        if !body.into_data()?.any_reservable() {
            return Ok(None);
        }

        Ok(Some(format!(
            "{}\n💰 Price: N/A (In Stock)",
            product.markdown_link()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> ActivityResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_reservable_sku_in_stock() {
        let data = parse(
            r#"{"success":"1","data":{"activitySkuList":[{"activityInfo":{"reservableId":5}},{"activityInfo":{"reservableId":-1}}]}}"#,
        )
        .into_data()
        .unwrap();
        assert!(data.any_reservable());
    }

    #[test]
    fn test_no_reservable_sku() {
        let data = parse(r#"{"success":"1","data":{"activitySkuList":[{"activityInfo":{}}]}}"#)
            .into_data()
            .unwrap();
        assert!(!data.any_reservable());
    }

    #[test]
    fn test_unsuccessful_response_is_api_error() {
        assert!(matches!(
            parse(r#"{"success":"0","data":{}}"#).into_data(),
            Err(CheckError::Api(_))
        ));
        assert!(parse(r#"{"success":"1"}"#).into_data().is_err());
        assert!(parse(r#"{"success":1,"data":{}}"#).into_data().is_err());
    }

    #[test]
    fn test_brand_urls() {
        let config = Config::default();
        let vivo = MshopChecker::new(Client::new(), &config, MshopBrand::Vivo);
        assert_eq!(vivo.store(), StoreType::Vivo);
        assert_eq!(
            vivo.activity_url("1234"),
            "https://mshop.vivo.com/in/api/product/activityInfo/all/1234"
        );
    }
}
