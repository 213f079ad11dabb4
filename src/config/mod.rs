//! Configuration management for stockwatch
//!
//! The configuration is built once at process start, either from environment
//! variables (optionally seeded from a dotenv file) or from a TOML file, and
//! then handed to every component explicitly. Nothing below `main` reads the
//! environment on its own.

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

use crate::models::StoreType;

/// Pincode used when `PINCODES_TO_CHECK` is unset or empty
pub const DEFAULT_PINCODE: &str = "110016";

/// Browser user agent sent to vendor APIs unless a checker overrides it
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/142.0.0.0 Safari/537.36";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Catalog database configuration
    pub database: DatabaseConfig,

    /// Telegram notification configuration
    pub telegram: TelegramConfig,

    /// Amazon Product Advertising API configuration
    pub amazon: AmazonConfig,

    /// Outbound HTTP configuration shared by all checkers
    pub http: HttpConfig,

    /// Vendor API base URLs
    pub endpoints: EndpointConfig,

    /// Cycle timing
    pub schedule: ScheduleConfig,

    /// Candidate pincodes, tried in order
    pub pincodes: Vec<String>,

    /// Metrics endpoint configuration
    pub metrics: MetricsConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// PostgreSQL connection string
    pub url: Option<String>,

    /// Maximum pool size
    pub pool_size: usize,

    /// Upper bound on connecting and on loading the catalog, in seconds
    pub timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            pool_size: 2,
            timeout_secs: 30,
        }
    }
}

impl DatabaseConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Telegram configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// Bot token
    pub bot_token: Option<String>,

    /// Default destination chat (group) id
    pub chat_id: Option<String>,

    /// Bot API base URL
    pub api_base: String,

    /// Per-store forum topic ids, keyed by store name (`flipkart`, `vijay_sales`, ...)
    pub topics: BTreeMap<String, String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Upper bound on outgoing messages per minute
    pub messages_per_minute: u32,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            chat_id: None,
            api_base: String::from("https://api.telegram.org"),
            topics: BTreeMap::new(),
            timeout_secs: 10,
            messages_per_minute: 20,
        }
    }
}

impl TelegramConfig {
    /// Topic id configured for a store, if any
    pub fn topic_for(&self, store: StoreType) -> Option<&str> {
        self.topics.get(store.as_str()).map(String::as_str)
    }
}

/// Amazon PA-API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AmazonConfig {
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub partner_tag: Option<String>,
    pub host: String,
    pub region: String,
    pub service: String,
    pub marketplace: String,
}

impl Default for AmazonConfig {
    fn default() -> Self {
        Self {
            access_key: None,
            secret_key: None,
            partner_tag: None,
            host: String::from("webservices.amazon.in"),
            region: String::from("eu-west-1"),
            service: String::from("ProductAdvertisingAPI"),
            marketplace: String::from("www.amazon.in"),
        }
    }
}

/// Complete Amazon credential triple
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmazonCredentials {
    pub access_key: String,
    pub secret_key: String,
    pub partner_tag: String,
}

impl AmazonConfig {
    /// Returns the credentials only when all three are present
    pub fn credentials(&self) -> Option<AmazonCredentials> {
        let present = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        Some(AmazonCredentials {
            access_key: present(&self.access_key)?,
            secret_key: present(&self.secret_key)?,
            partner_tag: present(&self.partner_tag)?,
        })
    }
}

/// Outbound HTTP configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Optional proxy for vendor requests (http, https or socks5)
    pub proxy_url: Option<String>,

    /// Default user agent
    pub user_agent: String,

    /// Timeout for most vendor requests in seconds
    pub request_timeout_secs: u64,

    /// Timeout for the slower serviceability APIs in seconds
    pub slow_request_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            proxy_url: None,
            user_agent: String::from(DEFAULT_USER_AGENT),
            request_timeout_secs: 10,
            slow_request_timeout_secs: 20,
        }
    }
}

/// Vendor API base URLs
///
/// Production values by default; tests point them at a mock server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    pub flipkart: String,
    pub reliance_digital: String,
    pub croma: String,
    pub amazon: String,
    pub iqoo: String,
    pub vivo: String,
    pub unicorn: String,
    pub vijay_sales: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            flipkart: String::from("https://2.rome.api.flipkart.com"),
            reliance_digital: String::from("https://www.reliancedigital.in"),
            croma: String::from("https://api.croma.com"),
            amazon: String::from("https://webservices.amazon.in"),
            iqoo: String::from("https://mshop.iqoo.com"),
            vivo: String::from("https://mshop.vivo.com"),
            unicorn: String::from("https://fe01.beamcommerce.in"),
            vijay_sales: String::from("https://mdm.vijaysales.com"),
        }
    }
}

impl EndpointConfig {
    /// Point every vendor at the same base URL
    pub fn all(base: &str) -> Self {
        let base = base.trim_end_matches('/').to_string();
        Self {
            flipkart: base.clone(),
            reliance_digital: base.clone(),
            croma: base.clone(),
            amazon: base.clone(),
            iqoo: base.clone(),
            vivo: base.clone(),
            unicorn: base.clone(),
            vijay_sales: base,
        }
    }
}

/// Cycle timing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Lower bound of the sleep between cycles in seconds
    pub min_delay_secs: u64,

    /// Upper bound of the sleep between cycles in seconds
    pub max_delay_secs: u64,

    /// Sleep after a failed cycle in seconds
    pub error_cooldown_secs: u64,

    /// Lower bound of the pacing delay between vendor requests in milliseconds
    pub pacing_min_ms: u64,

    /// Upper bound of the pacing delay between vendor requests in milliseconds
    pub pacing_max_ms: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            min_delay_secs: 30,
            max_delay_secs: 60,
            error_cooldown_secs: 300,
            pacing_min_ms: 1000,
            pacing_max_ms: 3000,
        }
    }
}

impl ScheduleConfig {
    pub fn error_cooldown(&self) -> Duration {
        Duration::from_secs(self.error_cooldown_secs)
    }

    /// Pacing range as durations
    pub fn pacing(&self) -> (Duration, Duration) {
        (
            Duration::from_millis(self.pacing_min_ms),
            Duration::from_millis(self.pacing_max_ms),
        )
    }
}

/// Metrics endpoint configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Bind address (e.g. `0.0.0.0:9108`); disabled when unset
    pub bind_addr: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

/// Split a comma separated pincode list, falling back to the default pincode
pub fn parse_pincodes(raw: &str) -> Vec<String> {
    let pincodes: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect();

    if pincodes.is_empty() {
        vec![String::from(DEFAULT_PINCODE)]
    } else {
        pincodes
    }
}

fn pincode_pattern() -> &'static Regex {
    static PINCODE_RE: OnceLock<Regex> = OnceLock::new();
    PINCODE_RE.get_or_init(|| Regex::new(r"^[1-9][0-9]{5}$").expect("Invalid regex pattern"))
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let get_num = |key: &str, default: u64| -> Result<u64> {
            match get(key) {
                Some(v) => v
                    .parse::<u64>()
                    .with_context(|| format!("{key} must be a non-negative integer, got '{v}'")),
                None => Ok(default),
            }
        };

        let defaults = ScheduleConfig::default();
        let schedule = ScheduleConfig {
            min_delay_secs: get_num("STOCKWATCH_MIN_DELAY_SECS", defaults.min_delay_secs)?,
            max_delay_secs: get_num("STOCKWATCH_MAX_DELAY_SECS", defaults.max_delay_secs)?,
            error_cooldown_secs: get_num(
                "STOCKWATCH_ERROR_COOLDOWN_SECS",
                defaults.error_cooldown_secs,
            )?,
            pacing_min_ms: get_num("STOCKWATCH_PACING_MIN_MS", defaults.pacing_min_ms)?,
            pacing_max_ms: get_num("STOCKWATCH_PACING_MAX_MS", defaults.pacing_max_ms)?,
        };

        let topics = StoreType::all()
            .into_iter()
            .filter_map(|store| {
                get(store.topic_env_key()).map(|id| (store.as_str().to_string(), id))
            })
            .collect();

        let pincodes = parse_pincodes(&get("PINCODES_TO_CHECK").unwrap_or_default());

        Ok(Self {
            database: DatabaseConfig {
                url: get("DATABASE_URL"),
                timeout_secs: get_num(
                    "STOCKWATCH_DB_TIMEOUT_SECS",
                    DatabaseConfig::default().timeout_secs,
                )?,
                ..DatabaseConfig::default()
            },
            telegram: TelegramConfig {
                bot_token: get("TELEGRAM_BOT_TOKEN"),
                chat_id: get("TELEGRAM_GROUP_ID"),
                topics,
                ..TelegramConfig::default()
            },
            amazon: AmazonConfig {
                access_key: get("AWS_ACCESS_KEY_ID"),
                secret_key: get("AWS_SECRET_ACCESS_KEY"),
                partner_tag: get("AMAZON_PARTNER_TAG"),
                ..AmazonConfig::default()
            },
            http: HttpConfig {
                proxy_url: get("STOCKWATCH_PROXY_URL"),
                ..HttpConfig::default()
            },
            endpoints: EndpointConfig::default(),
            schedule,
            pincodes,
            metrics: MetricsConfig {
                bind_addr: get("STOCKWATCH_METRICS_ADDR"),
            },
            logging: LoggingConfig {
                level: get("STOCKWATCH_LOG_LEVEL").unwrap_or_else(|| String::from("info")),
                format: get("STOCKWATCH_LOG_FORMAT").unwrap_or_else(|| String::from("text")),
            },
        })
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        if config.pincodes.is_empty() {
            config.pincodes = vec![String::from(DEFAULT_PINCODE)];
        }

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.schedule.min_delay_secs > self.schedule.max_delay_secs {
            anyhow::bail!(
                "min delay ({}s) must not exceed max delay ({}s)",
                self.schedule.min_delay_secs,
                self.schedule.max_delay_secs
            );
        }

        if self.schedule.pacing_min_ms > self.schedule.pacing_max_ms {
            anyhow::bail!("pacing_min_ms must not exceed pacing_max_ms");
        }

        if self.http.request_timeout_secs == 0 || self.http.slow_request_timeout_secs == 0 {
            anyhow::bail!("request timeouts must be greater than 0");
        }

        if self.telegram.timeout_secs == 0 {
            anyhow::bail!("telegram timeout must be greater than 0");
        }

        if self.pincodes.is_empty() {
            anyhow::bail!("at least one pincode is required");
        }

        if let Some(bad) = self
            .pincodes
            .iter()
            .find(|p| !pincode_pattern().is_match(p))
        {
            anyhow::bail!("invalid pincode '{bad}': expected six digits");
        }

        if let Some(proxy) = &self.http.proxy_url {
            url::Url::parse(proxy).with_context(|| format!("invalid proxy URL '{proxy}'"))?;
        }

        if self.database.pool_size == 0 {
            anyhow::bail!("pool_size must be greater than 0");
        }

        if self.database.timeout_secs == 0 {
            anyhow::bail!("database timeout must be greater than 0");
        }

        Ok(())
    }

    /// Timeout for most vendor requests
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.http.request_timeout_secs)
    }

    /// Timeout for the slower serviceability APIs
    #[must_use]
    pub fn slow_request_timeout(&self) -> Duration {
        Duration::from_secs(self.http.slow_request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn valid_config() -> Config {
        Config::from_lookup(lookup(&[])).unwrap()
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = valid_config();
        assert!(config.validate().is_ok());
        assert_eq!(config.pincodes, vec!["110016".to_string()]);
        assert_eq!(config.schedule.error_cooldown(), Duration::from_secs(300));
    }

    #[test]
    fn test_parse_pincodes() {
        assert_eq!(parse_pincodes("110016, 400001,,"), vec!["110016", "400001"]);
        assert_eq!(parse_pincodes(" , "), vec![DEFAULT_PINCODE]);
        assert_eq!(parse_pincodes(""), vec![DEFAULT_PINCODE]);
    }

    #[test]
    fn test_from_lookup_reads_topics_and_credentials() {
        let config = Config::from_lookup(lookup(&[
            ("TELEGRAM_BOT_TOKEN", "123:abc"),
            ("TELEGRAM_GROUP_ID", "-100200"),
            ("FLIPKART_TOPIC_ID", "7"),
            ("VIJAY_SALES_TOPIC_ID", "9"),
            ("AWS_ACCESS_KEY_ID", "AKID"),
            ("AWS_SECRET_ACCESS_KEY", "secret"),
            ("AMAZON_PARTNER_TAG", "tag-21"),
            ("PINCODES_TO_CHECK", "560001,110016"),
        ]))
        .unwrap();

        assert_eq!(config.telegram.topic_for(StoreType::Flipkart), Some("7"));
        assert_eq!(config.telegram.topic_for(StoreType::VijaySales), Some("9"));
        assert_eq!(config.telegram.topic_for(StoreType::Croma), None);
        assert!(config.amazon.credentials().is_some());
        assert_eq!(config.pincodes, vec!["560001", "110016"]);
    }

    #[test]
    fn test_partial_amazon_credentials() {
        let config = Config::from_lookup(lookup(&[
            ("AWS_ACCESS_KEY_ID", "AKID"),
            ("AMAZON_PARTNER_TAG", "tag-21"),
        ]))
        .unwrap();
        assert!(config.amazon.credentials().is_none());
    }

    #[test]
    fn test_invalid_numeric_env() {
        let result = Config::from_lookup(lookup(&[("STOCKWATCH_MIN_DELAY_SECS", "soon")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_min_delay_above_max_rejected() {
        let mut config = valid_config();
        config.schedule.min_delay_secs = 90;
        config.schedule.max_delay_secs = 60;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_pincode_rejected() {
        let mut config = valid_config();
        config.pincodes = vec!["11001".to_string()];
        assert!(config.validate().is_err());

        config.pincodes = vec!["ABCDEF".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_proxy_rejected() {
        let mut config = valid_config();
        config.http.proxy_url = Some("not a url".to_string());
        assert!(config.validate().is_err());

        config.http.proxy_url = Some("socks5://127.0.0.1:40000".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_request_timeout_conversion() {
        let config = valid_config();
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.slow_request_timeout(), Duration::from_secs(20));
    }

    #[test]
    fn test_database_timeout() {
        assert_eq!(valid_config().database.timeout(), Duration::from_secs(30));

        let config = Config::from_lookup(lookup(&[("STOCKWATCH_DB_TIMEOUT_SECS", "5")])).unwrap();
        assert_eq!(config.database.timeout(), Duration::from_secs(5));

        let config = Config::from_lookup(lookup(&[("STOCKWATCH_DB_TIMEOUT_SECS", "0")])).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_endpoints_all() {
        let endpoints = EndpointConfig::all("http://127.0.0.1:9000/");
        assert_eq!(endpoints.flipkart, "http://127.0.0.1:9000");
        assert_eq!(endpoints.vijay_sales, "http://127.0.0.1:9000");
    }

    #[test]
    fn test_from_file_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stockwatch.toml");
        std::fs::write(
            &path,
            r#"
pincodes = ["400001"]

[schedule]
min_delay_secs = 10
max_delay_secs = 20

[telegram]
chat_id = "-1001"

[telegram.topics]
croma = "11"
"#,
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.pincodes, vec!["400001"]);
        assert_eq!(config.schedule.min_delay_secs, 10);
        assert_eq!(config.schedule.error_cooldown_secs, 300);
        assert_eq!(config.telegram.topic_for(StoreType::Croma), Some("11"));
        assert!(config.validate().is_ok());
    }
}
