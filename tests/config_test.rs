//! Configuration loading from the process environment and TOML files

use serial_test::serial;
use std::io::Write;
use std::time::Duration;
use stockwatch::config::Config;
use stockwatch::models::StoreType;
use tempfile::NamedTempFile;
use tokio_test::{assert_err, assert_ok};

const KEYS: &[&str] = &[
    "DATABASE_URL",
    "TELEGRAM_BOT_TOKEN",
    "TELEGRAM_GROUP_ID",
    "PINCODES_TO_CHECK",
    "VIJAY_SALES_TOPIC_ID",
    "FLIPKART_TOPIC_ID",
    "AWS_ACCESS_KEY_ID",
    "AWS_SECRET_ACCESS_KEY",
    "AMAZON_PARTNER_TAG",
    "STOCKWATCH_MIN_DELAY_SECS",
    "STOCKWATCH_MAX_DELAY_SECS",
];

fn clear_env() {
    for key in KEYS {
        std::env::remove_var(key);
    }
}

#[test]
#[serial]
fn test_from_env_reads_everything() {
    clear_env();
    std::env::set_var("TELEGRAM_BOT_TOKEN", "123:abc");
    std::env::set_var("TELEGRAM_GROUP_ID", "-1001");
    std::env::set_var("PINCODES_TO_CHECK", " 110016, 400001 ,,560001 ");
    std::env::set_var("VIJAY_SALES_TOPIC_ID", "17");
    std::env::set_var("AWS_ACCESS_KEY_ID", "AKID");
    std::env::set_var("STOCKWATCH_MIN_DELAY_SECS", "10");
    std::env::set_var("STOCKWATCH_MAX_DELAY_SECS", "20");

    let config = Config::from_env().unwrap();
    clear_env();

    assert_eq!(config.telegram.bot_token.as_deref(), Some("123:abc"));
    assert_eq!(config.pincodes, vec!["110016", "400001", "560001"]);
    assert_eq!(config.telegram.topic_for(StoreType::VijaySales), Some("17"));
    assert_eq!(config.telegram.topic_for(StoreType::Flipkart), None);
    // Partial Amazon credentials are treated as absent
    assert!(config.amazon.credentials().is_none());
    assert_eq!(config.schedule.min_delay_secs, 10);
    assert_ok!(config.validate());
}

#[test]
#[serial]
fn test_from_env_defaults() {
    clear_env();
    let config = Config::from_env().unwrap();

    assert!(config.database.url.is_none());
    assert_eq!(config.pincodes, vec!["110016"]);
    assert_eq!(config.schedule.error_cooldown(), Duration::from_secs(300));
    assert_ok!(config.validate());
}

#[test]
#[serial]
fn test_inverted_delay_range_is_rejected() {
    clear_env();
    std::env::set_var("STOCKWATCH_MIN_DELAY_SECS", "90");
    std::env::set_var("STOCKWATCH_MAX_DELAY_SECS", "30");

    let config = Config::from_env().unwrap();
    clear_env();

    assert_err!(config.validate());
}

#[test]
fn test_from_toml_file() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
pincodes = ["400001"]

[telegram]
chat_id = "-1009"

[telegram.topics]
croma = "5"

[schedule]
min_delay_secs = 5
max_delay_secs = 6
"#
    )
    .unwrap();

    let config = Config::from_file(file.path()).unwrap();
    assert_eq!(config.pincodes, vec!["400001"]);
    assert_eq!(config.telegram.topic_for(StoreType::Croma), Some("5"));
    assert_eq!(config.telegram.api_base, "https://api.telegram.org");
    assert_eq!(config.schedule.max_delay_secs, 6);
    assert_eq!(config.schedule.error_cooldown_secs, 300);
    assert_ok!(config.validate());
}
