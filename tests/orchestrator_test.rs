//! Full-cycle tests with every vendor behind one mock server

mod common;

use async_trait::async_trait;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use stockwatch::catalog::{FileCatalog, StaticCatalog};
use stockwatch::checker::{ProbeResult, StockChecker};
use stockwatch::error::{CatalogError, Error};
use stockwatch::models::{Product, StoreType};
use stockwatch::orchestrator::{CycleOutcome, Orchestrator};
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{test_config, FailingCatalog, HangingCatalog, RecordingChannel};

/// Every vendor answers "not available"
async fn mount_all_unavailable(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/3/product/serviceability"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "RESPONSE": {} })))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/ext/raven-api/inventory/multi/articles-v2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": { "articles": [] } })))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/inventory/oms/v2/tms/details-pwa/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/in/api/product/activityInfo/all/.+$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": "1",
            "data": { "activitySkuList": [] }
        })))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/get_product_by_option_id"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "data": { "product": { "quantity": 0 } } })),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/web/api/oms/check-servicibility/v1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": {} })))
        .mount(server)
        .await;
}

fn catalog() -> Vec<Product> {
    vec![
        Product::new("Alpha", "https://fk/1", "FSN1", StoreType::Flipkart),
        Product::new("Beta", "https://fk/2", "FSN2", StoreType::Flipkart),
        Product::new("Gamma", "https://rd/1", "494", StoreType::RelianceDigital),
        Product::new("Delta", "https://croma/1", "300652", StoreType::Croma),
        Product::new("Echo", "https://amzn/1", "B0TEST", StoreType::Amazon),
        Product::new("Foxtrot", "https://iqoo/1", "11", StoreType::Iqoo),
        Product::new("Golf", "https://vivo/1", "22", StoreType::Vivo),
    ]
}

#[tokio::test]
async fn test_cycle_tracks_catalog_plus_fixed_variants() {
    let server = MockServer::start().await;
    mount_all_unavailable(&server).await;

    let config = test_config(&server.uri(), &["110016"]);
    let notifier = RecordingChannel::new();
    let orchestrator = Orchestrator::new(
        &config,
        Arc::new(StaticCatalog::new(catalog())),
        notifier.clone(),
    )
    .unwrap();

    let outcome = orchestrator.run_cycle().await.unwrap();
    let CycleOutcome::Completed(report) = outcome else {
        panic!("expected a completed cycle");
    };

    assert_eq!(report.total_tracked(), catalog().len() + 10);
    assert_eq!(report.total_found(), 0);
    assert_eq!(report.stores.len(), 8);
    assert_eq!(report.stores[&StoreType::Flipkart].total, 2);
    assert_eq!(report.stores[&StoreType::Unicorn].total, 5);
    assert_eq!(report.stores[&StoreType::VijaySales].total, 5);
    assert!(notifier.alerts().is_empty());
}

#[tokio::test]
async fn test_cycle_reads_catalog_file() {
    let server = MockServer::start().await;
    mount_all_unavailable(&server).await;

    let file = tempfile::NamedTempFile::new().unwrap();
    std::fs::write(
        file.path(),
        r#"[
            {"name": "Alpha", "url": "https://fk/1", "productId": "FSN1", "storeType": "flipkart"},
            {"name": "Nope", "url": "https://x/1", "productId": "X1", "storeType": "unknown_store"}
        ]"#,
    )
    .unwrap();

    let config = test_config(&server.uri(), &["110016"]);
    let orchestrator = Orchestrator::new(
        &config,
        Arc::new(FileCatalog::new(file.path())),
        RecordingChannel::new(),
    )
    .unwrap();

    let CycleOutcome::Completed(report) = orchestrator.run_cycle().await.unwrap() else {
        panic!("expected a completed cycle");
    };
    assert_eq!(report.stores[&StoreType::Flipkart].total, 1);
    assert_eq!(report.total_tracked(), 1 + 10);
}

#[tokio::test(start_paused = true)]
async fn test_silent_catalog_is_bounded_by_database_timeout() {
    let mut config = test_config("http://127.0.0.1:9", &["110016"]);
    config.database.timeout_secs = 10;
    let catalog = HangingCatalog::new(1);
    let orchestrator =
        Orchestrator::new(&config, catalog.clone(), RecordingChannel::new()).unwrap();

    let started = tokio::time::Instant::now();
    let err = orchestrator.run_cycle().await.unwrap_err();

    assert!(matches!(err, Error::Catalog(CatalogError::Timeout(10))));
    assert!(err.is_recoverable());
    assert!(started.elapsed() >= Duration::from_secs(10));
    assert!(started.elapsed() < Duration::from_secs(11));
    assert_eq!(catalog.starts().len(), 1);
}

#[tokio::test]
async fn test_catalog_outage_is_systemic_failure() {
    let server = MockServer::start().await;
    let config = test_config(&server.uri(), &["110016"]);
    let catalog = FailingCatalog::new();
    let orchestrator =
        Orchestrator::new(&config, catalog.clone(), RecordingChannel::new()).unwrap();

    let err = orchestrator.run_cycle().await.unwrap_err();
    assert!(matches!(err, Error::Catalog(_)));
    assert!(err.is_recoverable());
    assert_eq!(catalog.calls(), 1);

    // No vendor was contacted
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_empty_catalog_skips_cycle() {
    let server = MockServer::start().await;
    let config = test_config(&server.uri(), &["110016"]);
    let orchestrator = Orchestrator::new(
        &config,
        Arc::new(StaticCatalog::empty()),
        RecordingChannel::new(),
    )
    .unwrap();

    let outcome = orchestrator.run_cycle().await.unwrap();
    assert!(matches!(outcome, CycleOutcome::Skipped(_)));
    assert!(server.received_requests().await.unwrap().is_empty());
}

struct PanickingChecker;

#[async_trait]
impl StockChecker for PanickingChecker {
    fn store(&self) -> StoreType {
        StoreType::Croma
    }

    async fn probe(&self, _product: &Product, _pincode: Option<&str>) -> ProbeResult {
        panic!("croma parser exploded");
    }
}

struct AlwaysAvailable {
    calls: AtomicUsize,
}

#[async_trait]
impl StockChecker for AlwaysAvailable {
    fn store(&self) -> StoreType {
        StoreType::Amazon
    }

    async fn probe(&self, product: &Product, _pincode: Option<&str>) -> ProbeResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Some(product.markdown_link()))
    }
}

#[tokio::test]
async fn test_panicking_store_does_not_affect_others() {
    let server = MockServer::start().await;
    mount_all_unavailable(&server).await;

    let config = test_config(&server.uri(), &["110016"]);
    let notifier = RecordingChannel::new();
    let amazon = Arc::new(AlwaysAvailable {
        calls: AtomicUsize::new(0),
    });

    let orchestrator = Orchestrator::new(
        &config,
        Arc::new(StaticCatalog::new(catalog())),
        notifier.clone(),
    )
    .unwrap()
    .with_checker(Arc::new(PanickingChecker))
    .with_checker(amazon.clone());

    let CycleOutcome::Completed(report) = orchestrator.run_cycle().await.unwrap() else {
        panic!("expected a completed cycle");
    };

    assert_eq!(report.stores[&StoreType::Croma].found, 0);
    assert_eq!(report.stores[&StoreType::Croma].total, 1);
    assert_eq!(report.stores[&StoreType::Amazon].found, 1);
    assert_eq!(report.total_found(), 1);
    assert_eq!(amazon.calls.load(Ordering::SeqCst), 1);

    let alerts = notifier.alerts();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].store, StoreType::Amazon);
}

#[tokio::test]
async fn test_single_slot_concurrency_still_completes() {
    let server = MockServer::start().await;
    mount_all_unavailable(&server).await;

    let config = test_config(&server.uri(), &["110016"]);
    let orchestrator = Orchestrator::new(
        &config,
        Arc::new(StaticCatalog::new(catalog())),
        RecordingChannel::new(),
    )
    .unwrap()
    .with_max_concurrency(1);

    let outcome = orchestrator.run_cycle().await.unwrap();
    assert!(matches!(outcome, CycleOutcome::Completed(_)));
}
