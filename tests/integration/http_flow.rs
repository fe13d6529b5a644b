//! Full router against files on disk.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use std::sync::Arc;
use tower::ServiceExt;

use sales_forecast::config::AppSection;
use sales_forecast::dashboard::{build_router, routes::DashboardState};
use sales_forecast::data::{Dataset, DatasetCache};

use crate::fixtures::{CsvFixture, EXAMPLE_ITEMS, EXAMPLE_PREDICTIONS};

fn router_for(fx: &CsvFixture) -> Router {
    let cfg = fx.data_config();
    let mut cache = DatasetCache::new();
    let dataset = Dataset::load(&mut cache, &cfg).unwrap();
    build_router(Arc::new(DashboardState::new(AppSection::default(), cfg, dataset, cache)))
}

async fn send(app: &Router, method: &str, uri: &str) -> (StatusCode, serde_json::Value) {
    let resp = app
        .clone()
        .oneshot(Request::builder().method(method).uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let body = axum::body::to_bytes(resp.into_body(), 100_000).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_predict_with_category() {
    let fx = CsvFixture::with_items(EXAMPLE_PREDICTIONS, EXAMPLE_ITEMS);
    let app = router_for(&fx);

    let (status, json) = send(&app, "GET", "/api/predict?item_id=1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total_sales"].as_f64().unwrap(), 8.0);
    assert_eq!(json["shop_count"], 2);
    assert_eq!(json["average_per_shop"].as_f64().unwrap(), 4.0);
    assert_eq!(json["category_id"], 40);
    assert_eq!(json["top_shops"].as_array().unwrap().len(), 2);
    assert_eq!(json["all_shops"][1]["shop_id"], 11);
}

#[tokio::test]
async fn test_predict_unknown_item() {
    let fx = CsvFixture::new(EXAMPLE_PREDICTIONS);
    let app = router_for(&fx);

    let (status, json) = send(&app, "GET", "/api/predict?item_id=99").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["message"], "Item ID 99 not found in predictions!");
}

#[tokio::test]
async fn test_reload_detects_changes() {
    let fx = CsvFixture::new(EXAMPLE_PREDICTIONS);
    let app = router_for(&fx);

    let (status, json) = send(&app, "POST", "/api/reload").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["reloaded"], false);

    fx.rewrite_predictions("item_id,shop_id,item_cnt_month\n1,10,5.0\n3,12,2.0\n");
    let (status, json) = send(&app, "POST", "/api/reload").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["reloaded"], true);
    assert_eq!(json["total_predictions"], 2);

    let (status, _) = send(&app, "GET", "/api/predict?item_id=3").await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, "GET", "/api/predict?item_id=2").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_reload_failure_keeps_dataset() {
    let fx = CsvFixture::new(EXAMPLE_PREDICTIONS);
    let app = router_for(&fx);

    fx.rewrite_predictions("item_id,shop_id,item_cnt_month\n1,10,broken\n");
    let (status, json) = send(&app, "POST", "/api/reload").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["kind"], "internal");

    let (status, _) = send(&app, "GET", "/api/predict?item_id=1").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_stats_and_items() {
    let fx = CsvFixture::new(EXAMPLE_PREDICTIONS);
    let app = router_for(&fx);

    let (_, stats) = send(&app, "GET", "/api/stats").await;
    assert_eq!(stats["total_items"], 2);
    assert_eq!(stats["total_shops"], 2);
    assert_eq!(stats["total_predictions"], 3);
    assert_eq!(stats["item_metadata"], false);

    let (_, items) = send(&app, "GET", "/api/items").await;
    let labels: Vec<&str> = items["options"]
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["label"].as_str().unwrap())
        .collect();
    assert_eq!(labels, vec!["-- Select an Item ID --", "Item ID: 1", "Item ID: 2"]);
}

#[tokio::test]
async fn test_lookups_answered_during_reload() {
    let fx = CsvFixture::new(EXAMPLE_PREDICTIONS);
    let app = router_for(&fx);

    let mut big = String::from("item_id,shop_id,item_cnt_month\n");
    for i in 0..200_000 {
        big.push_str(&format!("{},{},{}.5\n", i % 5_000, i, i % 17));
    }
    fx.rewrite_predictions(&big);

    let finished = std::sync::Mutex::new(Vec::new());
    let reload = async {
        let (status, json) = send(&app, "POST", "/api/reload").await;
        finished.lock().unwrap().push("reload");
        (status, json)
    };
    let predict = async {
        let (status, _) = send(&app, "GET", "/api/predict?item_id=1").await;
        finished.lock().unwrap().push("predict");
        status
    };
    let ((reload_status, reload_json), predict_status) = tokio::join!(reload, predict);

    assert_eq!(reload_status, StatusCode::OK);
    assert_eq!(reload_json["total_predictions"], 200_000);
    assert_eq!(predict_status, StatusCode::OK);
    // Single-threaded runtime: the lookup can only finish first if the
    // reload yields while the file is parsed.
    assert_eq!(*finished.lock().unwrap(), vec!["predict", "reload"]);
}
