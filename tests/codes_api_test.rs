use std::sync::Arc;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::Value;
use tower::ServiceExt; // for `oneshot`

use caresync::api::auth::AuthState;
use caresync::auth::LogMailer;
use caresync::health::HealthMonitor;
use caresync::patients::PatientStore;
use caresync::terminology::CodeRegistry;

async fn test_app() -> axum::Router {
    let registry = Arc::new(CodeRegistry::with_seed_data());
    let patients = Arc::new(PatientStore::new());
    let auth_state = AuthState::new(Arc::new(LogMailer), 7);
    let health = Arc::new(HealthMonitor::new());
    let options = caresync::api::ApiOptions {
        rate_limit_per_minute: 1000,
        ..Default::default()
    };
    caresync::api::router(registry, patients, auth_state, health, options)
}

async fn get_json(app: &axum::Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: Value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::String(String::from_utf8_lossy(&bytes).to_string()))
    };
    (status, json)
}

#[tokio::test]
async fn test_search_matches_all_code_fields() {
    let app = test_app().await;

    // NAMASTE code fragment
    let (status, body) = get_json(&app, "/api/codes/search?q=AYR-001").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["results"][0]["icd11Code"], "BA25.1");

    // ICD-11 description fragment, case-insensitive
    let (status, body) = get_json(&app, "/api/codes/search?q=asthma").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"][0]["namasteCode"], "AYR-023");

    // No query returns the limited full set
    let (status, body) = get_json(&app, "/api/codes/search").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["total"].as_u64().unwrap() >= 5);
}

#[tokio::test]
async fn test_search_category_filter_and_limit() {
    let app = test_app().await;

    let (status, body) = get_json(&app, "/api/codes/search?category=Siddha").await;
    assert_eq!(status, StatusCode::OK);
    for result in body["results"].as_array().unwrap() {
        assert_eq!(result["category"], "Siddha");
    }

    let (status, body) = get_json(&app, "/api/codes/search?limit=2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"].as_array().unwrap().len(), 2);

    // Unknown category is a 400
    let (status, _) = get_json(&app, "/api/codes/search?category=Homeopathy").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_code_by_namaste_code() {
    let app = test_app().await;

    let (status, body) = get_json(&app, "/api/codes/SID-045").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["icd11Code"], "DA90");
    assert_eq!(body["icd11Description"], "Diabetes mellitus");

    let (status, _) = get_json(&app, "/api/codes/XYZ-999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_code_stats() {
    let app = test_app().await;

    let (status, body) = get_json(&app, "/api/codes/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["total"].as_u64().unwrap(),
        body["by_category"]
            .as_object()
            .unwrap()
            .values()
            .map(|v| v.as_u64().unwrap())
            .sum::<u64>()
    );
}

#[tokio::test]
async fn test_health_and_ping_are_public() {
    let app = test_app().await;

    let (status, body) = get_json(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "Healthy");

    let (status, body) = get_json(&app, "/api/ping").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].is_string());
}
