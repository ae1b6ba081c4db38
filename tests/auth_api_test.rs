use std::sync::{Arc, Mutex};
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{json, Value};
use tower::ServiceExt; // for `oneshot`

use caresync::api::auth::AuthState;
use caresync::auth::{Mailer, PendingSignup};
use caresync::health::HealthMonitor;
use caresync::patients::PatientStore;
use caresync::terminology::CodeRegistry;

/// Captures sent OTPs so the flow can be driven end to end.
struct RecordingMailer {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingMailer {
    fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
        }
    }

    fn last_otp_for(&self, email: &str) -> Option<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(to, _)| to == email)
            .map(|(_, otp)| otp.clone())
    }
}

impl Mailer for RecordingMailer {
    fn send_otp(&self, email: &str, otp: &str) {
        self.sent
            .lock()
            .unwrap()
            .push((email.to_string(), otp.to_string()));
    }
}

fn test_app() -> (axum::Router, AuthState, Arc<RecordingMailer>) {
    let mailer = Arc::new(RecordingMailer::new());
    let auth_state = AuthState::new(mailer.clone(), 7);

    let registry = Arc::new(CodeRegistry::with_seed_data());
    let patients = Arc::new(PatientStore::new());
    let health = Arc::new(HealthMonitor::new());
    let options = caresync::api::ApiOptions {
        rate_limit_per_minute: 1000,
        ..Default::default()
    };
    let app = caresync::api::router(registry, patients, auth_state.clone(), health, options);
    (app, auth_state, mailer)
}

async fn post_json(app: &axum::Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("Content-Type", "application/json")
                .body(Body::from(serde_json::to_string(&body).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: Value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or(Value::String(String::from_utf8_lossy(&bytes).to_string()))
    };
    (status, json)
}

/// A six-digit code guaranteed to differ from `otp`.
fn wrong_code(otp: &str) -> String {
    let first = otp.as_bytes()[0];
    let flipped = if first == b'9' { '0' } else { (first + 1) as char };
    format!("{}{}", flipped, &otp[1..])
}

#[tokio::test]
async fn test_full_signup_and_login_flow() {
    let (app, _state, mailer) = test_app();
    let email = "asha@example.com";

    // Fresh email is available
    let (status, body) = post_json(&app, "/api/auth/check-email", json!({ "email": email })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["exists"], false);

    // Request OTP
    let (status, body) = post_json(
        &app,
        "/api/auth/send-otp",
        json!({
            "email": email,
            "password": "secret123",
            "firstName": "Asha",
            "lastName": "Rao"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "OTP sent to email");

    let otp = mailer.last_otp_for(email).unwrap();
    assert_eq!(otp.len(), 6);

    // Wrong OTP rejected, entry kept for retry
    let (status, body) = post_json(
        &app,
        "/api/auth/verify-otp",
        json!({ "email": email, "otp": wrong_code(&otp) }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid OTP");

    // Correct OTP creates the account
    let (status, body) = post_json(
        &app,
        "/api/auth/verify-otp",
        json!({ "email": email, "otp": otp }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Account created");
    assert_eq!(body["user"]["email"], email);
    assert_eq!(body["user"]["firstName"], "Asha");
    assert!(body["user"].get("passwordHash").is_none());

    // OTP is consumed
    let (status, _) = post_json(
        &app,
        "/api/auth/verify-otp",
        json!({ "email": email, "otp": otp }),
    )
    .await;
    assert_eq!(status, StatusCode::GONE);

    // Email is now taken
    let (status, body) = post_json(&app, "/api/auth/check-email", json!({ "email": email })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["exists"], true);

    // Login with the password supplied at signup
    let (status, body) = post_json(
        &app,
        "/api/auth/login",
        json!({ "email": email, "password": "secret123" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap().to_string();

    // The token opens the guarded patient routes
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/patients")
                .header("Authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_send_otp_duplicate_email_conflict() {
    let (app, state, _mailer) = test_app();
    state
        .users
        .register("taken@example.com", "T", "K", "secret123")
        .await
        .unwrap();

    let (status, body) = post_json(
        &app,
        "/api/auth/send-otp",
        json!({
            "email": "taken@example.com",
            "password": "secret123",
            "firstName": "T",
            "lastName": "K"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Email already registered");
}

#[tokio::test]
async fn test_send_otp_validation() {
    let (app, _state, _mailer) = test_app();

    // Short password
    let (status, _) = post_json(
        &app,
        "/api/auth/send-otp",
        json!({
            "email": "a@example.com",
            "password": "short",
            "firstName": "A",
            "lastName": "B"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Malformed email
    let (status, _) = post_json(
        &app,
        "/api/auth/send-otp",
        json!({
            "email": "not-an-email",
            "password": "secret123",
            "firstName": "A",
            "lastName": "B"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_verify_otp_gone_cases() {
    let (app, state, _mailer) = test_app();

    // No pending signup at all
    let (status, _) = post_json(
        &app,
        "/api/auth/verify-otp",
        json!({ "email": "ghost@example.com", "otp": "123456" }),
    )
    .await;
    assert_eq!(status, StatusCode::GONE);

    // Expired pending signup
    state
        .otps
        .insert_raw(
            "late@example.com",
            PendingSignup {
                otp: "123456".to_string(),
                expires_at: chrono::Utc::now().timestamp() - 1,
                first_name: "Late".to_string(),
                last_name: "User".to_string(),
                password: "secret123".to_string(),
            },
        )
        .await;

    let (status, body) = post_json(
        &app,
        "/api/auth/verify-otp",
        json!({ "email": "late@example.com", "otp": "123456" }),
    )
    .await;
    assert_eq!(status, StatusCode::GONE);
    assert_eq!(body["error"], "OTP expired");
}

#[tokio::test]
async fn test_login_failures() {
    let (app, state, _mailer) = test_app();
    state
        .users
        .register("known@example.com", "K", "N", "secret123")
        .await
        .unwrap();

    let (status, _) = post_json(
        &app,
        "/api/auth/login",
        json!({ "email": "missing@example.com", "password": "secret123" }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = post_json(
        &app,
        "/api/auth/login",
        json!({ "email": "known@example.com", "password": "wrongpass" }),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid password");
}
