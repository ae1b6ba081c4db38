//! Auth endpoints - OTP signup and password login

use std::sync::Arc;
use axum::{extract::Extension, http::StatusCode, routing::post, Json, Router};
use serde::Serialize;

use crate::auth::{AuthError, Mailer, OtpStore, UserProfile, UserStore};
use crate::validation::{validate_object, FieldValidator, ValidationResult};

/// Shared state for the auth endpoints.
#[derive(Clone)]
pub struct AuthState {
    pub users: Arc<UserStore>,
    pub otps: Arc<OtpStore>,
    pub mailer: Arc<dyn Mailer>,
    pub token_expiry_days: u64,
}

impl AuthState {
    pub fn new(mailer: Arc<dyn Mailer>, token_expiry_days: u64) -> Self {
        Self {
            users: Arc::new(UserStore::new()),
            otps: Arc::new(OtpStore::new()),
            mailer,
            token_expiry_days,
        }
    }

    /// Replace the OTP store with one using a configured validity window.
    pub fn with_otp_ttl(mut self, ttl_seconds: i64) -> Self {
        self.otps = Arc::new(OtpStore::with_ttl(ttl_seconds));
        self
    }
}

pub fn routes() -> Router {
    Router::new()
        .route("/check-email", post(check_email))
        .route("/send-otp", post(send_otp))
        .route("/verify-otp", post(verify_otp))
        .route("/login", post(login))
}

fn bad_request(result: ValidationResult) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({
            "error": "Invalid request",
            "details": result.errors,
        })),
    )
}

fn error_response(err: &AuthError) -> (StatusCode, Json<serde_json::Value>) {
    let status = match err {
        AuthError::EmailRegistered => StatusCode::CONFLICT,
        AuthError::OtpNotFound | AuthError::OtpExpired => StatusCode::GONE,
        AuthError::OtpMismatch => StatusCode::BAD_REQUEST,
        AuthError::AccountNotFound => StatusCode::NOT_FOUND,
        AuthError::InvalidPassword => StatusCode::UNAUTHORIZED,
        AuthError::Token(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(serde_json::json!({ "error": err.to_string() })))
}

async fn check_email(
    Extension(state): Extension<AuthState>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    let result = validate_object(&body, &[FieldValidator::new("email").required().email()]);
    if !result.valid {
        return Err(bad_request(result));
    }

    let email = body["email"].as_str().unwrap_or_default();
    let exists = state.users.exists(email).await;
    Ok(Json(serde_json::json!({ "exists": exists })))
}

fn send_otp_rules() -> Vec<FieldValidator> {
    vec![
        FieldValidator::new("email").required().email(),
        FieldValidator::new("password").required().min_length(6),
        FieldValidator::new("firstName").required().min_length(1),
        FieldValidator::new("lastName").required().min_length(1),
    ]
}

async fn send_otp(
    Extension(state): Extension<AuthState>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    let result = validate_object(&body, &send_otp_rules());
    if !result.valid {
        return Err(bad_request(result));
    }

    let email = body["email"].as_str().unwrap_or_default();
    if state.users.exists(email).await {
        return Err(error_response(&AuthError::EmailRegistered));
    }

    // Opportunistic cleanup of abandoned signups
    state.otps.purge_expired().await;

    let otp = state
        .otps
        .begin(
            email,
            body["firstName"].as_str().unwrap_or_default(),
            body["lastName"].as_str().unwrap_or_default(),
            body["password"].as_str().unwrap_or_default(),
        )
        .await;

    state.mailer.send_otp(email, &otp);
    tracing::info!("OTP issued for signup of {}", email);

    Ok(Json(serde_json::json!({ "message": "OTP sent to email" })))
}

#[derive(Serialize)]
struct VerifyOtpResponse {
    message: String,
    user: UserProfile,
}

async fn verify_otp(
    Extension(state): Extension<AuthState>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<VerifyOtpResponse>, (StatusCode, Json<serde_json::Value>)> {
    let result = validate_object(
        &body,
        &[
            FieldValidator::new("email").required().email(),
            FieldValidator::new("otp").required().exact_length(6).digits(),
        ],
    );
    if !result.valid {
        return Err(bad_request(result));
    }

    let email = body["email"].as_str().unwrap_or_default();
    let otp = body["otp"].as_str().unwrap_or_default();

    let pending = state
        .otps
        .verify(email, otp)
        .await
        .map_err(|e| error_response(&e))?;

    let user = state
        .users
        .register(email, &pending.first_name, &pending.last_name, &pending.password)
        .await
        .map_err(|e| error_response(&e))?;

    tracing::info!("Account created for {}", email);

    Ok(Json(VerifyOtpResponse {
        message: "Account created".to_string(),
        user: UserProfile::from(&user),
    }))
}

#[derive(Serialize)]
struct LoginResponse {
    message: String,
    token: String,
    user: UserProfile,
}

async fn login(
    Extension(state): Extension<AuthState>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<LoginResponse>, (StatusCode, Json<serde_json::Value>)> {
    let result = validate_object(
        &body,
        &[
            FieldValidator::new("email").required().email(),
            FieldValidator::new("password").required().min_length(1),
        ],
    );
    if !result.valid {
        return Err(bad_request(result));
    }

    let email = body["email"].as_str().unwrap_or_default();
    let password = body["password"].as_str().unwrap_or_default();

    let user = state
        .users
        .authenticate(email, password)
        .await
        .map_err(|e| error_response(&e))?;

    let token = crate::auth::issue_token(&user.email, vec!["staff".to_string()], state.token_expiry_days)
        .map_err(|e| error_response(&e))?;

    tracing::info!("Login for {}", email);

    Ok(Json(LoginResponse {
        message: "Login successful".to_string(),
        token,
        user: UserProfile::from(&user),
    }))
}
