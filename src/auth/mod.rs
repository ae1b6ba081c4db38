//! Auth Module - OTP signup and password login
//!
//! Signup is a two-step flow: an OTP is mailed to the address and held with
//! the pending profile for five minutes; verifying it creates the account.
//! Login checks the salted password hash and issues a JWT for the API
//! middleware.

use std::collections::HashMap;
use jsonwebtoken::{encode, EncodingKey, Header};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;

/// OTP validity window.
pub const OTP_TTL_SECONDS: i64 = 5 * 60;

/// A registered account.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(skip_serializing)]
    pub salt: String,
    pub created_at: String,
}

/// Profile fields returned to clients.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum AuthError {
    EmailRegistered,
    OtpNotFound,
    OtpExpired,
    OtpMismatch,
    AccountNotFound,
    InvalidPassword,
    Token(String),
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::EmailRegistered => write!(f, "Email already registered"),
            AuthError::OtpNotFound => write!(f, "OTP expired or invalid. Restart signup."),
            AuthError::OtpExpired => write!(f, "OTP expired"),
            AuthError::OtpMismatch => write!(f, "Invalid OTP"),
            AuthError::AccountNotFound => write!(f, "Account not found"),
            AuthError::InvalidPassword => write!(f, "Invalid password"),
            AuthError::Token(msg) => write!(f, "Token error: {}", msg),
        }
    }
}

impl std::error::Error for AuthError {}

/// Delivery seam for OTP mail. The default implementation logs the send;
/// production wires an SMTP transport here.
pub trait Mailer: Send + Sync {
    fn send_otp(&self, email: &str, otp: &str);
}

/// Logs instead of sending.
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send_otp(&self, email: &str, otp: &str) {
        tracing::info!("Would send OTP email to {}: code {}", email, otp);
    }
}

/// Pending signup awaiting OTP verification.
#[derive(Clone, Debug)]
pub struct PendingSignup {
    pub otp: String,
    pub expires_at: i64,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

/// Temporary store for pending signups, keyed by email.
pub struct OtpStore {
    pending: RwLock<HashMap<String, PendingSignup>>,
    ttl_seconds: i64,
}

impl OtpStore {
    pub fn new() -> Self {
        Self::with_ttl(OTP_TTL_SECONDS)
    }

    /// Store with a configured validity window.
    pub fn with_ttl(ttl_seconds: i64) -> Self {
        Self {
            pending: RwLock::new(HashMap::new()),
            ttl_seconds,
        }
    }

    /// Stash a pending signup and return the generated OTP.
    pub async fn begin(&self, email: &str, first_name: &str, last_name: &str, password: &str) -> String {
        let otp = generate_otp();
        let pending = PendingSignup {
            otp: otp.clone(),
            expires_at: chrono::Utc::now().timestamp() + self.ttl_seconds,
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            password: password.to_string(),
        };

        let mut map = self.pending.write().await;
        map.insert(email.to_string(), pending);
        otp
    }

    /// Consume a pending signup if the OTP matches and is not expired.
    /// Expired entries are removed; mismatches leave the entry in place so
    /// the user can retry.
    pub async fn verify(&self, email: &str, otp: &str) -> Result<PendingSignup, AuthError> {
        let mut map = self.pending.write().await;

        let pending = map.get(email).ok_or(AuthError::OtpNotFound)?;

        if chrono::Utc::now().timestamp() > pending.expires_at {
            map.remove(email);
            return Err(AuthError::OtpExpired);
        }

        if pending.otp != otp {
            return Err(AuthError::OtpMismatch);
        }

        Ok(map.remove(email).unwrap())
    }

    /// Drop every expired entry.
    pub async fn purge_expired(&self) {
        let now = chrono::Utc::now().timestamp();
        let mut map = self.pending.write().await;
        map.retain(|_, p| p.expires_at >= now);
    }

    /// Insert a pending signup directly, bypassing OTP generation.
    pub async fn insert_raw(&self, email: &str, pending: PendingSignup) {
        self.pending.write().await.insert(email.to_string(), pending);
    }
}

impl Default for OtpStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Registered user accounts, keyed by email.
pub struct UserStore {
    users: RwLock<HashMap<String, User>>,
}

impl UserStore {
    pub fn new() -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
        }
    }

    pub async fn exists(&self, email: &str) -> bool {
        self.users.read().await.contains_key(email)
    }

    pub async fn find(&self, email: &str) -> Option<User> {
        self.users.read().await.get(email).cloned()
    }

    /// Create an account with a freshly salted password hash.
    pub async fn register(
        &self,
        email: &str,
        first_name: &str,
        last_name: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        let mut users = self.users.write().await;
        if users.contains_key(email) {
            return Err(AuthError::EmailRegistered);
        }

        let salt = generate_salt();
        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            email: email.to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            password_hash: hash_password(password, &salt),
            salt,
            created_at: chrono::Utc::now().to_rfc3339(),
        };

        users.insert(email.to_string(), user.clone());
        Ok(user)
    }

    /// Check credentials and return the account.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let users = self.users.read().await;
        let user = users.get(email).ok_or(AuthError::AccountNotFound)?;

        if hash_password(password, &user.salt) != user.password_hash {
            return Err(AuthError::InvalidPassword);
        }

        Ok(user.clone())
    }
}

impl Default for UserStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Six decimal digits.
pub fn generate_otp() -> String {
    let mut rng = rand::thread_rng();
    format!("{:06}", rng.gen_range(0..1_000_000u32))
}

fn generate_salt() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 16] = rng.gen();
    hex::encode(bytes)
}

/// Salted SHA-256, hex encoded.
pub fn hash_password(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// JWT claims shared with the API middleware.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub roles: Vec<String>,
}

pub fn jwt_secret() -> String {
    std::env::var("JWT_SECRET").unwrap_or_else(|_| "default_secret_do_not_use_in_prod".to_string())
}

/// Sign a JWT for the given subject and roles.
pub fn issue_token(sub: &str, roles: Vec<String>, expiry_days: u64) -> Result<String, AuthError> {
    let exp = chrono::Utc::now().timestamp() as usize + (expiry_days as usize * 24 * 60 * 60);
    let claims = Claims {
        sub: sub.to_string(),
        exp,
        roles,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_secret().as_bytes()),
    )
    .map_err(|e| AuthError::Token(e.to_string()))
}
