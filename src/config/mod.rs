//! Config Module - Configuration management

use std::collections::HashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Main configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub smtp: SmtpConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_ms: u64,
    pub rate_limit_per_minute: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuthConfig {
    pub otp_ttl_seconds: u64,
    pub token_expiry_days: u64,
    pub auth_required: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SmtpConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    pub from_address: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                request_timeout_ms: 30000,
                rate_limit_per_minute: 100,
            },
            auth: AuthConfig {
                otp_ttl_seconds: 300,
                token_expiry_days: 7,
                auth_required: true,
            },
            smtp: SmtpConfig {
                enabled: false,
                host: "smtp.gmail.com".to_string(),
                port: 587,
                from_address: "caresync@example.com".to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }
}

/// Configuration manager with file loading and overrides
pub struct ConfigManager {
    config: RwLock<Config>,
    config_path: Option<String>,
    overrides: RwLock<HashMap<String, String>>,
}

impl ConfigManager {
    pub fn new() -> Self {
        Self {
            config: RwLock::new(Config::default()),
            config_path: None,
            overrides: RwLock::new(HashMap::new()),
        }
    }

    /// Load from file
    pub async fn load(&mut self, path: &str) -> Result<(), String> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| format!("Failed to read config: {}", e))?;

        let config: Config = if path.ends_with(".toml") {
            toml::from_str(&content).map_err(|e| format!("Invalid TOML: {}", e))?
        } else if path.ends_with(".json") {
            serde_json::from_str(&content).map_err(|e| format!("Invalid JSON: {}", e))?
        } else {
            return Err("Unsupported config format".to_string());
        };

        let mut cfg = self.config.write().await;
        *cfg = config;
        self.config_path = Some(path.to_string());

        Ok(())
    }

    /// Get current config
    pub async fn get(&self) -> Config {
        self.config.read().await.clone()
    }

    /// Update config value
    pub async fn set(&self, key: &str, value: &str) {
        let mut overrides = self.overrides.write().await;
        overrides.insert(key.to_string(), value.to_string());
    }

    /// Get specific value
    pub async fn get_value(&self, key: &str) -> Option<String> {
        let overrides = self.overrides.read().await;
        if let Some(v) = overrides.get(key) {
            return Some(v.clone());
        }

        let config = self.config.read().await;
        match key {
            "server.host" => Some(config.server.host.clone()),
            "server.port" => Some(config.server.port.to_string()),
            "auth.token_expiry_days" => Some(config.auth.token_expiry_days.to_string()),
            "smtp.host" => Some(config.smtp.host.clone()),
            "logging.level" => Some(config.logging.level.clone()),
            _ => None,
        }
    }

    /// Validate config
    pub async fn validate(&self) -> Result<(), Vec<String>> {
        let config = self.config.read().await;
        let mut errors = Vec::new();

        if config.server.port == 0 {
            errors.push("Invalid server port".to_string());
        }

        if config.auth.otp_ttl_seconds == 0 {
            errors.push("otp_ttl_seconds must be > 0".to_string());
        }

        if config.auth.token_expiry_days == 0 {
            errors.push("token_expiry_days must be > 0".to_string());
        }

        if config.smtp.enabled && config.smtp.from_address.is_empty() {
            errors.push("smtp.from_address required when smtp is enabled".to_string());
        }

        if config.logging.level.parse::<tracing::Level>().is_err() {
            errors.push(format!("Unknown logging level: {}", config.logging.level));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Export config as TOML
    pub async fn export_toml(&self) -> Result<String, String> {
        let config = self.config.read().await;
        toml::to_string_pretty(&*config).map_err(|e| format!("Failed to serialize: {}", e))
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}
