//! Health Module - Service health monitoring

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Overall service health status
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SystemHealth {
    pub status: HealthStatus,
    pub uptime_seconds: u64,
    pub version: String,
    pub components: HashMap<String, ComponentHealth>,
    pub timestamp: i64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Component health
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub name: String,
    pub status: HealthStatus,
    pub message: Option<String>,
    pub last_check: i64,
}

impl ComponentHealth {
    pub fn healthy(name: &str) -> Self {
        Self {
            name: name.to_string(),
            status: HealthStatus::Healthy,
            message: None,
            last_check: chrono::Utc::now().timestamp(),
        }
    }
}

/// Health monitor
pub struct HealthMonitor {
    start_time: Instant,
    checks: RwLock<HashMap<String, Arc<dyn Fn() -> ComponentHealth + Send + Sync>>>,
    last_results: RwLock<HashMap<String, ComponentHealth>>,
}

impl HealthMonitor {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            checks: RwLock::new(HashMap::new()),
            last_results: RwLock::new(HashMap::new()),
        }
    }

    /// Register a health check
    pub async fn register_check<F>(&self, name: &str, check: F)
    where
        F: Fn() -> ComponentHealth + Send + Sync + 'static,
    {
        let mut checks = self.checks.write().await;
        checks.insert(name.to_string(), Arc::new(check));
    }

    /// Run all health checks
    pub async fn check_all(&self) -> SystemHealth {
        let checks = self.checks.read().await;
        let mut components = HashMap::new();
        let mut overall_status = HealthStatus::Healthy;

        for (name, check_fn) in checks.iter() {
            let result = check_fn();

            if result.status == HealthStatus::Unhealthy {
                overall_status = HealthStatus::Unhealthy;
            } else if result.status == HealthStatus::Degraded && overall_status != HealthStatus::Unhealthy {
                overall_status = HealthStatus::Degraded;
            }

            components.insert(name.clone(), result.clone());

            let mut last_results = self.last_results.write().await;
            last_results.insert(name.clone(), result);
        }

        SystemHealth {
            status: overall_status,
            uptime_seconds: self.start_time.elapsed().as_secs(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            components,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }

    /// Get specific component health
    pub async fn get_component(&self, name: &str) -> Option<ComponentHealth> {
        let results = self.last_results.read().await;
        results.get(name).cloned()
    }

    /// Get uptime
    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Readiness check (can handle traffic)
    pub async fn is_ready(&self) -> bool {
        let health = self.check_all().await;
        health.status != HealthStatus::Unhealthy
    }
}

impl Default for HealthMonitor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_monitor() {
        let monitor = HealthMonitor::new();

        monitor
            .register_check("code_registry", || ComponentHealth::healthy("code_registry"))
            .await;

        let health = monitor.check_all().await;
        assert_eq!(health.status, HealthStatus::Healthy);
        assert!(health.components.contains_key("code_registry"));
        assert!(monitor.is_ready().await);
    }

    #[tokio::test]
    async fn test_unhealthy_component_degrades_overall() {
        let monitor = HealthMonitor::new();
        monitor
            .register_check("patient_store", || ComponentHealth {
                name: "patient_store".to_string(),
                status: HealthStatus::Unhealthy,
                message: Some("store poisoned".to_string()),
                last_check: chrono::Utc::now().timestamp(),
            })
            .await;

        let health = monitor.check_all().await;
        assert_eq!(health.status, HealthStatus::Unhealthy);
        assert!(!monitor.is_ready().await);
    }
}
