//! Health tracking for liveness and readiness probes
//!
//! Each long-lived concern of the controller reports into a shared registry;
//! the binary's `/healthz` and `/readyz` endpoints serve the rollup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Health status of a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    /// Functioning normally
    Healthy,
    /// Experiencing issues but still operational
    Degraded,
    /// Failed
    Unhealthy,
}

/// One component's health record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_check_timestamp: i64,
}

impl ComponentHealth {
    fn record(status: ComponentStatus, message: Option<String>) -> Self {
        Self {
            status,
            message,
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

/// Overall health response served on `/healthz`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub components: HashMap<String, ComponentHealth>,
}

/// Readiness response served on `/readyz`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Component names for health tracking
pub mod components {
    pub const ENFORCER: &str = "enforcer";
    pub const METRICS_SERVICE: &str = "metrics_service";
}

/// Registry of component health, shared between the enforcement loop and the
/// probe endpoints.
#[derive(Debug, Clone, Default)]
pub struct HealthRegistry {
    components: Arc<RwLock<HashMap<String, ComponentHealth>>>,
    ready: Arc<RwLock<bool>>,
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component with initial healthy status
    pub async fn register(&self, name: &str) {
        self.set_healthy(name).await;
    }

    pub async fn set_healthy(&self, name: &str) {
        let mut components = self.components.write().await;
        components.insert(
            name.to_string(),
            ComponentHealth::record(ComponentStatus::Healthy, None),
        );
    }

    pub async fn set_degraded(&self, name: &str, message: impl Into<String>) {
        let mut components = self.components.write().await;
        components.insert(
            name.to_string(),
            ComponentHealth::record(ComponentStatus::Degraded, Some(message.into())),
        );
    }

    pub async fn set_unhealthy(&self, name: &str, message: impl Into<String>) {
        let mut components = self.components.write().await;
        components.insert(
            name.to_string(),
            ComponentHealth::record(ComponentStatus::Unhealthy, Some(message.into())),
        );
    }

    /// Flip readiness; set once startup has finished.
    pub async fn set_ready(&self, ready: bool) {
        *self.ready.write().await = ready;
    }

    pub async fn health(&self) -> HealthResponse {
        let components = self.components.read().await.clone();
        let status = rollup(&components);
        HealthResponse { status, components }
    }

    pub async fn readiness(&self) -> ReadinessResponse {
        if !*self.ready.read().await {
            return ReadinessResponse {
                ready: false,
                reason: Some("Controller not yet initialized".to_string()),
            };
        }

        let health = self.health().await;
        if health.status == ComponentStatus::Unhealthy {
            return ReadinessResponse {
                ready: false,
                reason: Some("Critical component unhealthy".to_string()),
            };
        }

        ReadinessResponse {
            ready: true,
            reason: None,
        }
    }
}

/// Worst component status wins; degraded components leave the controller
/// operational.
fn rollup(components: &HashMap<String, ComponentHealth>) -> ComponentStatus {
    let mut status = ComponentStatus::Healthy;
    for health in components.values() {
        match health.status {
            ComponentStatus::Unhealthy => return ComponentStatus::Unhealthy,
            ComponentStatus::Degraded => status = ComponentStatus::Degraded,
            ComponentStatus::Healthy => {}
        }
    }
    status
}
