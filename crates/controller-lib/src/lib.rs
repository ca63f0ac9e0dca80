//! Soft-limit enforcement library
//!
//! This crate provides the core functionality for:
//! - Parsing annotation-declared soft limits (absolute or percentage)
//! - Aggregating per-container usage into a workload-level vector
//! - The exceeded / not-exceeded decision
//! - The periodic enforcement loop and its Kubernetes collaborators
//! - Health checks and Prometheus metrics

pub mod cluster;
pub mod decision;
pub mod enforce;
pub mod error;
pub mod health;
pub mod limits;
pub mod models;
pub mod observability;
pub mod quantity;
pub mod usage;

pub use error::Error;
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::ControllerMetrics;
