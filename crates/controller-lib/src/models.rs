//! Core data models for the soft-limit controller

use crate::quantity::{Quantity, ResourceKind, ResourceVector};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Identity of a pod under enforcement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkloadRef {
    pub namespace: String,
    pub name: String,
}

impl fmt::Display for WorkloadRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// A pod as seen by one enforcement pass: its annotations and the hard
/// resource limits declared per container.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Workload {
    pub namespace: String,
    pub name: String,
    pub uid: Option<String>,
    pub annotations: BTreeMap<String, String>,
    /// Declared hard resource limits, one vector per container.
    pub container_limits: Vec<ResourceVector>,
}

impl Workload {
    pub fn workload_ref(&self) -> WorkloadRef {
        WorkloadRef {
            namespace: self.namespace.clone(),
            name: self.name.clone(),
        }
    }

    /// Sum one kind's hard limit across all containers. Containers without a
    /// declared limit for the kind contribute nothing.
    pub fn hard_limit_total(&self, kind: ResourceKind) -> Quantity {
        self.container_limits
            .iter()
            .filter_map(|limits| limits.get(kind))
            .fold(Quantity::ZERO, Quantity::saturating_add)
    }
}

/// Observed point-in-time resource usage for one container, already typed by
/// the metrics client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageSample {
    pub container: String,
    pub usage: ResourceVector,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workload_ref_display() {
        let reference = WorkloadRef {
            namespace: "default".to_string(),
            name: "web-0".to_string(),
        };
        assert_eq!(reference.to_string(), "default/web-0");
    }

    #[test]
    fn test_hard_limit_total_sums_containers() {
        let workload = Workload {
            container_limits: vec![
                [(ResourceKind::Cpu, Quantity::new(100))].into_iter().collect(),
                [
                    (ResourceKind::Cpu, Quantity::new(200)),
                    (ResourceKind::Memory, Quantity::new(1024)),
                ]
                .into_iter()
                .collect(),
            ],
            ..Workload::default()
        };

        assert_eq!(
            workload.hard_limit_total(ResourceKind::Cpu),
            Quantity::new(300)
        );
        assert_eq!(
            workload.hard_limit_total(ResourceKind::Memory),
            Quantity::new(1024)
        );
    }

    #[test]
    fn test_hard_limit_total_empty() {
        let workload = Workload::default();
        assert_eq!(workload.hard_limit_total(ResourceKind::Cpu), Quantity::ZERO);
    }
}
