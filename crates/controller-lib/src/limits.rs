//! Soft-limit derivation from pod annotations
//!
//! A pod opts into enforcement by annotating a CPU or memory soft limit,
//! either as an absolute quantity ("100m", "256Mi") or as a percentage of its
//! summed hard limits ("10%" means 10 percent below the hard limit).

use crate::models::Workload;
use crate::quantity::{PercentCache, Quantity, ResourceKind, ResourceVector};
use tracing::warn;

/// Annotation key declaring the CPU soft limit.
pub const SOFT_LIMIT_CPU_ANNOTATION: &str = "soft-limits.dev/cpu";
/// Annotation key declaring the memory soft limit.
pub const SOFT_LIMIT_MEMORY_ANNOTATION: &str = "soft-limits.dev/memory";

/// Soft limits derived for one pod in one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SoftLimits {
    /// Effective limits; kinds that derived to nothing enforceable are absent.
    pub limits: ResourceVector,
    /// Whether the pod declared any soft-limit annotation at all. A pod can
    /// be annotated yet end up with no enforceable constraint.
    pub annotated: bool,
}

/// Derives effective soft limits from annotations and container hard limits.
///
/// Owns the percentage-literal cache; derivation itself is recomputed fresh
/// on every pass since annotations may change between passes.
#[derive(Debug, Default)]
pub struct LimitDeriver {
    percents: PercentCache,
}

impl LimitDeriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn derive(&self, workload: &Workload) -> SoftLimits {
        let mut derived = SoftLimits::default();

        let keys = [
            (ResourceKind::Cpu, SOFT_LIMIT_CPU_ANNOTATION),
            (ResourceKind::Memory, SOFT_LIMIT_MEMORY_ANNOTATION),
        ];
        for (kind, key) in keys {
            let Some(value) = workload.annotations.get(key) else {
                continue;
            };
            derived.annotated = true;
            if let Some(limit) = self.derive_kind(workload, kind, value) {
                derived.limits.insert(kind, limit);
            }
        }

        derived
    }

    fn derive_kind(&self, workload: &Workload, kind: ResourceKind, value: &str) -> Option<Quantity> {
        if PercentCache::is_percent(value) {
            // A malformed percentage prefix parses as a 0% reduction, leaving
            // the full hard limit enforced (legacy fallback, see DESIGN.md).
            let percent = self.percents.parse(value).unwrap_or(0.0);
            let soft = reduce_by_percent(workload.hard_limit_total(kind), percent);
            return soft.is_positive().then_some(soft);
        }

        match Quantity::parse(value, kind) {
            Ok(quantity) => Some(quantity),
            Err(error) => {
                warn!(
                    pod = %workload.workload_ref(),
                    %kind,
                    value,
                    %error,
                    "ignoring unparseable soft-limit annotation"
                );
                None
            }
        }
    }
}

/// `hard − hard × percent/100`, truncated back to the canonical integer scale.
fn reduce_by_percent(hard: Quantity, percent: f64) -> Quantity {
    let raw = hard.raw() as f64;
    Quantity::new((raw - raw * (percent / 100.0)) as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn annotated(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
        entries
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    fn workload_with_limits(
        annotations: BTreeMap<String, String>,
        container_limits: Vec<ResourceVector>,
    ) -> Workload {
        Workload {
            namespace: "default".to_string(),
            name: "web-0".to_string(),
            annotations,
            container_limits,
            ..Workload::default()
        }
    }

    fn mem(text: &str) -> Quantity {
        Quantity::parse(text, ResourceKind::Memory).unwrap()
    }

    fn cpu(text: &str) -> Quantity {
        Quantity::parse(text, ResourceKind::Cpu).unwrap()
    }

    #[test]
    fn test_no_annotations_is_exempt() {
        let deriver = LimitDeriver::new();
        let derived = deriver.derive(&workload_with_limits(BTreeMap::new(), vec![]));

        assert!(!derived.annotated);
        assert!(derived.limits.is_empty());
    }

    #[test]
    fn test_absolute_memory_annotation() {
        let deriver = LimitDeriver::new();
        let workload = workload_with_limits(
            annotated(&[(SOFT_LIMIT_MEMORY_ANNOTATION, "100Mi")]),
            vec![],
        );
        let derived = deriver.derive(&workload);

        assert!(derived.annotated);
        assert_eq!(derived.limits.get(ResourceKind::Memory), Some(mem("100Mi")));
        assert_eq!(derived.limits.get(ResourceKind::Cpu), None);
    }

    #[test]
    fn test_absolute_cpu_annotation_ignores_hard_limits() {
        let deriver = LimitDeriver::new();
        let workload =
            workload_with_limits(annotated(&[(SOFT_LIMIT_CPU_ANNOTATION, "100m")]), vec![]);
        let derived = deriver.derive(&workload);

        assert!(derived.annotated);
        assert_eq!(derived.limits.get(ResourceKind::Cpu), Some(cpu("100m")));
    }

    #[test]
    fn test_percentage_reduces_hard_total() {
        let deriver = LimitDeriver::new();
        let workload = workload_with_limits(
            annotated(&[(SOFT_LIMIT_MEMORY_ANNOTATION, "10%")]),
            vec![[(ResourceKind::Memory, mem("100Mi"))].into_iter().collect()],
        );
        let derived = deriver.derive(&workload);

        assert_eq!(derived.limits.get(ResourceKind::Memory), Some(mem("90Mi")));
    }

    #[test]
    fn test_percentage_sums_across_containers() {
        let deriver = LimitDeriver::new();
        let workload = workload_with_limits(
            annotated(&[(SOFT_LIMIT_CPU_ANNOTATION, "50%")]),
            vec![
                [(ResourceKind::Cpu, cpu("100m"))].into_iter().collect(),
                [(ResourceKind::Cpu, cpu("200m"))].into_iter().collect(),
            ],
        );
        let derived = deriver.derive(&workload);

        assert_eq!(derived.limits.get(ResourceKind::Cpu), Some(cpu("150m")));
    }

    #[test]
    fn test_percentage_of_zero_hard_limit_is_omitted() {
        let deriver = LimitDeriver::new();
        let workload =
            workload_with_limits(annotated(&[(SOFT_LIMIT_MEMORY_ANNOTATION, "10%")]), vec![]);
        let derived = deriver.derive(&workload);

        assert!(derived.annotated);
        assert!(derived.limits.is_empty());
    }

    #[test]
    fn test_malformed_percentage_falls_back_to_hard_limit() {
        let deriver = LimitDeriver::new();
        let workload = workload_with_limits(
            annotated(&[(SOFT_LIMIT_MEMORY_ANNOTATION, "10%%")]),
            vec![[(ResourceKind::Memory, mem("100Mi"))].into_iter().collect()],
        );
        let derived = deriver.derive(&workload);

        assert_eq!(derived.limits.get(ResourceKind::Memory), Some(mem("100Mi")));
    }

    #[test]
    fn test_malformed_absolute_annotation_is_omitted() {
        let deriver = LimitDeriver::new();
        let workload = workload_with_limits(
            annotated(&[
                (SOFT_LIMIT_CPU_ANNOTATION, "not-a-quantity"),
                (SOFT_LIMIT_MEMORY_ANNOTATION, "256Mi"),
            ]),
            vec![],
        );
        let derived = deriver.derive(&workload);

        assert!(derived.annotated);
        assert_eq!(derived.limits.get(ResourceKind::Cpu), None);
        assert_eq!(derived.limits.get(ResourceKind::Memory), Some(mem("256Mi")));
    }

    #[test]
    fn test_independent_kinds() {
        let deriver = LimitDeriver::new();
        let workload = workload_with_limits(
            annotated(&[
                (SOFT_LIMIT_CPU_ANNOTATION, "10%"),
                (SOFT_LIMIT_MEMORY_ANNOTATION, "128Mi"),
            ]),
            vec![[(ResourceKind::Cpu, cpu("100m"))].into_iter().collect()],
        );
        let derived = deriver.derive(&workload);

        assert_eq!(derived.limits.get(ResourceKind::Cpu), Some(cpu("90m")));
        assert_eq!(derived.limits.get(ResourceKind::Memory), Some(mem("128Mi")));
    }
}
