//! Workload-level usage aggregation

use crate::models::UsageSample;
use crate::quantity::ResourceVector;

/// Sum per-container samples into a single workload-level usage vector.
///
/// Containers reporting nothing for a kind contribute zero for that kind.
/// Infallible by construction: samples arrive already typed, and any
/// transport or decode failure is reported by the metrics client instead.
pub fn aggregate_usage(samples: &[UsageSample]) -> ResourceVector {
    let mut total = ResourceVector::new();
    for sample in samples {
        total.merge_add(&sample.usage);
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quantity::{Quantity, ResourceKind};

    fn sample(container: &str, entries: &[(ResourceKind, i64)]) -> UsageSample {
        UsageSample {
            container: container.to_string(),
            usage: entries
                .iter()
                .map(|(kind, raw)| (*kind, Quantity::new(*raw)))
                .collect(),
        }
    }

    #[test]
    fn test_aggregates_across_containers() {
        let samples = vec![
            sample("app", &[(ResourceKind::Cpu, 50)]),
            sample("sidecar", &[(ResourceKind::Cpu, 60)]),
        ];

        let total = aggregate_usage(&samples);
        assert_eq!(total.get(ResourceKind::Cpu), Some(Quantity::new(110)));
    }

    #[test]
    fn test_missing_kind_contributes_nothing() {
        let samples = vec![
            sample("app", &[(ResourceKind::Cpu, 50), (ResourceKind::Memory, 1024)]),
            sample("sidecar", &[(ResourceKind::Cpu, 10)]),
        ];

        let total = aggregate_usage(&samples);
        assert_eq!(total.get(ResourceKind::Cpu), Some(Quantity::new(60)));
        assert_eq!(total.get(ResourceKind::Memory), Some(Quantity::new(1024)));
    }

    #[test]
    fn test_empty_samples_yield_empty_vector() {
        assert!(aggregate_usage(&[]).is_empty());
    }
}
