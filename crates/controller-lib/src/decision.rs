//! Exceeded / not-exceeded verdict

use crate::quantity::ResourceVector;

/// True when any limited kind shows usage strictly above its soft limit.
///
/// Kinds absent from `usage` are treated as not observed and skipped rather
/// than assumed zero or infinite. Equality is within bounds: the soft limit
/// is an inclusive upper bound.
pub fn exceeds(soft_limits: &ResourceVector, usage: &ResourceVector) -> bool {
    soft_limits.iter().any(|(kind, limit)| {
        usage
            .get(kind)
            .map_or(false, |observed| observed > limit)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quantity::{Quantity, ResourceKind};

    fn vector(entries: &[(ResourceKind, i64)]) -> ResourceVector {
        entries
            .iter()
            .map(|(kind, raw)| (*kind, Quantity::new(*raw)))
            .collect()
    }

    #[test]
    fn test_equal_usage_is_within_bounds() {
        let limits = vector(&[(ResourceKind::Memory, 100)]);
        assert!(!exceeds(&limits, &vector(&[(ResourceKind::Memory, 100)])));

        let limits = vector(&[(ResourceKind::Cpu, 100)]);
        assert!(!exceeds(&limits, &vector(&[(ResourceKind::Cpu, 100)])));
    }

    #[test]
    fn test_usage_above_limit_exceeds() {
        let limits = vector(&[(ResourceKind::Memory, 0)]);
        assert!(exceeds(&limits, &vector(&[(ResourceKind::Memory, 100)])));

        let limits = vector(&[(ResourceKind::Cpu, 0)]);
        assert!(exceeds(&limits, &vector(&[(ResourceKind::Cpu, 100)])));
    }

    #[test]
    fn test_usage_below_limit_is_within_bounds() {
        let limits = vector(&[(ResourceKind::Memory, 100)]);
        assert!(!exceeds(&limits, &vector(&[(ResourceKind::Memory, 0)])));

        let limits = vector(&[(ResourceKind::Cpu, 100)]);
        assert!(!exceeds(&limits, &vector(&[(ResourceKind::Cpu, 0)])));
    }

    #[test]
    fn test_unobserved_kind_is_skipped() {
        let limits = vector(&[(ResourceKind::Cpu, 100)]);
        assert!(!exceeds(&limits, &vector(&[])));
        assert!(!exceeds(&limits, &vector(&[(ResourceKind::Memory, 1 << 40)])));
    }

    #[test]
    fn test_any_kind_exceeding_marks_verdict() {
        let limits = vector(&[(ResourceKind::Cpu, 100), (ResourceKind::Memory, 100)]);
        let usage = vector(&[(ResourceKind::Cpu, 50), (ResourceKind::Memory, 101)]);
        assert!(exceeds(&limits, &usage));
    }

    #[test]
    fn test_empty_limits_never_exceed() {
        let usage = vector(&[(ResourceKind::Cpu, 1 << 40)]);
        assert!(!exceeds(&ResourceVector::new(), &usage));
    }
}
