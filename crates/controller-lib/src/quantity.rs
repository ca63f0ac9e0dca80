//! Resource quantity model
//!
//! Exact integer quantities in per-kind canonical scales (CPU in millicores,
//! memory in bytes), a parser for the Kubernetes quantity grammar subset used
//! in pod specs and annotations, and the process-wide cache of parsed
//! percentage literals.

use crate::error::Error;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::warn;

/// A resource dimension under enforcement.
///
/// Each kind has a canonical integer scale: CPU is counted in millicores,
/// memory in bytes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Cpu,
    Memory,
}

impl ResourceKind {
    /// Resource name as it appears in pod specs and metrics payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Cpu => "cpu",
            ResourceKind::Memory => "memory",
        }
    }

    /// Map a pod-spec or metrics resource name onto a kind; unknown names
    /// (ephemeral-storage, extended resources) are not enforced.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "cpu" => Some(ResourceKind::Cpu),
            "memory" => Some(ResourceKind::Memory),
            _ => None,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An exact amount of one resource, in its kind's canonical scale.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Quantity(i64);

impl Quantity {
    pub const ZERO: Quantity = Quantity(0);

    /// Wrap a raw value already expressed in the canonical scale.
    pub fn new(raw: i64) -> Self {
        Quantity(raw)
    }

    /// The raw value in the canonical scale (millicores or bytes).
    pub fn raw(&self) -> i64 {
        self.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Commutative, associative addition; saturates instead of wrapping.
    pub fn saturating_add(self, other: Quantity) -> Quantity {
        Quantity(self.0.saturating_add(other.0))
    }

    /// Parse a textual quantity against the kind's accepted grammar.
    ///
    /// CPU accepts plain cores (fractional allowed) or the `m` milli suffix;
    /// memory accepts plain bytes plus the decimal (`k M G T P E`) and binary
    /// (`Ki Mi Gi Ti Pi Ei`) suffixes. Non-integral results round up to the
    /// next canonical unit, matching platform scale-up rounding.
    pub fn parse(text: &str, kind: ResourceKind) -> Result<Self, Error> {
        let invalid = || Error::InvalidQuantity {
            text: text.to_string(),
            kind,
        };

        let split = text
            .char_indices()
            .find(|(i, c)| {
                !(c.is_ascii_digit() || *c == '.' || (*i == 0 && (*c == '+' || *c == '-')))
            })
            .map(|(i, _)| i)
            .unwrap_or(text.len());
        let (number, suffix) = text.split_at(split);

        let multiplier: i128 = match kind {
            ResourceKind::Cpu => match suffix {
                "" => 1_000, // cores to millicores
                "m" => 1,
                _ => return Err(invalid()),
            },
            ResourceKind::Memory => match suffix {
                "" => 1,
                "k" => 1_000,
                "M" => 1_000_000,
                "G" => 1_000_000_000,
                "T" => 1_000_000_000_000,
                "P" => 1_000_000_000_000_000,
                "E" => 1_000_000_000_000_000_000,
                "Ki" => 1 << 10,
                "Mi" => 1 << 20,
                "Gi" => 1 << 30,
                "Ti" => 1 << 40,
                "Pi" => 1 << 50,
                "Ei" => 1 << 60,
                _ => return Err(invalid()),
            },
        };

        let (negative, digits) = match number.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, number.strip_prefix('+').unwrap_or(number)),
        };

        let mut parts = digits.splitn(2, '.');
        let int_part = parts.next().unwrap_or("");
        let frac_part = parts.next().unwrap_or("");
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid());
        }
        if !int_part.chars().all(|c| c.is_ascii_digit())
            || !frac_part.chars().all(|c| c.is_ascii_digit())
        {
            return Err(invalid());
        }

        let int_value: i128 = if int_part.is_empty() {
            0
        } else {
            int_part.parse().map_err(|_| invalid())?
        };
        let frac_value: i128 = if frac_part.is_empty() {
            0
        } else {
            frac_part.parse().map_err(|_| invalid())?
        };
        let denominator = 10i128
            .checked_pow(frac_part.len() as u32)
            .ok_or_else(invalid)?;

        let numerator = int_value
            .checked_mul(denominator)
            .and_then(|v| v.checked_add(frac_value))
            .and_then(|v| v.checked_mul(multiplier))
            .ok_or_else(invalid)?;
        let mut scaled = div_ceil(numerator, denominator);
        if negative {
            scaled = -scaled;
        }

        i64::try_from(scaled).map(Quantity).map_err(|_| invalid())
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ceiling division for a non-negative denominator.
fn div_ceil(numerator: i128, denominator: i128) -> i128 {
    let quotient = numerator / denominator;
    if numerator % denominator != 0 && numerator > 0 {
        quotient + 1
    } else {
        quotient
    }
}

/// A mapping from resource kind to quantity.
///
/// Each kind appears at most once; absence means "no constraint / no
/// observation" for that kind, not zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceVector {
    entries: BTreeMap<ResourceKind, Quantity>,
}

impl ResourceVector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, kind: ResourceKind) -> Option<Quantity> {
        self.entries.get(&kind).copied()
    }

    pub fn insert(&mut self, kind: ResourceKind, quantity: Quantity) {
        self.entries.insert(kind, quantity);
    }

    /// Add to a kind, treating an absent entry as zero.
    pub fn accumulate(&mut self, kind: ResourceKind, quantity: Quantity) {
        let total = self.get(kind).unwrap_or(Quantity::ZERO);
        self.entries.insert(kind, total.saturating_add(quantity));
    }

    /// Element-wise addition of another vector into this one.
    pub fn merge_add(&mut self, other: &ResourceVector) {
        for (kind, quantity) in other.iter() {
            self.accumulate(kind, quantity);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ResourceKind, Quantity)> + '_ {
        self.entries.iter().map(|(kind, quantity)| (*kind, *quantity))
    }
}

impl FromIterator<(ResourceKind, Quantity)> for ResourceVector {
    fn from_iter<I: IntoIterator<Item = (ResourceKind, Quantity)>>(iter: I) -> Self {
        ResourceVector {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Process-wide cache of parsed percentage literals.
///
/// The same literal always parses to the same value, so entries are never
/// evicted. A literal whose numeric prefix does not parse is cached as a
/// failure and surfaces as `Error::InvalidPercentage`; the limit deriver maps
/// that onto a `0%` reduction, leaving the full hard limit enforced.
#[derive(Debug, Default)]
pub struct PercentCache {
    parsed: DashMap<String, Option<f64>>,
}

impl PercentCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when the literal carries a percentage marker.
    pub fn is_percent(text: &str) -> bool {
        text.contains('%')
    }

    /// Parse a percentage literal, memoized by the exact annotation string.
    ///
    /// The numeric prefix is everything before the final character (the `%`
    /// marker); any other trailing content, including a second `%`, makes the
    /// prefix unparseable rather than being stripped.
    pub fn parse(&self, text: &str) -> Result<f64, Error> {
        let invalid = || Error::InvalidPercentage {
            text: text.to_string(),
        };

        if let Some(cached) = self.parsed.get(text) {
            return match *cached.value() {
                Some(percent) => Ok(percent),
                None => Err(invalid()),
            };
        }

        let parsed = parse_percent_prefix(text);
        if parsed.is_none() {
            warn!(literal = %text, "invalid percentage literal in soft-limit annotation");
        }
        self.parsed.insert(text.to_string(), parsed);
        parsed.ok_or_else(invalid)
    }

    pub fn len(&self) -> usize {
        self.parsed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parsed.is_empty()
    }
}

fn parse_percent_prefix(text: &str) -> Option<f64> {
    let mut chars = text.chars();
    chars.next_back()?;
    chars.as_str().parse().ok()
}
