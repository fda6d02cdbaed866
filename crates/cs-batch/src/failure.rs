//! Per-circuit failure taxonomy and tallies.

use std::collections::BTreeMap;

use cs_gen::GenError;
use cs_symbolic::DeriveError;
use serde::{Deserialize, Serialize};

/// Why one circuit is missing from the output. Never fatal to the batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    GenerationExhausted,
    PoolExhausted,
    ResourceBound,
    DerivationTimeout,
    DerivationFailed,
}

impl FailureKind {
    pub const ALL: [FailureKind; 5] = [
        FailureKind::GenerationExhausted,
        FailureKind::PoolExhausted,
        FailureKind::ResourceBound,
        FailureKind::DerivationTimeout,
        FailureKind::DerivationFailed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FailureKind::GenerationExhausted => "generation_exhausted",
            FailureKind::PoolExhausted => "pool_exhausted",
            FailureKind::ResourceBound => "resource_bound",
            FailureKind::DerivationTimeout => "derivation_timeout",
            FailureKind::DerivationFailed => "derivation_failed",
        }
    }

    pub fn from_gen(err: &GenError) -> Self {
        match err {
            GenError::PoolExhausted { .. } => FailureKind::PoolExhausted,
            _ => FailureKind::GenerationExhausted,
        }
    }

    pub fn from_derive(err: &DeriveError) -> Self {
        match err {
            DeriveError::ResourceBound { .. } => FailureKind::ResourceBound,
            DeriveError::Timeout { .. } => FailureKind::DerivationTimeout,
            DeriveError::Failed { .. } | DeriveError::Algebra(_) => FailureKind::DerivationFailed,
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FailureTally {
    counts: BTreeMap<FailureKind, usize>,
}

impl FailureTally {
    pub fn record(&mut self, kind: FailureKind) {
        *self.counts.entry(kind).or_default() += 1;
    }

    pub fn get(&self, kind: FailureKind) -> usize {
        self.counts.get(&kind).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn merge(&mut self, other: &FailureTally) {
        for (kind, n) in &other.counts {
            *self.counts.entry(*kind).or_default() += n;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (FailureKind, usize)> + '_ {
        self.counts.iter().map(|(k, n)| (*k, *n))
    }

    /// String-keyed copy for persisted manifests.
    pub fn to_map(&self) -> BTreeMap<String, usize> {
        self.iter().map(|(k, n)| (k.as_str().to_string(), n)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cs_gen::RejectReason;

    #[test]
    fn classification() {
        let exhausted = GenError::GenerationExhausted {
            attempts: 3,
            last_reason: RejectReason::NotAttempted,
        };
        assert_eq!(FailureKind::from_gen(&exhausted), FailureKind::GenerationExhausted);
        let pool = GenError::PoolExhausted { level: 2, below: 1 };
        assert_eq!(FailureKind::from_gen(&pool), FailureKind::PoolExhausted);
        assert_eq!(
            FailureKind::from_derive(&DeriveError::Timeout { budget_ms: 5 }),
            FailureKind::DerivationTimeout
        );
        assert_eq!(
            FailureKind::from_derive(&DeriveError::ResourceBound { components: 9, cap: 4 }),
            FailureKind::ResourceBound
        );
    }

    #[test]
    fn tallies_merge() {
        let mut a = FailureTally::default();
        a.record(FailureKind::DerivationFailed);
        a.record(FailureKind::DerivationFailed);
        let mut b = FailureTally::default();
        b.record(FailureKind::ResourceBound);
        a.merge(&b);
        assert_eq!(a.get(FailureKind::DerivationFailed), 2);
        assert_eq!(a.total(), 3);
        assert_eq!(a.to_map()["resource_bound"], 1);
    }
}
