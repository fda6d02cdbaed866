//! Sub-block selection policies.
//!
//! When several pooled circuits are eligible for embedding, the composer asks
//! a `SelectionPolicy` which one to use. Policies hold no state of their own:
//! everything they may consult arrives in a `SelectionContext` built by the
//! composer from the composition seed and the frozen lower pool levels, so a
//! seed composes the same circuit no matter which worker runs it.

use std::collections::HashMap;

use cs_core::CircuitId;
use cs_project::SelectionDef;
use rand::Rng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;

/// Inputs a policy may consult besides the candidate list.
#[derive(Debug, Clone, Copy)]
pub struct SelectionContext<'a> {
    /// Position of this pick in the round-robin sequence, derived from the
    /// composition seed, the attempt and the block slot.
    pub turn: u64,
    /// Embeddings per circuit: those already in the pool below the level
    /// being composed, plus picks made earlier in the current attempt.
    pub uses: &'a HashMap<CircuitId, usize>,
}

impl SelectionContext<'_> {
    pub fn uses_of(&self, id: CircuitId) -> usize {
        self.uses.get(&id).copied().unwrap_or(0)
    }
}

pub trait SelectionPolicy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Pick one of `candidates`; `None` only when the slice is empty.
    fn select(
        &self,
        candidates: &[CircuitId],
        context: &SelectionContext<'_>,
        rng: &mut ChaCha8Rng,
    ) -> Option<CircuitId>;
}

/// Uniform choice driven by the composition seed.
#[derive(Debug, Default)]
pub struct RandomPolicy;

impl SelectionPolicy for RandomPolicy {
    fn name(&self) -> &'static str {
        "random"
    }

    fn select(
        &self,
        candidates: &[CircuitId],
        _context: &SelectionContext<'_>,
        rng: &mut ChaCha8Rng,
    ) -> Option<CircuitId> {
        candidates.choose(rng).copied()
    }
}

/// Cycles through candidates in pool order, one step per turn.
#[derive(Debug, Default)]
pub struct RoundRobinPolicy;

impl SelectionPolicy for RoundRobinPolicy {
    fn name(&self) -> &'static str {
        "round_robin"
    }

    fn select(
        &self,
        candidates: &[CircuitId],
        context: &SelectionContext<'_>,
        _rng: &mut ChaCha8Rng,
    ) -> Option<CircuitId> {
        if candidates.is_empty() {
            return None;
        }
        let i = (context.turn % candidates.len() as u64) as usize;
        Some(candidates[i])
    }
}

/// Prefers the candidate embedded the fewest times; ties are broken at
/// random.
#[derive(Debug, Default)]
pub struct LeastUsedPolicy;

impl SelectionPolicy for LeastUsedPolicy {
    fn name(&self) -> &'static str {
        "least_used"
    }

    fn select(
        &self,
        candidates: &[CircuitId],
        context: &SelectionContext<'_>,
        rng: &mut ChaCha8Rng,
    ) -> Option<CircuitId> {
        let min = candidates.iter().map(|id| context.uses_of(*id)).min()?;
        let tied: Vec<CircuitId> = candidates
            .iter()
            .copied()
            .filter(|id| context.uses_of(*id) == min)
            .collect();
        Some(tied[rng.gen_range(0..tied.len())])
    }
}

pub fn policy_for(def: SelectionDef) -> Box<dyn SelectionPolicy> {
    match def {
        SelectionDef::Random => Box::new(RandomPolicy),
        SelectionDef::RoundRobin => Box::new(RoundRobinPolicy),
        SelectionDef::LeastUsed => Box::new(LeastUsedPolicy),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn ids(n: u32) -> Vec<CircuitId> {
        (0..n).map(CircuitId::from_index).collect()
    }

    fn context(turn: u64, uses: &HashMap<CircuitId, usize>) -> SelectionContext<'_> {
        SelectionContext { turn, uses }
    }

    #[test]
    fn empty_pool_selects_nothing() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let uses = HashMap::new();
        for def in [
            SelectionDef::Random,
            SelectionDef::RoundRobin,
            SelectionDef::LeastUsed,
        ] {
            assert_eq!(policy_for(def).select(&[], &context(0, &uses), &mut rng), None);
        }
    }

    #[test]
    fn round_robin_cycles() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let pool = ids(3);
        let uses = HashMap::new();
        let picks: Vec<_> = (0..6)
            .filter_map(|turn| RoundRobinPolicy.select(&pool, &context(turn, &uses), &mut rng))
            .map(|id| id.index())
            .collect();
        assert_eq!(picks, vec![0, 1, 2, 0, 1, 2]);
    }

    #[test]
    fn round_robin_ignores_call_history() {
        let pool = ids(4);
        let uses = HashMap::new();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let first = RoundRobinPolicy.select(&pool, &context(9, &uses), &mut rng);
        for _ in 0..5 {
            RoundRobinPolicy.select(&pool, &context(2, &uses), &mut rng);
        }
        assert_eq!(RoundRobinPolicy.select(&pool, &context(9, &uses), &mut rng), first);
    }

    #[test]
    fn least_used_spreads_evenly() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let pool = ids(4);
        let mut uses: HashMap<CircuitId, usize> = HashMap::new();
        for _ in 0..8 {
            let pick = LeastUsedPolicy
                .select(&pool, &context(0, &uses), &mut rng)
                .unwrap();
            *uses.entry(pick).or_insert(0) += 1;
        }
        for id in pool {
            assert_eq!(uses[&id], 2);
        }
    }

    #[test]
    fn least_used_avoids_embedded_circuits() {
        let pool = ids(3);
        let uses = HashMap::from([(pool[0], 3), (pool[2], 1)]);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for _ in 0..10 {
            assert_eq!(
                LeastUsedPolicy.select(&pool, &context(0, &uses), &mut rng),
                Some(pool[1])
            );
        }
    }

    #[test]
    fn random_is_seeded() {
        let pool = ids(10);
        let uses = HashMap::new();
        let pick = |seed| {
            RandomPolicy.select(&pool, &context(0, &uses), &mut ChaCha8Rng::seed_from_u64(seed))
        };
        assert_eq!(pick(4), pick(4));
    }
}
