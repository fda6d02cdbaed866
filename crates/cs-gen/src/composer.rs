//! Hierarchical composition over the circuit pool.
//!
//! A level-k circuit is an ordinary grid candidate in which some resistor
//! edges are replaced by pooled circuits of lower levels. At least one of the
//! embedded blocks is of level k-1. A block is a one-port: the parent drives
//! it through the block's `in` port, and the block's own source is not part
//! of the parent.
//!
//! Under integrator mode every pooled circuit already carries its one
//! integrator, so the outer grid is drawn without one and embeds exactly one
//! block.

use std::collections::HashMap;

use cs_core::CircuitId;
use cs_graph::{BlockRef, Circuit, CircuitArena, MAX_LEVEL};
use cs_components::ElementKind;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, warn};

use crate::error::{GenError, GenResult};
use crate::generator::{GridGenerator, IntegratorRule};
use crate::grid::{EdgeRef, Grid};
use crate::policy::{SelectionContext, SelectionPolicy};
use crate::validator::{RejectReason, Validator, Verdict};

/// A validated circuit of level >= 1.
#[derive(Debug, Clone)]
pub struct Composed {
    pub circuit: Circuit,
    pub grid: Grid,
    pub blocks: Vec<CircuitId>,
    pub seed: u64,
    pub attempts: u32,
}

pub struct Composer<'a> {
    generator: &'a GridGenerator<'a>,
    pool: &'a CircuitArena,
    policy: &'a dyn SelectionPolicy,
}

impl<'a> Composer<'a> {
    pub fn new(
        generator: &'a GridGenerator<'a>,
        pool: &'a CircuitArena,
        policy: &'a dyn SelectionPolicy,
    ) -> Self {
        Self {
            generator,
            pool,
            policy,
        }
    }

    /// Compose a circuit of `level` from the current pool contents.
    ///
    /// Fails with `PoolExhausted` when no level `level - 1` circuit is pooled.
    pub fn compose(&self, level: u8, seed: u64) -> GenResult<Composed> {
        if level == 0 {
            return Err(GenError::InvalidLevel {
                level,
                what: "level 0 circuits come straight from the grid generator",
            });
        }
        if level > MAX_LEVEL {
            return Err(GenError::InvalidLevel {
                level,
                what: "beyond the deepest hierarchy level",
            });
        }

        let previous = self.pool.ids_at_level(level - 1);
        if previous.is_empty() {
            return Err(GenError::PoolExhausted {
                level,
                below: level - 1,
            });
        }
        let lower = self.pool.ids_below(level);

        let config = self.generator.config();
        let validator = Validator::new(config).with_pool(self.pool);
        let embedded = self.embed_counts(level);
        let (rule, max_blocks) = if config.integrator {
            (IntegratorRule::Strip, 1)
        } else {
            (IntegratorRule::Force, config.max_blocks.max(1) as usize)
        };
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut last_reason = RejectReason::NotAttempted;

        for attempt in 1..=config.max_attempts {
            let grid = match self.generator.candidate_with(&mut rng, rule) {
                Ok(grid) => grid,
                Err(reason) => {
                    last_reason = reason;
                    continue;
                }
            };
            let sites = block_sites(&grid);
            if sites.is_empty() {
                last_reason = RejectReason::NoSite { what: "sub-block" };
                continue;
            }

            let wanted = max_blocks.min(sites.len());
            let count = rng.gen_range(1..=wanted);
            let chosen: Vec<EdgeRef> = sites.choose_multiple(&mut rng, count).copied().collect();

            let mut uses = embedded.clone();
            let mut blocks = HashMap::new();
            let mut ids = Vec::with_capacity(count);
            for (i, edge) in chosen.into_iter().enumerate() {
                let candidates = if i == 0 { &previous } else { &lower };
                let context = SelectionContext {
                    turn: seed
                        .wrapping_add(u64::from(attempt - 1))
                        .wrapping_add(i as u64),
                    uses: &uses,
                };
                let Some(id) = self.policy.select(candidates, &context, &mut rng) else {
                    break;
                };
                *uses.entry(id).or_insert(0) += 1;
                let Some(child) = self.pool.get(id) else {
                    continue;
                };
                blocks.insert(
                    edge,
                    BlockRef {
                        circuit: id,
                        level: child.level(),
                        label: i as u32 + 1,
                    },
                );
                ids.push(id);
            }

            let circuit = grid.to_circuit_with_blocks(&blocks, level)?;
            match validator.check(&circuit) {
                Verdict::Accept => {
                    debug!(level, seed, attempt, blocks = ids.len(), policy = self.policy.name(), "composed");
                    return Ok(Composed {
                        circuit,
                        grid,
                        blocks: ids,
                        seed,
                        attempts: attempt,
                    });
                }
                Verdict::Reject(reason) => {
                    debug!(level, seed, attempt, %reason, "composition rejected");
                    last_reason = reason;
                }
            }
        }

        warn!(level, seed, %last_reason, "composition exhausted");
        Err(GenError::GenerationExhausted {
            attempts: config.max_attempts,
            last_reason,
        })
    }
}

impl Composer<'_> {
    /// How often each pooled circuit is embedded by circuits below `level`.
    ///
    /// Those levels do not grow while `level` is composed.
    fn embed_counts(&self, level: u8) -> HashMap<CircuitId, usize> {
        let mut uses = HashMap::new();
        for id in self.pool.ids_below(level) {
            let Some(circuit) = self.pool.get(id) else {
                continue;
            };
            for (_, block) in circuit.sub_blocks() {
                *uses.entry(block.circuit).or_insert(0) += 1;
            }
        }
        uses
    }
}

/// Unprobed resistors: replacing them cannot orphan a controlling probe.
fn block_sites(grid: &Grid) -> Vec<EdgeRef> {
    grid.edges()
        .filter(|(_, s)| s.kind == ElementKind::Resistor && !s.probe.is_active())
        .map(|(e, _)| e)
        .collect()
}
