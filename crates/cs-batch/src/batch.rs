//! Batch orchestration: fan generation and derivation out over workers.
//!
//! Workers run on a rayon pool and report every attempt over an mpsc channel.
//! The calling thread owns the dataset store, the progress callback and all
//! bookkeeping, so workers share nothing mutable beyond a few counters.
//!
//! Worker `w` draws seeds `seed + level * 2^48 + w * 2^32 + k` for its k-th
//! attempt, which keeps runs reproducible for a fixed worker count.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::{Duration, Instant};

use cs_core::CircuitId;
use cs_gen::{Composer, GridGenerator, policy_for};
use cs_graph::{Circuit, CircuitArena};
use cs_netlist::{FlattenOptions, Netlist, flatten};
use cs_project::{AnalysisConfig, ProjectConfig, SolveModeDef, validate_config};
use cs_results::{
    DatasetManifest, DatasetStore, EquationRecord, NetlistRecord, compute_circuit_id,
};
use cs_symbolic::{DerivationStrategy, SolveMode, SymbolicEquationSet, derive};
use tracing::{debug, info, warn};

use crate::error::{BatchError, BatchResult};
use crate::failure::{FailureKind, FailureTally};
use crate::progress::{BatchProgressEvent, BatchStage};

/// One circuit that made it into the output.
#[derive(Debug, Clone)]
pub struct Sample {
    pub circuit_id: String,
    /// Position of the circuit in the sub-block pool.
    pub pool_id: CircuitId,
    pub level: u8,
    pub seed: u64,
    pub netlist: Netlist,
    pub equations: Option<SymbolicEquationSet>,
}

/// Outcome of one level of a batch.
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub level: u8,
    pub requested: usize,
    pub produced: usize,
    pub analyzed: usize,
    /// Candidate draws consumed, counted against the attempt budget.
    pub attempts: usize,
    pub failures: FailureTally,
    pub samples: Vec<Sample>,
    pub elapsed: Duration,
}

impl BatchReport {
    pub fn is_complete(&self) -> bool {
        self.produced >= self.requested
    }

    pub fn equations(&self) -> impl Iterator<Item = &SymbolicEquationSet> {
        self.samples.iter().filter_map(|s| s.equations.as_ref())
    }
}

/// Derivation policy for an analysis section.
pub fn strategy_for(analysis: &AnalysisConfig) -> DerivationStrategy {
    DerivationStrategy {
        mode: match analysis.mode {
            SolveModeDef::Fast => SolveMode::Fast,
            SolveModeDef::Thorough => SolveMode::Thorough,
        },
        budget: Duration::from_millis(analysis.budget_ms),
        component_cap: analysis.component_cap,
    }
}

/// Manifest summarizing a finished batch.
pub fn dataset_manifest(
    name: &str,
    config: &ProjectConfig,
    reports: &[BatchReport],
) -> DatasetManifest {
    let mut manifest = DatasetManifest::new(name, config.clone());
    let mut failures = FailureTally::default();
    for r in reports {
        manifest.requested += r.requested;
        manifest.produced += r.produced;
        manifest.analyzed += r.analyzed;
        manifest.attempts += r.attempts;
        failures.merge(&r.failures);
    }
    manifest.failures = failures.to_map();
    manifest
}

/// A worker's finished circuit, not yet pooled.
struct Draft {
    circuit: Circuit,
    circuit_id: String,
    seed: u64,
    netlist: Netlist,
    equations: Option<SymbolicEquationSet>,
}

enum WorkerMessage {
    Produced(Box<Draft>),
    Failed { kind: FailureKind, seed: u64 },
}

/// Shared read-only context plus the counters workers poll.
struct Shared<'a> {
    config: &'a ProjectConfig,
    generator: &'a GridGenerator<'a>,
    composer: Option<Composer<'a>>,
    pool: &'a CircuitArena,
    strategy: DerivationStrategy,
    level: u8,
    budget: usize,
    attempts: AtomicUsize,
    produced: AtomicUsize,
    analyzed: AtomicUsize,
    stop: AtomicBool,
}

impl Shared<'_> {
    fn requested(&self) -> usize {
        self.config.batch.count
    }

    fn seed_for(&self, worker: usize, attempt: u64) -> u64 {
        self.config
            .batch
            .seed
            .wrapping_add(u64::from(self.level) << 48)
            .wrapping_add((worker as u64) << 32)
            .wrapping_add(attempt)
    }

    fn work(&self, worker: usize, tx: &Sender<WorkerMessage>) {
        let mut attempt = 0u64;
        while !self.stop.load(Ordering::Relaxed)
            && self.produced.load(Ordering::Relaxed) < self.requested()
            && self.attempts.load(Ordering::Relaxed) < self.budget
        {
            let seed = self.seed_for(worker, attempt);
            attempt += 1;
            let message = match self.run_one(seed) {
                Ok(produced) => WorkerMessage::Produced(Box::new(produced)),
                Err(kind) => WorkerMessage::Failed { kind, seed },
            };
            if tx.send(message).is_err() {
                break;
            }
        }
        debug!(worker, attempts = attempt, "worker finished");
    }

    /// Generate, flatten and (maybe) derive one circuit.
    fn run_one(&self, seed: u64) -> Result<Draft, FailureKind> {
        let generated = match &self.composer {
            None => self
                .generator
                .generate(seed)
                .map(|g| (g.circuit, g.attempts)),
            Some(composer) => composer
                .compose(self.level, seed)
                .map(|c| (c.circuit, c.attempts)),
        };
        let circuit = match generated {
            Ok((circuit, used)) => {
                self.attempts.fetch_add(used as usize, Ordering::Relaxed);
                circuit
            }
            Err(err) => {
                let kind = FailureKind::from_gen(&err);
                let used = match &err {
                    cs_gen::GenError::GenerationExhausted { attempts, .. } => *attempts as usize,
                    _ => 1,
                };
                self.attempts.fetch_add(used, Ordering::Relaxed);
                if kind == FailureKind::PoolExhausted {
                    // the pool does not grow within a level
                    self.stop.store(true, Ordering::Relaxed);
                }
                debug!(seed, %err, "generation failed");
                return Err(kind);
            }
        };

        let generation = &self.config.generation;
        let options = FlattenOptions {
            symbolic: generation.symbolic,
            rlc: generation.rlc,
            title: format!("L{}_{seed:016x}", self.level),
        };
        let netlist = flatten(&circuit, Some(self.pool), &options).map_err(|err| {
            warn!(seed, %err, "netlist emission failed");
            FailureKind::DerivationFailed
        })?;
        let circuit_id = compute_circuit_id(&netlist);

        let analysis = &self.config.analysis;
        let limit = analysis.max_circuits.unwrap_or(usize::MAX);
        let equations = if analysis.enabled
            && self.analyzed.fetch_add(1, Ordering::Relaxed) < limit
        {
            match derive(&netlist, &circuit_id, &self.strategy) {
                Ok(set) => Some(set),
                Err(err) => {
                    debug!(seed, circuit = %circuit_id, %err, "derivation failed");
                    return Err(FailureKind::from_derive(&err));
                }
            }
        } else {
            None
        };

        Ok(Draft {
            circuit,
            circuit_id,
            seed,
            netlist,
            equations,
        })
    }
}

fn emit(
    progress: &mut dyn FnMut(BatchProgressEvent),
    stage: BatchStage,
    report: &BatchReport,
    started: Instant,
    message: Option<String>,
) {
    progress(BatchProgressEvent {
        stage,
        level: report.level,
        requested: report.requested,
        produced: report.produced,
        failed: report.failures.total(),
        elapsed_wall_s: started.elapsed().as_secs_f64(),
        message,
    });
}

/// Produce `config.batch.count` circuits of level `config.batch.level`.
///
/// Produced circuits are appended to `pool` and, when a store is given, to
/// the dataset files. Returns once the requested count is reached, the
/// attempt budget is spent, or no further progress is possible.
pub fn run_batch(
    config: &ProjectConfig,
    pool: &CircuitArena,
    store: Option<&DatasetStore>,
    progress: Option<&mut dyn FnMut(BatchProgressEvent)>,
) -> BatchResult<BatchReport> {
    let mut ignore = |_: BatchProgressEvent| {};
    let progress: &mut dyn FnMut(BatchProgressEvent) = match progress {
        Some(cb) => cb,
        None => &mut ignore,
    };
    run_level(config, pool, store, progress)
}

fn run_level(
    config: &ProjectConfig,
    pool: &CircuitArena,
    store: Option<&DatasetStore>,
    progress: &mut dyn FnMut(BatchProgressEvent),
) -> BatchResult<BatchReport> {
    let started = Instant::now();
    let level = config.batch.level;
    let mut report = BatchReport {
        level,
        requested: config.batch.count,
        produced: 0,
        analyzed: 0,
        attempts: 0,
        failures: FailureTally::default(),
        samples: Vec::new(),
        elapsed: Duration::ZERO,
    };

    emit(progress, BatchStage::ValidatingConfig, &report, started, None);
    validate_config(config)?;
    let generator = GridGenerator::new(&config.generation)
        .map_err(|e| BatchError::InvalidConfig(e.to_string()))?;
    let policy = policy_for(config.generation.selection);
    let composer = (level > 0).then(|| Composer::new(&generator, pool, policy.as_ref()));

    let workers = config.batch.workers.max(1);
    let shared = Shared {
        config,
        generator: &generator,
        composer,
        pool,
        strategy: strategy_for(&config.analysis),
        level,
        budget: config.attempt_budget(),
        attempts: AtomicUsize::new(0),
        produced: AtomicUsize::new(0),
        analyzed: AtomicUsize::new(0),
        stop: AtomicBool::new(false),
    };

    info!(
        level,
        requested = report.requested,
        workers,
        budget = shared.budget,
        "batch started"
    );
    emit(progress, BatchStage::StartingLevel, &report, started, None);

    let threads = rayon::ThreadPoolBuilder::new().num_threads(workers).build()?;
    let (tx, rx) = mpsc::channel();
    let collected = threads.in_place_scope(|scope| {
        for worker in 0..workers {
            let tx = tx.clone();
            let shared = &shared;
            scope.spawn(move |_| shared.work(worker, &tx));
        }
        drop(tx);
        let outcome = collect(rx, &shared, pool, store, &mut report, progress, started);
        if outcome.is_err() {
            shared.stop.store(true, Ordering::Relaxed);
        }
        outcome
    });
    collected?;

    report.attempts = shared.attempts.load(Ordering::Relaxed);
    report.analyzed = report.samples.iter().filter(|s| s.equations.is_some()).count();
    report.elapsed = started.elapsed();

    if report.is_complete() {
        info!(
            level,
            produced = report.produced,
            failed = report.failures.total(),
            attempts = report.attempts,
            "batch finished"
        );
    } else {
        warn!(
            level,
            requested = report.requested,
            produced = report.produced,
            failed = report.failures.total(),
            attempts = report.attempts,
            "batch stopped short"
        );
    }
    emit(progress, BatchStage::LevelCompleted, &report, started, None);
    Ok(report)
}

/// Drain worker messages on the calling thread until every worker is done.
fn collect(
    rx: Receiver<WorkerMessage>,
    shared: &Shared<'_>,
    pool: &CircuitArena,
    store: Option<&DatasetStore>,
    report: &mut BatchReport,
    progress: &mut dyn FnMut(BatchProgressEvent),
    started: Instant,
) -> BatchResult<()> {
    for message in rx {
        match message {
            WorkerMessage::Failed { kind, seed } => {
                report.failures.record(kind);
                emit(
                    progress,
                    BatchStage::CircuitFailed,
                    report,
                    started,
                    Some(format!("seed {seed}: {kind}")),
                );
            }
            WorkerMessage::Produced(produced) => {
                if report.produced >= report.requested {
                    continue;
                }
                let draft = *produced;
                let sample = Sample {
                    pool_id: pool.insert(draft.circuit)?,
                    circuit_id: draft.circuit_id,
                    level: report.level,
                    seed: draft.seed,
                    netlist: draft.netlist,
                    equations: draft.equations,
                };
                if let Some(store) = store {
                    store.append_netlist(&NetlistRecord {
                        circuit_id: sample.circuit_id.clone(),
                        level: sample.level,
                        seed: sample.seed,
                        spice: cs_netlist::to_spice(&sample.netlist),
                        netlist: sample.netlist.clone(),
                    })?;
                    if let Some(equations) = &sample.equations {
                        store.append_equations(&EquationRecord {
                            circuit_id: sample.circuit_id.clone(),
                            equations: equations.clone(),
                        })?;
                    }
                }
                report.produced += 1;
                shared.produced.store(report.produced, Ordering::Relaxed);
                let message = Some(sample.circuit_id.clone());
                report.samples.push(sample);
                emit(progress, BatchStage::CircuitProduced, report, started, message);
            }
        }
    }
    Ok(())
}

/// Populate levels `0..=config.batch.level` bottom-up, each with
/// `config.batch.count` circuits.
pub fn run_levels(
    config: &ProjectConfig,
    pool: &CircuitArena,
    store: Option<&DatasetStore>,
    progress: Option<&mut dyn FnMut(BatchProgressEvent)>,
) -> BatchResult<Vec<BatchReport>> {
    validate_config(config)?;
    let mut ignore = |_: BatchProgressEvent| {};
    let progress: &mut dyn FnMut(BatchProgressEvent) = match progress {
        Some(cb) => cb,
        None => &mut ignore,
    };
    let started = Instant::now();
    let mut reports = Vec::new();
    for level in 0..=config.batch.level {
        let mut level_config = config.clone();
        level_config.batch.level = level;
        let report = run_level(&level_config, pool, store, &mut *progress)?;
        reports.push(report);
    }
    if let Some(last) = reports.last() {
        emit(progress, BatchStage::Completed, last, started, None);
    }
    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_follows_analysis_section() {
        let analysis = AnalysisConfig {
            mode: SolveModeDef::Fast,
            budget_ms: 1500,
            component_cap: 7,
            ..AnalysisConfig::default()
        };
        let s = strategy_for(&analysis);
        assert_eq!(s.mode, SolveMode::Fast);
        assert_eq!(s.budget, Duration::from_millis(1500));
        assert_eq!(s.component_cap, 7);
    }

    #[test]
    fn manifest_sums_levels() {
        let config = ProjectConfig::default();
        let mut failures = FailureTally::default();
        failures.record(FailureKind::ResourceBound);
        let report = |level| BatchReport {
            level,
            requested: 4,
            produced: 3,
            analyzed: 2,
            attempts: 10,
            failures: failures.clone(),
            samples: Vec::new(),
            elapsed: Duration::ZERO,
        };
        let manifest = dataset_manifest("d", &config, &[report(0), report(1)]);
        assert_eq!(manifest.requested, 8);
        assert_eq!(manifest.produced, 6);
        assert_eq!(manifest.attempts, 20);
        assert_eq!(manifest.failures["resource_bound"], 2);
    }
}
