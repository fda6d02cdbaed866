//! End-to-end batch scenarios.

use std::collections::HashSet;

use cs_batch::{
    BatchError, BatchProgressEvent, BatchStage, FailureKind, run_batch, run_levels,
};
use cs_components::{ElementKind, Palette};
use cs_gen::{Composer, GridGenerator, policy_for};
use cs_graph::CircuitArena;
use cs_netlist::NetKind;
use cs_project::{ProjectConfig, SelectionDef, SolveModeDef};
use cs_results::DatasetStore;

fn config(count: usize) -> ProjectConfig {
    let mut cfg = ProjectConfig::default();
    cfg.batch.count = count;
    cfg.batch.seed = 11;
    cfg
}

#[test]
fn level_zero_batch_produces_requested_circuits() {
    let mut cfg = config(10);
    cfg.analysis.enabled = false;
    let pool = CircuitArena::new();
    let report = run_batch(&cfg, &pool, None, None).unwrap();

    assert_eq!(report.requested, 10);
    assert_eq!(report.produced, 10);
    assert!(report.is_complete());
    assert_eq!(report.analyzed, 0);
    assert_eq!(pool.count_at_level(0), 10);
    for sample in &report.samples {
        assert_eq!(sample.level, 0);
        assert!(sample.netlist.count(NetKind::VoltageSource) >= 1);
        assert!(sample.equations.is_none());
        assert!(pool.get(sample.pool_id).is_some());
    }
}

#[test]
fn derivation_failures_are_excluded_and_tallied() {
    let cfg = config(10);
    let pool = CircuitArena::new();
    let report = run_batch(&cfg, &pool, None, None).unwrap();

    assert!(report.produced <= 10);
    assert_eq!(report.analyzed, report.produced);
    assert_eq!(report.equations().count(), report.produced);
    for set in report.equations() {
        assert_ne!(set.numeric_check, Some(false));
    }
    assert_eq!(report.failures.get(FailureKind::PoolExhausted), 0);
    assert!(report.produced > 0 || report.failures.total() > 0);
}

#[test]
fn max_circuits_limits_analysis() {
    let mut cfg = config(6);
    cfg.analysis.max_circuits = Some(2);
    cfg.analysis.component_cap = 1000;
    let pool = CircuitArena::new();
    let report = run_batch(&cfg, &pool, None, None).unwrap();
    assert!(report.analyzed <= 2);
    assert!(report.samples.iter().filter(|s| s.equations.is_none()).count() >= report.produced.saturating_sub(2));
}

#[test]
fn tiny_component_cap_reports_resource_bound() {
    let mut cfg = config(3);
    cfg.analysis.component_cap = 1;
    cfg.batch.attempt_budget = Some(60);
    let pool = CircuitArena::new();
    let report = run_batch(&cfg, &pool, None, None).unwrap();
    assert_eq!(report.produced, 0);
    assert!(report.failures.get(FailureKind::ResourceBound) > 0);
    assert!(report.attempts >= 60);
}

#[test]
fn composition_without_pool_fails_per_circuit() {
    let mut cfg = config(5);
    cfg.batch.level = 2;
    let pool = CircuitArena::new();
    let report = run_batch(&cfg, &pool, None, None).unwrap();
    assert_eq!(report.produced, 0);
    assert!(report.failures.get(FailureKind::PoolExhausted) >= 1);
    assert!(!report.is_complete());
}

#[test]
fn contradictory_config_is_fatal_before_work() {
    let mut palette = Palette::standard();
    for table in [&mut palette.inner, &mut palette.outer] {
        table.set(ElementKind::Capacitor, 0);
        table.set(ElementKind::Inductor, 0);
    }
    let mut cfg = config(5);
    cfg.generation.rlc = true;
    cfg.generation.palette = Some(palette);

    let mut stages = Vec::new();
    let pool = CircuitArena::new();
    let result = run_batch(&cfg, &pool, None, Some(&mut |e: BatchProgressEvent| stages.push(e.stage)));
    assert!(matches!(result, Err(BatchError::InvalidConfig(_))));
    assert_eq!(stages, vec![BatchStage::ValidatingConfig]);
    assert!(pool.is_empty());
}

#[test]
fn fast_mode_respects_budget() {
    let mut cfg = config(4);
    cfg.analysis.mode = SolveModeDef::Fast;
    cfg.analysis.budget_ms = 1000;
    cfg.analysis.component_cap = 1000;
    cfg.batch.attempt_budget = Some(200);
    let pool = CircuitArena::new();
    let report = run_batch(&cfg, &pool, None, None).unwrap();
    for set in report.equations() {
        assert!(set.elapsed_ms <= 1000 + 250, "derivation overran: {} ms", set.elapsed_ms);
    }
    let settled = report.produced + report.failures.total();
    assert!(settled > 0);
}

#[test]
fn single_worker_batches_are_reproducible() {
    let cfg = config(4);
    let ids = || {
        let pool = CircuitArena::new();
        run_batch(&cfg, &pool, None, None)
            .unwrap()
            .samples
            .into_iter()
            .map(|s| s.circuit_id)
            .collect::<Vec<_>>()
    };
    assert_eq!(ids(), ids());
}

#[test]
fn parallel_composition_depends_only_on_the_seed() {
    let pool = CircuitArena::new();
    let mut base = config(8);
    base.analysis.enabled = false;
    run_batch(&base, &pool, None, None).unwrap();

    for selection in [SelectionDef::RoundRobin, SelectionDef::LeastUsed] {
        let mut cfg = config(6);
        cfg.batch.level = 1;
        cfg.batch.workers = 4;
        cfg.analysis.enabled = false;
        cfg.generation.selection = selection;
        let report = run_batch(&cfg, &pool, None, None).unwrap();
        assert!(report.produced > 0);

        // Recompose every sample alone, on one thread, with a fresh policy.
        let generator = GridGenerator::new(&cfg.generation).unwrap();
        let policy = policy_for(selection);
        let composer = Composer::new(&generator, &pool, policy.as_ref());
        for sample in &report.samples {
            let alone = composer.compose(1, sample.seed).unwrap();
            assert_eq!(
                *pool.get(sample.pool_id).unwrap(),
                alone.circuit,
                "{selection:?} seed {}",
                sample.seed
            );
        }
    }
}

#[test]
fn parallel_workers_fill_the_request() {
    let mut cfg = config(8);
    cfg.batch.workers = 3;
    cfg.analysis.enabled = false;
    let pool = CircuitArena::new();
    let mut produced_events = 0;
    let report = run_batch(
        &cfg,
        &pool,
        None,
        Some(&mut |e: BatchProgressEvent| {
            if e.stage == BatchStage::CircuitProduced {
                produced_events += 1;
            }
        }),
    )
    .unwrap();
    assert_eq!(report.produced, 8);
    assert_eq!(produced_events, 8);
    assert_eq!(pool.count_at_level(0), 8);
    let seeds: HashSet<u64> = report.samples.iter().map(|s| s.seed).collect();
    assert_eq!(seeds.len(), 8);
}

#[test]
fn levels_are_populated_bottom_up() {
    let mut cfg = config(3);
    cfg.batch.level = 1;
    cfg.analysis.enabled = false;
    let pool = CircuitArena::new();
    let dir = std::env::temp_dir().join("cs_batch_levels");
    let _ = std::fs::remove_dir_all(&dir);
    let store = DatasetStore::new(dir).unwrap();

    let reports = run_levels(&cfg, &pool, Some(&store), None).unwrap();
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].level, 0);
    assert_eq!(reports[0].produced, 3);
    assert_eq!(reports[1].level, 1);
    for sample in &reports[1].samples {
        assert_eq!(sample.level, 1);
        assert_eq!(pool.get(sample.pool_id).unwrap().level(), 1);
    }

    let records = store.load_netlists().unwrap();
    let produced: usize = reports.iter().map(|r| r.produced).sum();
    assert_eq!(records.len(), produced);
    assert!(store.load_equations().unwrap().is_empty());
}

#[test]
fn equations_are_persisted_with_matching_ids() {
    let mut cfg = config(3);
    cfg.generation.simple = true;
    let pool = CircuitArena::new();
    let dir = std::env::temp_dir().join("cs_batch_equations");
    let _ = std::fs::remove_dir_all(&dir);
    let store = DatasetStore::new(dir).unwrap();

    let report = run_batch(&cfg, &pool, Some(&store), None).unwrap();
    let joined = store.joined().unwrap();
    assert_eq!(joined.len(), report.produced);
    for (netlist, equations) in joined {
        let equations = equations.expect("every produced circuit was analyzed");
        assert_eq!(equations.equations.netlist_id, netlist.circuit_id);
    }
}

#[test]
fn rlc_batches_never_exceed_the_component_cap() {
    let mut cfg = config(5);
    cfg.generation.rlc = true;
    cfg.analysis.component_cap = 3;
    cfg.batch.attempt_budget = Some(400);
    let pool = CircuitArena::new();
    let report = run_batch(&cfg, &pool, None, None).unwrap();
    for sample in &report.samples {
        assert!(sample.netlist.component_count() <= 3);
        assert!(sample.netlist.elements.iter().any(|e| e.kind.is_reactive()));
        assert!(sample.equations.is_some());
    }
    assert!(report.attempts >= report.produced);
}

#[test]
fn level_two_succeeds_once_lower_pools_exist() {
    let mut cfg = config(3);
    cfg.batch.level = 2;
    cfg.analysis.enabled = false;
    let pool = CircuitArena::new();

    let early = run_batch(&cfg, &pool, None, None).unwrap();
    assert_eq!(early.produced, 0);
    assert!(early.failures.get(FailureKind::PoolExhausted) >= 1);

    let reports = run_levels(&cfg, &pool, None, None).unwrap();
    assert_eq!(reports.len(), 3);
    assert!(reports[2].produced > 0);
    assert_eq!(reports[2].failures.get(FailureKind::PoolExhausted), 0);
    assert!(pool.count_at_level(2) > 0);
}
