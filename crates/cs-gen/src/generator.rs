//! Seeded grid topology generator.
//!
//! One candidate is drawn edge by edge from the palette, then repaired in a
//! fixed order: current sources become resistors, exactly one voltage source
//! is kept, labels are made unique per kind, the forced integrator and forced
//! reactive element are promoted from resistors, and finally probes are
//! labelled and controlled sources are linked to them. Candidates that cannot
//! be repaired or that fail validation are discarded and redrawn, up to
//! `max_attempts` times.

use std::collections::BTreeMap;

use cs_components::{ComponentSpec, ElementKind, GridSizes, Measure, Palette, Probe, WeightTable};
use cs_graph::Circuit;
use cs_project::GenerationConfig;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, warn};

use crate::error::{GenError, GenResult};
use crate::grid::{EdgeRef, Grid};
use crate::validator::{RejectReason, Validator, Verdict};

/// Relative weights of no probe, voltage probe and current probe.
const PROBE_WEIGHTS: [u32; 3] = [20, 1, 1];
/// Probe labels run 0..=9.
const PROBE_LABELS: u8 = 10;
/// Controlled sources per candidate when the palette allows them.
const DEPENDENT_RANGE: (usize, usize) = (1, 2);

/// What a candidate does with integrator op-amps when integrator mode is on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IntegratorRule {
    /// Keep or promote exactly one integrator.
    Force,
    /// Demote every integrator to a resistor; the circuit gets its single
    /// integrator from an embedded block.
    Strip,
}

/// A validated level-0 circuit and the grid it was drawn on.
#[derive(Debug, Clone)]
pub struct Generated {
    pub circuit: Circuit,
    pub grid: Grid,
    pub seed: u64,
    pub attempts: u32,
}

pub struct GridGenerator<'a> {
    config: &'a GenerationConfig,
    palette: Palette,
    sizes: GridSizes,
}

impl<'a> GridGenerator<'a> {
    pub fn new(config: &'a GenerationConfig) -> GenResult<Self> {
        let palette = config.palette();
        palette
            .validate()
            .map_err(|e| GenError::InvalidConfig(e.to_string()))?;
        let sizes = config.grid_sizes();
        sizes
            .validate()
            .map_err(|e| GenError::InvalidConfig(e.to_string()))?;
        if config.max_attempts == 0 {
            return Err(GenError::InvalidConfig(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            config,
            palette,
            sizes,
        })
    }

    pub fn config(&self) -> &GenerationConfig {
        self.config
    }

    /// Draw, repair and validate candidates until one is accepted.
    pub fn generate(&self, seed: u64) -> GenResult<Generated> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let validator = Validator::new(self.config);
        let mut last_reason = RejectReason::NotAttempted;

        for attempt in 1..=self.config.max_attempts {
            let grid = match self.candidate(&mut rng) {
                Ok(grid) => grid,
                Err(reason) => {
                    debug!(seed, attempt, %reason, "candidate redrawn");
                    last_reason = reason;
                    continue;
                }
            };
            let circuit = grid.to_circuit()?;
            match validator.check(&circuit) {
                Verdict::Accept => {
                    debug!(seed, attempt, elements = circuit.elements().len(), "candidate accepted");
                    return Ok(Generated {
                        circuit,
                        grid,
                        seed,
                        attempts: attempt,
                    });
                }
                Verdict::Reject(reason) => {
                    debug!(seed, attempt, %reason, "candidate rejected");
                    last_reason = reason;
                }
            }
        }

        warn!(seed, attempts = self.config.max_attempts, %last_reason, "generation exhausted");
        Err(GenError::GenerationExhausted {
            attempts: self.config.max_attempts,
            last_reason,
        })
    }

    /// One repaired candidate grid, not yet validated.
    pub fn candidate(&self, rng: &mut ChaCha8Rng) -> Result<Grid, RejectReason> {
        self.candidate_with(rng, IntegratorRule::Force)
    }

    pub fn candidate_with(
        &self,
        rng: &mut ChaCha8Rng,
        integrators: IntegratorRule,
    ) -> Result<Grid, RejectReason> {
        let rows = draw_size(&self.sizes, rng);
        let cols = draw_size(&self.sizes, rng);
        let mut grid = Grid::new(rows, cols);

        for edge in grid.edge_refs() {
            let spec = self.draw_edge(grid.is_outer(edge), rng);
            grid.set(edge, spec);
        }

        self.check_dependent_count(&grid)?;
        replace_current_sources(&mut grid, rng);
        keep_single_source(&mut grid, rng)?;
        relabel(&mut grid);
        if self.config.integrator {
            match integrators {
                IntegratorRule::Force => force_integrator(&mut grid, rng)?,
                IntegratorRule::Strip => strip_integrators(&mut grid, rng),
            }
        }
        if self.config.rlc {
            self.force_reactive(&mut grid, rng)?;
        }
        relabel(&mut grid);
        link_controls(&mut grid, self.config.probes, rng)?;
        Ok(grid)
    }

    fn draw_edge(&self, outer: bool, rng: &mut ChaCha8Rng) -> ComponentSpec {
        let kind = draw_kind(self.palette.table(outer), rng).unwrap_or(ElementKind::Open);
        let mut spec = ComponentSpec::new(kind, 0, draw_value(kind, rng)).reversed(rng.r#gen());
        if !kind.is_dependent_source() {
            let measure = draw_measure(rng);
            if !kind.conflicts_with(measure) {
                spec = spec.with_probe(Probe {
                    measure,
                    label: None,
                    same_direction: rng.r#gen(),
                    hidden: false,
                });
            }
        }
        spec
    }

    fn check_dependent_count(&self, grid: &Grid) -> Result<(), RejectReason> {
        if !self.palette.allows_dependent_sources() {
            return Ok(());
        }
        let found = grid
            .edges()
            .filter(|(_, s)| s.kind.is_dependent_source())
            .count();
        let (min, max) = DEPENDENT_RANGE;
        if found < min || found > max {
            return Err(RejectReason::DependentSourceCount { found, min, max });
        }
        Ok(())
    }

    fn force_reactive(&self, grid: &mut Grid, rng: &mut ChaCha8Rng) -> Result<(), RejectReason> {
        let reactive: Vec<ElementKind> = [ElementKind::Capacitor, ElementKind::Inductor]
            .into_iter()
            .filter(|k| self.palette.allows(*k))
            .collect();
        let present = grid.edges().any(|(_, s)| s.kind.is_reactive());
        if !present {
            let site = grid.find(ElementKind::Resistor).choose(rng).copied();
            let (Some(site), Some(&kind)) = (site, reactive.choose(rng)) else {
                return Err(RejectReason::NoSite {
                    what: "reactive element",
                });
            };
            promote(grid, site, kind, rng);
        }
        for edge in grid.find(ElementKind::VoltageSource) {
            if let Some(spec) = grid.get_mut(edge) {
                spec.probe = Probe::none();
            }
        }
        Ok(())
    }
}

fn draw_size(sizes: &GridSizes, rng: &mut ChaCha8Rng) -> u32 {
    let ticket = rng.gen_range(0..sizes.total().max(1));
    sizes.pick(ticket).unwrap_or(2)
}

fn draw_kind(table: &WeightTable, rng: &mut ChaCha8Rng) -> Option<ElementKind> {
    let total = table.total();
    if total == 0 {
        return None;
    }
    table.pick(rng.gen_range(0..total))
}

fn draw_value(kind: ElementKind, rng: &mut ChaCha8Rng) -> u32 {
    if kind.is_wiring() {
        return 0;
    }
    let (lo, hi) = kind.value_range();
    rng.gen_range(lo..hi)
}

fn draw_measure(rng: &mut ChaCha8Rng) -> Measure {
    let total: u32 = PROBE_WEIGHTS.iter().sum();
    let ticket = rng.gen_range(0..total);
    if ticket < PROBE_WEIGHTS[0] {
        Measure::None
    } else if ticket < PROBE_WEIGHTS[0] + PROBE_WEIGHTS[1] {
        Measure::Voltage
    } else {
        Measure::Current
    }
}

/// Turn the spec on `edge` into `kind`, redrawing its value and dropping a
/// probe the new kind cannot carry.
fn promote(grid: &mut Grid, edge: EdgeRef, kind: ElementKind, rng: &mut ChaCha8Rng) {
    let value = draw_value(kind, rng);
    if let Some(spec) = grid.get_mut(edge) {
        let mut next = spec.clone().with_kind(kind, value);
        if kind.conflicts_with(next.probe.measure) || kind.is_dependent_source() {
            next.probe = Probe::none();
        }
        *spec = next;
    }
}

fn replace_current_sources(grid: &mut Grid, rng: &mut ChaCha8Rng) {
    for edge in grid.find(ElementKind::CurrentSource) {
        promote(grid, edge, ElementKind::Resistor, rng);
    }
}

fn keep_single_source(grid: &mut Grid, rng: &mut ChaCha8Rng) -> Result<(), RejectReason> {
    let mut sources = grid.find(ElementKind::VoltageSource);
    if sources.is_empty() {
        let sites: Vec<EdgeRef> = grid
            .edges()
            .filter(|(_, s)| s.kind != ElementKind::Open && !s.kind.is_dependent_source())
            .map(|(e, _)| e)
            .collect();
        let site = sites.choose(rng).copied().ok_or(RejectReason::NoSite {
            what: "voltage source",
        })?;
        promote(grid, site, ElementKind::VoltageSource, rng);
        return Ok(());
    }
    sources.shuffle(rng);
    for &extra in &sources[1..] {
        promote(grid, extra, ElementKind::Resistor, rng);
    }
    Ok(())
}

fn force_integrator(grid: &mut Grid, rng: &mut ChaCha8Rng) -> Result<(), RejectReason> {
    let mut integrators = grid.find(ElementKind::OpAmpIntegrator);
    if integrators.is_empty() {
        let site = grid
            .find(ElementKind::Resistor)
            .choose(rng)
            .copied()
            .ok_or(RejectReason::NoSite { what: "integrator" })?;
        promote(grid, site, ElementKind::OpAmpIntegrator, rng);
        return Ok(());
    }
    integrators.shuffle(rng);
    for &extra in &integrators[1..] {
        promote(grid, extra, ElementKind::Resistor, rng);
    }
    Ok(())
}

fn strip_integrators(grid: &mut Grid, rng: &mut ChaCha8Rng) {
    for edge in grid.find(ElementKind::OpAmpIntegrator) {
        promote(grid, edge, ElementKind::Resistor, rng);
    }
}

/// Number every kind 1, 2, ... in edge order.
fn relabel(grid: &mut Grid) {
    let mut next: BTreeMap<ElementKind, u32> = BTreeMap::new();
    for edge in grid.edge_refs() {
        if let Some(spec) = grid.get_mut(edge) {
            if spec.kind == ElementKind::Open {
                spec.label = 0;
                continue;
            }
            let counter = next.entry(spec.kind).or_insert(0);
            *counter += 1;
            spec.label = *counter;
        }
    }
}

/// Give every probe a unique label, make sure each controller class has a
/// probe to read, and point every controlled source at one.
fn link_controls(grid: &mut Grid, show_probes: bool, rng: &mut ChaCha8Rng) -> Result<(), RejectReason> {
    let controlled: Vec<(EdgeRef, Measure)> = grid
        .edges()
        .filter_map(|(e, s)| s.kind.controller_measure().map(|m| (e, m)))
        .collect();

    for measure in [Measure::Voltage, Measure::Current] {
        let needed = controlled.iter().any(|(_, m)| *m == measure);
        let present = grid.edges().any(|(_, s)| s.probe.measure == measure);
        if needed && !present {
            let sites: Vec<EdgeRef> = grid
                .edges()
                .filter(|(_, s)| {
                    s.kind != ElementKind::Open
                        && !s.kind.is_dependent_source()
                        && !s.probe.is_active()
                        && !s.kind.conflicts_with(measure)
                })
                .map(|(e, _)| e)
                .collect();
            let site = sites.choose(rng).copied().ok_or(RejectReason::NoSite {
                what: "controlling probe",
            })?;
            if let Some(spec) = grid.get_mut(site) {
                spec.probe = Probe {
                    measure,
                    label: None,
                    same_direction: rng.r#gen(),
                    hidden: false,
                };
            }
        }
    }

    let probed: Vec<EdgeRef> = grid
        .edges()
        .filter(|(_, s)| s.probe.is_active())
        .map(|(e, _)| e)
        .collect();
    if probed.len() > PROBE_LABELS as usize {
        return Err(RejectReason::TooManyProbes {
            found: probed.len(),
            max: PROBE_LABELS as usize,
        });
    }
    let mut labels: Vec<u8> = (0..PROBE_LABELS).collect();
    labels.shuffle(rng);
    for (edge, label) in probed.iter().zip(labels) {
        if let Some(spec) = grid.get_mut(*edge) {
            spec.probe.label = Some(label);
        }
    }

    let mut used: Vec<u8> = Vec::new();
    for (edge, measure) in controlled {
        let candidates: Vec<u8> = grid
            .edges()
            .filter(|(_, s)| s.probe.measure == measure)
            .filter_map(|(_, s)| s.probe.label)
            .collect();
        let Some(&label) = candidates.choose(rng) else {
            return Err(RejectReason::NoSite {
                what: "controlling probe",
            });
        };
        used.push(label);
        if let Some(spec) = grid.get_mut(edge) {
            *spec = spec.clone().with_control(label);
        }
    }

    if !show_probes {
        for edge in probed {
            if let Some(spec) = grid.get_mut(edge)
                && !spec.probe.label.is_some_and(|l| used.contains(&l))
            {
                spec.probe.hidden = true;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> GenerationConfig {
        GenerationConfig::default()
    }

    #[test]
    fn same_seed_same_circuit() {
        let cfg = config();
        let generator = GridGenerator::new(&cfg).unwrap();
        let a = generator.generate(7);
        let b = generator.generate(7);
        match (a, b) {
            (Ok(a), Ok(b)) => {
                assert_eq!(a.circuit, b.circuit);
                assert_eq!(a.attempts, b.attempts);
            }
            (Err(a), Err(b)) => assert_eq!(a, b),
            _ => panic!("determinism violated"),
        }
    }

    #[test]
    fn candidate_has_one_source_and_unique_labels() {
        let cfg = config();
        let generator = GridGenerator::new(&cfg).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..50 {
            let Ok(grid) = generator.candidate(&mut rng) else {
                continue;
            };
            assert_eq!(grid.count(ElementKind::VoltageSource), 1);
            assert_eq!(grid.count(ElementKind::CurrentSource), 0);
            let mut seen = std::collections::HashSet::new();
            for (_, spec) in grid.edges().filter(|(_, s)| !s.kind.is_wiring()) {
                assert!(seen.insert((spec.kind, spec.label)), "{}", spec.name());
            }
        }
    }

    #[test]
    fn probes_disabled_hides_only_unused_probes() {
        let cfg = GenerationConfig {
            probes: false,
            ..config()
        };
        let generator = GridGenerator::new(&cfg).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        for _ in 0..50 {
            let Ok(grid) = generator.candidate(&mut rng) else {
                continue;
            };
            let controls: Vec<u8> = grid.edges().filter_map(|(_, s)| s.control).collect();
            for (_, spec) in grid.edges().filter(|(_, s)| s.probe.is_active()) {
                let used = spec.probe.label.is_some_and(|l| controls.contains(&l));
                assert_eq!(spec.probe.hidden, !used);
            }
        }
    }

    #[test]
    fn integrator_mode_places_exactly_one() {
        let cfg = GenerationConfig {
            integrator: true,
            ..config()
        };
        let generator = GridGenerator::new(&cfg).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        for _ in 0..50 {
            if let Ok(grid) = generator.candidate(&mut rng) {
                assert_eq!(grid.count(ElementKind::OpAmpIntegrator), 1);
            }
        }
    }

    #[test]
    fn stripped_candidates_carry_no_integrator() {
        let mut palette = Palette::passive();
        palette.inner.set(ElementKind::OpAmpIntegrator, 40);
        let cfg = GenerationConfig {
            integrator: true,
            palette: Some(palette),
            ..config()
        };
        let generator = GridGenerator::new(&cfg).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(21);
        let mut drawn = 0;
        for _ in 0..50 {
            if let Ok(grid) = generator.candidate_with(&mut rng, IntegratorRule::Strip) {
                assert_eq!(grid.count(ElementKind::OpAmpIntegrator), 0);
                drawn += 1;
            }
        }
        assert!(drawn > 0);
    }

    #[test]
    fn single_attempt_exhaustion_is_reported() {
        let mut palette = Palette::passive();
        palette.inner = WeightTable::new().with(ElementKind::Open, 1);
        palette.outer = WeightTable::new().with(ElementKind::Open, 1);
        let cfg = GenerationConfig {
            palette: Some(palette),
            max_attempts: 3,
            ..config()
        };
        let generator = GridGenerator::new(&cfg).unwrap();
        let err = generator.generate(1).unwrap_err();
        assert_eq!(
            err,
            GenError::GenerationExhausted {
                attempts: 3,
                last_reason: RejectReason::NoSite {
                    what: "voltage source"
                },
            }
        );
    }

    #[test]
    fn zero_attempts_rejected_up_front() {
        let cfg = GenerationConfig {
            max_attempts: 0,
            ..config()
        };
        assert!(matches!(
            GridGenerator::new(&cfg),
            Err(GenError::InvalidConfig(_))
        ));
    }
}
