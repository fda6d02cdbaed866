//! Derivation entry point and its result record.

use std::time::{Duration, Instant};

use cs_core::Deadline;
use cs_core::timing::derive_timing;
use cs_netlist::{NetKind, Netlist};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::check::cross_check;
use crate::eliminate::{Solution, solve};
use crate::error::{DeriveError, DeriveResult};
use crate::mna::{MnaSystem, Unknown};
use crate::poly::Poly;
use crate::reduce::{Rational, SolveMode, reduce};

/// Per-call derivation policy. Passed explicitly so concurrent derivations
/// in different modes never share state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DerivationStrategy {
    pub mode: SolveMode,
    pub budget: Duration,
    pub component_cap: usize,
}

impl Default for DerivationStrategy {
    fn default() -> Self {
        Self {
            mode: SolveMode::Thorough,
            budget: Duration::from_secs(30),
            component_cap: 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferFunction {
    pub numerator: String,
    pub denominator: String,
    pub expression: String,
}

impl TransferFunction {
    fn from_rational(value: &Rational, system: &MnaSystem) -> Self {
        Self {
            numerator: value.num.display(&system.symbols),
            denominator: value.den.display(&system.symbols),
            expression: value.display(&system.symbols),
        }
    }
}

/// A derived quantity other than the main transfer function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    pub quantity: String,
    pub expression: String,
}

/// Everything derived for one netlist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolicEquationSet {
    pub netlist_id: String,
    pub mode: SolveMode,
    /// Output quantity over the driving source.
    pub transfer: TransferFunction,
    pub output_label: String,
    pub input_label: String,
    pub laplace_system: Vec<String>,
    pub time_domain_system: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub node_voltages: Vec<Relation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub element_voltages: Vec<Relation>,
    pub parameters: Vec<String>,
    pub component_count: usize,
    pub complexity_score: usize,
    /// False when some common factor may remain uncancelled.
    pub fully_reduced: bool,
    /// Agreement with a floating-point solve; `None` at a degenerate sample.
    pub numeric_check: Option<bool>,
    pub elapsed_ms: u64,
}

/// Derive the governing equations of `netlist`.
///
/// Netlists over the component cap are rejected before any work. Everything
/// else runs under the strategy's wall-clock budget.
pub fn derive(
    netlist: &Netlist,
    netlist_id: &str,
    strategy: &DerivationStrategy,
) -> DeriveResult<SymbolicEquationSet> {
    let components = netlist.component_count();
    if components > strategy.component_cap {
        return Err(DeriveError::ResourceBound {
            components,
            cap: strategy.component_cap,
        });
    }

    let started = Instant::now();
    let deadline = Deadline::after(strategy.budget);
    deadline.check("stamp")?;

    let system = MnaSystem::stamp(netlist)?;
    derive_timing::STAMP.record(started.elapsed());

    let t = Instant::now();
    let solution = solve(&system, &deadline)?;
    derive_timing::ELIMINATION.record(t.elapsed());

    let t = Instant::now();
    let pos = unknown_index(&system, netlist.output.pos);
    let neg = unknown_index(&system, netlist.output.neg);
    let raw = difference(&solution, pos, neg, &deadline)?;
    let transfer = reduce(&raw, strategy.mode, &deadline)?;
    if transfer.value.is_zero() {
        return Err(DeriveError::failed("output is identically zero"));
    }
    let mut fully_reduced = transfer.complete;

    let mut node_voltages = Vec::new();
    let mut element_voltages = Vec::new();
    if strategy.mode == SolveMode::Thorough {
        for (i, unknown) in system.unknowns.iter().enumerate() {
            let Unknown::Node(node) = unknown else {
                continue;
            };
            let raw = difference(&solution, Some(i), None, &deadline)?;
            let r = reduce(&raw, strategy.mode, &deadline)?;
            fully_reduced &= r.complete;
            node_voltages.push(Relation {
                quantity: format!("V{node}/{}", netlist.input),
                expression: r.value.display(&system.symbols),
            });
        }
        for e in netlist.elements.iter().filter(|e| e.kind != NetKind::Ammeter) {
            if e.name == netlist.input {
                continue;
            }
            let p = unknown_index(&system, e.pos);
            let n = unknown_index(&system, e.neg);
            let raw = difference(&solution, p, n, &deadline)?;
            let r = reduce(&raw, strategy.mode, &deadline)?;
            fully_reduced &= r.complete;
            element_voltages.push(Relation {
                quantity: format!("V_{}/{}", e.name, netlist.input),
                expression: r.value.display(&system.symbols),
            });
        }
    }
    derive_timing::REDUCTION.record(t.elapsed());

    let numeric_check = cross_check(&system, pos, neg, &transfer.value);
    if numeric_check == Some(false) {
        return Err(DeriveError::failed("symbolic result disagrees with numeric solve"));
    }

    let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    debug!(
        netlist = netlist_id,
        mode = strategy.mode.as_str(),
        unknowns = system.size(),
        elapsed_ms,
        "derived"
    );

    Ok(SymbolicEquationSet {
        netlist_id: netlist_id.to_string(),
        mode: strategy.mode,
        transfer: TransferFunction::from_rational(&transfer.value, &system),
        output_label: netlist.output.label.clone(),
        input_label: netlist.input.clone(),
        laplace_system: system.laplace_equations(),
        time_domain_system: system.time_domain_equations(),
        node_voltages,
        element_voltages,
        parameters: system.parameters(),
        component_count: components,
        complexity_score: netlist.complexity_score(),
        fully_reduced,
        numeric_check,
        elapsed_ms,
    })
}

fn unknown_index(system: &MnaSystem, node: u32) -> Option<usize> {
    if node == 0 {
        None
    } else {
        system.node_index(node)
    }
}

/// `x[pos] - x[neg]` with ground read as zero.
fn difference(
    solution: &Solution,
    pos: Option<usize>,
    neg: Option<usize>,
    deadline: &Deadline,
) -> DeriveResult<Rational> {
    let pick = |i: Option<usize>| match i {
        Some(i) => Rational::new(
            solution.numerators[i].clone(),
            solution.denominators[i].clone(),
        ),
        None => Rational::new(Poly::zero(), Poly::one()),
    };
    pick(pos).sub_with(&pick(neg), || -> DeriveResult<()> {
        Ok(deadline.check("reduction")?)
    })
}
