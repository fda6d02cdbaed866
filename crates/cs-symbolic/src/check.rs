//! Floating-point cross-check of a symbolic result.

use cs_core::{Real, Tolerances, nearly_equal};
use nalgebra::{DMatrix, DVector};

use crate::mna::MnaSystem;
use crate::reduce::Rational;

/// Sample value of the Laplace variable.
const SAMPLE_S: Real = 0.73;

const CHECK_TOLERANCE: Tolerances = Tolerances {
    abs: 1e-9,
    rel: 1e-6,
};

/// Value assigned to every variable at the sample point.
pub fn sample_point(vars: usize) -> Vec<Real> {
    (0..vars)
        .map(|v| {
            if v == 0 {
                SAMPLE_S
            } else {
                1.0 + ((v % 5) as Real) * 0.5
            }
        })
        .collect()
}

/// Solve the system numerically and compare the difference of unknowns
/// `pos - neg` against `expected`.
///
/// `None` when the sample point is degenerate for either side.
pub fn cross_check(
    system: &MnaSystem,
    pos: Option<usize>,
    neg: Option<usize>,
    expected: &Rational,
) -> Option<bool> {
    let point = sample_point(system.symbols.len());
    let n = system.size();
    let a = DMatrix::from_fn(n, n, |r, c| system.matrix[r][c].eval(&point));
    let b = DVector::from_fn(n, |r, _| system.rhs[r].eval(&point));
    let x = a.lu().solve(&b)?;

    let numeric = pos.map_or(0.0, |i| x[i]) - neg.map_or(0.0, |i| x[i]);
    let den = expected.den.eval(&point);
    if !numeric.is_finite() || den.abs() < CHECK_TOLERANCE.abs {
        return None;
    }
    let symbolic = expected.num.eval(&point) / den;
    Some(nearly_equal(numeric, symbolic, CHECK_TOLERANCE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::poly::Poly;

    #[test]
    fn sample_point_is_stable() {
        assert_eq!(sample_point(4), vec![0.73, 1.5, 2.0, 2.5]);
    }

    #[test]
    fn detects_wrong_result() {
        let system = MnaSystem {
            symbols: crate::poly::Symbols::new(),
            unknowns: vec![crate::mna::Unknown::Node(1)],
            matrix: vec![vec![Poly::constant(2)]],
            rhs: vec![Poly::constant(1)],
            source: None,
            analysis: cs_netlist::Analysis::Dc,
        };
        let half = Rational::new(Poly::one(), Poly::constant(2));
        let third = Rational::new(Poly::one(), Poly::constant(3));
        assert_eq!(cross_check(&system, Some(0), None, &half), Some(true));
        assert_eq!(cross_check(&system, Some(0), None, &third), Some(false));
    }
}
