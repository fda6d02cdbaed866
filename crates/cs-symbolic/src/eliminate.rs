//! Fraction-free Gauss-Jordan elimination.
//!
//! Every update `a_ij <- (a_kk * a_ij - a_ik * a_kj) / p` divides exactly by
//! the previous pivot `p`, so entries stay polynomial. On completion every
//! diagonal entry equals the determinant up to sign and unknown `i` is
//! `a_in / a_ii`.
//!
//! The deadline is polled before every entry update and inside the
//! polynomial products and quotients that make it up.

use cs_core::Deadline;

use crate::error::{DeriveError, DeriveResult};
use crate::mna::MnaSystem;
use crate::poly::Poly;

/// Unreduced solution `num / den` for every unknown, in system order.
#[derive(Debug, Clone)]
pub struct Solution {
    pub numerators: Vec<Poly>,
    pub denominators: Vec<Poly>,
}

pub fn solve(system: &MnaSystem, deadline: &Deadline) -> DeriveResult<Solution> {
    let n = system.size();
    let mut a: Vec<Vec<Poly>> = system
        .matrix
        .iter()
        .zip(&system.rhs)
        .map(|(row, rhs)| {
            let mut row = row.clone();
            row.push(rhs.clone());
            row
        })
        .collect();

    let tick = || -> DeriveResult<()> { Ok(deadline.check("elimination")?) };
    let mut previous = Poly::one();
    for k in 0..n {
        tick()?;
        let pivot_row = (k..n)
            .filter(|&r| !a[r][k].is_zero())
            .min_by_key(|&r| a[r][k].len())
            .ok_or_else(|| DeriveError::failed(format!("singular system at column {k}")))?;
        a.swap(k, pivot_row);

        let pivot = a[k][k].clone();
        let pivot_row = a[k].clone();
        for (i, row) in a.iter_mut().enumerate() {
            if i == k {
                continue;
            }
            let factor = std::mem::take(&mut row[k]);
            for j in 0..=n {
                if j == k {
                    continue;
                }
                tick()?;
                let scaled = if row[j].is_zero() {
                    Poly::zero()
                } else {
                    pivot.mul_with(&row[j], tick)?
                };
                let cross = if factor.is_zero() || pivot_row[j].is_zero() {
                    Poly::zero()
                } else {
                    factor.mul_with(&pivot_row[j], tick)?
                };
                let combined = scaled.sub(&cross)?;
                row[j] = if combined.is_zero() {
                    combined
                } else {
                    combined.div_exact_with(&previous, tick)?
                };
            }
        }
        previous = pivot;
    }

    let (numerators, denominators) = a
        .into_iter()
        .enumerate()
        .map(|(i, mut row)| {
            let den = std::mem::take(&mut row[i]);
            (row.swap_remove(n), den)
        })
        .unzip();
    Ok(Solution {
        numerators,
        denominators,
    })
}
