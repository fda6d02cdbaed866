//! Sparse multivariate polynomials with exact `i128` coefficients.
//!
//! Variables are small integers handed out by a [`Symbols`] table; variable
//! `0` is always the Laplace variable `s`. Terms are kept in lexicographic
//! order with lower variable indices more significant, so the last term of a
//! polynomial is its leading term and powers of `s` lead when printed.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt::Write as _;

use cs_core::gcd_i128;

use crate::error::{AlgebraError, AlgebraResult};

/// Interned variable names.
#[derive(Debug, Clone)]
pub struct Symbols {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl Symbols {
    /// Index of the Laplace variable.
    pub const S: usize = 0;

    pub fn new() -> Self {
        let mut symbols = Self {
            names: Vec::new(),
            index: HashMap::new(),
        };
        symbols.intern("s");
        symbols
    }

    pub fn intern(&mut self, name: &str) -> usize {
        if let Some(&i) = self.index.get(name) {
            return i;
        }
        let i = self.names.len();
        self.names.push(name.to_string());
        self.index.insert(name.to_string(), i);
        i
    }

    pub fn name(&self, var: usize) -> &str {
        self.names.get(var).map_or("?", String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Parameter names, excluding `s`.
    pub fn parameters(&self) -> impl Iterator<Item = &str> {
        self.names.iter().skip(1).map(String::as_str)
    }
}

impl Default for Symbols {
    fn default() -> Self {
        Self::new()
    }
}

/// Exponent vector with trailing zeros trimmed.
///
/// The derived ordering on the trimmed vector is lexicographic order with
/// variable 0 most significant.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Monomial(Vec<u32>);

impl Monomial {
    pub fn one() -> Self {
        Self(Vec::new())
    }

    pub fn var(var: usize) -> Self {
        Self::var_pow(var, 1)
    }

    pub fn var_pow(var: usize, exp: u32) -> Self {
        let mut e = vec![0; var + 1];
        e[var] = exp;
        Self(e).trimmed()
    }

    fn trimmed(mut self) -> Self {
        while self.0.last() == Some(&0) {
            self.0.pop();
        }
        self
    }

    pub fn is_one(&self) -> bool {
        self.0.is_empty()
    }

    pub fn exp(&self, var: usize) -> u32 {
        self.0.get(var).copied().unwrap_or(0)
    }

    pub fn degree(&self) -> u32 {
        self.0.iter().sum()
    }

    pub fn mul(&self, other: &Monomial) -> Monomial {
        let len = self.0.len().max(other.0.len());
        Monomial((0..len).map(|v| self.exp(v) + other.exp(v)).collect())
    }

    /// `self / other`, if `other` divides `self`.
    pub fn div(&self, other: &Monomial) -> Option<Monomial> {
        if other.0.len() > self.0.len() && other.0[self.0.len()..].iter().any(|&e| e > 0) {
            return None;
        }
        let mut out = Vec::with_capacity(self.0.len());
        for (v, &e) in self.0.iter().enumerate() {
            out.push(e.checked_sub(other.exp(v))?);
        }
        Some(Monomial(out).trimmed())
    }

    pub fn gcd(&self, other: &Monomial) -> Monomial {
        let len = self.0.len().min(other.0.len());
        Monomial((0..len).map(|v| self.exp(v).min(other.exp(v))).collect()).trimmed()
    }

    fn with_exp(&self, var: usize, exp: u32) -> Monomial {
        let mut e = self.0.clone();
        if e.len() <= var {
            e.resize(var + 1, 0);
        }
        e[var] = exp;
        Monomial(e).trimmed()
    }

    pub fn vars(&self) -> impl Iterator<Item = usize> + '_ {
        self.0
            .iter()
            .enumerate()
            .filter(|(_, e)| **e > 0)
            .map(|(v, _)| v)
    }

    fn write(&self, symbols: &Symbols, out: &mut String) {
        let mut first = true;
        for (v, &e) in self.0.iter().enumerate() {
            if e == 0 {
                continue;
            }
            if !first {
                out.push('*');
            }
            first = false;
            out.push_str(symbols.name(v));
            if e > 1 {
                let _ = write!(out, "^{e}");
            }
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Poly {
    terms: BTreeMap<Monomial, i128>,
}

impl Poly {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn one() -> Self {
        Self::constant(1)
    }

    pub fn constant(c: i128) -> Self {
        Self::term(Monomial::one(), c)
    }

    pub fn var(var: usize) -> Self {
        Self::term(Monomial::var(var), 1)
    }

    pub fn term(m: Monomial, c: i128) -> Self {
        let mut terms = BTreeMap::new();
        if c != 0 {
            terms.insert(m, c);
        }
        Self { terms }
    }

    pub fn is_zero(&self) -> bool {
        self.terms.is_empty()
    }

    /// Number of terms.
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn as_constant(&self) -> Option<i128> {
        match self.terms.len() {
            0 => Some(0),
            1 => self.terms.get(&Monomial::one()).copied(),
            _ => None,
        }
    }

    pub fn is_constant(&self) -> bool {
        self.as_constant().is_some()
    }

    pub fn terms(&self) -> impl DoubleEndedIterator<Item = (&Monomial, i128)> {
        self.terms.iter().map(|(m, c)| (m, *c))
    }

    pub fn leading(&self) -> Option<(&Monomial, i128)> {
        self.terms.last_key_value().map(|(m, c)| (m, *c))
    }

    fn accumulate(&mut self, m: Monomial, c: i128) -> AlgebraResult<()> {
        if c == 0 {
            return Ok(());
        }
        match self.terms.get_mut(&m) {
            Some(existing) => {
                let sum = existing.checked_add(c).ok_or(AlgebraError::Overflow)?;
                if sum == 0 {
                    self.terms.remove(&m);
                } else {
                    *existing = sum;
                }
            }
            None => {
                self.terms.insert(m, c);
            }
        }
        Ok(())
    }

    pub fn add(&self, other: &Poly) -> AlgebraResult<Poly> {
        let mut out = self.clone();
        for (m, c) in other.terms() {
            out.accumulate(m.clone(), c)?;
        }
        Ok(out)
    }

    pub fn sub(&self, other: &Poly) -> AlgebraResult<Poly> {
        let mut out = self.clone();
        for (m, c) in other.terms() {
            out.accumulate(m.clone(), c.checked_neg().ok_or(AlgebraError::Overflow)?)?;
        }
        Ok(out)
    }

    pub fn neg(&self) -> AlgebraResult<Poly> {
        self.scale(-1)
    }

    pub fn scale(&self, k: i128) -> AlgebraResult<Poly> {
        self.mul_term(&Monomial::one(), k)
    }

    pub fn mul_term(&self, m: &Monomial, k: i128) -> AlgebraResult<Poly> {
        if k == 0 {
            return Ok(Poly::zero());
        }
        let mut terms = BTreeMap::new();
        for (tm, c) in self.terms() {
            terms.insert(tm.mul(m), c.checked_mul(k).ok_or(AlgebraError::Overflow)?);
        }
        Ok(Poly { terms })
    }

    pub fn mul(&self, other: &Poly) -> AlgebraResult<Poly> {
        self.mul_with(other, || Ok(()))
    }

    /// `self * other`, calling `tick` before each row of partial products.
    /// An error from `tick` abandons the product.
    pub fn mul_with<E: From<AlgebraError>>(
        &self,
        other: &Poly,
        mut tick: impl FnMut() -> Result<(), E>,
    ) -> Result<Poly, E> {
        let (small, large) = if self.len() <= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        let mut out = Poly::zero();
        for (m, c) in small.terms() {
            tick()?;
            for (om, oc) in large.terms() {
                out.accumulate(m.mul(om), c.checked_mul(oc).ok_or(AlgebraError::Overflow)?)?;
            }
        }
        Ok(out)
    }

    /// Exact quotient `self / divisor`; fails when a remainder would be left.
    pub fn div_exact(&self, divisor: &Poly) -> AlgebraResult<Poly> {
        self.div_exact_with(divisor, || Ok(()))
    }

    /// [`Poly::div_exact`], calling `tick` before each quotient term.
    pub fn div_exact_with<E: From<AlgebraError>>(
        &self,
        divisor: &Poly,
        mut tick: impl FnMut() -> Result<(), E>,
    ) -> Result<Poly, E> {
        let (lead_m, lead_c) = divisor.leading().ok_or(AlgebraError::DivisionByZero)?;
        if let Some(k) = divisor.as_constant() {
            return Ok(self.div_by_term(&Monomial::one(), k)?);
        }
        let mut remainder = self.clone();
        let mut quotient = Poly::zero();
        while let Some((rm, rc)) = remainder.leading() {
            tick()?;
            let m = rm.div(lead_m).ok_or(AlgebraError::Inexact)?;
            if rc % lead_c != 0 {
                return Err(AlgebraError::Inexact.into());
            }
            let c = rc / lead_c;
            remainder = remainder.sub(&divisor.mul_term(&m, c)?)?;
            quotient.accumulate(m, c)?;
        }
        Ok(quotient)
    }

    /// Divide every term by `c * m`; fails unless each term is divisible.
    pub fn div_by_term(&self, m: &Monomial, c: i128) -> AlgebraResult<Poly> {
        if c == 0 {
            return Err(AlgebraError::DivisionByZero);
        }
        let mut terms = BTreeMap::new();
        for (tm, tc) in self.terms() {
            if tc % c != 0 {
                return Err(AlgebraError::Inexact);
            }
            terms.insert(tm.div(m).ok_or(AlgebraError::Inexact)?, tc / c);
        }
        Ok(Poly { terms })
    }

    /// Non-negative gcd of all coefficients.
    pub fn content(&self) -> i128 {
        self.terms().fold(0, |g, (_, c)| gcd_i128(g, c))
    }

    /// Largest monomial dividing every term.
    pub fn monomial_content(&self) -> Monomial {
        let mut iter = self.terms.keys();
        let Some(first) = iter.next() else {
            return Monomial::one();
        };
        iter.fold(first.clone(), |g, m| g.gcd(m))
    }

    pub fn degree_in(&self, var: usize) -> u32 {
        self.terms.keys().map(|m| m.exp(var)).max().unwrap_or(0)
    }

    /// Coefficient of `var^k`, with `var` removed.
    pub fn coeff_in(&self, var: usize, k: u32) -> Poly {
        let terms = self
            .terms()
            .filter(|(m, _)| m.exp(var) == k)
            .map(|(m, c)| (m.with_exp(var, 0), c))
            .collect();
        Poly { terms }
    }

    /// Multiply by `var^k`.
    pub fn shift(&self, var: usize, k: u32) -> Poly {
        let terms = self
            .terms()
            .map(|(m, c)| (m.with_exp(var, m.exp(var) + k), c))
            .collect();
        Poly { terms }
    }

    pub fn vars(&self) -> BTreeSet<usize> {
        self.terms.keys().flat_map(|m| m.vars()).collect()
    }

    /// Flip the sign so the leading coefficient is positive.
    pub fn normalized_sign(self) -> AlgebraResult<Poly> {
        match self.leading() {
            Some((_, c)) if c < 0 => self.neg(),
            _ => Ok(self),
        }
    }

    pub fn eval(&self, point: &[f64]) -> f64 {
        self.terms()
            .map(|(m, c)| {
                m.0.iter()
                    .enumerate()
                    .fold(c as f64, |acc, (v, &e)| {
                        acc * point.get(v).copied().unwrap_or(0.0).powi(e as i32)
                    })
            })
            .sum()
    }

    /// Human-readable rendering, leading term first.
    pub fn display(&self, symbols: &Symbols) -> String {
        if self.is_zero() {
            return "0".to_string();
        }
        let mut out = String::new();
        for (i, (m, c)) in self.terms().rev().enumerate() {
            let magnitude = c.unsigned_abs();
            if i == 0 {
                if c < 0 {
                    out.push('-');
                }
            } else {
                out.push_str(if c < 0 { " - " } else { " + " });
            }
            if m.is_one() {
                let _ = write!(out, "{magnitude}");
            } else {
                if magnitude != 1 {
                    let _ = write!(out, "{magnitude}*");
                }
                m.write(symbols, &mut out);
            }
        }
        out
    }

    /// Rendering safe to use as a factor.
    pub fn display_factor(&self, symbols: &Symbols) -> String {
        let text = self.display(symbols);
        if self.len() > 1 { format!("({text})") } else { text }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars() -> (Symbols, Poly, Poly, Poly) {
        let mut sym = Symbols::new();
        let r = sym.intern("R1");
        let c = sym.intern("C1");
        (sym, Poly::var(Symbols::S), Poly::var(r), Poly::var(c))
    }

    #[test]
    fn arithmetic_and_display() {
        let (sym, s, r, c) = vars();
        // R1*C1*s + 1
        let p = r.mul(&c).unwrap().mul(&s).unwrap().add(&Poly::one()).unwrap();
        assert_eq!(p.display(&sym), "s*R1*C1 + 1");
        let sq = p.mul(&p).unwrap();
        assert_eq!(sq.display(&sym), "s^2*R1^2*C1^2 + 2*s*R1*C1 + 1");
        assert_eq!(sq.degree_in(Symbols::S), 2);
        assert!(p.sub(&p).unwrap().is_zero());
        assert_eq!(Poly::constant(-3).display(&sym), "-3");
    }

    #[test]
    fn exact_division() {
        let (_, s, r, _) = vars();
        let a = s.add(&r).unwrap();
        let b = s.sub(&r).unwrap();
        let prod = a.mul(&b).unwrap();
        assert_eq!(prod.div_exact(&a).unwrap(), b);
        assert_eq!(prod.div_exact(&s), Err(AlgebraError::Inexact));
        assert_eq!(a.div_exact(&Poly::zero()), Err(AlgebraError::DivisionByZero));
    }

    #[test]
    fn contents() {
        let (_, s, r, _) = vars();
        let p = s.mul(&r).unwrap().scale(6).unwrap().add(&s.scale(4).unwrap()).unwrap();
        assert_eq!(p.content(), 2);
        assert_eq!(p.monomial_content(), Monomial::var(Symbols::S));
        let reduced = p.div_by_term(&Monomial::var(Symbols::S), 2).unwrap();
        assert_eq!(reduced, r.scale(3).unwrap().add(&Poly::constant(2)).unwrap());
    }

    #[test]
    fn coefficient_extraction() {
        let (_, s, r, c) = vars();
        // s^2*R1 + s*C1 + R1*C1
        let p = s
            .mul(&s)
            .unwrap()
            .mul(&r)
            .unwrap()
            .add(&s.mul(&c).unwrap())
            .unwrap()
            .add(&r.mul(&c).unwrap())
            .unwrap();
        assert_eq!(p.coeff_in(Symbols::S, 2), r);
        assert_eq!(p.coeff_in(Symbols::S, 1), c);
        assert_eq!(p.coeff_in(Symbols::S, 0).shift(Symbols::S, 1), s.mul(&r).unwrap().mul(&c).unwrap());
        assert_eq!(p.vars().len(), 3);
    }

    #[test]
    fn overflow_is_reported() {
        let big = Poly::constant(i128::MAX);
        assert_eq!(big.add(&Poly::one()), Err(AlgebraError::Overflow));
        assert_eq!(big.scale(2), Err(AlgebraError::Overflow));
    }

    #[test]
    fn evaluation() {
        let (_, s, r, _) = vars();
        let p = s.mul(&r).unwrap().add(&Poly::constant(2)).unwrap();
        assert!((p.eval(&[0.5, 4.0]) - 4.0).abs() < 1e-12);
    }
}
