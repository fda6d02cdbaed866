//! Cancellation of common factors in polynomial fractions.

use cs_core::Deadline;
use serde::{Deserialize, Serialize};

use crate::error::{AlgebraError, AlgebraResult, DeriveError, DeriveResult};
use crate::gcd::poly_gcd;
use crate::poly::{Poly, Symbols};

/// How much effort goes into simplifying derived fractions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SolveMode {
    /// Integer and monomial content only.
    #[default]
    Fast,
    /// Full multivariate gcd cancellation.
    Thorough,
}

impl SolveMode {
    pub fn as_str(self) -> &'static str {
        match self {
            SolveMode::Fast => "fast",
            SolveMode::Thorough => "thorough",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rational {
    pub num: Poly,
    pub den: Poly,
}

impl Rational {
    pub fn new(num: Poly, den: Poly) -> Self {
        Self { num, den }
    }

    pub fn sub(&self, other: &Rational) -> AlgebraResult<Rational> {
        self.sub_with(other, || Ok(()))
    }

    /// `self - other`, polling `tick` through the cross products.
    pub fn sub_with<E: From<AlgebraError>>(
        &self,
        other: &Rational,
        mut tick: impl FnMut() -> Result<(), E>,
    ) -> Result<Rational, E> {
        if self.den == other.den {
            return Ok(Rational::new(self.num.sub(&other.num)?, self.den.clone()));
        }
        let left = self.num.mul_with(&other.den, &mut tick)?;
        let right = other.num.mul_with(&self.den, &mut tick)?;
        let den = self.den.mul_with(&other.den, &mut tick)?;
        Ok(Rational::new(left.sub(&right)?, den))
    }

    pub fn is_zero(&self) -> bool {
        self.num.is_zero()
    }

    pub fn eval(&self, point: &[f64]) -> f64 {
        self.num.eval(point) / self.den.eval(point)
    }

    pub fn display(&self, symbols: &Symbols) -> String {
        if self.num.is_zero() {
            return "0".to_string();
        }
        if self.den.as_constant() == Some(1) {
            return self.num.display(symbols);
        }
        let den = self.den.display(symbols);
        let den = if self.den.len() > 1 || den.contains('*') {
            format!("({den})")
        } else {
            den
        };
        format!("{}/{den}", self.num.display_factor(symbols))
    }

    /// Strip integer and monomial content shared by both sides and make the
    /// denominator's leading coefficient positive.
    fn cancel_content(&self) -> AlgebraResult<Rational> {
        if self.den.is_zero() {
            return Err(AlgebraError::DivisionByZero);
        }
        if self.num.is_zero() {
            return Ok(Rational::new(Poly::zero(), Poly::one()));
        }
        let k = cs_core::gcd_i128(self.num.content(), self.den.content());
        let m = self.num.monomial_content().gcd(&self.den.monomial_content());
        let mut num = self.num.div_by_term(&m, k)?;
        let mut den = self.den.div_by_term(&m, k)?;
        if den.leading().is_some_and(|(_, c)| c < 0) {
            num = num.neg()?;
            den = den.neg()?;
        }
        Ok(Rational::new(num, den))
    }
}

/// A fraction after reduction and whether every common factor was removed.
#[derive(Debug, Clone)]
pub struct Reduced {
    pub value: Rational,
    pub complete: bool,
}

pub fn reduce(value: &Rational, mode: SolveMode, deadline: &Deadline) -> DeriveResult<Reduced> {
    deadline.check("reduction")?;
    let fast = value.cancel_content()?;
    if mode == SolveMode::Fast || fast.num.is_zero() {
        let complete = mode == SolveMode::Thorough;
        return Ok(Reduced {
            value: fast,
            complete,
        });
    }
    match cancel_gcd(&fast, deadline) {
        Ok(value) => Ok(Reduced {
            value,
            complete: true,
        }),
        Err(DeriveError::Algebra(AlgebraError::Overflow)) => {
            tracing::debug!("gcd overflowed, keeping content-reduced fraction");
            Ok(Reduced {
                value: fast,
                complete: false,
            })
        }
        Err(e) => Err(e),
    }
}

fn cancel_gcd(value: &Rational, deadline: &Deadline) -> DeriveResult<Rational> {
    let g = poly_gcd(&value.num, &value.den, deadline)?;
    if g.as_constant() == Some(1) {
        return Ok(value.clone());
    }
    let tick = || -> DeriveResult<()> { Ok(deadline.check("reduction")?) };
    let reduced = Rational::new(
        value.num.div_exact_with(&g, tick)?,
        value.den.div_exact_with(&g, tick)?,
    );
    Ok(reduced.cancel_content()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars() -> (Symbols, Poly, Poly) {
        let mut sym = Symbols::new();
        let r = Poly::var(sym.intern("R1"));
        let c = Poly::var(sym.intern("C1"));
        (sym, r, c)
    }

    #[test]
    fn fast_mode_strips_content_only() {
        let (sym, r, c) = vars();
        // (-2*R1*C1) / (-4*R1*(C1 + 1))
        let num = r.mul(&c).unwrap().scale(-2).unwrap();
        let den = r.mul(&c.add(&Poly::one()).unwrap()).unwrap().scale(-4).unwrap();
        let out = reduce(&Rational::new(num, den), SolveMode::Fast, &Deadline::unbounded()).unwrap();
        assert_eq!(out.value.display(&sym), "C1/(2*C1 + 2)");
        assert!(!out.complete);
    }

    #[test]
    fn thorough_mode_cancels_polynomial_factors() {
        let (sym, r, c) = vars();
        let f = r.add(&c).unwrap();
        let num = f.mul(&r).unwrap();
        let den = f.mul(&f).unwrap();
        let out = reduce(&Rational::new(num, den), SolveMode::Thorough, &Deadline::unbounded())
            .unwrap();
        assert_eq!(out.value.display(&sym), "R1/(R1 + C1)");
        assert!(out.complete);
    }

    #[test]
    fn zero_numerator() {
        let (_, r, _) = vars();
        let out = reduce(&Rational::new(Poly::zero(), r), SolveMode::Thorough, &Deadline::unbounded())
            .unwrap();
        assert!(out.value.is_zero());
        assert_eq!(out.value.den, Poly::one());
    }

    #[test]
    fn mode_names() {
        assert_eq!(SolveMode::Fast.as_str(), "fast");
        assert_eq!(
            serde_json::from_str::<SolveMode>("\"thorough\"").unwrap(),
            SolveMode::Thorough
        );
    }
}
