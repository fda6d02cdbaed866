//! Multivariate polynomial gcd by recursive primitive remainder sequences.
//!
//! The polynomials are viewed as univariate in their most significant
//! variable with coefficients in the remaining ones. Contents are taken
//! recursively and the primitive parts run through a pseudo-remainder
//! sequence, taking primitive parts at every step to keep coefficients small.

use cs_core::{Deadline, gcd_i128};

use crate::error::DeriveResult;
use crate::poly::Poly;

/// Greatest common divisor with positive leading coefficient.
///
/// `gcd(0, 0)` is `0`.
pub fn poly_gcd(a: &Poly, b: &Poly, deadline: &Deadline) -> DeriveResult<Poly> {
    deadline.check("gcd")?;
    if a.is_zero() {
        return Ok(b.clone().normalized_sign()?);
    }
    if b.is_zero() {
        return Ok(a.clone().normalized_sign()?);
    }
    let (Some(ca), Some(cb)) = (a.as_constant(), b.as_constant()) else {
        return gcd_in_main_var(a, b, deadline);
    };
    Ok(Poly::constant(gcd_i128(ca, cb)))
}

fn gcd_in_main_var(a: &Poly, b: &Poly, deadline: &Deadline) -> DeriveResult<Poly> {
    let vars = a.vars();
    let var = match (vars.first(), b.vars().first()) {
        (Some(&x), Some(&y)) => x.min(y),
        (Some(&x), None) | (None, Some(&x)) => x,
        (None, None) => return Ok(Poly::constant(gcd_i128(a.content(), b.content()))),
    };

    let ca = content_in(a, var, deadline)?;
    let cb = content_in(b, var, deadline)?;
    let content = poly_gcd(&ca, &cb, deadline)?;

    let tick = || -> DeriveResult<()> { Ok(deadline.check("gcd")?) };
    let mut p = a.div_exact_with(&ca, tick)?;
    let mut q = b.div_exact_with(&cb, tick)?;
    if p.degree_in(var) < q.degree_in(var) {
        std::mem::swap(&mut p, &mut q);
    }
    while !q.is_zero() {
        deadline.check("gcd")?;
        let r = pseudo_remainder(&p, &q, var, deadline)?;
        p = q;
        q = if r.is_zero() {
            r
        } else {
            primitive_part_in(&r, var, deadline)?
        };
    }
    let g = primitive_part_in(&p, var, deadline)?;
    Ok(content.mul_with(&g, tick)?.normalized_sign()?)
}

/// Gcd of the coefficients of `p` viewed as a polynomial in `var`.
fn content_in(p: &Poly, var: usize, deadline: &Deadline) -> DeriveResult<Poly> {
    let mut g = Poly::zero();
    for k in 0..=p.degree_in(var) {
        let c = p.coeff_in(var, k);
        if c.is_zero() {
            continue;
        }
        g = poly_gcd(&g, &c, deadline)?;
        if g.as_constant() == Some(1) {
            break;
        }
    }
    Ok(g)
}

fn primitive_part_in(p: &Poly, var: usize, deadline: &Deadline) -> DeriveResult<Poly> {
    let c = content_in(p, var, deadline)?;
    let tick = || -> DeriveResult<()> { Ok(deadline.check("gcd")?) };
    Ok(p.div_exact_with(&c, tick)?.normalized_sign()?)
}

/// `lc(q)^k * p mod q` in `var`, computed without divisions.
fn pseudo_remainder(p: &Poly, q: &Poly, var: usize, deadline: &Deadline) -> DeriveResult<Poly> {
    let tick = || -> DeriveResult<()> { Ok(deadline.check("gcd")?) };
    let n = q.degree_in(var);
    let lead = q.coeff_in(var, n);
    let mut r = p.clone();
    while !r.is_zero() && r.degree_in(var) >= n {
        let d = r.degree_in(var);
        let lr = r.coeff_in(var, d).shift(var, d - n);
        r = lead.mul_with(&r, tick)?.sub(&lr.mul_with(q, tick)?)?;
    }
    Ok(r)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::poly::Symbols;

    fn setup() -> (Poly, Poly, Poly) {
        let mut sym = Symbols::new();
        let r = sym.intern("R1");
        let c = sym.intern("C1");
        (Poly::var(Symbols::S), Poly::var(r), Poly::var(c))
    }

    #[test]
    fn common_factor_is_found() {
        let (s, r, c) = setup();
        let deadline = Deadline::unbounded();
        // f = s*R1*C1 + 1, a = f*(s + R1), b = f*(C1 - 2)
        let f = s.mul(&r).unwrap().mul(&c).unwrap().add(&Poly::one()).unwrap();
        let a = f.mul(&s.add(&r).unwrap()).unwrap();
        let b = f.mul(&c.sub(&Poly::constant(2)).unwrap()).unwrap();
        assert_eq!(poly_gcd(&a, &b, &deadline).unwrap(), f);
    }

    #[test]
    fn coprime_polynomials() {
        let (s, r, _) = setup();
        let deadline = Deadline::unbounded();
        let a = s.add(&r).unwrap();
        let b = s.sub(&r).unwrap();
        assert_eq!(poly_gcd(&a, &b, &deadline).unwrap(), Poly::one());
    }

    #[test]
    fn integer_and_zero_cases() {
        let (s, _, _) = setup();
        let deadline = Deadline::unbounded();
        let a = s.scale(6).unwrap();
        let b = s.scale(-4).unwrap();
        assert_eq!(poly_gcd(&a, &b, &deadline).unwrap(), s.scale(2).unwrap());
        assert_eq!(poly_gcd(&Poly::zero(), &b, &deadline).unwrap(), s.scale(4).unwrap());
        assert!(poly_gcd(&Poly::zero(), &Poly::zero(), &deadline).unwrap().is_zero());
    }

    #[test]
    fn expired_deadline_times_out() {
        let (s, r, _) = setup();
        let deadline = Deadline::after(std::time::Duration::ZERO);
        assert!(matches!(
            poly_gcd(&s, &r, &deadline),
            Err(crate::error::DeriveError::Timeout { .. })
        ));
    }
}
