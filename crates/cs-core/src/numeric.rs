/// Floating point type used by numeric cross-checks.
pub type Real = f64;

/// Absolute and relative closeness bounds for a float comparison.
#[derive(Clone, Copy, Debug)]
pub struct Tolerances {
    pub abs: Real,
    pub rel: Real,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            abs: 1e-12,
            rel: 1e-9,
        }
    }
}

/// `a` and `b` agree within `tol.abs`, or within `tol.rel` of the larger magnitude.
pub fn nearly_equal(a: Real, b: Real, tol: Tolerances) -> bool {
    let diff = (a - b).abs();
    if diff <= tol.abs {
        return true;
    }
    diff <= tol.rel * a.abs().max(b.abs())
}

/// Greatest common divisor of two integers, always non-negative.
pub fn gcd_i128(mut a: i128, mut b: i128) -> i128 {
    a = a.abs();
    b = b.abs();
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearly_equal_abs_then_rel() {
        let tol = Tolerances {
            abs: 1e-12,
            rel: 1e-9,
        };
        assert!(nearly_equal(1.0, 1.0 + 1e-12, tol));
        assert!(nearly_equal(0.0, 1e-13, tol));
        assert!(!nearly_equal(1.0, 1.0 + 1e-6, tol));
        assert!(nearly_equal(1e6, 1e6 + 1e-4, tol));
    }

    #[test]
    fn gcd_handles_signs_and_zero() {
        assert_eq!(gcd_i128(12, -18), 6);
        assert_eq!(gcd_i128(0, 5), 5);
        assert_eq!(gcd_i128(0, 0), 0);
    }

    proptest::proptest! {
        #[test]
        fn gcd_divides_both(a in -1_000_000i128..1_000_000, b in -1_000_000i128..1_000_000) {
            let g = gcd_i128(a, b);
            proptest::prop_assert!(g >= 0);
            if g != 0 {
                proptest::prop_assert_eq!(a % g, 0);
                proptest::prop_assert_eq!(b % g, 0);
            }
        }

        #[test]
        fn nearly_equal_is_symmetric(a in -1e6f64..1e6, b in -1e6f64..1e6) {
            let tol = Tolerances::default();
            proptest::prop_assert_eq!(nearly_equal(a, b, tol), nearly_equal(b, a, tol));
        }
    }
}
