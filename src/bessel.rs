//! Modified Bessel functions of the second kind of orders zero and one.
//!
//! Thin layer over the `spec_math` Cephes ports. At the edges of the domain the values are
//! fixed here: `+inf` at zero, NaN for negative or NaN arguments and zero at infinity.

use spec_math::Bessel;

/// `K0(x)`.
///
/// Returns `+inf` at `x = 0` and NaN for negative or NaN arguments.
pub fn k0(x: f64) -> f64 {
    k0_k1(x).0
}

/// `K1(x)`.
///
/// Returns `+inf` at `x = 0` and NaN for negative or NaN arguments.
pub fn k1(x: f64) -> f64 {
    k0_k1(x).1
}

/// `(K0(x), K1(x))` evaluated together.
pub fn k0_k1(x: f64) -> (f64, f64) {
    special_values(x).unwrap_or_else(|| (x.bessel_k0(), x.bessel_k1()))
}

/// Exponentially scaled `e^x K0(x)`.
pub fn k0_scaled(x: f64) -> f64 {
    k0_k1_scaled(x).0
}

/// Exponentially scaled `e^x K1(x)`.
pub fn k1_scaled(x: f64) -> f64 {
    k0_k1_scaled(x).1
}

/// `(e^x K0(x), e^x K1(x))` evaluated together. These do not underflow for large `x`.
pub fn k0_k1_scaled(x: f64) -> (f64, f64) {
    special_values(x).unwrap_or_else(|| (x.bessel_k0e(), x.bessel_k1e()))
}

/// Values at the edges of the domain.
fn special_values(x: f64) -> Option<(f64, f64)> {
    if x.is_nan() || x < 0.0 {
        Some((f64::NAN, f64::NAN))
    } else if x == 0.0 {
        Some((f64::INFINITY, f64::INFINITY))
    } else if x.is_infinite() {
        // sqrt(pi / 2x) e^{-x} and its scaled form both vanish.
        Some((0.0, 0.0))
    } else {
        None
    }
}
