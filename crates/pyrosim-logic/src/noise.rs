//! Bounded noise helpers.
//!
//! Every simulated reading is a nominal value perturbed by one of these
//! helpers. None of them can move a value outside a known envelope, which is
//! what lets the models clamp instead of validate.

use rand::Rng;

/// Multiplicative noise: `value * (1 ± factor/2)`.
///
/// A `factor` of `0.01` gives ±0.5 %, `0.05` gives ±2.5 %.
pub fn fluctuate(value: f64, factor: f64, rng: &mut impl Rng) -> f64 {
    value * (1.0 + (rng.gen::<f64>() - 0.5) * factor)
}

/// One-sided attenuation: `value * (1 - u * spread)` with `u` in `[0, 1)`.
pub fn attenuate(value: f64, spread: f64, rng: &mut impl Rng) -> f64 {
    value * (1.0 - rng.gen::<f64>() * spread)
}

/// Symmetric additive step in `[-span/2, span/2)`, used for random walks.
pub fn jitter(span: f64, rng: &mut impl Rng) -> f64 {
    (rng.gen::<f64>() - 0.5) * span
}

/// Uniform sample in `[lo, hi)`. Degenerate ranges return `lo`.
pub fn uniform(lo: f64, hi: f64, rng: &mut impl Rng) -> f64 {
    if hi <= lo {
        lo
    } else {
        rng.gen_range(lo..hi)
    }
}

/// Closed bounds of [`fluctuate`] around a nominal value.
pub fn envelope(nominal: f64, factor: f64) -> (f64, f64) {
    let a = nominal * (1.0 - factor / 2.0);
    let b = nominal * (1.0 + factor / 2.0);
    (a.min(b), a.max(b))
}
