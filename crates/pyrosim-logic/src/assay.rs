//! Biochar quality assay.
//!
//! The lab derives four properties from the purity of the rubber granulate
//! (GCR) stream the sample was drawn from. Purer feed gives more fixed
//! carbon, a more porous char and less ash.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::noise::fluctuate;

/// Purity the correlations are centred on.
const REFERENCE_PURITY: f64 = 95.0;

/// Assay output for one sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AssayResult {
    /// Fixed carbon, percent of dry mass.
    pub carbon_pct: f64,
    pub ph: f64,
    /// BET surface area, m²/g.
    pub porosity_m2_per_g: f64,
    /// Ash, percent of dry mass.
    pub ash_pct: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Quality {
    Premium,
    Standard,
}

/// Classification thresholds and measurement noise.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssayTuning {
    /// Carbon must exceed this for premium.
    pub min_carbon_pct: f64,
    /// Ash must stay below this for premium.
    pub max_ash_pct: f64,
    /// Purity assumed when the upstream line reports none.
    pub fallback_purity: f64,
    /// Multiplicative noise factor on carbon, porosity and ash.
    pub measurement_noise: f64,
}

impl Default for AssayTuning {
    fn default() -> Self {
        Self {
            min_carbon_pct: 88.0,
            max_ash_pct: 4.5,
            fallback_purity: 98.5,
            measurement_noise: 0.005,
        }
    }
}

/// Run the assay against a purity reading (percent).
pub fn assay(purity: f64, tuning: &AssayTuning, rng: &mut impl Rng) -> AssayResult {
    let base = if purity > 0.0 {
        purity
    } else {
        tuning.fallback_purity
    };
    let delta = base - REFERENCE_PURITY;
    let noise = tuning.measurement_noise;

    AssayResult {
        carbon_pct: fluctuate(85.0 + delta, noise, rng).clamp(0.0, 100.0),
        ph: 8.5 + rng.gen::<f64>(),
        porosity_m2_per_g: fluctuate(450.0 + delta * 10.0, noise, rng).max(0.0),
        ash_pct: fluctuate(5.0 - delta * 0.2, noise, rng).clamp(0.0, 100.0),
    }
}

/// Premium needs both enough carbon and little enough ash.
pub fn classify(result: &AssayResult, tuning: &AssayTuning) -> Quality {
    if result.carbon_pct > tuning.min_carbon_pct && result.ash_pct < tuning.max_ash_pct {
        Quality::Premium
    } else {
        Quality::Standard
    }
}
