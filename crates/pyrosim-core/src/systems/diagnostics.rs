//! Electrical safety check - grounding and insulation resistance

use log::{info, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::components::GroundingStatus;

/// Chance a check comes back clean.
const PASS_PROBABILITY: f64 = 0.9;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticsOutcome {
    pub grounding: GroundingStatus,
    /// Insulation integrity, percent.
    pub insulation: f64,
}

impl DiagnosticsOutcome {
    pub fn passed(&self) -> bool {
        self.grounding == GroundingStatus::Ok
    }

    pub fn message(&self) -> String {
        if self.passed() {
            format!(
                "Electrical diagnostics passed. Grounding OK, insulation {:.1}%.",
                self.insulation
            )
        } else {
            format!(
                "Electrical diagnostics FAILED. Grounding fault, insulation {:.1}%.",
                self.insulation
            )
        }
    }
}

/// At most one check runs at a time.
#[derive(Debug, Clone, Default)]
pub struct ElectricalDiagnostics {
    started_at: Option<f64>,
}

impl ElectricalDiagnostics {
    pub fn is_running(&self) -> bool {
        self.started_at.is_some()
    }

    pub fn begin(&mut self, now: f64) -> bool {
        if self.started_at.is_some() {
            return false;
        }
        self.started_at = Some(now);
        true
    }

    /// Finish the running check. `None` when nothing was running.
    pub fn complete(&mut self, rng: &mut impl Rng) -> Option<DiagnosticsOutcome> {
        self.started_at.take()?;
        let outcome = if rng.gen::<f64>() < PASS_PROBABILITY {
            DiagnosticsOutcome {
                grounding: GroundingStatus::Ok,
                insulation: 99.9 - rng.gen::<f64>() * 0.1,
            }
        } else {
            DiagnosticsOutcome {
                grounding: GroundingStatus::Fault,
                insulation: 85.0 - rng.gen::<f64>() * 5.0,
            }
        };
        if outcome.passed() {
            info!("electrical diagnostics passed");
        } else {
            warn!("electrical diagnostics found a grounding fault");
        }
        Some(outcome)
    }
}
