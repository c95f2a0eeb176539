//! Quality lab ("Gaia Lab") records.

use pyrosim_logic::assay::{AssayResult, Quality};
use serde::{Deserialize, Serialize};

/// An analysis in flight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisJob {
    pub sample_id: String,
    pub started_at: f64,
    pub ready_at: f64,
}

/// A completed analysis. Kept until the next sample is taken.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub sample_id: String,
    pub assay: AssayResult,
    pub quality: Quality,
    pub completed_at: f64,
}

/// What the lab view shows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabStatus {
    pub batch_ready: bool,
    pub job: Option<AnalysisJob>,
    pub result: Option<AnalysisResult>,
    pub samples_taken: u32,
}

impl LabStatus {
    pub fn is_analyzing(&self) -> bool {
        self.job.is_some()
    }

    /// A new batch can be offered when none waits and none is being analysed.
    pub fn accepts_batch(&self) -> bool {
        !self.batch_ready && self.job.is_none()
    }
}
