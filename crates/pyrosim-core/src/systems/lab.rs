//! Quality lab - one fixed-latency biochar analysis at a time

use log::{debug, info};
use pyrosim_logic::assay::{assay, classify, AssayTuning, Quality};
use rand::Rng;

use crate::components::{AnalysisJob, AnalysisResult, LabStatus};

#[derive(Debug, Clone)]
pub struct QualityLab {
    status: LabStatus,
    tuning: AssayTuning,
    latency_secs: f64,
}

impl QualityLab {
    pub fn new(tuning: AssayTuning, latency_secs: f64) -> Self {
        Self {
            status: LabStatus::default(),
            tuning,
            latency_secs,
        }
    }

    pub fn status(&self) -> &LabStatus {
        &self.status
    }

    pub fn latency_secs(&self) -> f64 {
        self.latency_secs
    }

    /// Mark a batch as waiting. Refused while one is already waiting or
    /// an analysis is running.
    pub fn offer_batch(&mut self) -> bool {
        if !self.status.accepts_batch() {
            return false;
        }
        self.status.batch_ready = true;
        true
    }

    /// Pull the waiting batch into analysis.
    ///
    /// Returns the started job, or `None` when no batch is waiting.
    pub fn take_sample(&mut self, now: f64) -> Option<AnalysisJob> {
        if !self.status.batch_ready || self.status.is_analyzing() {
            debug!("take_sample ignored: no batch waiting");
            return None;
        }
        self.status.batch_ready = false;
        self.status.samples_taken += 1;
        self.status.result = None;
        let job = AnalysisJob {
            sample_id: format!("GCR-{:06}", self.status.samples_taken),
            started_at: now,
            ready_at: now + self.latency_secs,
        };
        info!("analysing {}", job.sample_id);
        self.status.job = Some(job.clone());
        Some(job)
    }

    /// Finish the job for `sample_id`. Stale ids are ignored.
    ///
    /// `purity` is the current GCR stream purity; zero or negative falls back
    /// to the configured default.
    pub fn complete(
        &mut self,
        sample_id: &str,
        now: f64,
        purity: f64,
        rng: &mut impl Rng,
    ) -> Option<AnalysisResult> {
        match &self.status.job {
            Some(job) if job.sample_id == sample_id => {}
            _ => {
                debug!("stale analysis completion for {}", sample_id);
                return None;
            }
        }
        self.status.job = None;
        let measured = assay(purity, &self.tuning, rng);
        let result = AnalysisResult {
            sample_id: sample_id.to_string(),
            quality: classify(&measured, &self.tuning),
            assay: measured,
            completed_at: now,
        };
        info!("{} graded {}", result.sample_id, quality_label(result.quality));
        self.status.result = Some(result.clone());
        Some(result)
    }
}

pub fn quality_label(quality: Quality) -> &'static str {
    match quality {
        Quality::Premium => "Premium",
        Quality::Standard => "Standard",
    }
}
