//! Tyre recycling line - six stages feeding three storage silos
//!
//! Each plant tick walks the line in order: stages come online, jam at random
//! and recover at random. A new jam cuts throughput for that tick and the
//! three output streams fill their silos up to capacity.

use log::{debug, info};
use pyrosim_logic::noise::{attenuate, fluctuate};
use rand::Rng;
use std::collections::BTreeSet;

use crate::components::{PlantState, Stage, StageStatus};
use crate::config::{PlantTuning, StreamValues};

/// Something the engine may need to react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlantEvent {
    StageOnline(Stage),
    StageJammed(Stage),
    StageRecovered(Stage),
    /// A GCR batch is waiting for the lab.
    BatchReady,
}

#[derive(Debug, Clone)]
pub struct PlantModel {
    state: PlantState,
    tuning: PlantTuning,
    /// Seconds between plant ticks.
    period_secs: f64,
    /// Stages forced to jam on the next tick.
    pending_jams: BTreeSet<Stage>,
}

impl PlantModel {
    pub fn new(tuning: PlantTuning, input_tons_per_day: f64, period_secs: f64) -> Self {
        Self {
            state: PlantState::new(input_tons_per_day, tuning.log_capacity),
            tuning,
            period_secs,
            pending_jams: BTreeSet::new(),
        }
    }

    pub fn state(&self) -> &PlantState {
        &self.state
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running
    }

    pub fn log(&mut self, now: f64, message: impl Into<String>) {
        self.state.log.push(now, message);
    }

    /// Start or stop the line. Returns false when nothing changed.
    pub fn set_running(&mut self, running: bool, now: f64) -> bool {
        if running == self.state.is_running {
            return false;
        }
        if running {
            self.state.is_running = true;
            self.state.log.push(now, "Plant start sequence initiated.");
            info!("recycling line starting at {} t/day", self.state.input_tons_per_day);
        } else {
            self.state.is_running = false;
            self.shutdown();
            self.state.log.push(now, "Plant stopped. All stages offline.");
            info!("recycling line stopped");
        }
        true
    }

    pub fn set_input_tons(&mut self, tons_per_day: f64) -> bool {
        if !tons_per_day.is_finite() || tons_per_day < 0.0 {
            return false;
        }
        self.state.input_tons_per_day = tons_per_day;
        true
    }

    /// Force `stage` to jam on the next tick. Ignored while stopped.
    pub fn inject_jam(&mut self, stage: Stage) -> bool {
        if !self.state.is_running {
            return false;
        }
        self.pending_jams.insert(stage);
        true
    }

    /// Advance one plant tick.
    ///
    /// `lab_accepts_batch` gates the batch trigger so a new batch is only
    /// offered while the lab is idle.
    pub fn step(&mut self, now: f64, lab_accepts_batch: bool, rng: &mut impl Rng) -> Vec<PlantEvent> {
        if !self.state.is_running {
            if !self.state.all_off() || self.state.processing_rate_tires_per_hour != 0.0 {
                self.shutdown();
            }
            return Vec::new();
        }

        let mut events = Vec::new();
        let mut jam_occurred = false;
        for stage in Stage::LINE {
            let forced = self.pending_jams.remove(&stage);
            let mut current = self.state.status(stage);
            if current == StageStatus::Off {
                current = StageStatus::Ok;
                self.state.stages.insert(stage, current);
                self.state.log.push(now, format!("{} online.", capitalize(stage.label())));
                events.push(PlantEvent::StageOnline(stage));
            }
            match current {
                StageStatus::Ok if forced || rng.gen::<f64>() < self.tuning.jam_probability => {
                    self.state.stages.insert(stage, StageStatus::Jammed);
                    self.state
                        .log
                        .push(now, format!("Alert: {} jammed.", capitalize(stage.label())));
                    debug!("{} jammed", stage.label());
                    events.push(PlantEvent::StageJammed(stage));
                    jam_occurred = true;
                }
                StageStatus::Jammed
                    if !forced && rng.gen::<f64>() < self.tuning.recovery_probability =>
                {
                    self.state.stages.insert(stage, StageStatus::Ok);
                    self.state
                        .log
                        .push(now, format!("{} cleared and running.", capitalize(stage.label())));
                    events.push(PlantEvent::StageRecovered(stage));
                }
                _ => {}
            }
        }

        self.update_throughput(jam_occurred, rng);

        if self.batch_triggered(lab_accepts_batch, rng) {
            self.state.log.push(now, "New GCR batch ready for quality analysis.");
            debug!("GCR batch ready at {:.0} kg", self.state.silo_levels_kg.gcr);
            events.push(PlantEvent::BatchReady);
        }
        events
    }

    /// A new jam cuts the prior rate; any other tick runs at nominal, even
    /// with a stage still jammed.
    fn update_throughput(&mut self, jam_occurred: bool, rng: &mut impl Rng) {
        let t = &self.tuning;
        let s = &mut self.state;

        s.processing_rate_tires_per_hour = if jam_occurred {
            s.processing_rate_tires_per_hour * t.jam_penalty
        } else {
            s.input_tons_per_day / 24.0 * 1000.0 / t.kg_per_tire
        };

        let mass = s.processing_rate_tires_per_hour * t.kg_per_tire;
        let spread = t.rate_noise;
        s.production_rate_kg_per_hour = t.stream_split.map(|share| attenuate(mass * share, spread, rng));

        let ticks_per_hour = 3600.0 / self.period_secs;
        let production = s.production_rate_kg_per_hour;
        let capacity = t.silo_capacity_kg;
        s.silo_levels_kg = StreamValues::new(
            (s.silo_levels_kg.gcr + production.gcr / ticks_per_hour).clamp(0.0, capacity.gcr),
            (s.silo_levels_kg.steel + production.steel / ticks_per_hour).clamp(0.0, capacity.steel),
            (s.silo_levels_kg.fiber + production.fiber / ticks_per_hour).clamp(0.0, capacity.fiber),
        );

        let noise = t.purity_noise;
        s.output_purity = t.nominal_purity.map(|p| fluctuate(p, noise, rng).clamp(0.0, 100.0));
    }

    fn batch_triggered(&self, lab_accepts_batch: bool, rng: &mut impl Rng) -> bool {
        let gcr = self.state.silo_levels_kg.gcr;
        lab_accepts_batch
            && gcr >= self.tuning.min_batch_kg
            && gcr < self.tuning.silo_capacity_kg.gcr
            && rng.gen::<f64>() < self.tuning.batch_probability
    }

    fn shutdown(&mut self) {
        for status in self.state.stages.values_mut() {
            *status = StageStatus::Off;
        }
        self.state.processing_rate_tires_per_hour = 0.0;
        self.state.production_rate_kg_per_hour = StreamValues::default();
        self.state.output_purity = StreamValues::default();
        self.pending_jams.clear();
    }
}

fn capitalize(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
