//! Recycling line ("Vulcano") state.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::event_log::EventLog;
use crate::config::StreamValues;

/// Processing stages, in line order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Stage {
    Debeader,
    PrimaryShredder,
    RasperMill,
    Granulators,
    MagneticSeparators,
    TextileClassifiers,
}

impl Stage {
    pub const LINE: [Stage; 6] = [
        Stage::Debeader,
        Stage::PrimaryShredder,
        Stage::RasperMill,
        Stage::Granulators,
        Stage::MagneticSeparators,
        Stage::TextileClassifiers,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Stage::Debeader => "debeader",
            Stage::PrimaryShredder => "primary shredder",
            Stage::RasperMill => "rasper mill",
            Stage::Granulators => "granulators",
            Stage::MagneticSeparators => "magnetic separators",
            Stage::TextileClassifiers => "textile classifiers",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StageStatus {
    Off,
    Ok,
    Jammed,
}

/// Whole-line state at one plant tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlantState {
    pub is_running: bool,
    pub input_tons_per_day: f64,
    pub stages: BTreeMap<Stage, StageStatus>,
    pub processing_rate_tires_per_hour: f64,
    /// Percent.
    pub output_purity: StreamValues,
    pub production_rate_kg_per_hour: StreamValues,
    pub silo_levels_kg: StreamValues,
    /// Operator log ("hefestos"), newest first.
    pub log: EventLog,
}

impl PlantState {
    pub fn new(input_tons_per_day: f64, log_capacity: usize) -> Self {
        Self {
            is_running: false,
            input_tons_per_day,
            stages: Stage::LINE.iter().map(|s| (*s, StageStatus::Off)).collect(),
            processing_rate_tires_per_hour: 0.0,
            output_purity: StreamValues::default(),
            production_rate_kg_per_hour: StreamValues::default(),
            silo_levels_kg: StreamValues::default(),
            log: EventLog::new(log_capacity),
        }
    }

    pub fn status(&self, stage: Stage) -> StageStatus {
        self.stages.get(&stage).copied().unwrap_or(StageStatus::Off)
    }

    pub fn any_jammed(&self) -> bool {
        self.stages.values().any(|s| *s == StageStatus::Jammed)
    }

    pub fn all_off(&self) -> bool {
        self.stages.values().all(|s| *s == StageStatus::Off)
    }
}
