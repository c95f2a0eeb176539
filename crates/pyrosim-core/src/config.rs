//! Engine configuration.
//!
//! Every noise envelope and process constant lives here rather than in the
//! models, so the simulator's feel can be tuned without touching code.
//! Sections default independently; a JSON file only needs the keys it
//! overrides.

use pyrosim_logic::alarm::{default_alarm_configs, AlarmConfig, Signal};
use pyrosim_logic::assay::AssayTuning;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::systems::MAX_SETPOINT;

/// Errors raised while loading or validating an [`EngineConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Top-level simulator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// RNG seed. `None` seeds from entropy.
    pub seed: Option<u64>,
    /// Reactor setpoint in °C.
    pub target_temp: f64,
    /// Recycling line feed, tonnes of tyres per day.
    pub input_tons_per_day: f64,
    /// Feedstock selection. Label only.
    pub feedstock_id: u32,
    /// Catalyst selection. Label only.
    pub catalyst_id: String,
    pub schedule: ScheduleConfig,
    pub history: HistoryConfig,
    pub reactor: ReactorTuning,
    pub plant: PlantTuning,
    pub lab: AssayTuning,
    pub fleet: FleetTuning,
    pub alarms: BTreeMap<Signal, AlarmConfig>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed: None,
            target_temp: 500.0,
            input_tons_per_day: 50.0,
            feedstock_id: 1,
            catalyst_id: "zeolite-zsm5".to_string(),
            schedule: ScheduleConfig::default(),
            history: HistoryConfig::default(),
            reactor: ReactorTuning::default(),
            plant: PlantTuning::default(),
            lab: AssayTuning::default(),
            fleet: FleetTuning::default(),
            alarms: default_alarm_configs(),
        }
    }
}

impl EngineConfig {
    /// Default configuration with a fixed seed.
    pub fn seeded(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Default::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Reject values the models cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("schedule.reactor_period_secs", self.schedule.reactor_period_secs)?;
        positive("schedule.plant_period_secs", self.schedule.plant_period_secs)?;
        non_negative("schedule.lab_latency_secs", self.schedule.lab_latency_secs)?;
        non_negative(
            "schedule.diagnostics_latency_secs",
            self.schedule.diagnostics_latency_secs,
        )?;

        if self.history.recent_capacity == 0 {
            return Err(invalid("history.recent_capacity", "must be at least 1"));
        }
        if self.history.minute_capacity == 0 {
            return Err(invalid("history.minute_capacity", "must be at least 1"));
        }
        if self.history.minute_every_ticks == 0 {
            return Err(invalid("history.minute_every_ticks", "must be at least 1"));
        }

        let setpoint_ok =
            self.target_temp > self.reactor.ambient_temp && self.target_temp <= MAX_SETPOINT;
        if !setpoint_ok {
            return Err(invalid(
                "target_temp",
                &format!("must be above ambient and at most {} °C", MAX_SETPOINT),
            ));
        }
        non_negative("input_tons_per_day", self.input_tons_per_day)?;

        let r = &self.reactor;
        let thresholds_ordered = r.ambient_temp < r.off_temp && r.off_temp < r.standby_temp;
        if !thresholds_ordered {
            return Err(invalid(
                "reactor.off_temp",
                "must lie between ambient_temp and standby_temp",
            ));
        }
        positive("reactor.cooling_step_min", r.cooling_step_min)?;
        if r.cooling_step_max < r.cooling_step_min {
            return Err(invalid("reactor.cooling_step_max", "must not be below cooling_step_min"));
        }
        non_negative("reactor.heating_noise", r.heating_noise)?;
        probability("reactor.tight_noise", r.tight_noise)?;
        probability("reactor.small_noise", r.small_noise)?;
        probability("reactor.medium_noise", r.medium_noise)?;
        probability("reactor.gas_noise", r.gas_noise)?;

        probability("plant.jam_probability", self.plant.jam_probability)?;
        probability("plant.recovery_probability", self.plant.recovery_probability)?;
        probability("plant.jam_penalty", self.plant.jam_penalty)?;
        probability("plant.batch_probability", self.plant.batch_probability)?;
        positive("plant.silo_capacity_kg.gcr", self.plant.silo_capacity_kg.gcr)?;
        positive("plant.silo_capacity_kg.steel", self.plant.silo_capacity_kg.steel)?;
        positive("plant.silo_capacity_kg.fiber", self.plant.silo_capacity_kg.fiber)?;
        positive("plant.kg_per_tire", self.plant.kg_per_tire)?;
        probability("plant.stream_split.gcr", self.plant.stream_split.gcr)?;
        probability("plant.stream_split.steel", self.plant.stream_split.steel)?;
        probability("plant.stream_split.fiber", self.plant.stream_split.fiber)?;
        probability("plant.rate_noise", self.plant.rate_noise)?;
        probability("plant.purity_noise", self.plant.purity_noise)?;
        non_negative("plant.min_batch_kg", self.plant.min_batch_kg)?;
        probability("reactor.cooling_decay", self.reactor.cooling_decay)?;
        probability("reactor.heating_rate", self.reactor.heating_rate)?;

        if self.fleet.unit_count == 0 {
            return Err(invalid("fleet.unit_count", "must be at least 1"));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.to_string(),
    }
}

fn positive(field: &'static str, v: f64) -> Result<(), ConfigError> {
    if v.is_finite() && v > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, &format!("expected > 0, got {}", v)))
    }
}

fn non_negative(field: &'static str, v: f64) -> Result<(), ConfigError> {
    if v.is_finite() && v >= 0.0 {
        Ok(())
    } else {
        Err(invalid(field, &format!("expected >= 0, got {}", v)))
    }
}

fn probability(field: &'static str, v: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&v) {
        Ok(())
    } else {
        Err(invalid(field, &format!("expected within [0, 1], got {}", v)))
    }
}

/// Cadences of the periodic drivers and latencies of deferred jobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub reactor_period_secs: f64,
    pub plant_period_secs: f64,
    pub lab_latency_secs: f64,
    pub diagnostics_latency_secs: f64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            reactor_period_secs: 1.0,
            plant_period_secs: 2.0,
            lab_latency_secs: 5.0,
            diagnostics_latency_secs: 3.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// One sample per reactor tick (600 ≈ 10 minutes at 1 Hz).
    pub recent_capacity: usize,
    pub minute_capacity: usize,
    /// Cycle ticks between per-minute snapshots.
    pub minute_every_ticks: u64,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            recent_capacity: 600,
            minute_capacity: 100,
            minute_every_ticks: 60,
        }
    }
}

/// Reactor process constants and noise envelopes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReactorTuning {
    pub ambient_temp: f64,
    /// Fraction of the remaining gap closed per heating tick.
    pub heating_rate: f64,
    /// Upper bound of the additive heating noise (lower bound is 0).
    pub heating_noise: f64,
    pub cooling_step_min: f64,
    pub cooling_step_max: f64,
    /// Geometric tail-off of production values while cooling.
    pub cooling_decay: f64,
    /// Below this, secondary systems latch to standby.
    pub standby_temp: f64,
    /// At or below this, the reactor is off.
    pub off_temp: f64,
    /// Setpoint forced on stop.
    pub cooldown_setpoint: f64,
    pub atmospheric_pressure: f64,

    pub tight_noise: f64,
    pub small_noise: f64,
    pub medium_noise: f64,
    pub gas_noise: f64,

    pub nominal_feed_rate: f64,
    pub feeder_rpm_per_kg: f64,
    pub liquid_yield: f64,
    pub solid_yield: f64,
    pub nominal_n2: f64,
    pub nominal_co: f64,
    pub nominal_co2: f64,
    pub nominal_h2: f64,
    pub nominal_ch4: f64,
    pub catalyst_dose_target: f64,

    /// Initial inventory levels, percent.
    pub initial_biomass_hopper: f64,
    pub initial_bio_oil_tank: f64,
    pub initial_aqueous_tank: f64,
    pub initial_biochar_container: f64,
    pub initial_catalyst_hopper: f64,
}

impl Default for ReactorTuning {
    fn default() -> Self {
        Self {
            ambient_temp: 25.0,
            heating_rate: 0.05,
            heating_noise: 2.0,
            cooling_step_min: 3.0,
            cooling_step_max: 8.0,
            cooling_decay: 0.9,
            standby_temp: 100.0,
            off_temp: 25.5,
            cooldown_setpoint: 100.0,
            atmospheric_pressure: 1.01,
            tight_noise: 0.005,
            small_noise: 0.01,
            medium_noise: 0.05,
            gas_noise: 0.1,
            nominal_feed_rate: 37.5,
            feeder_rpm_per_kg: 6.66,
            liquid_yield: 0.65,
            solid_yield: 0.20,
            nominal_n2: 5.5,
            nominal_co: 2.3,
            nominal_co2: 1.1,
            nominal_h2: 1.4,
            nominal_ch4: 0.9,
            catalyst_dose_target: 2.5,
            initial_biomass_hopper: 85.0,
            initial_bio_oil_tank: 20.0,
            initial_aqueous_tank: 15.0,
            initial_biochar_container: 10.0,
            initial_catalyst_hopper: 90.0,
        }
    }
}

/// Per-stream triple used for silo capacities, purities and splits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamValues {
    pub gcr: f64,
    pub steel: f64,
    pub fiber: f64,
}

impl StreamValues {
    pub const fn new(gcr: f64, steel: f64, fiber: f64) -> Self {
        Self { gcr, steel, fiber }
    }

    pub fn map(&self, mut f: impl FnMut(f64) -> f64) -> Self {
        Self {
            gcr: f(self.gcr),
            steel: f(self.steel),
            fiber: f(self.fiber),
        }
    }
}

/// Recycling line constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlantTuning {
    pub jam_probability: f64,
    pub recovery_probability: f64,
    /// Fraction of prior throughput kept while any stage is jammed.
    pub jam_penalty: f64,
    pub kg_per_tire: f64,
    /// Fraction of processed mass going to each stream.
    pub stream_split: StreamValues,
    /// One-sided spread of the production-rate noise.
    pub rate_noise: f64,
    pub silo_capacity_kg: StreamValues,
    pub nominal_purity: StreamValues,
    pub purity_noise: f64,
    pub batch_probability: f64,
    /// GCR the silo must hold before a batch can be offered to the lab.
    pub min_batch_kg: f64,
    pub log_capacity: usize,
}

impl Default for PlantTuning {
    fn default() -> Self {
        Self {
            jam_probability: 0.02,
            recovery_probability: 0.3,
            jam_penalty: 0.2,
            kg_per_tire: 10.0,
            stream_split: StreamValues::new(0.60, 0.25, 0.10),
            rate_noise: 0.1,
            silo_capacity_kg: StreamValues::new(20_000.0, 10_000.0, 5_000.0),
            nominal_purity: StreamValues::new(98.5, 97.0, 92.0),
            purity_noise: 0.005,
            batch_probability: 0.2,
            min_batch_kg: 1.0,
            log_capacity: 50,
        }
    }
}

/// Fleet overview constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FleetTuning {
    pub unit_count: usize,
    /// Units with an index at or above this run on rubber granulate.
    pub first_gcr_unit: usize,
    /// Relative weights of stable / idle / starting / alert for synthetic units.
    pub status_weights: [u32; 4],
}

impl Default for FleetTuning {
    fn default() -> Self {
        Self {
            unit_count: 9,
            first_gcr_unit: 6,
            status_weights: [4, 2, 1, 1],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = EngineConfig::from_json_str(
            r#"{ "seed": 42, "plant": { "jam_probability": 0.1 } }"#,
        )
        .unwrap();
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.plant.jam_probability, 0.1);
        assert_eq!(config.plant.recovery_probability, 0.3);
        assert_eq!(config.schedule.plant_period_secs, 2.0);
        assert_eq!(config.alarms.len(), 5);
    }

    #[test]
    fn test_alarm_keys_use_signal_names() {
        let config = EngineConfig::from_json_str(
            r#"{ "alarms": { "reactorTemp": {
                "enabled": false, "medium": 1.0, "high": 2.0, "critical": 3.0,
                "medium_sound": "beepShort", "high_sound": "beepShort",
                "critical_sound": "voiceAlert" } } }"#,
        )
        .unwrap();
        assert_eq!(config.alarms.len(), 1);
        assert!(!config.alarms[&Signal::ReactorTemp].enabled);
    }

    #[test]
    fn test_rejects_bad_probability() {
        let err = EngineConfig::from_json_str(r#"{ "plant": { "jam_probability": 1.5 } }"#)
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid { field: "plant.jam_probability", .. }
        ));
    }

    #[test]
    fn test_rejects_zero_period() {
        let mut config = EngineConfig::default();
        config.schedule.reactor_period_secs = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_setpoint_below_ambient() {
        let mut config = EngineConfig::default();
        config.target_temp = 20.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_setpoint_above_reactor_limit() {
        let mut config = EngineConfig::default();
        config.target_temp = MAX_SETPOINT + 1.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "target_temp", .. })
        ));
        config.target_temp = MAX_SETPOINT;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_plant_constants_that_break_silos() {
        let mut config = EngineConfig::default();
        config.plant.rate_noise = 3.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "plant.rate_noise", .. })
        ));

        let mut config = EngineConfig::default();
        config.plant.kg_per_tire = 0.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "plant.kg_per_tire", .. })
        ));

        let mut config = EngineConfig::default();
        config.plant.stream_split.steel = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_off_threshold_below_ambient() {
        let mut config = EngineConfig::default();
        config.reactor.off_temp = 20.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "reactor.off_temp", .. })
        ));

        let mut config = EngineConfig::default();
        config.reactor.cooling_step_min = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_json() {
        let err = EngineConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = EngineConfig::from_path("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
