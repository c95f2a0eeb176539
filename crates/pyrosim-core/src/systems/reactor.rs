//! Reactor thermal model - the OFF → HEATING → STABLE → COOLING cycle
//!
//! Heating is a first-order lag toward the setpoint with additive noise.
//! Stable operation holds every reading around a nominal value scaled by the
//! setpoint. Cooling sheds a few degrees per tick and lets production tail
//! off geometrically. No transition can fail; every derived value is clamped.

use log::{debug, info};
use pyrosim_logic::noise::{fluctuate, uniform};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::components::{
    Equipment, EventLog, GroundingStatus, ProcessSnapshot, SafetyState, SystemMode, Valve,
};
use crate::config::ReactorTuning;

/// Highest setpoint the operator may request.
pub const MAX_SETPOINT: f64 = 1000.0;

/// Reactor event log length.
pub const EVENT_LOG_CAPACITY: usize = 100;

/// Production values below this are reported as zero while tailing off.
const TAIL_EPSILON: f64 = 1e-3;

/// Ticks spent in each active mode during the current cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleCounters {
    pub heating_ticks: u64,
    pub stable_ticks: u64,
    pub cooling_ticks: u64,
}

impl CycleCounters {
    pub fn total(&self) -> u64 {
        self.heating_ticks + self.stable_ticks + self.cooling_ticks
    }
}

/// Owns the reactor snapshot and its event log.
#[derive(Debug, Clone)]
pub struct ReactorModel {
    snapshot: ProcessSnapshot,
    /// Operator setpoint. Survives the cool-down override.
    setpoint: f64,
    counters: CycleCounters,
    events: EventLog,
    tuning: ReactorTuning,
    /// Simulated seconds per tick.
    tick_secs: f64,
}

impl ReactorModel {
    pub fn new(tuning: ReactorTuning, setpoint: f64, catalyst: &str, tick_secs: f64) -> Self {
        Self {
            snapshot: ProcessSnapshot::off_baseline(&tuning, setpoint, catalyst),
            setpoint,
            counters: CycleCounters::default(),
            events: EventLog::new(EVENT_LOG_CAPACITY),
            tuning,
            tick_secs,
        }
    }

    pub fn snapshot(&self) -> &ProcessSnapshot {
        &self.snapshot
    }

    pub fn mode(&self) -> SystemMode {
        self.snapshot.system_mode
    }

    pub fn counters(&self) -> CycleCounters {
        self.counters
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn setpoint(&self) -> f64 {
        self.setpoint
    }

    pub fn log(&mut self, now: f64, message: impl Into<String>) {
        self.events.push(now, message);
    }

    /// OFF → HEATING. Ignored in any other mode.
    pub fn start(&mut self, now: f64) -> bool {
        if self.snapshot.system_mode != SystemMode::Off {
            debug!("start ignored in {:?}", self.snapshot.system_mode);
            return false;
        }
        self.snapshot.system_mode = SystemMode::Heating;
        self.snapshot.target_temp = self.setpoint;
        self.events.push(now, "Heating protocol started.");
        info!("reactor heating toward {:.0} °C", self.setpoint);
        true
    }

    /// HEATING or STABLE → COOLING, forcing the cool-down setpoint.
    pub fn stop(&mut self, now: f64) -> bool {
        match self.snapshot.system_mode {
            SystemMode::Heating | SystemMode::Stable => {
                self.snapshot.system_mode = SystemMode::Cooling;
                self.snapshot.target_temp = self.tuning.cooldown_setpoint;
                self.events.push(now, "Cooling protocol started.");
                info!("reactor cooling from {:.1} °C", self.snapshot.reactor_temp);
                true
            }
            mode => {
                debug!("stop ignored in {:?}", mode);
                false
            }
        }
    }

    /// Change the operator setpoint. Takes effect at once unless cooling.
    pub fn set_target_temp(&mut self, target: f64) -> bool {
        if !target.is_finite() || target <= self.tuning.ambient_temp || target > MAX_SETPOINT {
            debug!("setpoint {} rejected", target);
            return false;
        }
        self.setpoint = target;
        if self.snapshot.system_mode != SystemMode::Cooling {
            self.snapshot.target_temp = target;
        }
        true
    }

    pub fn set_catalyst(&mut self, catalyst: &str) {
        self.snapshot.selected_catalyst = catalyst.to_string();
    }

    /// Record the outcome of an electrical safety check.
    pub fn apply_grounding(&mut self, status: GroundingStatus, insulation: f64) {
        self.snapshot.grounding_status = status;
        self.snapshot.insulation_integrity = insulation.clamp(0.0, 100.0);
    }

    /// Advance one tick. Returns the mode entered, if any.
    pub fn step(&mut self, now: f64, rng: &mut impl Rng) -> Option<SystemMode> {
        match self.snapshot.system_mode {
            SystemMode::Heating => {
                self.counters.heating_ticks += 1;
                self.heat(rng);
                if self.snapshot.reactor_temp >= self.snapshot.target_temp {
                    self.snapshot.system_mode = SystemMode::Stable;
                    self.events
                        .push(now, "Reactor reached target temperature. System stable.");
                    info!(
                        "reactor stable at {:.0} °C after {} ticks",
                        self.snapshot.target_temp, self.counters.heating_ticks
                    );
                    return Some(SystemMode::Stable);
                }
                None
            }
            SystemMode::Stable => {
                self.counters.stable_ticks += 1;
                self.hold(rng);
                None
            }
            SystemMode::Cooling => {
                self.counters.cooling_ticks += 1;
                self.cool(rng);
                if self.snapshot.reactor_temp <= self.tuning.off_temp {
                    self.enter_off();
                    self.events.push(now, "Reactor fully cooled and shut down.");
                    info!("reactor off after {} cycle ticks", self.counters.total());
                    return Some(SystemMode::Off);
                }
                None
            }
            SystemMode::Off => {
                if self.counters.total() > 0 {
                    self.counters = CycleCounters::default();
                }
                None
            }
        }
    }

    fn heat(&mut self, rng: &mut impl Rng) {
        let t = &self.tuning;
        let s = &mut self.snapshot;

        let increase = (s.target_temp - s.reactor_temp) * t.heating_rate
            + uniform(0.0, t.heating_noise, rng);
        s.reactor_temp = (s.reactor_temp + increase).min(s.target_temp);
        let ratio = if s.target_temp > 0.0 {
            (s.reactor_temp / s.target_temp).clamp(0.0, 1.0)
        } else {
            0.0
        };

        s.reactor_wall_temp = fluctuate(s.reactor_temp * 0.95, t.small_noise, rng);
        s.reactor_pressure = t.atmospheric_pressure + ratio * 0.09;
        s.pyrometer_core_temp = fluctuate(s.reactor_temp * 1.02, t.small_noise, rng);
        s.thermocouple_core_temp = fluctuate(s.reactor_temp * 0.98, t.small_noise, rng);
        s.insulation_integrity = 99.9 - rng.gen::<f64>() * 0.2;
        s.energy_consumption = fluctuate(8.5, t.small_noise, rng);
        s.n2_flow = fluctuate(t.nominal_n2, t.small_noise, rng);
        s.n2_pressure = fluctuate(t.nominal_n2, t.small_noise, rng);

        s.safety_system = SafetyState::Armed;
        s.inert_gas_purge = Equipment::Active;
        s.condenser_state = Equipment::Standby;
        s.discharge_system_state = Equipment::Standby;
        s.catalyst_system_state = Equipment::Standby;
        s.refrigeration_system_state = Equipment::Active;
        s.refrigeration_pump_state = Equipment::Active;
        s.chiller_power = fluctuate(5.0, t.small_noise, rng);

        // Nothing is produced before steady state
        s.biomass_feeder_on = false;
        s.feed_rate = 0.0;
        s.biomass_feeder_rpm = 0.0;
        s.condensate_flow = 0.0;
        s.cooling_power = 0.0;
        s.discharge_rate = 0.0;
        s.catalyst_dose_actual = 0.0;
        s.catalyst_feeder_rpm = 0.0;
        s.co = 0.0;
        s.co2 = 0.0;
        s.h2 = 0.0;
        s.ch4 = 0.0;
    }

    fn hold(&mut self, rng: &mut impl Rng) {
        let t = &self.tuning;
        let dt = self.tick_secs;
        let s = &mut self.snapshot;
        let target = s.target_temp;

        s.reactor_temp = fluctuate(target, t.tight_noise, rng);
        s.reactor_wall_temp = fluctuate(target - 15.0, t.small_noise, rng);
        s.reactor_pressure = fluctuate(1.1, 0.02, rng).max(t.atmospheric_pressure);
        s.pyrometer_core_temp = fluctuate(target + 25.0, t.small_noise, rng);
        s.thermocouple_core_temp = fluctuate(target, t.tight_noise, rng);
        s.insulation_integrity = 99.8 - rng.gen::<f64>() * 0.1;
        s.energy_consumption = fluctuate(7.49, t.small_noise, rng);
        s.n2_flow = fluctuate(t.nominal_n2, t.small_noise, rng);
        s.n2_pressure = fluctuate(t.nominal_n2, t.small_noise, rng);

        // Feed
        s.biomass_feeder_on = true;
        s.feed_rate = fluctuate(t.nominal_feed_rate, t.medium_noise, rng);
        s.biomass_feeder_rpm = fluctuate(s.feed_rate * t.feeder_rpm_per_kg, t.small_noise, rng);
        s.biomass_hopper_level = drain(s.biomass_hopper_level, s.feed_rate, 0.1, dt);

        // Condensation
        s.condenser_state = Equipment::Active;
        s.condensate_flow = fluctuate(s.feed_rate * t.liquid_yield, t.small_noise, rng);
        s.condenser_temp = fluctuate(15.0, t.small_noise, rng);
        s.cooling_power = fluctuate(s.condensate_flow * 0.22, t.small_noise, rng);
        s.bio_oil_tank_level = fill(s.bio_oil_tank_level, s.condensate_flow, 0.15, dt);
        s.aqueous_phase_tank_level = fill(s.aqueous_phase_tank_level, s.condensate_flow, 0.05, dt);

        // Biochar discharge
        s.discharge_system_state = Equipment::Active;
        s.discharge_valve = Valve::Open;
        s.discharge_rate = fluctuate(s.feed_rate * t.solid_yield, t.medium_noise, rng);
        s.biochar_container_level = fill(s.biochar_container_level, s.discharge_rate, 0.1, dt);
        s.biochar_temp = fluctuate(s.reactor_temp - 50.0, t.small_noise, rng);
        s.biochar_temp_cooler = fluctuate(45.0, t.small_noise, rng);
        s.cooler_state = Equipment::Active;
        s.cooling_water_flow = fluctuate(8.5, t.small_noise, rng);

        // Catalyst dosing
        s.catalyst_system_state = Equipment::Active;
        s.catalyst_dose_valve = Valve::Open;
        s.catalyst_dose_actual = fluctuate(s.catalyst_dose_target, t.small_noise, rng);
        s.catalyst_feeder_rpm = fluctuate(s.catalyst_dose_actual * 15.0, t.small_noise, rng);
        s.catalyst_hopper_level = (s.catalyst_hopper_level
            - s.catalyst_dose_actual / 60.0 * 0.01 * dt)
            .clamp(0.0, 100.0);

        // Gas analysis
        s.co = fluctuate(t.nominal_co, t.gas_noise, rng);
        s.co2 = fluctuate(t.nominal_co2, t.gas_noise, rng);
        s.h2 = fluctuate(t.nominal_h2, t.gas_noise, rng);
        s.ch4 = fluctuate(t.nominal_ch4, t.gas_noise, rng);

        // Safety and auxiliaries
        s.safety_system = SafetyState::Armed;
        s.inert_gas_purge = Equipment::Active;
        s.ambient_o2 = fluctuate(20.9, 0.001, rng);
        s.refrigeration_system_state = Equipment::Active;
        s.refrigeration_pump_state = Equipment::Active;
        s.chiller_power = fluctuate(12.0, t.small_noise, rng);
        s.coolant_temp_in = fluctuate(5.0, t.small_noise, rng);
        s.coolant_temp_out = fluctuate(15.0, t.small_noise, rng);
        s.coolant_pressure = fluctuate(4.5, t.small_noise, rng);
    }

    fn cool(&mut self, rng: &mut impl Rng) {
        let t = &self.tuning;
        let dt = self.tick_secs;
        let s = &mut self.snapshot;

        let decrease = uniform(t.cooling_step_min, t.cooling_step_max, rng);
        s.reactor_temp = (s.reactor_temp - decrease).max(t.ambient_temp);
        s.reactor_wall_temp = fluctuate(s.reactor_temp * 1.05, t.small_noise, rng);
        s.reactor_pressure = (s.reactor_pressure - 0.005).max(t.atmospheric_pressure);
        s.pyrometer_core_temp = fluctuate(s.reactor_temp * 1.1, t.small_noise, rng);
        s.thermocouple_core_temp = fluctuate(s.reactor_temp * 1.02, t.small_noise, rng);
        s.biochar_temp = (s.biochar_temp - 10.0).max(t.ambient_temp);
        s.energy_consumption = fluctuate(0.5, t.small_noise, rng);

        // Residual flows tail off instead of stopping dead
        let k = t.cooling_decay;
        s.biomass_feeder_on = false;
        s.feed_rate = tail(s.feed_rate, k);
        s.biomass_feeder_rpm = tail(s.biomass_feeder_rpm, k);
        s.condensate_flow = tail(s.condensate_flow, k);
        s.cooling_power = tail(s.cooling_power, k);
        s.discharge_rate = tail(s.discharge_rate, k);
        s.catalyst_dose_actual = tail(s.catalyst_dose_actual, k);
        s.catalyst_feeder_rpm = tail(s.catalyst_feeder_rpm, k);
        s.co = tail(s.co, k);
        s.co2 = tail(s.co2, k);
        s.h2 = tail(s.h2, k);
        s.ch4 = tail(s.ch4, k);

        s.biomass_hopper_level = drain(s.biomass_hopper_level, s.feed_rate, 0.1, dt);
        s.bio_oil_tank_level = fill(s.bio_oil_tank_level, s.condensate_flow, 0.15, dt);
        s.aqueous_phase_tank_level = fill(s.aqueous_phase_tank_level, s.condensate_flow, 0.05, dt);
        s.biochar_container_level = fill(s.biochar_container_level, s.discharge_rate, 0.1, dt);

        if s.reactor_temp < t.standby_temp {
            s.condenser_state = Equipment::Standby;
            s.discharge_system_state = Equipment::Standby;
            s.discharge_valve = Valve::Closed;
            s.catalyst_system_state = Equipment::Standby;
            s.catalyst_dose_valve = Valve::Closed;
            s.cooler_state = Equipment::Off;
            s.cooling_water_flow = 0.0;
            s.inert_gas_purge = Equipment::Standby;
            s.safety_system = SafetyState::Disarmed;
        }
    }

    /// Reset process variables to baseline, keeping physical inventory.
    fn enter_off(&mut self) {
        let mut fresh = ProcessSnapshot::off_baseline(
            &self.tuning,
            self.setpoint,
            &self.snapshot.selected_catalyst,
        );
        fresh.keep_inventory_of(&self.snapshot);
        self.snapshot = fresh;
    }
}

fn tail(value: f64, decay: f64) -> f64 {
    let next = (value * decay).max(0.0);
    if next < TAIL_EPSILON {
        0.0
    } else {
        next
    }
}

/// Level after `rate` kg/h drains it for `dt` seconds.
fn drain(level: f64, rate: f64, gain: f64, dt: f64) -> f64 {
    (level - rate / 3600.0 * gain * dt).clamp(0.0, 100.0)
}

fn fill(level: f64, rate: f64, gain: f64, dt: f64) -> f64 {
    (level + rate / 3600.0 * gain * dt).clamp(0.0, 100.0)
}
