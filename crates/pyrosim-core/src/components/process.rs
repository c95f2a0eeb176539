//! Reactor process snapshot: every reading the control room displays.

use pyrosim_logic::alarm::Signal;
use serde::{Deserialize, Serialize};

use crate::config::ReactorTuning;

/// Reactor operating mode. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SystemMode {
    Off,
    Heating,
    Stable,
    Cooling,
}

impl SystemMode {
    /// True in the modes where the reactor produces nothing.
    pub fn is_idle(&self) -> bool {
        matches!(self, SystemMode::Off | SystemMode::Heating)
    }
}

/// Operating state of an auxiliary unit (condenser, discharge, cooler, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Equipment {
    Off,
    Standby,
    Active,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Valve {
    Open,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SafetyState {
    Armed,
    Disarmed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GroundingStatus {
    Ok,
    Fault,
}

/// Complete reactor state at one tick.
///
/// Temperatures in °C, pressures in bar, flows in kg/h unless noted, levels in
/// percent of capacity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessSnapshot {
    pub system_mode: SystemMode,
    pub target_temp: f64,

    // Thermal
    pub reactor_temp: f64,
    pub reactor_wall_temp: f64,
    pub reactor_pressure: f64,
    pub pyrometer_core_temp: f64,
    pub thermocouple_core_temp: f64,
    pub insulation_integrity: f64,
    /// kWh per kg of feed.
    pub energy_consumption: f64,

    // Inerting
    /// Nm³/h.
    pub n2_flow: f64,
    pub n2_pressure: f64,
    pub inert_gas_purge: Equipment,

    // Feed
    pub biomass_feeder_on: bool,
    pub feed_rate: f64,
    pub biomass_feeder_rpm: f64,
    pub biomass_hopper_level: f64,

    // Condensation
    pub condenser_state: Equipment,
    pub condensate_flow: f64,
    pub condenser_temp: f64,
    /// kW.
    pub cooling_power: f64,
    pub bio_oil_tank_level: f64,
    pub aqueous_phase_tank_level: f64,

    // Biochar discharge
    pub discharge_system_state: Equipment,
    pub discharge_valve: Valve,
    pub discharge_rate: f64,
    pub biochar_temp: f64,
    pub biochar_temp_cooler: f64,
    pub cooler_state: Equipment,
    /// m³/h.
    pub cooling_water_flow: f64,
    pub biochar_container_level: f64,

    // Catalyst dosing
    pub catalyst_system_state: Equipment,
    pub selected_catalyst: String,
    pub catalyst_dose_target: f64,
    pub catalyst_dose_actual: f64,
    pub catalyst_feeder_rpm: f64,
    pub catalyst_dose_valve: Valve,
    pub catalyst_hopper_level: f64,

    // Gas analysis, vol %
    pub co: f64,
    pub co2: f64,
    pub h2: f64,
    pub ch4: f64,

    // Safety and auxiliaries
    pub safety_system: SafetyState,
    pub ambient_o2: f64,
    pub grounding_status: GroundingStatus,
    pub refrigeration_system_state: Equipment,
    pub refrigeration_pump_state: Equipment,
    pub coolant_temp_in: f64,
    pub coolant_temp_out: f64,
    pub coolant_pressure: f64,
    /// kW.
    pub chiller_power: f64,
}

impl ProcessSnapshot {
    /// Cold, idle reactor with full initial inventory.
    pub fn off_baseline(tuning: &ReactorTuning, target_temp: f64, catalyst: &str) -> Self {
        let ambient = tuning.ambient_temp;
        Self {
            system_mode: SystemMode::Off,
            target_temp,
            reactor_temp: ambient,
            reactor_wall_temp: ambient,
            reactor_pressure: tuning.atmospheric_pressure,
            pyrometer_core_temp: ambient,
            thermocouple_core_temp: ambient,
            insulation_integrity: 99.9,
            energy_consumption: 0.0,
            n2_flow: 0.0,
            n2_pressure: 0.0,
            inert_gas_purge: Equipment::Off,
            biomass_feeder_on: false,
            feed_rate: 0.0,
            biomass_feeder_rpm: 0.0,
            biomass_hopper_level: tuning.initial_biomass_hopper,
            condenser_state: Equipment::Off,
            condensate_flow: 0.0,
            condenser_temp: ambient,
            cooling_power: 0.0,
            bio_oil_tank_level: tuning.initial_bio_oil_tank,
            aqueous_phase_tank_level: tuning.initial_aqueous_tank,
            discharge_system_state: Equipment::Off,
            discharge_valve: Valve::Closed,
            discharge_rate: 0.0,
            biochar_temp: ambient,
            biochar_temp_cooler: ambient,
            cooler_state: Equipment::Off,
            cooling_water_flow: 0.0,
            biochar_container_level: tuning.initial_biochar_container,
            catalyst_system_state: Equipment::Off,
            selected_catalyst: catalyst.to_string(),
            catalyst_dose_target: tuning.catalyst_dose_target,
            catalyst_dose_actual: 0.0,
            catalyst_feeder_rpm: 0.0,
            catalyst_dose_valve: Valve::Closed,
            catalyst_hopper_level: tuning.initial_catalyst_hopper,
            co: 0.0,
            co2: 0.0,
            h2: 0.0,
            ch4: 0.0,
            safety_system: SafetyState::Disarmed,
            ambient_o2: 20.9,
            grounding_status: GroundingStatus::Ok,
            refrigeration_system_state: Equipment::Off,
            refrigeration_pump_state: Equipment::Off,
            coolant_temp_in: ambient,
            coolant_temp_out: ambient,
            coolant_pressure: 0.0,
            chiller_power: 0.0,
        }
    }

    /// Copy physical inventory (hoppers, tanks, container) from `other`.
    pub fn keep_inventory_of(&mut self, other: &ProcessSnapshot) {
        self.biomass_hopper_level = other.biomass_hopper_level;
        self.bio_oil_tank_level = other.bio_oil_tank_level;
        self.aqueous_phase_tank_level = other.aqueous_phase_tank_level;
        self.biochar_container_level = other.biochar_container_level;
        self.catalyst_hopper_level = other.catalyst_hopper_level;
    }

    /// Hopper, tank and container levels, in that order.
    pub fn levels(&self) -> [f64; 5] {
        [
            self.biomass_hopper_level,
            self.bio_oil_tank_level,
            self.aqueous_phase_tank_level,
            self.biochar_container_level,
            self.catalyst_hopper_level,
        ]
    }

    /// Live value of an alarmable signal.
    pub fn signal_value(&self, signal: Signal) -> f64 {
        match signal {
            Signal::ReactorTemp => self.reactor_temp,
            Signal::ReactorPressure => self.reactor_pressure,
            Signal::CondenserTemp => self.condenser_temp,
            Signal::BiomassHopper => self.biomass_hopper_level,
            Signal::BioOilTank => self.bio_oil_tank_level,
        }
    }
}
