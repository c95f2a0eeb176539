//! Fleet overview - the live reactor plus synthetic sister units
//!
//! Unit P-01 is the reactor this engine simulates. The rest are generated
//! once with a random status and then drift slowly while stable.

use log::debug;
use pyrosim_logic::noise::jitter;
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

use crate::components::{unit_id, FleetUnit, ProcessSnapshot, SafetyState, UnitStatus};
use crate::config::FleetTuning;

const BIOMASS_FEEDSTOCK: &str = "Biomass pellets";
const GCR_FEEDSTOCK: &str = "GCR";

/// Stable sister units wander inside these bands.
const TEMP_BAND: (f64, f64) = (460.0, 540.0);
const PRESSURE_BAND: (f64, f64) = (1.01, 1.2);
const FEED_BAND: (f64, f64) = (30.0, 45.0);
const OUTPUT_BAND: (f64, f64) = (18.0, 30.0);

/// Synthetic status draw order, matching [`FleetTuning::status_weights`].
const STATUS_CHOICES: [UnitStatus; 4] = [
    UnitStatus::Stable,
    UnitStatus::Idle,
    UnitStatus::Starting,
    UnitStatus::Alert,
];

#[derive(Debug, Clone, Default)]
pub struct FleetAggregator {
    units: Vec<FleetUnit>,
    tuning: FleetTuning,
}

impl FleetAggregator {
    pub fn new(tuning: FleetTuning) -> Self {
        Self {
            units: Vec::new(),
            tuning,
        }
    }

    pub fn units(&self) -> &[FleetUnit] {
        &self.units
    }

    /// Refresh the overview after a reactor tick. Builds the fleet on the
    /// first call.
    pub fn step(&mut self, reactor: &ProcessSnapshot, rng: &mut impl Rng) {
        if self.units.is_empty() {
            self.populate(reactor, rng);
            return;
        }
        if let Some(own) = self.units.first_mut() {
            mirror(own, reactor);
        }
        for unit in self.units.iter_mut().skip(1) {
            if unit.status == UnitStatus::Stable {
                drift(unit, rng);
            }
        }
    }

    fn populate(&mut self, reactor: &ProcessSnapshot, rng: &mut impl Rng) {
        let picker = WeightedIndex::new(self.tuning.status_weights).ok();
        let count = self.tuning.unit_count.max(1);
        let mut units = Vec::with_capacity(count);
        units.push(own_unit(reactor));
        for index in 2..=count {
            let status = match &picker {
                Some(p) => STATUS_CHOICES[p.sample(rng)],
                None => UnitStatus::Idle,
            };
            let gcr = index >= self.tuning.first_gcr_unit;
            units.push(sister_unit(index, gcr, status, rng));
        }
        self.units = units;
        debug!("fleet populated with {} units", self.units.len());
    }
}

fn own_unit(reactor: &ProcessSnapshot) -> FleetUnit {
    let mut unit = FleetUnit {
        id: unit_id(1),
        status: UnitStatus::Idle,
        feedstock: BIOMASS_FEEDSTOCK.to_string(),
        temperature: 0.0,
        target_temp: 0.0,
        pressure: 0.0,
        feed_rate: 0.0,
        bio_oil_output: 0.0,
        emergency_stop: SafetyState::Armed,
        o2_level: 0.1,
        pellet_purity: 99.5,
        pellet_moisture: 8.5,
        efficiency_factor: 0.95,
    };
    mirror(&mut unit, reactor);
    unit
}

fn mirror(unit: &mut FleetUnit, reactor: &ProcessSnapshot) {
    unit.status = UnitStatus::from(reactor.system_mode);
    unit.temperature = reactor.reactor_temp;
    unit.target_temp = reactor.target_temp;
    unit.pressure = reactor.reactor_pressure;
    unit.feed_rate = reactor.feed_rate;
    unit.bio_oil_output = reactor.condensate_flow;
}

fn sister_unit(index: usize, gcr: bool, status: UnitStatus, rng: &mut impl Rng) -> FleetUnit {
    let running = status == UnitStatus::Stable;
    FleetUnit {
        id: unit_id(index),
        status,
        feedstock: if gcr { GCR_FEEDSTOCK } else { BIOMASS_FEEDSTOCK }.to_string(),
        temperature: if running {
            480.0 + rng.gen::<f64>() * 40.0
        } else {
            25.0 + rng.gen::<f64>() * 10.0
        },
        target_temp: 500.0,
        pressure: if running {
            1.05 + rng.gen::<f64>() * 0.1
        } else {
            1.01
        },
        feed_rate: if running { 35.0 + rng.gen::<f64>() * 5.0 } else { 0.0 },
        bio_oil_output: if running { 22.0 + rng.gen::<f64>() * 4.0 } else { 0.0 },
        emergency_stop: SafetyState::Armed,
        o2_level: 0.15,
        pellet_purity: if gcr { 98.2 } else { 99.6 },
        pellet_moisture: if gcr { 1.5 } else { 8.2 },
        efficiency_factor: 0.93 + rng.gen::<f64>() * 0.04,
    }
}

fn drift(unit: &mut FleetUnit, rng: &mut impl Rng) {
    unit.temperature = (unit.temperature + jitter(2.0, rng)).clamp(TEMP_BAND.0, TEMP_BAND.1);
    unit.pressure = (unit.pressure + jitter(0.01, rng)).clamp(PRESSURE_BAND.0, PRESSURE_BAND.1);
    unit.feed_rate = (unit.feed_rate + jitter(0.5, rng)).clamp(FEED_BAND.0, FEED_BAND.1);
    unit.bio_oil_output =
        (unit.bio_oil_output + jitter(0.3, rng)).clamp(OUTPUT_BAND.0, OUTPUT_BAND.1);
}
