//! Reactor fleet overview records.

use serde::{Deserialize, Serialize};

use super::process::{SafetyState, SystemMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitStatus {
    Idle,
    Starting,
    Stable,
    Cooling,
    Alert,
}

impl From<SystemMode> for UnitStatus {
    fn from(mode: SystemMode) -> Self {
        match mode {
            SystemMode::Off => UnitStatus::Idle,
            SystemMode::Heating => UnitStatus::Starting,
            SystemMode::Stable => UnitStatus::Stable,
            SystemMode::Cooling => UnitStatus::Cooling,
        }
    }
}

/// Summary of one reactor unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FleetUnit {
    pub id: String,
    pub status: UnitStatus,
    pub feedstock: String,
    pub temperature: f64,
    pub target_temp: f64,
    pub pressure: f64,
    pub feed_rate: f64,
    pub bio_oil_output: f64,
    pub emergency_stop: SafetyState,
    pub o2_level: f64,
    pub pellet_purity: f64,
    pub pellet_moisture: f64,
    pub efficiency_factor: f64,
}

/// `P-01`, `P-02`, ...
pub fn unit_id(index: usize) -> String {
    format!("P-{:02}", index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_ids() {
        assert_eq!(unit_id(1), "P-01");
        assert_eq!(unit_id(12), "P-12");
    }

    #[test]
    fn test_mode_mapping() {
        assert_eq!(UnitStatus::from(SystemMode::Off), UnitStatus::Idle);
        assert_eq!(UnitStatus::from(SystemMode::Heating), UnitStatus::Starting);
        assert_eq!(UnitStatus::from(SystemMode::Cooling), UnitStatus::Cooling);
    }
}
