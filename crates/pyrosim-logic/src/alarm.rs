//! Alarm thresholds and tier classification.
//!
//! Each monitored signal carries three thresholds. Rising alarms (the usual
//! case: temperature, pressure, tank fill) trip when the value reaches a
//! threshold from below. Falling alarms (hopper level running empty) are
//! expressed by ordering the thresholds downwards, `critical < medium`, and
//! trip when the value drops to a threshold.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Alarm tier, ordered from harmless to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AlarmLevel {
    None,
    Medium,
    High,
    Critical,
}

/// Sound cue the operator console plays for a tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AlarmSound {
    BeepShort,
    BeepContinuous,
    SirenIntermittent,
    VoiceAlert,
}

/// Signals the control room can put an alarm on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Signal {
    ReactorTemp,
    ReactorPressure,
    CondenserTemp,
    BiomassHopper,
    BioOilTank,
}

impl Signal {
    pub const ALL: [Signal; 5] = [
        Signal::ReactorTemp,
        Signal::ReactorPressure,
        Signal::CondenserTemp,
        Signal::BiomassHopper,
        Signal::BioOilTank,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Signal::ReactorTemp => "reactor temperature",
            Signal::ReactorPressure => "reactor pressure",
            Signal::CondenserTemp => "condenser temperature",
            Signal::BiomassHopper => "biomass hopper level",
            Signal::BioOilTank => "bio-oil tank level",
        }
    }
}

/// Thresholds and sound cues for one signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlarmConfig {
    pub enabled: bool,
    pub medium: f64,
    pub high: f64,
    pub critical: f64,
    pub medium_sound: AlarmSound,
    pub high_sound: AlarmSound,
    pub critical_sound: AlarmSound,
}

impl AlarmConfig {
    /// Enabled config with the standard escalating cues.
    pub fn new(medium: f64, high: f64, critical: f64) -> Self {
        Self {
            enabled: true,
            medium,
            high,
            critical,
            medium_sound: AlarmSound::BeepShort,
            high_sound: AlarmSound::BeepContinuous,
            critical_sound: AlarmSound::SirenIntermittent,
        }
    }

    pub fn with_critical_sound(mut self, sound: AlarmSound) -> Self {
        self.critical_sound = sound;
        self
    }

    /// True when thresholds descend, i.e. the alarm watches for a low value.
    pub fn is_falling(&self) -> bool {
        self.critical < self.medium
    }

    pub fn sound_for(&self, level: AlarmLevel) -> Option<AlarmSound> {
        match level {
            AlarmLevel::None => None,
            AlarmLevel::Medium => Some(self.medium_sound),
            AlarmLevel::High => Some(self.high_sound),
            AlarmLevel::Critical => Some(self.critical_sound),
        }
    }
}

/// Highest tier whose threshold `value` has reached, or `None`.
///
/// Disabled configs and NaN readings always classify as `None`.
pub fn evaluate(value: f64, config: &AlarmConfig) -> AlarmLevel {
    if !config.enabled || value.is_nan() {
        return AlarmLevel::None;
    }
    let reached = |threshold: f64| {
        if config.is_falling() {
            value <= threshold
        } else {
            value >= threshold
        }
    };
    if reached(config.critical) {
        AlarmLevel::Critical
    } else if reached(config.high) {
        AlarmLevel::High
    } else if reached(config.medium) {
        AlarmLevel::Medium
    } else {
        AlarmLevel::None
    }
}

/// Control-room defaults for every [`Signal`].
pub fn default_alarm_configs() -> BTreeMap<Signal, AlarmConfig> {
    let mut configs = BTreeMap::new();
    configs.insert(Signal::ReactorTemp, AlarmConfig::new(600.0, 750.0, 850.0));
    configs.insert(Signal::ReactorPressure, AlarmConfig::new(1.5, 1.8, 2.0));
    configs.insert(Signal::CondenserTemp, AlarmConfig::new(40.0, 50.0, 60.0));
    configs.insert(
        Signal::BiomassHopper,
        AlarmConfig::new(20.0, 10.0, 5.0).with_critical_sound(AlarmSound::VoiceAlert),
    );
    configs.insert(
        Signal::BioOilTank,
        AlarmConfig::new(80.0, 90.0, 95.0).with_critical_sound(AlarmSound::VoiceAlert),
    );
    configs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rising_tiers() {
        let cfg = AlarmConfig::new(600.0, 750.0, 850.0);
        assert_eq!(evaluate(25.0, &cfg), AlarmLevel::None);
        assert_eq!(evaluate(600.0, &cfg), AlarmLevel::Medium);
        assert_eq!(evaluate(749.9, &cfg), AlarmLevel::Medium);
        assert_eq!(evaluate(800.0, &cfg), AlarmLevel::High);
        assert_eq!(evaluate(900.0, &cfg), AlarmLevel::Critical);
    }

    #[test]
    fn test_falling_tiers() {
        let cfg = AlarmConfig::new(20.0, 10.0, 5.0);
        assert!(cfg.is_falling());
        assert_eq!(evaluate(85.0, &cfg), AlarmLevel::None);
        assert_eq!(evaluate(20.0, &cfg), AlarmLevel::Medium);
        assert_eq!(evaluate(7.0, &cfg), AlarmLevel::High);
        assert_eq!(evaluate(0.0, &cfg), AlarmLevel::Critical);
    }

    #[test]
    fn test_disabled_never_alarms() {
        let mut cfg = AlarmConfig::new(1.5, 1.8, 2.0);
        cfg.enabled = false;
        assert_eq!(evaluate(10.0, &cfg), AlarmLevel::None);
    }

    #[test]
    fn test_nan_is_not_an_alarm() {
        let cfg = AlarmConfig::new(1.5, 1.8, 2.0);
        assert_eq!(evaluate(f64::NAN, &cfg), AlarmLevel::None);
    }

    #[test]
    fn test_sound_cues() {
        let configs = default_alarm_configs();
        let hopper = &configs[&Signal::BiomassHopper];
        assert_eq!(hopper.sound_for(AlarmLevel::None), None);
        assert_eq!(hopper.sound_for(AlarmLevel::High), Some(AlarmSound::BeepContinuous));
        assert_eq!(hopper.sound_for(AlarmLevel::Critical), Some(AlarmSound::VoiceAlert));
    }

    #[test]
    fn test_defaults_cover_every_signal() {
        let configs = default_alarm_configs();
        for signal in Signal::ALL {
            assert!(configs.contains_key(&signal), "missing {:?}", signal);
        }
    }

    #[test]
    fn test_levels_are_ordered() {
        assert!(AlarmLevel::Critical > AlarmLevel::High);
        assert!(AlarmLevel::High > AlarmLevel::Medium);
        assert!(AlarmLevel::Medium > AlarmLevel::None);
    }
}
