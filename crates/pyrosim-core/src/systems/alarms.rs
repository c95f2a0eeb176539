//! Alarm sweep over the live reactor snapshot

use pyrosim_logic::alarm::{evaluate, AlarmConfig, AlarmLevel, AlarmSound, Signal};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::components::ProcessSnapshot;

/// A signal currently past at least its medium threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActiveAlarm {
    pub signal: Signal,
    pub value: f64,
    pub level: AlarmLevel,
    pub sound: AlarmSound,
}

/// Classify every configured signal, worst first.
pub fn evaluate_alarms(
    snapshot: &ProcessSnapshot,
    configs: &BTreeMap<Signal, AlarmConfig>,
) -> Vec<ActiveAlarm> {
    let mut active: Vec<ActiveAlarm> = configs
        .iter()
        .filter_map(|(signal, config)| {
            let value = snapshot.signal_value(*signal);
            let level = evaluate(value, config);
            config.sound_for(level).map(|sound| ActiveAlarm {
                signal: *signal,
                value,
                level,
                sound,
            })
        })
        .collect();
    active.sort_by(|a, b| b.level.cmp(&a.level).then(a.signal.cmp(&b.signal)));
    active
}
