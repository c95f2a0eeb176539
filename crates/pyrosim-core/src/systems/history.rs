//! Telemetry history - a per-tick ring and a coarser per-minute ring

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use super::reactor::CycleCounters;
use crate::components::ProcessSnapshot;
use crate::config::HistoryConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistorySample {
    /// Simulated seconds since start.
    pub timestamp_secs: f64,
    pub snapshot: ProcessSnapshot,
}

#[derive(Debug, Clone)]
pub struct TelemetryHistory {
    recent: VecDeque<HistorySample>,
    minute: VecDeque<HistorySample>,
    config: HistoryConfig,
}

impl TelemetryHistory {
    pub fn new(config: HistoryConfig) -> Self {
        Self {
            recent: VecDeque::with_capacity(config.recent_capacity),
            minute: VecDeque::with_capacity(config.minute_capacity),
            config,
        }
    }

    /// Append the post-tick snapshot. Returns true when it also landed in
    /// the per-minute ring.
    pub fn record(&mut self, now: f64, snapshot: &ProcessSnapshot, counters: CycleCounters) -> bool {
        let sample = HistorySample {
            timestamp_secs: now,
            snapshot: snapshot.clone(),
        };
        let total = counters.total();
        let on_minute = total > 0 && total % self.config.minute_every_ticks.max(1) == 0;
        if on_minute {
            push_capped(&mut self.minute, sample.clone(), self.config.minute_capacity);
        }
        push_capped(&mut self.recent, sample, self.config.recent_capacity);
        on_minute
    }

    /// Oldest first.
    pub fn recent(&self) -> impl Iterator<Item = &HistorySample> {
        self.recent.iter()
    }

    pub fn minute(&self) -> impl Iterator<Item = &HistorySample> {
        self.minute.iter()
    }

    pub fn recent_len(&self) -> usize {
        self.recent.len()
    }

    pub fn minute_len(&self) -> usize {
        self.minute.len()
    }

    pub fn latest(&self) -> Option<&HistorySample> {
        self.recent.back()
    }

    /// Owned copies of both rings, for handing across threads.
    pub fn export(&self) -> (Vec<HistorySample>, Vec<HistorySample>) {
        (
            self.recent.iter().cloned().collect(),
            self.minute.iter().cloned().collect(),
        )
    }
}

fn push_capped(ring: &mut VecDeque<HistorySample>, sample: HistorySample, capacity: usize) {
    ring.push_back(sample);
    while ring.len() > capacity.max(1) {
        ring.pop_front();
    }
}
