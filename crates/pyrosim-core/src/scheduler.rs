//! Virtual-time driver
//!
//! Runs the reactor and plant cadences from independent accumulators and
//! fires deferred jobs from a timer queue, all against simulated seconds.
//! Deterministic for a seeded engine, which is what the tests and the
//! headless harness rely on.

use log::{debug, info};

use crate::engine::{Command, DeferredJob, Scheduled, SimulationEngine};

/// Slack when comparing due times, so `n * period` lands on its tick.
const EPSILON: f64 = 1e-9;

#[derive(Debug, Clone)]
struct Timer {
    due: f64,
    /// Insertion order, breaks ties between timers due together.
    seq: u64,
    job: DeferredJob,
}

/// Counts of what one [`TickScheduler::advance`] call did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdvanceReport {
    pub reactor_ticks: u32,
    pub plant_ticks: u32,
    pub jobs_fired: u32,
}

pub struct TickScheduler {
    engine: SimulationEngine,
    now: f64,
    next_reactor: f64,
    next_plant: f64,
    timers: Vec<Timer>,
    next_seq: u64,
    stopped: bool,
}

impl TickScheduler {
    pub fn new(engine: SimulationEngine) -> Self {
        let start = engine.sim_time();
        let schedule = engine.schedule().clone();
        info!(
            "scheduler started: reactor every {}s, plant every {}s",
            schedule.reactor_period_secs, schedule.plant_period_secs
        );
        Self {
            engine,
            now: start,
            next_reactor: start + schedule.reactor_period_secs,
            next_plant: start + schedule.plant_period_secs,
            timers: Vec::new(),
            next_seq: 0,
            stopped: false,
        }
    }

    pub fn engine(&self) -> &SimulationEngine {
        &self.engine
    }

    pub fn into_engine(self) -> SimulationEngine {
        self.engine
    }

    pub fn now(&self) -> f64 {
        self.now
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn pending_jobs(&self) -> usize {
        self.timers.len()
    }

    /// Apply an operator command, queueing any deferred job it starts.
    /// Ignored once stopped.
    pub fn apply(&mut self, command: Command) -> bool {
        if self.stopped {
            debug!("command after stop ignored: {:?}", command);
            return false;
        }
        let outcome = self.engine.apply(command);
        if let Some(scheduled) = outcome.deferred {
            self.queue(scheduled);
        }
        outcome.accepted
    }

    fn queue(&mut self, scheduled: Scheduled) {
        self.timers.push(Timer {
            due: self.now + scheduled.delay_secs.max(0.0),
            seq: self.next_seq,
            job: scheduled.job,
        });
        self.next_seq += 1;
    }

    /// Run everything due within the next `dt` simulated seconds, in time
    /// order. Reactor ticks go before plant ticks, and both before timers,
    /// when they fall due together.
    pub fn advance(&mut self, dt: f64) -> AdvanceReport {
        let mut report = AdvanceReport::default();
        if self.stopped || dt.is_nan() || dt <= 0.0 {
            return report;
        }
        let until = self.now + dt;
        let reactor_period = self.engine.schedule().reactor_period_secs;
        let plant_period = self.engine.schedule().plant_period_secs;

        loop {
            let next_timer = self.earliest_timer();
            let next = self
                .next_reactor
                .min(self.next_plant)
                .min(next_timer.map(|i| self.timers[i].due).unwrap_or(f64::INFINITY));
            if next > until + EPSILON {
                break;
            }
            self.now = next.max(self.now);
            self.engine.set_clock(self.now);

            if self.next_reactor <= next + EPSILON {
                self.engine.step_reactor();
                self.next_reactor += reactor_period;
                report.reactor_ticks += 1;
            } else if self.next_plant <= next + EPSILON {
                self.engine.step_plant();
                self.next_plant += plant_period;
                report.plant_ticks += 1;
            } else if let Some(i) = next_timer {
                let timer = self.timers.swap_remove(i);
                self.engine.fire(timer.job);
                report.jobs_fired += 1;
            }
        }

        self.now = until;
        self.engine.set_clock(until);
        report
    }

    /// Run whole seconds.
    pub fn run_secs(&mut self, secs: u32) -> AdvanceReport {
        let mut total = AdvanceReport::default();
        for _ in 0..secs {
            let r = self.advance(1.0);
            total.reactor_ticks += r.reactor_ticks;
            total.plant_ticks += r.plant_ticks;
            total.jobs_fired += r.jobs_fired;
        }
        total
    }

    /// Cancel pending jobs and refuse further ticks. Safe to call again.
    pub fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        let dropped = self.timers.len();
        self.timers.clear();
        info!("scheduler stopped at {:.1}s, {} pending jobs dropped", self.now, dropped);
    }

    fn earliest_timer(&self) -> Option<usize> {
        self.timers
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| a.due.total_cmp(&b.due).then(a.seq.cmp(&b.seq)))
            .map(|(i, _)| i)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::SystemMode;
    use crate::config::EngineConfig;

    fn scheduler() -> TickScheduler {
        TickScheduler::new(SimulationEngine::new(EngineConfig::seeded(11)))
    }

    #[test]
    fn test_cadences_are_independent() {
        let mut s = scheduler();
        let report = s.advance(10.0);
        assert_eq!(report.reactor_ticks, 10);
        assert_eq!(report.plant_ticks, 5);
        assert_eq!(s.now(), 10.0);
    }

    #[test]
    fn test_fractional_advances_accumulate() {
        let mut s = scheduler();
        let mut ticks = 0;
        for _ in 0..40 {
            ticks += s.advance(0.25).reactor_ticks;
        }
        assert_eq!(ticks, 10);
    }

    #[test]
    fn test_analysis_fires_after_latency() {
        let mut s = scheduler();
        assert!(s.apply(Command::SimulateBatch));
        assert!(s.apply(Command::TakeSample));
        assert!(!s.apply(Command::TakeSample), "no duplicate job");
        assert_eq!(s.pending_jobs(), 1);

        s.advance(4.0);
        assert!(s.engine().analysis_result().is_none());
        let report = s.advance(1.0);
        assert_eq!(report.jobs_fired, 1);
        assert!(s.engine().analysis_result().is_some());
        assert_eq!(s.pending_jobs(), 0);
    }

    #[test]
    fn test_stop_is_idempotent_and_final() {
        let mut s = scheduler();
        s.apply(Command::StartReactor);
        s.apply(Command::RunDiagnostics);
        s.stop();
        s.stop();
        assert!(s.is_stopped());
        assert_eq!(s.pending_jobs(), 0);
        let report = s.advance(10.0);
        assert_eq!(report, AdvanceReport::default());
        assert_eq!(s.engine().history().recent_len(), 0);
        assert!(!s.apply(Command::StopReactor));
        assert_eq!(s.engine().snapshot().system_mode, SystemMode::Heating);
    }

    #[test]
    fn test_non_positive_advance_is_noop() {
        let mut s = scheduler();
        assert_eq!(s.advance(0.0), AdvanceReport::default());
        assert_eq!(s.advance(-1.0), AdvanceReport::default());
        assert_eq!(s.advance(f64::NAN), AdvanceReport::default());
        assert_eq!(s.now(), 0.0);
    }
}
