//! Simulation engine - owns every model and routes events between them
//!
//! The engine does not know about wall-clock time. A driver (the virtual-time
//! [`TickScheduler`](crate::scheduler::TickScheduler) or the tokio
//! [`runtime`](crate::runtime)) sets the clock, calls the two step functions
//! at their own cadences and fires deferred jobs when they fall due.

use log::{debug, info};
use pyrosim_logic::alarm::{AlarmConfig, Signal};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::components::*;
use crate::config::{ConfigError, EngineConfig, ScheduleConfig};
use crate::systems::*;

/// Work that completes some time after the command that started it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeferredJob {
    CompleteAnalysis { sample_id: String },
    CompleteDiagnostics,
}

/// A deferred job and how long after now it falls due.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scheduled {
    pub job: DeferredJob,
    pub delay_secs: f64,
}

/// Operator commands. Invalid ones are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    StartReactor,
    StopReactor,
    SetTargetTemp(f64),
    SetCatalyst(String),
    SetFeedstock(u32),
    SetPlant { running: bool, tons_per_day: f64 },
    InjectJam(Stage),
    TakeSample,
    SimulateBatch,
    RunDiagnostics,
    SetAlarm(Signal, AlarmConfig),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CommandOutcome {
    pub accepted: bool,
    pub deferred: Option<Scheduled>,
}

impl CommandOutcome {
    fn from_bool(accepted: bool) -> Self {
        Self {
            accepted,
            deferred: None,
        }
    }

    fn from_scheduled(deferred: Option<Scheduled>) -> Self {
        Self {
            accepted: deferred.is_some(),
            deferred,
        }
    }
}

/// Immutable view of everything a console renders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub sim_time_secs: f64,
    pub reactor: ProcessSnapshot,
    pub counters: CycleCounters,
    pub reactor_log: Vec<LogEntry>,
    pub plant: PlantState,
    pub lab: LabStatus,
    pub fleet: Vec<FleetUnit>,
    pub feedstock_id: u32,
    pub diagnostics_running: bool,
    pub alarms: Vec<ActiveAlarm>,
}

/// Both history rings, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryExport {
    pub recent: Vec<HistorySample>,
    pub minute: Vec<HistorySample>,
}

/// Main simulation engine
pub struct SimulationEngine {
    reactor: ReactorModel,
    plant: PlantModel,
    lab: QualityLab,
    fleet: FleetAggregator,
    history: TelemetryHistory,
    diagnostics: ElectricalDiagnostics,
    alarms: BTreeMap<Signal, AlarmConfig>,
    schedule: ScheduleConfig,
    feedstock_id: u32,
    rng: StdRng,
    /// Simulated seconds since start.
    sim_time: f64,
}

impl SimulationEngine {
    /// Build an engine from a configuration assumed to be valid.
    pub fn new(config: EngineConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let schedule = config.schedule;
        Self {
            reactor: ReactorModel::new(
                config.reactor,
                config.target_temp,
                &config.catalyst_id,
                schedule.reactor_period_secs,
            ),
            plant: PlantModel::new(
                config.plant,
                config.input_tons_per_day,
                schedule.plant_period_secs,
            ),
            lab: QualityLab::new(config.lab, schedule.lab_latency_secs),
            fleet: FleetAggregator::new(config.fleet),
            history: TelemetryHistory::new(config.history),
            diagnostics: ElectricalDiagnostics::default(),
            alarms: config.alarms,
            schedule,
            feedstock_id: config.feedstock_id,
            rng,
            sim_time: 0.0,
        }
    }

    /// Validate `config`, then build.
    pub fn from_config(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::new(config))
    }

    pub fn schedule(&self) -> &ScheduleConfig {
        &self.schedule
    }

    pub fn sim_time(&self) -> f64 {
        self.sim_time
    }

    /// Move the clock forward. Never moves backwards.
    pub fn set_clock(&mut self, secs: f64) {
        if secs > self.sim_time {
            self.sim_time = secs;
        }
    }

    // ---- Periodic steps ----

    /// One reactor tick: reactor, then fleet, then history.
    pub fn step_reactor(&mut self) -> Option<SystemMode> {
        let now = self.sim_time;
        let entered = self.reactor.step(now, &mut self.rng);
        self.fleet.step(self.reactor.snapshot(), &mut self.rng);
        self.history
            .record(now, self.reactor.snapshot(), self.reactor.counters());
        entered
    }

    /// One plant tick. A ready batch is handed to the lab in the same tick.
    pub fn step_plant(&mut self) -> Vec<PlantEvent> {
        let now = self.sim_time;
        let accepts = self.lab.status().accepts_batch();
        let events = self.plant.step(now, accepts, &mut self.rng);
        if events.contains(&PlantEvent::BatchReady) {
            self.lab.offer_batch();
        }
        events
    }

    /// Complete a deferred job. Returns false for stale jobs.
    pub fn fire(&mut self, job: DeferredJob) -> bool {
        let now = self.sim_time;
        match job {
            DeferredJob::CompleteAnalysis { sample_id } => {
                let purity = self.plant.state().output_purity.gcr;
                match self.lab.complete(&sample_id, now, purity, &mut self.rng) {
                    Some(result) => {
                        self.plant.log(
                            now,
                            format!(
                                "Analysis of batch {} complete. Quality: {}.",
                                result.sample_id,
                                quality_label(result.quality)
                            ),
                        );
                        true
                    }
                    None => false,
                }
            }
            DeferredJob::CompleteDiagnostics => match self.diagnostics.complete(&mut self.rng) {
                Some(outcome) => {
                    self.reactor.apply_grounding(outcome.grounding, outcome.insulation);
                    self.reactor.log(now, outcome.message());
                    true
                }
                None => {
                    debug!("stale diagnostics completion");
                    false
                }
            },
        }
    }

    // ---- Commands ----

    pub fn apply(&mut self, command: Command) -> CommandOutcome {
        match command {
            Command::StartReactor => CommandOutcome::from_bool(self.start_reactor()),
            Command::StopReactor => CommandOutcome::from_bool(self.stop_reactor()),
            Command::SetTargetTemp(t) => CommandOutcome::from_bool(self.set_target_temp(t)),
            Command::SetCatalyst(id) => {
                self.set_catalyst(&id);
                CommandOutcome::from_bool(true)
            }
            Command::SetFeedstock(id) => {
                self.set_feedstock(id);
                CommandOutcome::from_bool(true)
            }
            Command::SetPlant {
                running,
                tons_per_day,
            } => CommandOutcome::from_bool(self.set_plant(running, tons_per_day)),
            Command::InjectJam(stage) => CommandOutcome::from_bool(self.inject_jam(stage)),
            Command::TakeSample => CommandOutcome::from_scheduled(self.take_sample()),
            Command::SimulateBatch => CommandOutcome::from_bool(self.simulate_batch()),
            Command::RunDiagnostics => {
                CommandOutcome::from_scheduled(self.run_electrical_diagnostics())
            }
            Command::SetAlarm(signal, config) => {
                self.set_alarm(signal, config);
                CommandOutcome::from_bool(true)
            }
        }
    }

    pub fn start_reactor(&mut self) -> bool {
        self.reactor.start(self.sim_time)
    }

    pub fn stop_reactor(&mut self) -> bool {
        self.reactor.stop(self.sim_time)
    }

    pub fn set_target_temp(&mut self, target: f64) -> bool {
        self.reactor.set_target_temp(target)
    }

    pub fn set_catalyst(&mut self, catalyst_id: &str) {
        self.reactor.set_catalyst(catalyst_id);
    }

    pub fn set_feedstock(&mut self, feedstock_id: u32) {
        self.feedstock_id = feedstock_id;
    }

    /// Set the running flag and daily input. False if neither was accepted.
    pub fn set_plant(&mut self, running: bool, tons_per_day: f64) -> bool {
        let rate_ok = self.plant.set_input_tons(tons_per_day);
        let toggled = self.plant.set_running(running, self.sim_time);
        rate_ok || toggled
    }

    pub fn inject_jam(&mut self, stage: Stage) -> bool {
        self.plant.inject_jam(stage)
    }

    /// Start analysing the waiting batch. The returned job must be fired
    /// after its delay.
    pub fn take_sample(&mut self) -> Option<Scheduled> {
        let job = self.lab.take_sample(self.sim_time)?;
        Some(Scheduled {
            delay_secs: self.lab.latency_secs(),
            job: DeferredJob::CompleteAnalysis {
                sample_id: job.sample_id,
            },
        })
    }

    /// Manual batch-ready trigger.
    pub fn simulate_batch(&mut self) -> bool {
        let offered = self.lab.offer_batch();
        if offered {
            self.plant.log(self.sim_time, "Manual GCR batch flagged for analysis.");
        }
        offered
    }

    pub fn run_electrical_diagnostics(&mut self) -> Option<Scheduled> {
        if !self.diagnostics.begin(self.sim_time) {
            debug!("diagnostics already running");
            return None;
        }
        self.reactor
            .log(self.sim_time, "Electrical diagnostics started.");
        info!("electrical diagnostics started");
        Some(Scheduled {
            job: DeferredJob::CompleteDiagnostics,
            delay_secs: self.schedule.diagnostics_latency_secs,
        })
    }

    pub fn set_alarm(&mut self, signal: Signal, config: AlarmConfig) {
        self.alarms.insert(signal, config);
    }

    // ---- Queries ----

    pub fn snapshot(&self) -> &ProcessSnapshot {
        self.reactor.snapshot()
    }

    pub fn counters(&self) -> CycleCounters {
        self.reactor.counters()
    }

    pub fn setpoint(&self) -> f64 {
        self.reactor.setpoint()
    }

    pub fn plant(&self) -> &PlantState {
        self.plant.state()
    }

    pub fn lab(&self) -> &LabStatus {
        self.lab.status()
    }

    pub fn analysis_result(&self) -> Option<&AnalysisResult> {
        self.lab.status().result.as_ref()
    }

    pub fn fleet(&self) -> &[FleetUnit] {
        self.fleet.units()
    }

    pub fn history(&self) -> &TelemetryHistory {
        &self.history
    }

    pub fn export_history(&self) -> HistoryExport {
        let (recent, minute) = self.history.export();
        HistoryExport { recent, minute }
    }

    pub fn reactor_log(&self) -> &EventLog {
        self.reactor.events()
    }

    pub fn plant_log(&self) -> &EventLog {
        &self.plant.state().log
    }

    pub fn alarm_configs(&self) -> &BTreeMap<Signal, AlarmConfig> {
        &self.alarms
    }

    pub fn evaluate_alarms(&self) -> Vec<ActiveAlarm> {
        evaluate_alarms(self.reactor.snapshot(), &self.alarms)
    }

    pub fn frame(&self) -> Frame {
        Frame {
            sim_time_secs: self.sim_time,
            reactor: self.reactor.snapshot().clone(),
            counters: self.reactor.counters(),
            reactor_log: self.reactor.events().iter().cloned().collect(),
            plant: self.plant.state().clone(),
            lab: self.lab.status().clone(),
            fleet: self.fleet.units().to_vec(),
            feedstock_id: self.feedstock_id,
            diagnostics_running: self.diagnostics.is_running(),
            alarms: self.evaluate_alarms(),
        }
    }
}

impl Default for SimulationEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> SimulationEngine {
        SimulationEngine::new(EngineConfig::seeded(7))
    }

    fn tick(engine: &mut SimulationEngine, secs: f64) {
        let t = engine.sim_time() + secs;
        engine.set_clock(t);
        engine.step_reactor();
    }

    #[test]
    fn test_new_engine_is_off() {
        let engine = engine();
        assert_eq!(engine.snapshot().system_mode, SystemMode::Off);
        assert!(engine.fleet().is_empty());
        assert_eq!(engine.history().recent_len(), 0);
    }

    #[test]
    fn test_from_config_rejects_invalid() {
        let mut config = EngineConfig::default();
        config.fleet.unit_count = 0;
        assert!(SimulationEngine::from_config(config).is_err());
    }

    #[test]
    fn test_reactor_step_feeds_fleet_and_history() {
        let mut engine = engine();
        engine.start_reactor();
        tick(&mut engine, 1.0);
        assert_eq!(engine.fleet().len(), 9);
        assert_eq!(engine.fleet()[0].temperature, engine.snapshot().reactor_temp);
        assert_eq!(engine.history().recent_len(), 1);
        assert_eq!(engine.history().latest().map(|s| s.timestamp_secs), Some(1.0));
    }

    #[test]
    fn test_clock_never_runs_backwards() {
        let mut engine = engine();
        engine.set_clock(10.0);
        engine.set_clock(5.0);
        assert_eq!(engine.sim_time(), 10.0);
    }

    #[test]
    fn test_sample_flow_logs_to_plant() {
        let mut engine = engine();
        assert!(engine.take_sample().is_none(), "no batch yet");
        assert!(engine.simulate_batch());
        let scheduled = engine.take_sample().unwrap();
        assert_eq!(scheduled.delay_secs, 5.0);
        assert!(engine.take_sample().is_none(), "one job in flight");

        engine.set_clock(5.0);
        assert!(engine.fire(scheduled.job.clone()));
        assert!(engine.analysis_result().is_some());
        assert!(engine.plant_log().contains("Analysis of batch GCR-000001 complete"));
        assert!(!engine.fire(scheduled.job), "second completion is stale");
    }

    #[test]
    fn test_diagnostics_round_trip() {
        let mut engine = engine();
        let scheduled = engine.run_electrical_diagnostics().unwrap();
        assert!(engine.run_electrical_diagnostics().is_none());
        assert_eq!(scheduled.delay_secs, 3.0);
        assert!(engine.frame().diagnostics_running);
        engine.set_clock(3.0);
        assert!(engine.fire(scheduled.job));
        assert!(engine.reactor_log().contains("Electrical diagnostics"));
        assert!(!engine.frame().diagnostics_running);
    }

    #[test]
    fn test_batch_ready_reaches_lab() {
        let mut config = EngineConfig::seeded(3);
        config.plant.batch_probability = 1.0;
        config.plant.jam_probability = 0.0;
        let mut engine = SimulationEngine::new(config);
        engine.set_plant(true, 50.0);
        let mut offered = false;
        for i in 1..=5 {
            engine.set_clock(i as f64 * 2.0);
            offered |= engine.step_plant().contains(&PlantEvent::BatchReady);
        }
        assert!(offered, "a batch must be offered once the silo holds GCR");
        assert!(engine.lab().batch_ready);
    }

    #[test]
    fn test_commands_route_through_apply() {
        let mut engine = engine();
        assert!(engine.apply(Command::StartReactor).accepted);
        assert!(!engine.apply(Command::StartReactor).accepted);
        assert!(!engine.apply(Command::TakeSample).accepted);
        let outcome = engine.apply(Command::RunDiagnostics);
        assert!(outcome.accepted);
        assert_eq!(
            outcome.deferred.map(|s| s.job),
            Some(DeferredJob::CompleteDiagnostics)
        );
    }

    #[test]
    fn test_frame_serializes() {
        let mut engine = engine();
        engine.start_reactor();
        tick(&mut engine, 1.0);
        let json = serde_json::to_string(&engine.frame()).unwrap();
        assert!(json.contains("\"system_mode\":\"Heating\""));
    }
}
