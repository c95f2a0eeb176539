//! Real-time driver
//!
//! One tokio task owns the engine. Two intervals drive the reactor and plant
//! cadences, commands arrive over an mpsc channel, and every change is
//! published as an immutable [`Frame`] on a watch channel. Deferred jobs are
//! sleeps bound to a child cancellation token, so none outlive the driver.

use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::engine::{Command, DeferredJob, Frame, HistoryExport, Scheduled, SimulationEngine};

/// Pending commands before senders wait.
const REQUEST_QUEUE: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("simulation runtime has stopped")]
    Stopped,
    #[error("simulation task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

enum Request {
    Command {
        command: Command,
        reply: oneshot::Sender<bool>,
    },
    History(oneshot::Sender<HistoryExport>),
}

/// Client side of a running simulation.
pub struct SimulationHandle {
    requests: mpsc::Sender<Request>,
    frames: watch::Receiver<Arc<Frame>>,
    cancel: CancellationToken,
    task: JoinHandle<SimulationEngine>,
}

impl SimulationHandle {
    /// Apply a command. Resolves to whether it was accepted.
    pub async fn send(&self, command: Command) -> Result<bool, RuntimeError> {
        let (reply, accepted) = oneshot::channel();
        self.requests
            .send(Request::Command { command, reply })
            .await
            .map_err(|_| RuntimeError::Stopped)?;
        accepted.await.map_err(|_| RuntimeError::Stopped)
    }

    pub async fn history(&self) -> Result<HistoryExport, RuntimeError> {
        let (reply, export) = oneshot::channel();
        self.requests
            .send(Request::History(reply))
            .await
            .map_err(|_| RuntimeError::Stopped)?;
        export.await.map_err(|_| RuntimeError::Stopped)
    }

    /// Latest published frame.
    pub fn frame(&self) -> Arc<Frame> {
        Arc::clone(&self.frames.borrow())
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Frame>> {
        self.frames.clone()
    }

    /// Request cancellation. No tick is dispatched afterwards.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Cancel and wait for the driver, returning the engine it owned.
    pub async fn shutdown(self) -> Result<SimulationEngine, RuntimeError> {
        self.cancel.cancel();
        Ok(self.task.await?)
    }
}

/// Start driving `engine` in real time on the current tokio runtime.
pub fn spawn(engine: SimulationEngine) -> SimulationHandle {
    let cancel = CancellationToken::new();
    let (requests, request_rx) = mpsc::channel(REQUEST_QUEUE);
    let (frame_tx, frames) = watch::channel(Arc::new(engine.frame()));
    let task = tokio::spawn(run(engine, request_rx, frame_tx, cancel.clone()));
    SimulationHandle {
        requests,
        frames,
        cancel,
        task,
    }
}

async fn run(
    mut engine: SimulationEngine,
    mut requests: mpsc::Receiver<Request>,
    frames: watch::Sender<Arc<Frame>>,
    cancel: CancellationToken,
) -> SimulationEngine {
    let schedule = engine.schedule().clone();
    let start = Instant::now();
    let base = engine.sim_time();
    let mut reactor_tick = ticker(start, schedule.reactor_period_secs);
    let mut plant_tick = ticker(start, schedule.plant_period_secs);

    let jobs = cancel.child_token();
    let (fire_tx, mut fire_rx) = mpsc::unbounded_channel::<DeferredJob>();
    info!("simulation runtime started");

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = reactor_tick.tick() => {
                engine.set_clock(base + start.elapsed().as_secs_f64());
                engine.step_reactor();
                publish(&frames, &engine);
            }
            _ = plant_tick.tick() => {
                engine.set_clock(base + start.elapsed().as_secs_f64());
                engine.step_plant();
                publish(&frames, &engine);
            }
            Some(job) = fire_rx.recv() => {
                engine.set_clock(base + start.elapsed().as_secs_f64());
                if engine.fire(job) {
                    publish(&frames, &engine);
                }
            }
            request = requests.recv() => match request {
                Some(Request::Command { command, reply }) => {
                    engine.set_clock(base + start.elapsed().as_secs_f64());
                    let outcome = engine.apply(command);
                    if let Some(scheduled) = outcome.deferred {
                        defer(scheduled, jobs.clone(), fire_tx.clone());
                    }
                    let _ = reply.send(outcome.accepted);
                    publish(&frames, &engine);
                }
                Some(Request::History(reply)) => {
                    let _ = reply.send(engine.export_history());
                }
                None => {
                    debug!("all handles dropped");
                    break;
                }
            },
        }
    }

    jobs.cancel();
    info!("simulation runtime stopped at {:.1}s", engine.sim_time());
    engine
}

fn ticker(start: Instant, period_secs: f64) -> Interval {
    let period = match Duration::try_from_secs_f64(period_secs) {
        Ok(d) if !d.is_zero() => d,
        _ => {
            warn!("tick period {} unusable, using 1s", period_secs);
            Duration::from_secs(1)
        }
    };
    let mut interval = interval_at(start + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}

fn defer(scheduled: Scheduled, token: CancellationToken, fire: mpsc::UnboundedSender<DeferredJob>) {
    let delay = Duration::try_from_secs_f64(scheduled.delay_secs).unwrap_or_default();
    tokio::spawn(async move {
        tokio::select! {
            _ = token.cancelled() => {}
            _ = tokio::time::sleep(delay) => {
                let _ = fire.send(scheduled.job);
            }
        }
    });
}

fn publish(frames: &watch::Sender<Arc<Frame>>, engine: &SimulationEngine) {
    frames.send_replace(Arc::new(engine.frame()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::SystemMode;
    use crate::config::EngineConfig;

    fn handle() -> SimulationHandle {
        spawn(SimulationEngine::new(EngineConfig::seeded(21)))
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_publish_frames() {
        let handle = handle();
        assert!(handle.send(Command::StartReactor).await.unwrap());
        tokio::time::sleep(Duration::from_millis(3500)).await;

        let frame = handle.frame();
        assert_eq!(frame.reactor.system_mode, SystemMode::Heating);
        assert_eq!(frame.counters.heating_ticks, 3);
        assert_eq!(frame.fleet.len(), 9);

        let engine = handle.shutdown().await.unwrap();
        assert_eq!(engine.history().recent_len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_command_is_refused() {
        let handle = handle();
        assert!(!handle.send(Command::StopReactor).await.unwrap());
        assert!(!handle.send(Command::TakeSample).await.unwrap());
        handle.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_analysis_completes_after_latency() {
        let handle = handle();
        assert!(handle.send(Command::SimulateBatch).await.unwrap());
        assert!(handle.send(Command::TakeSample).await.unwrap());

        tokio::time::sleep(Duration::from_millis(4900)).await;
        assert!(handle.frame().lab.result.is_none());
        assert!(handle.frame().lab.job.is_some());

        tokio::time::sleep(Duration::from_millis(200)).await;
        let frame = handle.frame();
        assert!(frame.lab.result.is_some());
        assert!(frame.plant.log.contains("Analysis of batch"));
        handle.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_history_served_on_request() {
        let handle = handle();
        tokio::time::sleep(Duration::from_millis(2500)).await;
        let history = handle.history().await.unwrap();
        assert_eq!(history.recent.len(), 2);
        assert!(history.minute.is_empty());
        handle.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_is_idempotent_and_halts_ticks() {
        let handle = handle();
        handle.send(Command::StartReactor).await.unwrap();
        handle.send(Command::RunDiagnostics).await.unwrap();
        handle.stop();
        handle.stop();
        assert!(handle.is_stopped());

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(matches!(
            handle.send(Command::StopReactor).await,
            Err(RuntimeError::Stopped)
        ));
        let frame = handle.frame();
        assert_eq!(frame.counters.total(), 0);
        assert!(frame.diagnostics_running, "deferred job cancelled with the driver");

        let engine = handle.shutdown().await.unwrap();
        assert_eq!(engine.history().recent_len(), 0);
    }
}
