//! PyroSim Core - real-time industrial process simulator
//!
//! A pyrolysis reactor, a tyre recycling line, a biochar quality lab and a
//! fleet overview, advanced together on a shared clock. Every reading is a
//! nominal value with bounded noise; state transitions are deterministic
//! given the RNG seed.
//!
//! # Architecture
//!
//! - **Components**: plain data (process snapshot, plant state, lab status,
//!   fleet units, operator logs)
//! - **Systems**: the models that own and mutate that data once per tick
//! - **Engine**: owns every model, applies commands and routes plant events
//!   to the lab
//! - **Drivers**: [`scheduler::TickScheduler`] runs in simulated time,
//!   [`runtime::spawn`] runs in real time on tokio
//!
//! # Example
//!
//! ```rust,no_run
//! use pyrosim_core::prelude::*;
//!
//! let engine = SimulationEngine::new(EngineConfig::seeded(42));
//! let mut scheduler = TickScheduler::new(engine);
//!
//! scheduler.apply(Command::StartReactor);
//! scheduler.apply(Command::SetPlant { running: true, tons_per_day: 50.0 });
//! scheduler.run_secs(600);
//!
//! println!("{:?}", scheduler.engine().snapshot().system_mode);
//! ```

pub mod components;
pub mod config;
pub mod engine;
pub mod runtime;
pub mod scheduler;
pub mod systems;

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::components::*;
    pub use crate::config::{ConfigError, EngineConfig};
    pub use crate::engine::{Command, DeferredJob, Frame, SimulationEngine};
    pub use crate::scheduler::TickScheduler;
    pub use pyrosim_logic::alarm::{AlarmConfig, AlarmLevel, Signal};
}
