//! Components - plain data records owned and mutated by the models

mod event_log;
mod fleet;
mod lab;
mod plant;
mod process;

pub use event_log::*;
pub use fleet::*;
pub use lab::*;
pub use plant::*;
pub use process::*;
