//! Systems - the models that advance on each tick

mod alarms;
mod diagnostics;
mod fleet;
mod history;
mod lab;
mod plant;
mod reactor;

pub use alarms::*;
pub use diagnostics::*;
pub use fleet::*;
pub use history::*;
pub use lab::*;
pub use plant::*;
pub use reactor::*;
