mod break_state;
mod breakpoints;
mod controller;
mod history;
mod stepping;

pub use break_state::{BreakState, BreakTriggers};
pub use breakpoints::Breakpoints;
pub use controller::{ConnectionState, DebugController};
pub use history::CallHistory;
pub use stepping::StepMode;
