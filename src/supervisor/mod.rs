//! Supervisor module: orchestration and state tracking.

mod runner;
mod state;

pub use runner::*;
pub use state::*;
