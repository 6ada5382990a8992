//! Command-list replay.

mod interpreter;
mod scissor;
mod stats;

pub use interpreter::{CommandListInterpreter, PassState};
pub use stats::ReplayStats;
