//! Dataflow graph: blocks, signals and the simulation arena.
//!
//! Blocks and signals live in a [`Sim`] and refer to each other through
//! [`BlockId`] and [`SignalId`] handles, so the graph may contain feedback
//! cycles and may be rewired at any time while a program is evaluated.

mod block;
mod signal;
mod sim;
mod types;

pub use block::{Block, BlockKind, Evaluation, Param, Shape};
pub use signal::Signal;
pub use sim::{Sim, MAX_FUN_OUTPUTS};
pub use types::*;

use crate::dsl::Fun;
use crate::error::Result;

/// Services the graph needs from the program that owns it.
///
/// `fun` blocks evaluate a user function every step, and the scheduler
/// reports deadlocked steps; both go through the host.
pub trait Host {
    /// Call `fun` with one numeric argument per parameter and return the
    /// values of its results.
    fn call_function(&mut self, fun: &Fun, args: &[f64]) -> Result<Vec<f64>>;

    /// Write a diagnostic line into the program's output.
    fn diagnostic(&mut self, message: &str) -> Result<()>;
}
