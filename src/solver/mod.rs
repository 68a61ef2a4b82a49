//! Simulation of a dataflow graph over discrete time steps.
//!
//! ## Scheduling
//!
//! The execution order of blocks is not fixed ahead of time. Every step
//! clears all ready flags and then sweeps the block list:
//!
//! ```text
//! pending = all blocks
//! while pending is not empty:
//!     for each block in pending:
//!         if block is a source or all of its inputs are ready:
//!             compute it, mark its outputs ready
//!     pending = blocks that were not computed
//!     if nothing was computed in this pass: deadlock, give up on this step
//! ```
//!
//! Integrators are sources, so feedback loops through an integrator always
//! resolve: the integrator publishes its new state and the rest of the loop
//! follows. A loop of purely algebraic blocks cannot resolve and is reported
//! as a deadlock.
//!
//! ## Integration
//!
//! Stateful blocks use forward Euler, `x(n+1) = x(n) + dt * dx`.

mod euler;
mod scheduler;

pub use euler::{forward_euler, integrate_states};
pub use scheduler::{run, step, RunStats};

/// Slack added to `tmax / dt` so that the last time point is not lost to
/// rounding, e.g. `0.3 / 0.1 = 2.9999999999999996`.
pub const STEP_EPSILON: f64 = 1e-9;

/// Largest number of time points a single `calc` may simulate.
pub const MAX_STEPS: usize = 100_000_000;
