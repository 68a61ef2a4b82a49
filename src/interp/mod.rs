//! Evaluation of parsed programs.
//!
//! Evaluating an expression returns a [`Value`] and, as a side effect, adds
//! blocks to the interpreter's [`Sim`](crate::graph::Sim):
//!
//! | Expression | Graph |
//! |------------|-------|
//! | `3` | `num(3)` source |
//! | `a + b` | `add` fed by `a` and `b` |
//! | `a - b` | `add` fed by `a` and a `-1` gain of `b` |
//! | `a * b` | `mult` fed by `a` and `b` |
//! | `a / b` | `div` fed by `a` and `b` |
//! | `-a` | `-1` gain of `a` |
//! | `a @ b` | rewires the first input of `b` to `a` |
//!
//! Blocks whose whole upstream is constant are computed on the spot, so
//! `print(1 + 2)` shows `3.0` without running a simulation.

mod builtins;
mod config;
mod env;
mod format;
mod interpreter;
mod value;

pub use builtins::{render_plot, Routine, PLOT_HEIGHT, PLOT_WIDTH};
pub use config::{
    EngineConfig, DEFAULT_EQUALITY_TOLERANCE, DEFAULT_MAX_CALL_DEPTH, DEFAULT_PRECISION,
};
pub use env::Env;
pub use format::{format_number, render, round_to};
pub use interpreter::{FunctionHost, Interpreter};
pub use value::Value;
