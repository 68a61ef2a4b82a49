//! # Blockscript Core
//!
//! A small language for describing block diagrams, and the dataflow
//! simulator that runs them.
//!
//! This library provides:
//! - A DSL whose arithmetic builds a graph of signal-processing blocks
//! - A readiness-driven scheduler with forward-Euler integration
//! - Translation of JSON diagrams from a graphical editor into programs
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`dsl`] - Lexer and parser for the block language
//! - [`graph`] - Blocks, signals and the graph that owns them
//! - [`solver`] - Simulation scheduling and integration
//! - [`interp`] - Program evaluation and built-in routines
//! - [`diagram`] - JSON diagram translation
//! - [`executor`] - Running programs and capturing their output
//!
//! ## Usage
//!
//! ### Native CLI
//!
//! ```bash
//! blockscript model.bs
//! blockscript --diagram model.json --timeout 5
//! ```
//!
//! ### Library
//!
//! ```
//! use blockscript_core::{run_source, EngineConfig};
//!
//! let out = run_source("x = 2\nprint(x * (1 + 2))", &EngineConfig::default());
//! assert_eq!(out, "6.0\n");
//! ```
//!
//! ## Simulation Method
//!
//! `calc(dt, tmax)` advances time in steps of `dt`. In each step every block
//! is computed once, as soon as all of its inputs have been produced in that
//! step. Integrators and other sources publish their values first, which
//! breaks feedback loops. Integrator states then advance with forward Euler.

pub mod diagram;
pub mod dsl;
pub mod error;
pub mod executor;
pub mod graph;
pub mod interp;
pub mod solver;

// Re-export main types for convenience
pub use error::{EngineError, Result};
pub use executor::run_source;
pub use graph::Sim;
pub use interp::{EngineConfig, Interpreter};

// WASM bindings
#[cfg(feature = "wasm")]
mod wasm;

#[cfg(feature = "wasm")]
pub use wasm::WasmEngine;
