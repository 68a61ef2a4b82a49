//! WASM bindings for Blockscript Core.
//!
//! This module provides JavaScript-friendly bindings for running programs
//! in a browser playground.
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { WasmEngine, translate_diagram } from 'blockscript_core';
//!
//! await init();
//!
//! const engine = new WasmEngine(5);
//! const output = engine.run(`
//!   y = integ()
//!   e = 1 - y
//!   e @ y
//!   calc(0.0001, 1)
//!   print(y)
//! `);
//!
//! const source = translate_diagram(JSON.stringify(diagram));
//! ```

use wasm_bindgen::prelude::*;

use crate::diagram;
use crate::executor::run_source;
use crate::interp::EngineConfig;

/// Nested user-function calls allowed in the browser. WASM programs run on
/// the caller's stack, which is far smaller than a native evaluation thread's.
pub const WASM_MAX_CALL_DEPTH: usize = 64;

fn config(precision: Option<u32>) -> EngineConfig {
    EngineConfig::new()
        .with_precision(precision)
        .with_max_call_depth(WASM_MAX_CALL_DEPTH)
}

/// Initialize panic hook for better error messages in browser console.
#[wasm_bindgen(start)]
pub fn init_panic_hook() {
    console_error_panic_hook::set_once();
}

/// A program runner with fixed output settings.
#[wasm_bindgen]
pub struct WasmEngine {
    config: EngineConfig,
}

#[wasm_bindgen]
impl WasmEngine {
    /// Create an engine printing numbers with `precision` decimal places.
    #[wasm_bindgen(constructor)]
    pub fn new(precision: u32) -> WasmEngine {
        WasmEngine {
            config: config(Some(precision)),
        }
    }

    /// Run a program and return everything it printed. Errors are part of
    /// the returned text.
    #[wasm_bindgen]
    pub fn run(&self, source: &str) -> String {
        run_source(source, &self.config)
    }

    /// Decimal places of printed numbers.
    #[wasm_bindgen(getter)]
    pub fn precision(&self) -> Option<u32> {
        self.config.precision
    }
}

/// Run a program with the default settings.
#[wasm_bindgen]
pub fn run_program(source: &str) -> String {
    run_source(source, &config(EngineConfig::default().precision))
}

/// Translate diagram JSON into program source.
#[wasm_bindgen]
pub fn translate_diagram(json: &str) -> Result<String, JsValue> {
    diagram::translate(json).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Get the library version.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
