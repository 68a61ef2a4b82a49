//! Engine configuration.

/// Decimal places printed numbers are rounded to.
pub const DEFAULT_PRECISION: u32 = 5;

/// Relative tolerance of `==` and `!=`.
pub const DEFAULT_EQUALITY_TOLERANCE: f64 = 1e-9;

/// Nested user-function calls allowed before a program is stopped.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 200;

/// Configuration for evaluating programs.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Decimal places printed numbers are rounded to; `None` prints the
    /// shortest exact representation.
    pub precision: Option<u32>,
    /// Relative tolerance used by `==` and `!=`.
    pub equality_tolerance: f64,
    /// Maximum nesting of user-function calls.
    pub max_call_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            precision: Some(DEFAULT_PRECISION),
            equality_tolerance: DEFAULT_EQUALITY_TOLERANCE,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }
}

impl EngineConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of decimal places printed numbers are rounded to.
    pub fn with_precision(mut self, precision: Option<u32>) -> Self {
        self.precision = precision;
        self
    }

    /// Set the relative tolerance of `==` and `!=`.
    pub fn with_equality_tolerance(mut self, tolerance: f64) -> Self {
        self.equality_tolerance = tolerance;
        self
    }

    /// Set the maximum nesting of user-function calls.
    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    /// Tolerant equality of two signal values.
    pub fn values_equal(&self, a: f64, b: f64) -> bool {
        approx::relative_eq!(
            a,
            b,
            epsilon = f64::EPSILON,
            max_relative = self.equality_tolerance
        )
    }
}
