//! Error types for the Blockscript engine.
//!
//! This module provides a unified error type [`EngineError`] that covers
//! every failure that can occur while lexing, parsing, evaluating a program
//! or driving its simulation. At the process boundary these errors are turned
//! into text and appended to the program's captured output.

use thiserror::Error;

/// Result type alias using [`EngineError`].
pub type Result<T> = std::result::Result<T, EngineError>;

/// Unified error type for all Blockscript operations.
#[derive(Error, Debug)]
pub enum EngineError {
    // ============ Source Errors ============
    /// Unrecognized character in the source text
    #[error("Lexer error at line {line}, column {column}: {message}")]
    LexerError {
        line: usize,
        column: usize,
        message: String,
    },

    /// Grammar violation
    #[error("Syntax error at line {line}, column {column}: expected {expected}, found {found}")]
    SyntaxError {
        line: usize,
        column: usize,
        expected: String,
        found: String,
    },

    /// Reserved syntax with no semantics
    #[error("Syntax error at line {line}: {feature} is not supported")]
    UnsupportedSyntax { line: usize, feature: String },

    // ============ Evaluation Errors ============
    /// Block parameter or state count does not match the block's shape
    #[error("Number of {what} for block '{kind}' does not match: need {expected}, got {actual}")]
    ArityError {
        kind: String,
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// User function called with the wrong number of arguments
    #[error("Function '{name}' takes {expected} argument(s), got {actual}")]
    ArgumentCount {
        name: String,
        expected: usize,
        actual: usize,
    },

    /// Arithmetic failure inside a block
    #[error("Arithmetic error: {message}")]
    ArithmeticError { message: String },

    /// Operand of the wrong kind
    #[error("Type error: {message}")]
    TypeError { message: String },

    /// Call of a name that is neither a block kind, a routine nor a function
    #[error("Undefined function '{name}'")]
    UndefinedFunction { name: String },

    /// Index past the end of an array or port list
    #[error("Index {index} is out of range for a collection of length {len}")]
    IndexOutOfRange { index: i64, len: usize },

    /// `return` reached the top level of a program
    #[error("'return' used outside of a function")]
    ReturnOutsideFunction,

    /// Too many nested function calls
    #[error("Maximum call depth of {depth} exceeded")]
    RecursionLimit { depth: usize },

    // ============ Simulation Errors ============
    /// Invalid simulation parameter
    #[error("Invalid simulation parameter: {message}")]
    InvalidSimulationParam { message: String },

    // ============ Diagram Errors ============
    /// The diagram JSON is well formed but cannot be translated
    #[error("Invalid diagram: {message}")]
    InvalidDiagram { message: String },

    /// The diagram JSON is malformed
    #[error("Failed to parse diagram JSON: {0}")]
    Json(#[from] serde_json::Error),

    // ============ I/O Errors ============
    /// Error reading a program file
    #[error("Failed to read program file '{path}': {source}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Error writing program output
    #[error("Output error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Create a lexer error
    pub fn lexer(line: usize, column: usize, message: impl Into<String>) -> Self {
        Self::LexerError {
            line,
            column,
            message: message.into(),
        }
    }

    /// Create a syntax error
    pub fn syntax(
        line: usize,
        column: usize,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Self::SyntaxError {
            line,
            column,
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Create a type error
    pub fn type_error(message: impl Into<String>) -> Self {
        Self::TypeError {
            message: message.into(),
        }
    }

    /// Create a division by zero error
    pub fn division_by_zero() -> Self {
        Self::ArithmeticError {
            message: "division by zero".to_string(),
        }
    }

    /// Create an invalid simulation parameter error
    pub fn invalid_param(message: impl Into<String>) -> Self {
        Self::InvalidSimulationParam {
            message: message.into(),
        }
    }

    /// Create an invalid diagram error
    pub fn invalid_diagram(message: impl Into<String>) -> Self {
        Self::InvalidDiagram {
            message: message.into(),
        }
    }
}
