//! DSL (Domain Specific Language) front end for block-diagram programs.
//!
//! Programs describe signal-flow systems: arithmetic on values builds a
//! dataflow graph of blocks, `@` wires signals into block inputs, and
//! `calc(dt, tmax)` simulates the graph.
//!
//! # Grammar Overview
//!
//! ```text
//! code       = assignment { sep assignment }*
//! assignment = "def" funcdef | "return" expr | "if" ifexpr | "while" whileexpr
//!            | [ NAME "=" ] logicExpr
//! logicExpr  = logicTerm { "or" logicTerm }*
//! logicTerm  = condition { "and" condition }*
//! condition  = ["not"] expr [ relOp expr ]
//! expr       = term { ("+"|"-") term }*
//! term       = factor { ("*"|"/"|"@") factor }*
//! factor     = ["+"] ["-"] ( NUMBER | "(" logicExpr ")" | "[" { logicExpr ","? }* "]" | named )
//! named      = NAME { "[" logicExpr "]" | "(" { logicExpr ","? }* ")" | "." ("in"|"out") }*
//! funcdef    = NAME "(" { NAME ","? }* ")" "{" code "}"
//! ifexpr     = logicExpr "{" code "}" { "else" "if" ifexpr }* [ "else" "{" code "}" ]
//! whileexpr  = logicExpr "{" code "}"
//! sep        = "\n" | ";"
//! ```
//!
//! `for` is a reserved word; loops over ranges are not part of the language.
//!
//! # Built-in Block Constructors
//!
//! | Call | Block |
//! |------|-------|
//! | `num(v)` | constant source, or gain once its input is wired |
//! | `add()` | sum of two inputs |
//! | `mult()` | product of two inputs |
//! | `div()` | quotient of two inputs |
//! | `integ()` | forward-Euler integrator |
//! | `time()` | simulation time |
//! | `fun(f, n)` | user function `f` with `n` outputs |
//!
//! # Example
//!
//! ```text
//! x = 1
//! y = integ()
//! e = x - y
//! e @ y
//! calc(0.001, 10)
//! print(y)
//! ```

mod ast;
mod lexer;
mod parser;

pub use ast::*;
pub use lexer::{tokenize, Lexer, Token, TokenKind};
pub use parser::{Attempt, Parser};

use crate::error::Result;

/// Parse a complete DSL program.
pub fn parse(input: &str) -> Result<Vec<Stmt>> {
    let lexer = Lexer::new(input);
    let mut parser = Parser::new(lexer)?;
    parser.parse_program()
}

/// Read a program file into memory.
#[cfg(feature = "cli")]
pub fn read_source(path: &std::path::Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| crate::error::EngineError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })
}
