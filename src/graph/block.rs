//! Block kinds and block instances.

use std::fmt;
use std::rc::Rc;

use super::types::{BlockId, SignalId};
use super::Host;
use crate::dsl::Fun;
use crate::error::{EngineError, Result};

/// The closed set of block kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    /// Constant source, or a gain once its input is wired
    Num,
    /// Sum of two inputs
    Add,
    /// Forward-Euler integrator
    Integ,
    /// Quotient of two inputs
    Div,
    /// Product of two inputs
    Mult,
    /// Simulation time
    Time,
    /// User function evaluated every step
    Fun,
}

/// Declared shape of a block kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shape {
    /// Number of input slots
    pub inputs: usize,
    /// Number of output signals
    pub outputs: usize,
    /// Number of parameters the kind takes
    pub params: usize,
    /// Parameters used when none are given
    pub default_params: &'static [f64],
    /// Initial states; also fixes the state count
    pub default_states: &'static [f64],
}

impl BlockKind {
    /// Every block kind, in the order they are documented.
    pub const ALL: [BlockKind; 7] = [
        BlockKind::Num,
        BlockKind::Add,
        BlockKind::Integ,
        BlockKind::Div,
        BlockKind::Mult,
        BlockKind::Time,
        BlockKind::Fun,
    ];

    /// Resolve a constructor name used in programs.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Constructor name used in programs.
    pub fn name(self) -> &'static str {
        match self {
            BlockKind::Num => "num",
            BlockKind::Add => "add",
            BlockKind::Integ => "integ",
            BlockKind::Div => "div",
            BlockKind::Mult => "mult",
            BlockKind::Time => "time",
            BlockKind::Fun => "fun",
        }
    }

    /// Declared shape. For [`BlockKind::Fun`] the slot counts are placeholders;
    /// the real counts come from the wrapped function.
    pub fn shape(self) -> Shape {
        const NONE: &[f64] = &[];
        let (inputs, outputs, params, default_params, default_states) = match self {
            BlockKind::Num => (1, 1, 1, &[1.0][..], NONE),
            BlockKind::Add | BlockKind::Div | BlockKind::Mult => (2, 1, 0, NONE, NONE),
            BlockKind::Integ => (1, 1, 0, NONE, &[0.0][..]),
            BlockKind::Time => (0, 1, 0, NONE, NONE),
            BlockKind::Fun => (1, 1, 2, NONE, NONE),
        };
        Shape {
            inputs,
            outputs,
            params,
            default_params,
            default_states,
        }
    }

    /// Stateless kinds are computed directly from their inputs.
    pub fn is_inert(self) -> bool {
        !matches!(self, BlockKind::Integ)
    }

    /// Sources are computable without ready inputs.
    pub fn is_source(self) -> bool {
        matches!(
            self,
            BlockKind::Num | BlockKind::Integ | BlockKind::Time | BlockKind::Fun
        )
    }

    /// Whether a block of this kind with constant inputs is itself constant.
    pub fn folds_constants(self) -> bool {
        !matches!(self, BlockKind::Integ | BlockKind::Time)
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A block parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Number(f64),
    Function(Rc<Fun>),
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Param::Number(v) => write!(f, "{}", v),
            Param::Function(fun) => write!(f, "{}", fun),
        }
    }
}

/// What a block computes in one step.
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation {
    /// New output values (inert blocks)
    Outputs(Vec<f64>),
    /// Derivative to integrate into every state (non-inert blocks)
    Derivative(f64),
}

/// A node of the dataflow graph.
#[derive(Debug, Clone)]
pub struct Block {
    pub id: BlockId,
    pub kind: BlockKind,
    /// Input slots; `None` reads as a constant zero
    pub inputs: Vec<Option<SignalId>>,
    pub outputs: Vec<SignalId>,
    pub params: Vec<Param>,
    pub states: Vec<f64>,
    /// States restored before every simulation run
    pub initial_states: Vec<f64>,
    pub inert: bool,
    pub source: bool,
    /// Entire upstream is constant
    pub constant: bool,
}

impl Block {
    /// Numeric parameter at `index`.
    pub fn number_param(&self, index: usize) -> Result<f64> {
        match self.params.get(index) {
            Some(Param::Number(v)) => Ok(*v),
            Some(Param::Function(_)) => Err(EngineError::type_error(format!(
                "parameter {} of block '{}' must be a number",
                index, self.kind
            ))),
            None => Err(EngineError::ArityError {
                kind: self.kind.to_string(),
                what: "parameters",
                expected: index + 1,
                actual: self.params.len(),
            }),
        }
    }

    /// Function parameter at `index`.
    pub fn function_param(&self, index: usize) -> Result<&Rc<Fun>> {
        match self.params.get(index) {
            Some(Param::Function(fun)) => Ok(fun),
            _ => Err(EngineError::type_error(format!(
                "parameter {} of block '{}' must be a function",
                index, self.kind
            ))),
        }
    }

    /// Compute this block for time `t` from its input values.
    pub fn evaluate(&self, t: f64, inputs: &[f64], host: &mut dyn Host) -> Result<Evaluation> {
        let input = |i: usize| inputs.get(i).copied().unwrap_or(0.0);

        let outputs = match self.kind {
            BlockKind::Num => {
                let par = self.number_param(0)?;
                if self.source {
                    vec![par]
                } else {
                    vec![par * input(0)]
                }
            }
            BlockKind::Add => vec![input(0) + input(1)],
            BlockKind::Mult => vec![input(0) * input(1)],
            BlockKind::Div => {
                if input(1) == 0.0 {
                    return Err(EngineError::division_by_zero());
                }
                vec![input(0) / input(1)]
            }
            BlockKind::Time => vec![t],
            BlockKind::Integ => return Ok(Evaluation::Derivative(input(0))),
            BlockKind::Fun => {
                let fun = self.function_param(0)?;
                let values = host.call_function(fun, inputs)?;
                if values.len() < self.outputs.len() {
                    return Err(EngineError::type_error(format!(
                        "function '{}' returned {} value(s), block needs {}",
                        fun.name,
                        values.len(),
                        self.outputs.len()
                    )));
                }
                values[..self.outputs.len()].to_vec()
            }
        };
        Ok(Evaluation::Outputs(outputs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::tests::NoCalls;

    fn block(kind: BlockKind, params: Vec<Param>, source: bool) -> Block {
        Block {
            id: BlockId(0),
            kind,
            inputs: vec![None; kind.shape().inputs],
            outputs: vec![SignalId(0)],
            params,
            states: kind.shape().default_states.to_vec(),
            initial_states: kind.shape().default_states.to_vec(),
            inert: kind.is_inert(),
            source,
            constant: false,
        }
    }

    #[test]
    fn test_kind_names_round_trip() {
        for kind in BlockKind::ALL {
            assert_eq!(BlockKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(BlockKind::from_name("print"), None);
    }

    #[test]
    fn test_num_source_and_gain() {
        let mut b = block(BlockKind::Num, vec![Param::Number(3.0)], true);
        assert_eq!(
            b.evaluate(0.0, &[2.0], &mut NoCalls).unwrap(),
            Evaluation::Outputs(vec![3.0])
        );
        b.source = false;
        assert_eq!(
            b.evaluate(0.0, &[2.0], &mut NoCalls).unwrap(),
            Evaluation::Outputs(vec![6.0])
        );
    }

    #[test]
    fn test_division_by_zero() {
        let b = block(BlockKind::Div, vec![], false);
        let err = b.evaluate(0.0, &[1.0, 0.0], &mut NoCalls).unwrap_err();
        assert!(err.to_string().contains("division by zero"));
    }

    #[test]
    fn test_integrator_returns_derivative() {
        let b = block(BlockKind::Integ, vec![], true);
        assert_eq!(
            b.evaluate(0.0, &[0.5], &mut NoCalls).unwrap(),
            Evaluation::Derivative(0.5)
        );
    }

    #[test]
    fn test_time_outputs_t() {
        let b = block(BlockKind::Time, vec![], true);
        assert_eq!(
            b.evaluate(1.25, &[], &mut NoCalls).unwrap(),
            Evaluation::Outputs(vec![1.25])
        );
    }
}
