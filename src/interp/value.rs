//! Runtime values.

use std::rc::Rc;

use crate::dsl::{Fun, PortDir};
use crate::error::{EngineError, Result};
use crate::graph::{BlockId, SignalId, Sim};

/// A value produced by evaluating an expression.
///
/// Numbers never appear on their own: every number is the output of a block
/// in the graph, which is what lets arithmetic build the graph.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Result of statements and routines that produce nothing
    Unit,
    /// Result of a comparison or logical operator
    Bool(bool),
    /// A block; as a signal it stands for its first output
    Block(BlockId),
    /// One input or output slot of a block
    Port {
        block: BlockId,
        dir: PortDir,
        slot: usize,
    },
    /// `block.in` or `block.out`
    Ports(BlockId, PortDir),
    /// Ordered heterogeneous array
    Array(Rc<[Value]>),
    /// User function
    Fun(Rc<Fun>),
}

impl Value {
    /// Short name of the value's type for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Unit => "none",
            Value::Bool(_) => "boolean",
            Value::Block(_) => "block",
            Value::Port { .. } => "port",
            Value::Ports(..) => "port list",
            Value::Array(_) => "array",
            Value::Fun(_) => "function",
        }
    }

    /// The signal this value carries.
    ///
    /// Input ports carry the signal wired into them.
    pub fn signal(&self, sim: &Sim) -> Result<SignalId> {
        match *self {
            Value::Block(block) => sim.output(block, 0),
            Value::Port {
                block,
                dir: PortDir::Out,
                slot,
            } => sim.output(block, slot),
            Value::Port {
                block,
                dir: PortDir::In,
                slot,
            } => sim.input(block, slot)?.ok_or_else(|| {
                EngineError::type_error(format!(
                    "input {} of block {}{} is not wired",
                    slot,
                    sim.block(block).kind,
                    block
                ))
            }),
            _ => Err(EngineError::type_error(format!(
                "expected a signal, found {}",
                self.type_name()
            ))),
        }
    }

    /// Current numeric value of a signal-carrying value.
    ///
    /// Unwired input ports read as zero.
    pub fn number(&self, sim: &Sim) -> Result<f64> {
        match *self {
            Value::Port {
                block,
                dir: PortDir::In,
                slot,
            } => Ok(sim.input(block, slot)?.map_or(0.0, |signal| sim.value(signal))),
            _ => Ok(sim.value(self.signal(sim)?)),
        }
    }

    /// The boolean of a condition.
    pub fn truth(&self, what: &str) -> Result<bool> {
        match self {
            Value::Bool(b) => Ok(*b),
            other => Err(EngineError::type_error(format!(
                "{} needs a boolean, found {}",
                what,
                other.type_name()
            ))),
        }
    }
}
