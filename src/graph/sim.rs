//! The simulation arena.

use std::fmt;

use log::debug;

use super::block::{Block, BlockKind, Evaluation, Param};
use super::signal::Signal;
use super::types::{BlockId, SignalId};
use super::Host;
use crate::error::{EngineError, Result};
use crate::solver::integrate_states;

/// Owns every block and signal created while one program is evaluated,
/// together with the time points of the last simulation run.
#[derive(Debug, Clone, Default)]
pub struct Sim {
    blocks: Vec<Block>,
    signals: Vec<Signal>,
    time_history: Vec<f64>,
}

impl Sim {
    /// Create an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a block of `kind`.
    ///
    /// `params` and `states` fall back to the kind's defaults when `None`;
    /// when given, their lengths must match the kind's shape. `num` blocks
    /// are evaluated immediately so their value is usable before any run.
    pub fn create(
        &mut self,
        kind: BlockKind,
        params: Option<Vec<Param>>,
        states: Option<Vec<f64>>,
        host: &mut dyn Host,
    ) -> Result<BlockId> {
        let shape = kind.shape();

        let params = match params {
            None => shape
                .default_params
                .iter()
                .map(|&v| Param::Number(v))
                .collect(),
            Some(params) if params.len() == shape.params => params,
            Some(params) => {
                return Err(EngineError::ArityError {
                    kind: kind.to_string(),
                    what: "parameters",
                    expected: shape.params,
                    actual: params.len(),
                })
            }
        };

        let states = match states {
            None => shape.default_states.to_vec(),
            Some(states) if states.len() == shape.default_states.len() => states,
            Some(states) => {
                return Err(EngineError::ArityError {
                    kind: kind.to_string(),
                    what: "states",
                    expected: shape.default_states.len(),
                    actual: states.len(),
                })
            }
        };

        let (input_count, output_count) = if kind == BlockKind::Fun {
            fun_slots(&params)?
        } else {
            (shape.inputs, shape.outputs)
        };

        let id = BlockId(self.blocks.len());
        let mut outputs = Vec::with_capacity(output_count);
        for i in 0..output_count {
            let mut signal = Signal::new(id);
            if let Some(&state) = states.get(i) {
                signal.reset(state);
            }
            outputs.push(SignalId(self.signals.len()));
            self.signals.push(signal);
        }

        debug!(
            "created {} block {} with {} input(s) and {} output(s)",
            kind, id, input_count, output_count
        );

        self.blocks.push(Block {
            id,
            kind,
            inputs: vec![None; input_count],
            outputs,
            params,
            initial_states: states.clone(),
            states,
            inert: kind.is_inert(),
            source: kind.is_source(),
            constant: false,
        });

        if kind == BlockKind::Num {
            self.refresh(id, host)?;
        }
        Ok(id)
    }

    /// Wire `signal` into input `slot` of `block`, replacing what was there.
    ///
    /// A `num` block stops being a source once its input is wired and acts
    /// as a gain from then on.
    pub fn connect(
        &mut self,
        signal: SignalId,
        block: BlockId,
        slot: usize,
        host: &mut dyn Host,
    ) -> Result<()> {
        let target = &mut self.blocks[block.0];
        let len = target.inputs.len();
        let entry = target
            .inputs
            .get_mut(slot)
            .ok_or(EngineError::IndexOutOfRange {
                index: slot as i64,
                len,
            })?;
        *entry = Some(signal);
        if target.kind == BlockKind::Num {
            target.source = false;
        }
        debug!("wired {} into input {} of {}{}", signal, slot, target.kind, block);

        self.refresh(block, host)
    }

    /// Recompute whether `id` is constant and, if it is, evaluate it now.
    ///
    /// Unwired inputs count as constant.
    pub fn refresh(&mut self, id: BlockId, host: &mut dyn Host) -> Result<()> {
        let block = &self.blocks[id.0];
        let constant = block.kind.folds_constants()
            && block.inputs.iter().flatten().all(|signal| {
                let owner = self.signals[signal.0].owner;
                self.blocks[owner.0].constant
            });
        self.blocks[id.0].constant = constant;

        if constant {
            debug!("folding constant block {}{}", self.blocks[id.0].kind, id);
            self.compute(id, 0.0, 0.0, host)?;
        }
        Ok(())
    }

    /// Compute one block at time `t` and mark its outputs ready.
    ///
    /// Unwired inputs read as zero. Non-inert blocks integrate the returned
    /// derivative into every state with step `dt` and publish the states.
    pub fn compute(&mut self, id: BlockId, t: f64, dt: f64, host: &mut dyn Host) -> Result<()> {
        let inputs: Vec<f64> = self.blocks[id.0]
            .inputs
            .iter()
            .map(|slot| slot.map_or(0.0, |signal| self.signals[signal.0].value()))
            .collect();
        let evaluation = self.blocks[id.0].evaluate(t, &inputs, host)?;

        let block = &mut self.blocks[id.0];
        match evaluation {
            Evaluation::Outputs(values) => {
                for (signal, value) in block.outputs.iter().zip(values) {
                    self.signals[signal.0].set(value);
                }
            }
            Evaluation::Derivative(derivative) => {
                integrate_states(&mut block.states, dt, derivative);
                for (signal, &state) in block.outputs.iter().zip(&block.states) {
                    self.signals[signal.0].set(state);
                }
            }
        }
        for signal in &block.outputs {
            self.signals[signal.0].ready = true;
        }
        Ok(())
    }

    /// Whether a block can be computed in the current step.
    pub fn is_ready(&self, id: BlockId) -> bool {
        let block = &self.blocks[id.0];
        block.source
            || block
                .inputs
                .iter()
                .flatten()
                .all(|signal| self.signals[signal.0].ready)
    }

    /// Clear every signal's ready flag at the start of a step.
    pub fn clear_ready(&mut self) {
        for signal in &mut self.signals {
            signal.ready = false;
        }
    }

    /// Prepare for a new simulation run.
    ///
    /// Histories are cleared, states go back to their initial values and
    /// every output that is not constant starts again from its initial value.
    pub fn reset_for_run(&mut self) {
        self.time_history.clear();
        for block in &mut self.blocks {
            block.states.clone_from(&block.initial_states);
            for (i, id) in block.outputs.iter().enumerate() {
                let signal = &mut self.signals[id.0];
                if !block.inert {
                    signal.reset(block.states.get(i).copied().unwrap_or(0.0));
                } else if block.constant {
                    signal.clear_history();
                } else {
                    signal.reset(0.0);
                }
            }
        }
    }

    /// Record a simulated time point.
    pub fn push_time(&mut self, t: f64) {
        self.time_history.push(t);
    }

    /// Time points of the last run.
    pub fn time_history(&self) -> &[f64] {
        &self.time_history
    }

    /// Block by handle.
    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id.0]
    }

    /// All blocks in creation order.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Handles of all blocks in creation order.
    pub fn block_ids(&self) -> impl Iterator<Item = BlockId> {
        (0..self.blocks.len()).map(BlockId)
    }

    /// Number of blocks.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Whether no block has been created.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Signal by handle.
    pub fn signal(&self, id: SignalId) -> &Signal {
        &self.signals[id.0]
    }

    /// Current value of a signal.
    pub fn value(&self, id: SignalId) -> f64 {
        self.signals[id.0].value()
    }

    /// Output signal `index` of `block`.
    pub fn output(&self, block: BlockId, index: usize) -> Result<SignalId> {
        let outputs = &self.blocks[block.0].outputs;
        outputs
            .get(index)
            .copied()
            .ok_or(EngineError::IndexOutOfRange {
                index: index as i64,
                len: outputs.len(),
            })
    }

    /// Signal wired into input `index` of `block`, if any.
    pub fn input(&self, block: BlockId, index: usize) -> Result<Option<SignalId>> {
        let inputs = &self.blocks[block.0].inputs;
        inputs
            .get(index)
            .copied()
            .ok_or(EngineError::IndexOutOfRange {
                index: index as i64,
                len: inputs.len(),
            })
    }
}

/// Largest number of outputs a `fun` block may declare.
pub const MAX_FUN_OUTPUTS: usize = 1024;

/// Input and output counts of a `fun` block from its parameters.
fn fun_slots(params: &[Param]) -> Result<(usize, usize)> {
    let fun = match params.first() {
        Some(Param::Function(fun)) => fun,
        _ => {
            return Err(EngineError::type_error(
                "first parameter of block 'fun' must be a function",
            ))
        }
    };
    let outputs = match params.get(1) {
        Some(Param::Number(n))
            if n.fract() == 0.0 && *n >= 1.0 && *n <= MAX_FUN_OUTPUTS as f64 =>
        {
            *n as usize
        }
        _ => {
            return Err(EngineError::type_error(format!(
                "second parameter of block 'fun' must be a whole number of outputs from 1 to {}",
                MAX_FUN_OUTPUTS
            )))
        }
    };
    Ok((fun.arity(), outputs))
}

impl fmt::Display for Sim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "----- sim: {} block(s) -----", self.blocks.len())?;
        for block in &self.blocks {
            let mut flags = Vec::new();
            if block.source {
                flags.push("source");
            }
            if !block.inert {
                flags.push("stateful");
            }
            if block.constant {
                flags.push("const");
            }
            let params: Vec<String> = block.params.iter().map(|p| p.to_string()).collect();
            let inputs: Vec<String> = block
                .inputs
                .iter()
                .map(|slot| match slot {
                    Some(signal) => signal.to_string(),
                    None => "-".to_string(),
                })
                .collect();
            let outputs: Vec<String> = block
                .outputs
                .iter()
                .map(|signal| format!("{}={}", signal, self.value(*signal)))
                .collect();
            writeln!(
                f,
                "{}{} [{}] params=[{}] states={:?} in=[{}] out=[{}]",
                block.kind,
                block.id,
                flags.join(", "),
                params.join(", "),
                block.states,
                inputs.join(", "),
                outputs.join(", ")
            )?;
        }
        write!(f, "---------------------------")
    }
}
