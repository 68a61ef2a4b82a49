//! Statement and expression evaluation.

use std::io::Write;
use std::rc::Rc;

use log::{debug, trace};

use super::builtins::Routine;
use super::config::EngineConfig;
use super::env::Env;
use super::value::Value;
use crate::dsl::{BinOp, Expr, Fun, Lexer, LogicOp, Parser, PortDir, Stmt};
use crate::error::{EngineError, Result};
use crate::graph::{BlockId, BlockKind, Host, Param, Sim};

/// Non-local exit from a statement list.
#[derive(Debug)]
pub(crate) enum Unwind {
    /// `return` carrying the function result
    Return(Value),
    /// A failure that aborts the program
    Error(EngineError),
}

impl From<EngineError> for Unwind {
    fn from(err: EngineError) -> Self {
        Unwind::Error(err)
    }
}

type Flow<T> = std::result::Result<T, Unwind>;

/// Everything a graph needs from its program while it is simulated:
/// the output stream, the configuration and the call depth.
pub struct FunctionHost<'a> {
    pub(crate) out: &'a mut dyn Write,
    pub(crate) config: EngineConfig,
    pub(crate) depth: usize,
}

impl Host for FunctionHost<'_> {
    /// Run a `fun` block's function in a graph of its own, with one
    /// constant per argument.
    fn call_function(&mut self, fun: &Fun, args: &[f64]) -> Result<Vec<f64>> {
        if self.depth >= self.config.max_call_depth {
            return Err(EngineError::RecursionLimit {
                depth: self.config.max_call_depth,
            });
        }
        let mut nested = Interpreter::with_depth(&mut *self.out, self.config.clone(), self.depth + 1);
        nested.call_detached(fun, args)
    }

    fn diagnostic(&mut self, message: &str) -> Result<()> {
        writeln!(self.out, "{}", message)?;
        Ok(())
    }
}

/// Evaluates programs, building and simulating their dataflow graph.
///
/// Output of `print`, `plot`, `debug` and simulation diagnostics is written
/// to the stream given at construction.
pub struct Interpreter<'a> {
    pub(crate) sim: Sim,
    pub(crate) host: FunctionHost<'a>,
}

impl<'a> Interpreter<'a> {
    /// Create an interpreter writing to `out`.
    pub fn new(out: &'a mut dyn Write, config: EngineConfig) -> Self {
        Self::with_depth(out, config, 0)
    }

    fn with_depth(out: &'a mut dyn Write, config: EngineConfig, depth: usize) -> Self {
        Self {
            sim: Sim::new(),
            host: FunctionHost { out, config, depth },
        }
    }

    /// The graph built so far.
    pub fn sim(&self) -> &Sim {
        &self.sim
    }

    /// The active configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.host.config
    }

    /// Evaluate a program in a fresh environment.
    pub fn run(&mut self, source: &str) -> Result<()> {
        let mut env = Env::new();
        self.eval_source(source, &mut env).map(|_| ())
    }

    /// Evaluate a program statement by statement in `env`.
    ///
    /// Each statement is evaluated before the next one is parsed, so output
    /// of earlier statements is kept when a later one fails to parse.
    /// Returns the value of the last statement.
    pub fn eval_source(&mut self, source: &str, env: &mut Env) -> Result<Value> {
        let mut parser = Parser::new(Lexer::new(source))?;
        let mut last = Value::Unit;
        while let Some(stmt) = parser.next_statement()? {
            last = match self.exec(&stmt, env) {
                Ok(value) => value,
                Err(Unwind::Return(_)) => return Err(EngineError::ReturnOutsideFunction),
                Err(Unwind::Error(err)) => return Err(err),
            };
        }
        Ok(last)
    }

    // ---------------------------------------------------------------------
    // Statements

    fn exec_body(&mut self, body: &[Stmt], env: &mut Env) -> Flow<Value> {
        let mut last = Value::Unit;
        for stmt in body {
            last = self.exec(stmt, env)?;
        }
        Ok(last)
    }

    fn exec(&mut self, stmt: &Stmt, env: &mut Env) -> Flow<Value> {
        match stmt {
            Stmt::Def(fun) => {
                debug!("defined function {}", fun);
                let value = Value::Fun(Rc::clone(fun));
                env.set(fun.name.clone(), value.clone());
                Ok(value)
            }
            Stmt::Return(expr) => {
                let value = match expr {
                    Some(expr) => self.eval(expr, env)?,
                    None => Value::Unit,
                };
                Err(Unwind::Return(value))
            }
            Stmt::If {
                branches,
                otherwise,
            } => {
                for (cond, body) in branches {
                    if self.eval(cond, env)?.truth("'if'")? {
                        self.exec_body(body, env)?;
                        return Ok(Value::Unit);
                    }
                }
                if let Some(body) = otherwise {
                    self.exec_body(body, env)?;
                }
                Ok(Value::Unit)
            }
            Stmt::While { cond, body } => {
                let mut iterations = 0usize;
                loop {
                    // the condition sees the loop's bindings but cannot change them
                    let mut scratch = env.clone();
                    if !self.eval(cond, &mut scratch)?.truth("'while'")? {
                        break;
                    }
                    match self.exec_body(body, env) {
                        Ok(_) | Err(Unwind::Return(_)) => {}
                        Err(err) => return Err(err),
                    }
                    iterations += 1;
                }
                trace!("while loop finished after {} iteration(s)", iterations);
                Ok(Value::Unit)
            }
            Stmt::Assign { name, value } => {
                let value = self.eval(value, env)?;
                env.set(name.clone(), value.clone());
                Ok(value)
            }
            Stmt::Expr(expr) => Ok(self.eval(expr, env)?),
        }
    }

    // ---------------------------------------------------------------------
    // Expressions

    pub(crate) fn eval(&mut self, expr: &Expr, env: &mut Env) -> Result<Value> {
        match expr {
            Expr::Number(v) => Ok(Value::Block(self.constant(*v)?)),
            Expr::Name(name) => self.lookup(name, env),
            Expr::Array(items) => {
                let values = items
                    .iter()
                    .map(|item| self.eval(item, env))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Value::Array(values.into()))
            }
            Expr::Neg(inner) => {
                let value = self.eval(inner, env)?;
                Ok(Value::Block(self.negate(&value)?))
            }
            Expr::Binary { op, lhs, rhs } => {
                let lhs = self.eval(lhs, env)?;
                let rhs = self.eval(rhs, env)?;
                self.binary(*op, lhs, rhs)
            }
            Expr::Compare { op, lhs, rhs } => {
                let a = self.eval(lhs, env)?.number(&self.sim)?;
                let b = self.eval(rhs, env)?.number(&self.sim)?;
                let config = &self.host.config;
                Ok(Value::Bool(op.apply(a, b, |x, y| config.values_equal(x, y))))
            }
            Expr::Not(inner) => {
                let value = self.eval(inner, env)?.truth("'not'")?;
                Ok(Value::Bool(!value))
            }
            Expr::Logic { op, lhs, rhs } => {
                let (what, combine): (&str, fn(bool, bool) -> bool) = match op {
                    LogicOp::And => ("'and'", |a, b| a && b),
                    LogicOp::Or => ("'or'", |a, b| a || b),
                };
                let a = self.eval(lhs, env)?.truth(what)?;
                let b = self.eval(rhs, env)?.truth(what)?;
                Ok(Value::Bool(combine(a, b)))
            }
            Expr::Index { target, index } => {
                let target = self.eval(target, env)?;
                let index = self.eval(index, env)?.number(&self.sim)?;
                self.index(&target, index)
            }
            Expr::Call { callee, args } => self.call(callee, args, env),
            Expr::Ports { target, dir } => match self.eval(target, env)? {
                Value::Block(block) => Ok(Value::Ports(block, *dir)),
                other => Err(EngineError::type_error(format!(
                    "'.{}' needs a block, found {}",
                    dir,
                    other.type_name()
                ))),
            },
        }
    }

    /// Resolve a bare name. Unknown names become a NaN constant.
    fn lookup(&mut self, name: &str, env: &mut Env) -> Result<Value> {
        if let Some(value) = env.get(name) {
            return Ok(value.clone());
        }
        debug!("'{}' is undefined, binding it to nan", name);
        let value = Value::Block(self.constant(f64::NAN)?);
        env.set(name, value.clone());
        Ok(value)
    }

    fn constant(&mut self, value: f64) -> Result<BlockId> {
        self.sim.create(
            BlockKind::Num,
            Some(vec![Param::Number(value)]),
            None,
            &mut self.host,
        )
    }

    fn negate(&mut self, value: &Value) -> Result<BlockId> {
        let signal = value.signal(&self.sim)?;
        let gain = self.constant(-1.0)?;
        self.sim.connect(signal, gain, 0, &mut self.host)?;
        Ok(gain)
    }

    /// Create a two-input block fed by `lhs` and `rhs`.
    fn combine(&mut self, kind: BlockKind, lhs: &Value, rhs: &Value) -> Result<BlockId> {
        let a = lhs.signal(&self.sim)?;
        let b = rhs.signal(&self.sim)?;
        let block = self.sim.create(kind, None, None, &mut self.host)?;
        self.sim.connect(a, block, 0, &mut self.host)?;
        self.sim.connect(b, block, 1, &mut self.host)?;
        Ok(block)
    }

    fn binary(&mut self, op: BinOp, lhs: Value, rhs: Value) -> Result<Value> {
        let block = match op {
            BinOp::Add => self.combine(BlockKind::Add, &lhs, &rhs)?,
            BinOp::Sub => {
                let negated = Value::Block(self.negate(&rhs)?);
                self.combine(BlockKind::Add, &lhs, &negated)?
            }
            BinOp::Mul => self.combine(BlockKind::Mult, &lhs, &rhs)?,
            BinOp::Div => self.combine(BlockKind::Div, &lhs, &rhs)?,
            BinOp::Pipe => return self.pipe(&lhs, rhs),
        };
        Ok(Value::Block(block))
    }

    /// `src @ dst`: wire `src` into the first input of a block, or into an
    /// input port. Returns `dst`.
    fn pipe(&mut self, src: &Value, dst: Value) -> Result<Value> {
        let signal = src.signal(&self.sim)?;
        let (block, slot) = match dst {
            Value::Block(block) => (block, 0),
            Value::Port {
                block,
                dir: PortDir::In,
                slot,
            } => (block, slot),
            ref other => {
                return Err(EngineError::type_error(format!(
                    "'@' needs a block or an input port on its right, found {}",
                    other.type_name()
                )))
            }
        };
        self.sim.connect(signal, block, slot, &mut self.host)?;
        Ok(dst)
    }

    fn index(&self, target: &Value, index: f64) -> Result<Value> {
        match target {
            Value::Array(items) => {
                let slot = position(index, items.len())?;
                Ok(items[slot].clone())
            }
            Value::Ports(block, dir) => {
                let len = match dir {
                    PortDir::In => self.sim.block(*block).inputs.len(),
                    PortDir::Out => self.sim.block(*block).outputs.len(),
                };
                Ok(Value::Port {
                    block: *block,
                    dir: *dir,
                    slot: position(index, len)?,
                })
            }
            other => Err(EngineError::type_error(format!(
                "cannot index into {}",
                other.type_name()
            ))),
        }
    }

    // ---------------------------------------------------------------------
    // Calls

    /// Resolve and perform a call.
    ///
    /// A bare name is looked up as a block kind, then as a function bound in
    /// the environment, then as a built-in routine.
    fn call(&mut self, callee: &Expr, args: &[Expr], env: &mut Env) -> Result<Value> {
        let target = match callee {
            Expr::Name(name) => {
                if let Some(kind) = BlockKind::from_name(name) {
                    let args = self.eval_args(args, env)?;
                    return self.construct(kind, &args).map(Value::Block);
                }
                match env.get(name).cloned() {
                    Some(Value::Fun(fun)) => Value::Fun(fun),
                    bound => {
                        if let Some(routine) = Routine::from_name(name) {
                            let args = self.eval_args(args, env)?;
                            return self.call_routine(routine, &args);
                        }
                        bound.ok_or_else(|| EngineError::UndefinedFunction { name: name.clone() })?
                    }
                }
            }
            other => self.eval(other, env)?,
        };

        let fun = match target {
            Value::Fun(fun) => fun,
            other => {
                return Err(EngineError::type_error(format!(
                    "{} is not callable",
                    other.type_name()
                )))
            }
        };
        let args = self.eval_args(args, env)?;
        self.call_fun(&fun, args, env)
    }

    fn eval_args(&mut self, args: &[Expr], env: &mut Env) -> Result<Vec<Value>> {
        args.iter().map(|arg| self.eval(arg, env)).collect()
    }

    /// Call a user function in a copy of the caller's environment.
    ///
    /// Parameters without an argument stay unbound and resolve through the
    /// caller's bindings.
    fn call_fun(&mut self, fun: &Rc<Fun>, args: Vec<Value>, caller: &Env) -> Result<Value> {
        if args.len() > fun.arity() {
            return Err(EngineError::ArgumentCount {
                name: fun.name.clone(),
                expected: fun.arity(),
                actual: args.len(),
            });
        }
        if self.host.depth >= self.host.config.max_call_depth {
            return Err(EngineError::RecursionLimit {
                depth: self.host.config.max_call_depth,
            });
        }

        let mut env = caller.clone();
        for (param, arg) in fun.params.iter().zip(args) {
            env.set(param.clone(), arg);
        }

        trace!("calling {} at depth {}", fun, self.host.depth + 1);
        self.host.depth += 1;
        let result = self.exec_body(&fun.body, &mut env);
        self.host.depth -= 1;

        match result {
            Ok(value) | Err(Unwind::Return(value)) => Ok(value),
            Err(Unwind::Error(err)) => Err(err),
        }
    }

    /// Evaluate `fun` on plain numbers in this interpreter's own graph and
    /// return the values of its result.
    fn call_detached(&mut self, fun: &Fun, args: &[f64]) -> Result<Vec<f64>> {
        let mut env = Env::new();
        for (param, &arg) in fun.params.iter().zip(args) {
            let value = Value::Block(self.constant(arg)?);
            env.set(param.clone(), value);
        }

        let result = match self.exec_body(&fun.body, &mut env) {
            Ok(value) | Err(Unwind::Return(value)) => value,
            Err(Unwind::Error(err)) => return Err(err),
        };

        match result {
            Value::Array(items) => items.iter().map(|item| item.number(&self.sim)).collect(),
            other => Ok(vec![other.number(&self.sim)?]),
        }
    }

    /// `kind(p1, p2, ...)` or `kind([params], [states])`.
    fn construct(&mut self, kind: BlockKind, args: &[Value]) -> Result<BlockId> {
        let (params, states) = match args {
            [] => (None, None),
            [Value::Array(params)] => (Some(self.params(params)?), None),
            [Value::Array(params), Value::Array(states)] => {
                let states = states
                    .iter()
                    .map(|state| state.number(&self.sim))
                    .collect::<Result<Vec<_>>>()?;
                (Some(self.params(params)?), Some(states))
            }
            args => (Some(self.params(args)?), None),
        };
        self.sim.create(kind, params, states, &mut self.host)
    }

    fn params(&self, args: &[Value]) -> Result<Vec<Param>> {
        args.iter()
            .map(|arg| match arg {
                Value::Fun(fun) => Ok(Param::Function(Rc::clone(fun))),
                other => Ok(Param::Number(other.number(&self.sim)?)),
            })
            .collect()
    }
}

/// Array position of a numeric index, truncated toward zero.
fn position(index: f64, len: usize) -> Result<usize> {
    if !index.is_finite() {
        return Err(EngineError::type_error(format!(
            "index must be a finite number, found {}",
            index
        )));
    }
    let position = index.trunc() as i64;
    if position < 0 || position as usize >= len {
        return Err(EngineError::IndexOutOfRange {
            index: position,
            len,
        });
    }
    Ok(position as usize)
}
