//! Syntax tree types for the block-diagram DSL.
//!
//! Function, branch and loop bodies are parsed once into these types and
//! evaluated as many times as they are called.

use std::fmt;
use std::rc::Rc;

/// A parsed statement list, shared between a [`Fun`] and every call of it.
pub type Body = Rc<[Stmt]>;

/// A statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// `def name(params) { body }`
    Def(Rc<Fun>),
    /// `return [expr]`
    Return(Option<Expr>),
    /// `if cond { .. } else if cond { .. } else { .. }`
    If {
        branches: Vec<(Expr, Body)>,
        otherwise: Option<Body>,
    },
    /// `while cond { .. }`
    While { cond: Expr, body: Body },
    /// `name = expr`
    Assign { name: String, value: Expr },
    /// A bare expression
    Expr(Expr),
}

impl Stmt {
    /// Whether the statement ends with a closing brace, in which case the
    /// next statement may follow without a separator.
    pub fn ends_with_block(&self) -> bool {
        matches!(self, Stmt::Def(_) | Stmt::If { .. } | Stmt::While { .. })
    }
}

/// An expression. Evaluating one may add blocks to the simulation graph.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Numeric literal, becomes a constant `num` block
    Number(f64),
    /// Variable reference
    Name(String),
    /// `[a, b, c]`
    Array(Vec<Expr>),
    /// Unary minus on a non-literal
    Neg(Box<Expr>),
    /// `+ - * / @`
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// `== != > < >= <=`
    Compare {
        op: RelOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// `not cond`
    Not(Box<Expr>),
    /// `and`, `or`
    Logic {
        op: LogicOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// `target[index]`
    Index { target: Box<Expr>, index: Box<Expr> },
    /// `callee(args)`
    Call { callee: Box<Expr>, args: Vec<Expr> },
    /// `target.in` / `target.out`
    Ports { target: Box<Expr>, dir: PortDir },
}

/// Graph-building binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    /// Wire the left signal into the right block's input
    Pipe,
}

/// Relational operators, evaluated on current signal values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelOp {
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
}

impl RelOp {
    /// Apply the operator; `eq` decides tolerant equality.
    pub fn apply(self, a: f64, b: f64, eq: impl Fn(f64, f64) -> bool) -> bool {
        match self {
            RelOp::Eq => eq(a, b),
            RelOp::Ne => !eq(a, b),
            RelOp::Gt => a > b,
            RelOp::Lt => a < b,
            RelOp::Ge => a > b || eq(a, b),
            RelOp::Le => a < b || eq(a, b),
        }
    }
}

/// Boolean connectives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicOp {
    And,
    Or,
}

/// Which side of a block a port collection addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortDir {
    In,
    Out,
}

impl PortDir {
    /// Parse the member name used after a dot.
    pub fn from_member(name: &str) -> Option<Self> {
        match name {
            "in" => Some(PortDir::In),
            "out" => Some(PortDir::Out),
            _ => None,
        }
    }
}

impl fmt::Display for PortDir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortDir::In => f.write_str("in"),
            PortDir::Out => f.write_str("out"),
        }
    }
}

/// A user-defined function.
#[derive(Debug, Clone, PartialEq)]
pub struct Fun {
    /// Function name (empty for loop bodies and conditions)
    pub name: String,
    /// Ordered parameter names
    pub params: Vec<String>,
    /// Parsed body
    pub body: Body,
}

impl Fun {
    /// Create a new function value.
    pub fn new(name: impl Into<String>, params: Vec<String>, body: Body) -> Self {
        Self {
            name: name.into(),
            params,
            body,
        }
    }

    /// Number of declared parameters.
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

impl fmt::Display for Fun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<fun {}({})>", self.name, self.params.join(", "))
    }
}
