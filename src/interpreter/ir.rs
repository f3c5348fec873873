use serde::{Deserialize, Serialize};
use std::fmt;

use super::value::Value;

/// Validated expression tree ready for evaluation.
///
/// Every conditional form carries a fallback, so evaluating a `Term` always
/// selects a branch; only type and arithmetic errors can make it fail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Term {
    /// Constant value.
    Literal(Value),
    /// The current state value (`value` in source).
    Input,
    /// Operator application with evaluated arguments.
    Call {
        /// Operator to apply.
        op: Op,
        /// Argument terms, evaluated left to right.
        args: Vec<Term>,
    },
    /// Two-way conditional.
    If {
        /// Condition tested for truthiness.
        test: Box<Term>,
        /// Result when the condition holds.
        then: Box<Term>,
        /// Result otherwise.
        otherwise: Box<Term>,
    },
    /// Ordered multi-way conditional with mandatory `else`.
    Cond {
        /// `(test result)` arms tried in order.
        arms: Vec<(Term, Term)>,
        /// Result of the `else` arm.
        otherwise: Box<Term>,
    },
    /// Short-circuit conjunction; yields the first falsy operand or the last.
    And(Vec<Term>),
    /// Short-circuit disjunction; yields the first truthy operand or the last.
    Or(Vec<Term>),
}

/// Built-in operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Op {
    /// `+`
    Add,
    /// `-` (unary negation or binary subtraction)
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Rem,
    /// `min`
    Min,
    /// `max`
    Max,
    /// `abs`
    Abs,
    /// `=`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `not`
    Not,
    /// `concat` / `str`
    Concat,
    /// `list`
    List,
    /// `len`
    Len,
    /// `get`
    Get,
    /// `assoc`
    Assoc,
    /// `push`
    Push,
}

/// Accepted argument counts for an operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Exactly `n` arguments.
    Exactly(usize),
    /// Between `min` and `max` arguments, inclusive.
    Range(usize, usize),
    /// At least `n` arguments.
    AtLeast(usize),
}

impl Arity {
    /// Whether `count` arguments are acceptable.
    pub fn accepts(&self, count: usize) -> bool {
        match *self {
            Arity::Exactly(n) => count == n,
            Arity::Range(min, max) => (min..=max).contains(&count),
            Arity::AtLeast(n) => count >= n,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exactly(n) => write!(f, "exactly {}", n),
            Arity::Range(min, max) => write!(f, "{} to {}", min, max),
            Arity::AtLeast(n) => write!(f, "at least {}", n),
        }
    }
}

impl Op {
    /// Resolve an operator from its source symbol.
    pub fn from_symbol(symbol: &str) -> Option<Op> {
        let op = match symbol {
            "+" => Op::Add,
            "-" => Op::Sub,
            "*" => Op::Mul,
            "/" => Op::Div,
            "%" => Op::Rem,
            "min" => Op::Min,
            "max" => Op::Max,
            "abs" => Op::Abs,
            "=" => Op::Eq,
            "!=" => Op::Ne,
            "<" => Op::Lt,
            "<=" => Op::Le,
            ">" => Op::Gt,
            ">=" => Op::Ge,
            "not" => Op::Not,
            "concat" | "str" => Op::Concat,
            "list" => Op::List,
            "len" => Op::Len,
            "get" => Op::Get,
            "assoc" => Op::Assoc,
            "push" => Op::Push,
            _ => return None,
        };
        Some(op)
    }

    /// Source symbol for diagnostics.
    pub fn symbol(&self) -> &'static str {
        match self {
            Op::Add => "+",
            Op::Sub => "-",
            Op::Mul => "*",
            Op::Div => "/",
            Op::Rem => "%",
            Op::Min => "min",
            Op::Max => "max",
            Op::Abs => "abs",
            Op::Eq => "=",
            Op::Ne => "!=",
            Op::Lt => "<",
            Op::Le => "<=",
            Op::Gt => ">",
            Op::Ge => ">=",
            Op::Not => "not",
            Op::Concat => "concat",
            Op::List => "list",
            Op::Len => "len",
            Op::Get => "get",
            Op::Assoc => "assoc",
            Op::Push => "push",
        }
    }

    /// Argument counts accepted by the operator.
    pub fn arity(&self) -> Arity {
        match self {
            Op::Add | Op::Mul | Op::Min | Op::Max => Arity::AtLeast(1),
            Op::Sub => Arity::Range(1, 2),
            Op::Div | Op::Rem => Arity::Exactly(2),
            Op::Eq | Op::Ne | Op::Lt | Op::Le | Op::Gt | Op::Ge => Arity::Exactly(2),
            Op::Abs | Op::Not | Op::Len => Arity::Exactly(1),
            Op::Concat | Op::List => Arity::AtLeast(0),
            Op::Get | Op::Push => Arity::Exactly(2),
            Op::Assoc => Arity::Exactly(3),
        }
    }
}

/// Names bound while compiling an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// No bindings; used by initializers.
    Empty,
    /// `value` is bound to the state's current value.
    StateValue,
}
