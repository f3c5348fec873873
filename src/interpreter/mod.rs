//! Restricted expression language for state initializers, renderers and
//! transitions.
//!
//! State behavior is stored as data: small S-expressions such as
//! `(+ value 1)` or `(cond ((< value 0) "negative") (else "positive"))`.
//! They are parsed and validated when a configuration is loaded and then
//! interpreted by the engine. The grammar only offers literals, arithmetic,
//! comparisons, boolean logic, conditionals, string concatenation and a few
//! list/map helpers, so a stored configuration can never run arbitrary code.

/// Abstract syntax tree definitions for the expression language.
pub mod ast;
/// Validation pass that turns parsed forms into typed terms.
pub mod builder;
/// Term evaluator.
pub mod eval;
/// Typed term representation.
pub mod ir;
/// Parser for the expression language.
pub mod parser;
/// Structured values manipulated by expressions.
pub mod value;

pub use ast::Expr;
pub use builder::{Expression, build_term};
pub use eval::evaluate;
pub use ir::{Op, Scope, Term};
pub use parser::parse_expr;
pub use value::{Value, ValueKind};

use thiserror::Error;

/// Convenience result alias for parsing and validation.
pub type Result<T> = std::result::Result<T, ExprError>;

/// Convenience result alias for evaluation.
pub type EvalResult<T> = std::result::Result<T, EvalError>;

/// Errors raised while turning source text into a [`Term`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExprError {
    /// Parsing failed due to invalid syntax.
    #[error("invalid expression syntax: {0}")]
    Syntax(String),

    /// Semantic validation failed (unknown operator, arity, missing else, ...).
    #[error("expression validation failed: {0}")]
    Validation(String),
}

/// Errors raised while evaluating a [`Term`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    /// An operand had the wrong type.
    #[error("type error: {0}")]
    Type(String),

    /// Integer arithmetic overflowed.
    #[error("integer overflow in `{0}`")]
    Overflow(&'static str),

    /// Division or remainder by zero.
    #[error("division by zero")]
    DivisionByZero,

    /// Map key or list index not present.
    #[error("missing key or index `{0}`")]
    MissingKey(String),

    /// `value` was read without a binding.
    #[error("`value` is not bound")]
    Unbound,

    /// An operator received no operands at runtime.
    #[error("`{0}` received no operands")]
    Arity(&'static str),
}
