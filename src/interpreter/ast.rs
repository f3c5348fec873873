use serde::{Deserialize, Serialize};

/// Generic S-expression nodes produced by the parser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Expr {
    /// A bare symbol (operator names, `value`, `else`).
    Symbol(String),
    /// String literal.
    String(String),
    /// Signed integer literal.
    Integer(i64),
    /// Floating-point literal.
    Float(f64),
    /// Boolean literal.
    Boolean(bool),
    /// The `null` literal.
    Null,
    /// Nested list.
    List(Vec<Expr>),
}

impl Expr {
    /// Return the symbol name when this node is a bare symbol.
    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            Expr::Symbol(sym) => Some(sym),
            _ => None,
        }
    }

    /// Return the head symbol of a list form, e.g. `if` for `(if a b c)`.
    pub fn head(&self) -> Option<&str> {
        match self {
            Expr::List(items) => items.first().and_then(Expr::as_symbol),
            _ => None,
        }
    }
}
