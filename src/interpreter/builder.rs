use super::ir::{Op, Scope, Term};
use super::parser::parse_expr;
use super::value::Value;
use super::{EvalResult, Expr, ExprError, Result, evaluate};

/// A parsed and validated expression together with its source text.
///
/// The source is kept so configurations can be written back unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    source: String,
    term: Term,
    scope: Scope,
}

impl Expression {
    /// Parse and validate `source` for the given binding scope.
    pub fn compile(source: impl Into<String>, scope: Scope) -> Result<Self> {
        let source = source.into();
        let expr = parse_expr(&source)?;
        let term = build_term(&expr, scope)?;
        Ok(Self {
            source,
            term,
            scope,
        })
    }

    /// Original source text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Validated term tree.
    pub fn term(&self) -> &Term {
        &self.term
    }

    /// Evaluate with no bindings. Only valid for [`Scope::Empty`] expressions.
    pub fn eval_initial(&self) -> EvalResult<Value> {
        evaluate(&self.term, None)
    }

    /// Evaluate with `value` bound to `input`.
    pub fn eval_with(&self, input: &Value) -> EvalResult<Value> {
        evaluate(&self.term, Some(input))
    }

    /// Scope the expression was validated against.
    pub fn scope(&self) -> Scope {
        self.scope
    }
}

/// Translate a parsed [`Expr`] into a validated [`Term`].
pub fn build_term(expr: &Expr, scope: Scope) -> Result<Term> {
    match expr {
        Expr::Integer(num) => Ok(Term::Literal(Value::Integer(*num))),
        Expr::Float(num) => Ok(Term::Literal(Value::Float(*num))),
        Expr::String(text) => Ok(Term::Literal(Value::String(text.clone()))),
        Expr::Boolean(flag) => Ok(Term::Literal(Value::Boolean(*flag))),
        Expr::Null => Ok(Term::Literal(Value::Null)),
        Expr::Symbol(sym) => build_symbol(sym, scope),
        Expr::List(items) => build_form(items, scope),
    }
}

fn build_symbol(sym: &str, scope: Scope) -> Result<Term> {
    match (sym, scope) {
        ("value", Scope::StateValue) => Ok(Term::Input),
        ("value", Scope::Empty) => Err(validation(
            "`value` is not available in an initializer",
        )),
        ("else", _) => Err(validation("`else` is only valid as the last cond arm")),
        _ => Err(validation(&format!("unknown symbol `{}`", sym))),
    }
}

fn build_form(items: &[Expr], scope: Scope) -> Result<Term> {
    let Some((head, rest)) = items.split_first() else {
        return Err(validation("empty form"));
    };
    let Some(name) = head.as_symbol() else {
        return Err(validation(&format!(
            "form head must be an operator symbol, found {:?}",
            head
        )));
    };

    match name {
        "if" => build_if(rest, scope),
        "cond" => build_cond(rest, scope),
        "and" | "or" => {
            if rest.is_empty() {
                return Err(validation(&format!("`{}` needs at least one operand", name)));
            }
            let terms = build_all(rest, scope)?;
            Ok(if name == "and" {
                Term::And(terms)
            } else {
                Term::Or(terms)
            })
        }
        _ => {
            let op = Op::from_symbol(name)
                .ok_or_else(|| validation(&format!("unknown operator `{}`", name)))?;
            let arity = op.arity();
            if !arity.accepts(rest.len()) {
                return Err(validation(&format!(
                    "`{}` takes {} arguments, found {}",
                    op.symbol(),
                    arity,
                    rest.len()
                )));
            }
            Ok(Term::Call {
                op,
                args: build_all(rest, scope)?,
            })
        }
    }
}

fn build_if(rest: &[Expr], scope: Scope) -> Result<Term> {
    match rest {
        [test, then, otherwise] => Ok(Term::If {
            test: Box::new(build_term(test, scope)?),
            then: Box::new(build_term(then, scope)?),
            otherwise: Box::new(build_term(otherwise, scope)?),
        }),
        _ => Err(validation(
            "`if` requires a condition, a result and an else result",
        )),
    }
}

fn build_cond(rest: &[Expr], scope: Scope) -> Result<Term> {
    let Some((last, arms_src)) = rest.split_last() else {
        return Err(validation("`cond` requires at least an else arm"));
    };

    let otherwise = match last {
        Expr::List(pair) if pair.len() == 2 && pair[0].as_symbol() == Some("else") => {
            build_term(&pair[1], scope)?
        }
        _ => {
            return Err(validation(
                "`cond` must end with an (else result) arm so every value is covered",
            ));
        }
    };

    let mut arms = Vec::with_capacity(arms_src.len());
    for arm in arms_src {
        match arm {
            Expr::List(pair) if pair.len() == 2 => {
                if pair[0].as_symbol() == Some("else") {
                    return Err(validation("`else` must be the last cond arm"));
                }
                arms.push((build_term(&pair[0], scope)?, build_term(&pair[1], scope)?));
            }
            _ => return Err(validation("cond arms must be (test result) pairs")),
        }
    }

    Ok(Term::Cond {
        arms,
        otherwise: Box::new(otherwise),
    })
}

fn build_all(exprs: &[Expr], scope: Scope) -> Result<Vec<Term>> {
    exprs.iter().map(|expr| build_term(expr, scope)).collect()
}

fn validation(message: &str) -> ExprError {
    ExprError::Validation(message.to_string())
}
