//! Tree-walking evaluator for validated terms.
//!
//! Terms are finite trees without loops or recursion, so evaluation always
//! terminates in time proportional to the tree size.

use std::cmp::Ordering;

use super::ir::{Op, Term};
use super::value::Value;
use super::{EvalError, EvalResult};

/// Evaluate `term`, binding `value` to `input` when provided.
pub fn evaluate(term: &Term, input: Option<&Value>) -> EvalResult<Value> {
    match term {
        Term::Literal(value) => Ok(value.clone()),
        Term::Input => input.cloned().ok_or(EvalError::Unbound),
        Term::If {
            test,
            then,
            otherwise,
        } => {
            if evaluate(test, input)?.is_truthy() {
                evaluate(then, input)
            } else {
                evaluate(otherwise, input)
            }
        }
        Term::Cond { arms, otherwise } => {
            for (test, result) in arms {
                if evaluate(test, input)?.is_truthy() {
                    return evaluate(result, input);
                }
            }
            evaluate(otherwise, input)
        }
        Term::And(terms) => {
            let mut last = Value::Boolean(true);
            for term in terms {
                last = evaluate(term, input)?;
                if !last.is_truthy() {
                    break;
                }
            }
            Ok(last)
        }
        Term::Or(terms) => {
            let mut last = Value::Boolean(false);
            for term in terms {
                last = evaluate(term, input)?;
                if last.is_truthy() {
                    break;
                }
            }
            Ok(last)
        }
        Term::Call { op, args } => {
            let values = args
                .iter()
                .map(|arg| evaluate(arg, input))
                .collect::<EvalResult<Vec<_>>>()?;
            apply(*op, values)
        }
    }
}

fn apply(op: Op, mut args: Vec<Value>) -> EvalResult<Value> {
    match op {
        Op::Add => fold_numeric(op, args, i64::checked_add, |a, b| a + b),
        Op::Mul => fold_numeric(op, args, i64::checked_mul, |a, b| a * b),
        Op::Sub => {
            if args.len() == 1 {
                negate(&args[0])
            } else {
                fold_numeric(op, args, i64::checked_sub, |a, b| a - b)
            }
        }
        Op::Div => divide(&args[0], &args[1]),
        Op::Rem => remainder(&args[0], &args[1]),
        Op::Min | Op::Max => {
            let mut best = args.remove(0);
            expect_number(op, &best)?;
            for candidate in args {
                let ordering = compare(op, &candidate, &best)?;
                let better = if op == Op::Min {
                    ordering == Ordering::Less
                } else {
                    ordering == Ordering::Greater
                };
                if better {
                    best = candidate;
                }
            }
            Ok(best)
        }
        Op::Abs => match &args[0] {
            Value::Integer(num) => num
                .checked_abs()
                .map(Value::Integer)
                .ok_or_else(|| overflow(op)),
            Value::Float(num) => Ok(Value::Float(num.abs())),
            other => Err(type_error(op, "a number", other)),
        },
        Op::Eq => Ok(Value::Boolean(loosely_equal(&args[0], &args[1]))),
        Op::Ne => Ok(Value::Boolean(!loosely_equal(&args[0], &args[1]))),
        Op::Lt => compare(op, &args[0], &args[1]).map(|o| Value::Boolean(o == Ordering::Less)),
        Op::Le => compare(op, &args[0], &args[1]).map(|o| Value::Boolean(o != Ordering::Greater)),
        Op::Gt => compare(op, &args[0], &args[1]).map(|o| Value::Boolean(o == Ordering::Greater)),
        Op::Ge => compare(op, &args[0], &args[1]).map(|o| Value::Boolean(o != Ordering::Less)),
        Op::Not => Ok(Value::Boolean(!args[0].is_truthy())),
        Op::Concat => {
            let mut text = String::new();
            for value in &args {
                text.push_str(&value.to_string());
            }
            Ok(Value::String(text))
        }
        Op::List => Ok(Value::List(args)),
        Op::Len => match &args[0] {
            Value::String(text) => Ok(Value::Integer(text.chars().count() as i64)),
            Value::List(items) => Ok(Value::Integer(items.len() as i64)),
            Value::Map(entries) => Ok(Value::Integer(entries.len() as i64)),
            other => Err(type_error(op, "a string, list or map", other)),
        },
        Op::Get => get(&args[0], &args[1]),
        Op::Assoc => {
            let replacement = args.pop().unwrap_or(Value::Null);
            let key = args.pop().unwrap_or(Value::Null);
            let target = args.pop().unwrap_or(Value::Null);
            assoc(target, &key, replacement)
        }
        Op::Push => {
            let item = args.pop().unwrap_or(Value::Null);
            match args.pop() {
                Some(Value::List(mut items)) => {
                    items.push(item);
                    Ok(Value::List(items))
                }
                Some(other) => Err(type_error(op, "a list", &other)),
                None => Err(type_error(op, "a list", &Value::Null)),
            }
        }
    }
}

fn fold_numeric(
    op: Op,
    args: Vec<Value>,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> EvalResult<Value> {
    let mut iter = args.into_iter();
    let mut acc = match iter.next() {
        Some(first) => {
            expect_number(op, &first)?;
            first
        }
        None => return Err(EvalError::Arity(op.symbol())),
    };
    for next in iter {
        acc = match (&acc, &next) {
            (Value::Integer(a), Value::Integer(b)) => {
                Value::Integer(int_op(*a, *b).ok_or_else(|| overflow(op))?)
            }
            _ => {
                let a = acc.as_f64().ok_or_else(|| type_error(op, "a number", &acc))?;
                let b = next.as_f64().ok_or_else(|| type_error(op, "a number", &next))?;
                Value::Float(float_op(a, b))
            }
        };
    }
    Ok(acc)
}

fn negate(value: &Value) -> EvalResult<Value> {
    match value {
        Value::Integer(num) => num
            .checked_neg()
            .map(Value::Integer)
            .ok_or_else(|| overflow(Op::Sub)),
        Value::Float(num) => Ok(Value::Float(-num)),
        other => Err(type_error(Op::Sub, "a number", other)),
    }
}

/// Integer division yields an integer when exact and a float otherwise.
fn divide(lhs: &Value, rhs: &Value) -> EvalResult<Value> {
    match (lhs, rhs) {
        (Value::Integer(_), Value::Integer(0)) => Err(EvalError::DivisionByZero),
        (Value::Integer(a), Value::Integer(b)) => {
            if a.checked_rem(*b) == Some(0) {
                a.checked_div(*b)
                    .map(Value::Integer)
                    .ok_or_else(|| overflow(Op::Div))
            } else {
                Ok(Value::Float(*a as f64 / *b as f64))
            }
        }
        _ => {
            let a = lhs.as_f64().ok_or_else(|| type_error(Op::Div, "a number", lhs))?;
            let b = rhs.as_f64().ok_or_else(|| type_error(Op::Div, "a number", rhs))?;
            if b == 0.0 {
                return Err(EvalError::DivisionByZero);
            }
            Ok(Value::Float(a / b))
        }
    }
}

fn remainder(lhs: &Value, rhs: &Value) -> EvalResult<Value> {
    match (lhs, rhs) {
        (Value::Integer(_), Value::Integer(0)) => Err(EvalError::DivisionByZero),
        (Value::Integer(a), Value::Integer(b)) => a
            .checked_rem(*b)
            .map(Value::Integer)
            .ok_or_else(|| overflow(Op::Rem)),
        _ => {
            let a = lhs.as_f64().ok_or_else(|| type_error(Op::Rem, "a number", lhs))?;
            let b = rhs.as_f64().ok_or_else(|| type_error(Op::Rem, "a number", rhs))?;
            if b == 0.0 {
                return Err(EvalError::DivisionByZero);
            }
            Ok(Value::Float(a % b))
        }
    }
}

fn compare(op: Op, lhs: &Value, rhs: &Value) -> EvalResult<Ordering> {
    match (lhs, rhs) {
        (Value::Integer(a), Value::Integer(b)) => Ok(a.cmp(b)),
        (Value::String(a), Value::String(b)) => Ok(a.cmp(b)),
        _ => {
            let a = lhs.as_f64().ok_or_else(|| type_error(op, "comparable values", lhs))?;
            let b = rhs.as_f64().ok_or_else(|| type_error(op, "comparable values", rhs))?;
            a.partial_cmp(&b)
                .ok_or_else(|| EvalError::Type(format!("`{}` cannot order NaN", op.symbol())))
        }
    }
}

fn loosely_equal(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::Integer(a), Value::Float(b)) | (Value::Float(b), Value::Integer(a)) => {
            *a as f64 == *b
        }
        _ => lhs == rhs,
    }
}

fn get(target: &Value, key: &Value) -> EvalResult<Value> {
    match (target, key) {
        (Value::Map(entries), Value::String(name)) => entries
            .get(name)
            .cloned()
            .ok_or_else(|| EvalError::MissingKey(name.clone())),
        (Value::List(items), Value::Integer(index)) => usize::try_from(*index)
            .ok()
            .and_then(|index| items.get(index))
            .cloned()
            .ok_or_else(|| EvalError::MissingKey(index.to_string())),
        (Value::Map(_) | Value::List(_), other) => {
            Err(type_error(Op::Get, "a string key or integer index", other))
        }
        (other, _) => Err(type_error(Op::Get, "a map or list", other)),
    }
}

fn assoc(target: Value, key: &Value, replacement: Value) -> EvalResult<Value> {
    match (target, key) {
        (Value::Map(mut entries), Value::String(name)) => {
            entries.insert(name.clone(), replacement);
            Ok(Value::Map(entries))
        }
        (Value::List(mut items), Value::Integer(index)) => {
            let slot = usize::try_from(*index)
                .ok()
                .and_then(|index| items.get_mut(index))
                .ok_or_else(|| EvalError::MissingKey(index.to_string()))?;
            *slot = replacement;
            Ok(Value::List(items))
        }
        (Value::Map(_) | Value::List(_), other) => {
            Err(type_error(Op::Assoc, "a string key or integer index", other))
        }
        (other, _) => Err(type_error(Op::Assoc, "a map or list", &other)),
    }
}

fn expect_number(op: Op, value: &Value) -> EvalResult<()> {
    match value {
        Value::Integer(_) | Value::Float(_) => Ok(()),
        other => Err(type_error(op, "a number", other)),
    }
}

fn type_error(op: Op, expected: &str, found: &Value) -> EvalError {
    EvalError::Type(format!(
        "`{}` expects {}, found {}",
        op.symbol(),
        expected,
        found.kind()
    ))
}

fn overflow(op: Op) -> EvalError {
    EvalError::Overflow(op.symbol())
}

#[cfg(test)]
mod tests {
    use super::super::builder::Expression;
    use super::super::ir::Scope;
    use super::*;

    fn eval(src: &str, input: Value) -> EvalResult<Value> {
        Expression::compile(src, Scope::StateValue)
            .expect("compile")
            .eval_with(&input)
    }

    #[test]
    fn integer_arithmetic_stays_integral() {
        assert_eq!(eval("(+ value 1)", Value::Integer(6)).unwrap(), Value::Integer(7));
        assert_eq!(eval("(- value)", Value::Integer(6)).unwrap(), Value::Integer(-6));
        assert_eq!(eval("(/ value 2)", Value::Integer(6)).unwrap(), Value::Integer(3));
        assert_eq!(eval("(/ value 4)", Value::Integer(6)).unwrap(), Value::Float(1.5));
        assert_eq!(eval("(% value 4)", Value::Integer(6)).unwrap(), Value::Integer(2));
    }

    #[test]
    fn mixed_arithmetic_promotes_to_float() {
        assert_eq!(eval("(* value 0.5)", Value::Integer(3)).unwrap(), Value::Float(1.5));
        assert_eq!(eval("(max value 2 9)", Value::Integer(3)).unwrap(), Value::Integer(9));
        assert_eq!(eval("(min value 2 9)", Value::Integer(3)).unwrap(), Value::Integer(2));
    }

    #[test]
    fn arithmetic_failures_are_errors() {
        assert_eq!(
            eval("(/ value 0)", Value::Integer(1)),
            Err(EvalError::DivisionByZero)
        );
        assert!(matches!(
            eval("(+ value 1)", Value::Integer(i64::MAX)),
            Err(EvalError::Overflow(_))
        ));
        assert!(matches!(
            eval("(+ value 1)", Value::from("six")),
            Err(EvalError::Type(_))
        ));
    }

    #[test]
    fn cond_selects_first_matching_band() {
        let src = "(cond ((< value 0) \"neg\") ((= value 0) \"zero\") (else \"pos\"))";
        assert_eq!(eval(src, Value::Integer(-3)).unwrap(), Value::from("neg"));
        assert_eq!(eval(src, Value::Integer(0)).unwrap(), Value::from("zero"));
        assert_eq!(eval(src, Value::Float(0.0)).unwrap(), Value::from("zero"));
        assert_eq!(eval(src, Value::Integer(4)).unwrap(), Value::from("pos"));
    }

    #[test]
    fn logic_short_circuits() {
        assert_eq!(
            eval("(and (> value 0) (< value 10))", Value::Integer(5)).unwrap(),
            Value::Boolean(true)
        );
        // The division is never evaluated.
        assert_eq!(
            eval("(or (= value 0) (/ 1 value))", Value::Integer(0)).unwrap(),
            Value::Boolean(true)
        );
        assert_eq!(eval("(not value)", Value::Integer(0)).unwrap(), Value::Boolean(true));
    }

    #[test]
    fn concat_renders_plain_text() {
        assert_eq!(
            eval("(concat \"The number is \" value \". \")", Value::Integer(6)).unwrap(),
            Value::from("The number is 6. ")
        );
    }

    #[test]
    fn collections_are_updated_functionally() {
        let mut map = std::collections::BTreeMap::new();
        map.insert("fuel".to_string(), Value::Integer(10));
        let input = Value::Map(map);

        let updated = eval("(assoc value \"fuel\" (- (get value \"fuel\") 1))", input).unwrap();
        assert_eq!(
            eval("(get value \"fuel\")", updated).unwrap(),
            Value::Integer(9)
        );

        let list = eval("(push value 3)", Value::List(vec![Value::Integer(1)])).unwrap();
        assert_eq!(eval("(len value)", list).unwrap(), Value::Integer(2));
        assert!(matches!(
            eval("(get value \"missing\")", Value::Map(Default::default())),
            Err(EvalError::MissingKey(_))
        ));
    }
}
