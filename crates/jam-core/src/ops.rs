//! Operator, access, and coercion tables over the value universe.
//!
//! Every operation switches on the value tag and returns either a value or
//! a [`RuntimeError`] with the exact code the language defines for that
//! failure. Logical `and`/`or` are absent here: they short-circuit in the
//! executor and return the deciding operand unchanged.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::diag::codes::MessageCode;
use crate::error::RuntimeError;
use crate::value::{TypeHint, Value};

/// Binary operators of the expression grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    And,
    Or,
}

impl BinaryOp {
    /// Source spelling, used in diagnostics.
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Modulo => "%",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::Less => "<",
            BinaryOp::LessEqual => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterEqual => ">=",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Unary operators of the expression grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Negate,
    Not,
    Increment,
    Decrement,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Negate => "-",
            UnaryOp::Not => "not",
            UnaryOp::Increment => "++",
            UnaryOp::Decrement => "--",
        }
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

fn invalid_operands(op: BinaryOp, lhs: &Value, rhs: &Value) -> RuntimeError {
    RuntimeError::new(
        MessageCode::InvalidOperands,
        vec![
            op.symbol().to_string(),
            lhs.kind().to_string(),
            rhs.kind().to_string(),
        ],
    )
}

/// Evaluate a binary operator over two values.
///
/// Arithmetic is numeric-only, except that `+` also concatenates two
/// strings and appends array to array. Relational operators require both
/// operands to be the same primitive kind. Equality is deep and
/// structural.
pub fn evaluate_binary(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value, RuntimeError> {
    match op {
        BinaryOp::Add => match (lhs, rhs) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
            (Value::String(a), Value::String(b)) => {
                let mut s = String::with_capacity(a.len() + b.len());
                s.push_str(a);
                s.push_str(b);
                Ok(Value::String(s))
            }
            (Value::Array(a), Value::Array(b)) => {
                let mut items = a.clone();
                items.extend(b.iter().cloned());
                Ok(Value::Array(items))
            }
            _ => Err(invalid_operands(op, lhs, rhs)),
        },
        BinaryOp::Subtract | BinaryOp::Multiply => match (lhs, rhs) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(match op {
                BinaryOp::Subtract => a - b,
                _ => a * b,
            })),
            _ => Err(invalid_operands(op, lhs, rhs)),
        },
        BinaryOp::Divide => match (lhs, rhs) {
            (Value::Number(_), Value::Number(b)) if *b == 0.0 => {
                Err(RuntimeError::new(MessageCode::DivisionByZero, vec![]))
            }
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a / b)),
            _ => Err(invalid_operands(op, lhs, rhs)),
        },
        BinaryOp::Modulo => match (lhs, rhs) {
            (Value::Number(_), Value::Number(b)) if *b == 0.0 => {
                Err(RuntimeError::new(MessageCode::ModuloByZero, vec![]))
            }
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a % b)),
            _ => Err(invalid_operands(op, lhs, rhs)),
        },
        BinaryOp::Equal => Ok(Value::Bool(lhs == rhs)),
        BinaryOp::NotEqual => Ok(Value::Bool(lhs != rhs)),
        BinaryOp::Less | BinaryOp::LessEqual | BinaryOp::Greater | BinaryOp::GreaterEqual => {
            let ordering_holds = match (lhs, rhs) {
                (Value::Number(a), Value::Number(b)) => relational(op, a.partial_cmp(b)),
                (Value::String(a), Value::String(b)) => relational(op, Some(a.cmp(b))),
                (Value::Bool(a), Value::Bool(b)) => relational(op, Some(a.cmp(b))),
                _ => {
                    return Err(RuntimeError::new(
                        MessageCode::IncomparableTypes,
                        vec![lhs.kind().to_string(), rhs.kind().to_string()],
                    ))
                }
            };
            Ok(Value::Bool(ordering_holds))
        }
        // `and`/`or` never reach the table: the executor short-circuits them.
        BinaryOp::And | BinaryOp::Or => Err(RuntimeError::fault(
            "logical operators are evaluated by the executor",
        )),
    }
}

fn relational(op: BinaryOp, ordering: Option<std::cmp::Ordering>) -> bool {
    use std::cmp::Ordering::*;
    match (op, ordering) {
        (BinaryOp::Less, Some(Less)) => true,
        (BinaryOp::LessEqual, Some(Less | Equal)) => true,
        (BinaryOp::Greater, Some(Greater)) => true,
        (BinaryOp::GreaterEqual, Some(Greater | Equal)) => true,
        // NaN comparisons have no ordering and are uniformly false.
        _ => false,
    }
}

/// Evaluate a unary operator.
pub fn evaluate_unary(op: UnaryOp, value: &Value) -> Result<Value, RuntimeError> {
    match (op, value) {
        (UnaryOp::Negate, Value::Number(n)) => Ok(Value::Number(-n)),
        (UnaryOp::Increment, Value::Number(n)) => Ok(Value::Number(n + 1.0)),
        (UnaryOp::Decrement, Value::Number(n)) => Ok(Value::Number(n - 1.0)),
        (UnaryOp::Not, v) => Ok(Value::Bool(!v.is_truthy())),
        (op, v) => Err(RuntimeError::new(
            MessageCode::InvalidOperands,
            vec![
                op.symbol().to_string(),
                v.kind().to_string(),
                v.kind().to_string(),
            ],
        )),
    }
}

/// Read a property. Objects return the mapped value or Null when the key is
/// absent; null and non-objects raise.
pub fn get_property(value: &Value, key: &str) -> Result<Value, RuntimeError> {
    match value {
        Value::Object(o) => Ok(o.get(key).cloned().unwrap_or(Value::Null)),
        Value::Null => Err(RuntimeError::new(
            MessageCode::PropertyAccessOnNull,
            vec![key.to_string()],
        )),
        other => Err(RuntimeError::new(
            MessageCode::PropertyAccessInvalidType,
            vec![key.to_string(), other.kind().to_string()],
        )),
    }
}

/// Write a property. Only objects accept property writes.
pub fn set_property(target: &mut Value, key: &str, value: Value) -> Result<(), RuntimeError> {
    match target {
        Value::Object(o) => {
            o.insert(key.to_string(), value);
            Ok(())
        }
        other => Err(RuntimeError::new(
            MessageCode::SetPropertyOnNonObject,
            vec![key.to_string(), other.kind().to_string()],
        )),
    }
}

/// Resolve a possibly negative read index against a length. Negative
/// indices wrap from the end (-1 is the last element).
pub fn resolve_read_index(index: f64, len: usize) -> Result<usize, RuntimeError> {
    if !index.is_finite() || index.fract() != 0.0 {
        return Err(RuntimeError::new(
            MessageCode::InvalidIndexType,
            vec!["fractional Number".to_string()],
        ));
    }
    let idx = index as i64;
    let resolved = if idx < 0 { idx + len as i64 } else { idx };
    if resolved < 0 || resolved as usize >= len {
        return Err(RuntimeError::new(
            MessageCode::IndexOutOfRange,
            vec![idx.to_string(), len.to_string()],
        ));
    }
    Ok(resolved as usize)
}

/// Read an index. Arrays take integer indices (negative wraps from the
/// end), strings yield one-character substrings, objects treat a string
/// index as a property read.
pub fn get_index(value: &Value, index: &Value) -> Result<Value, RuntimeError> {
    match (value, index) {
        (Value::Array(items), Value::Number(n)) => {
            let idx = resolve_read_index(*n, items.len())?;
            Ok(items[idx].clone())
        }
        (Value::String(s), Value::Number(n)) => {
            let chars: Vec<char> = s.chars().collect();
            let idx = resolve_read_index(*n, chars.len())?;
            Ok(Value::String(chars[idx].to_string()))
        }
        (Value::Object(_), Value::String(key)) => get_property(value, key),
        (Value::Null, _) => Err(RuntimeError::new(MessageCode::IndexAccessOnNull, vec![])),
        (Value::Array(_) | Value::String(_) | Value::Object(_), idx) => Err(RuntimeError::new(
            MessageCode::InvalidIndexType,
            vec![idx.kind().to_string()],
        )),
        (other, _) => Err(RuntimeError::new(
            MessageCode::IndexAccessInvalidType,
            vec![other.kind().to_string()],
        )),
    }
}

/// Write an index. Stricter than the read side: negative indices are
/// rejected and only arrays and objects are writable containers.
pub fn set_index(target: &mut Value, index: &Value, value: Value) -> Result<(), RuntimeError> {
    match (target, index) {
        (Value::Array(items), Value::Number(n)) => {
            if !n.is_finite() || n.fract() != 0.0 {
                return Err(RuntimeError::new(
                    MessageCode::InvalidIndexType,
                    vec!["fractional Number".to_string()],
                ));
            }
            let idx = *n as i64;
            if idx < 0 {
                return Err(RuntimeError::new(
                    MessageCode::NegativeIndex,
                    vec![idx.to_string()],
                ));
            }
            if idx as usize >= items.len() {
                return Err(RuntimeError::new(
                    MessageCode::IndexOutOfRange,
                    vec![idx.to_string(), items.len().to_string()],
                ));
            }
            items[idx as usize] = value;
            Ok(())
        }
        (Value::Object(o), Value::String(key)) => {
            o.insert(key.clone(), value);
            Ok(())
        }
        (Value::Array(_) | Value::Object(_), idx) => Err(RuntimeError::new(
            MessageCode::InvalidIndexType,
            vec![idx.kind().to_string()],
        )),
        (other, _) => Err(RuntimeError::new(
            MessageCode::SetIndexOnNonContainer,
            vec![other.kind().to_string()],
        )),
    }
}

/// Check a value against a declared type hint. Identity when the hint is
/// `Any` or the kinds match; JM5100 otherwise, naming the variable.
pub fn coerce_to_hint(value: &Value, hint: TypeHint, var_name: &str) -> Result<(), RuntimeError> {
    if value.kind().matches_hint(hint) {
        Ok(())
    } else {
        Err(RuntimeError::new(
            MessageCode::InvalidType,
            vec![
                var_name.to_string(),
                hint.to_string(),
                value.kind().to_string(),
            ],
        ))
    }
}

/// Expand a value into the sequence `foreach` iterates.
///
/// Arrays yield their elements in order; objects yield `{key, value}`
/// objects in insertion order; strings yield one-character strings.
pub fn to_iterable(value: &Value) -> Result<Vec<Value>, RuntimeError> {
    match value {
        Value::Array(items) => Ok(items.clone()),
        Value::Object(o) => Ok(o
            .iter()
            .map(|(k, v)| {
                Value::Object(
                    [
                        ("key".to_string(), Value::String(k.clone())),
                        ("value".to_string(), v.clone()),
                    ]
                    .into_iter()
                    .collect(),
                )
            })
            .collect()),
        Value::String(s) => Ok(s.chars().map(|c| Value::String(c.to_string())).collect()),
        other => Err(RuntimeError::new(
            MessageCode::NotIterable,
            vec![other.kind().to_string()],
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(n: f64) -> Value {
        Value::Number(n)
    }

    fn s(text: &str) -> Value {
        Value::String(text.into())
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(
            evaluate_binary(BinaryOp::Add, &num(40.0), &num(2.0)).unwrap(),
            num(42.0)
        );
        assert_eq!(
            evaluate_binary(BinaryOp::Subtract, &num(5.0), &num(3.0)).unwrap(),
            num(2.0)
        );
        assert_eq!(
            evaluate_binary(BinaryOp::Multiply, &num(6.0), &num(7.0)).unwrap(),
            num(42.0)
        );
        assert_eq!(
            evaluate_binary(BinaryOp::Modulo, &num(7.0), &num(4.0)).unwrap(),
            num(3.0)
        );
    }

    #[test]
    fn test_add_concatenates_strings_and_arrays() {
        assert_eq!(
            evaluate_binary(BinaryOp::Add, &s("ab"), &s("cd")).unwrap(),
            s("abcd")
        );
        assert_eq!(
            evaluate_binary(
                BinaryOp::Add,
                &Value::Array(vec![num(1.0)]),
                &Value::Array(vec![num(2.0)])
            )
            .unwrap(),
            Value::Array(vec![num(1.0), num(2.0)])
        );
    }

    #[test]
    fn test_add_mixed_kinds_rejected() {
        let err = evaluate_binary(BinaryOp::Add, &s("n="), &num(1.0)).unwrap_err();
        assert_eq!(err.code, MessageCode::InvalidOperands);
    }

    #[test]
    fn test_division_by_zero() {
        let err = evaluate_binary(BinaryOp::Divide, &num(10.0), &num(0.0)).unwrap_err();
        assert_eq!(err.code, MessageCode::DivisionByZero);
        let err = evaluate_binary(BinaryOp::Modulo, &num(10.0), &num(0.0)).unwrap_err();
        assert_eq!(err.code, MessageCode::ModuloByZero);
    }

    #[test]
    fn test_equality_is_deep() {
        let a = Value::Array(vec![num(1.0), s("x")]);
        let b = Value::Array(vec![num(1.0), s("x")]);
        assert_eq!(
            evaluate_binary(BinaryOp::Equal, &a, &b).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            evaluate_binary(BinaryOp::Equal, &Value::Null, &Value::Null).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            evaluate_binary(BinaryOp::NotEqual, &a, &Value::Null).unwrap(),
            Value::Bool(true)
        );
    }

    #[test]
    fn test_relational_same_primitive_only() {
        assert_eq!(
            evaluate_binary(BinaryOp::Less, &num(1.0), &num(2.0)).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            evaluate_binary(BinaryOp::GreaterEqual, &s("b"), &s("a")).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            evaluate_binary(BinaryOp::Less, &Value::Bool(false), &Value::Bool(true)).unwrap(),
            Value::Bool(true)
        );
        let err = evaluate_binary(BinaryOp::Less, &num(1.0), &s("2")).unwrap_err();
        assert_eq!(err.code, MessageCode::IncomparableTypes);
    }

    #[test]
    fn test_relational_nan_is_false() {
        assert_eq!(
            evaluate_binary(BinaryOp::Less, &num(f64::NAN), &num(1.0)).unwrap(),
            Value::Bool(false)
        );
    }

    #[test]
    fn test_unary() {
        assert_eq!(evaluate_unary(UnaryOp::Negate, &num(3.0)).unwrap(), num(-3.0));
        assert_eq!(
            evaluate_unary(UnaryOp::Not, &Value::Null).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            evaluate_unary(UnaryOp::Increment, &num(41.0)).unwrap(),
            num(42.0)
        );
        assert_eq!(
            evaluate_unary(UnaryOp::Decrement, &num(43.0)).unwrap(),
            num(42.0)
        );
        let err = evaluate_unary(UnaryOp::Negate, &s("x")).unwrap_err();
        assert_eq!(err.code, MessageCode::InvalidOperands);
    }

    #[test]
    fn test_get_property() {
        let v: Value = [("name".to_string(), s("Alice"))].into_iter().collect();
        assert_eq!(get_property(&v, "name").unwrap(), s("Alice"));
        assert_eq!(get_property(&v, "missing").unwrap(), Value::Null);
        assert_eq!(
            get_property(&Value::Null, "x").unwrap_err().code,
            MessageCode::PropertyAccessOnNull
        );
        assert_eq!(
            get_property(&num(1.0), "x").unwrap_err().code,
            MessageCode::PropertyAccessInvalidType
        );
    }

    #[test]
    fn test_get_index_arrays() {
        let v = Value::Array(vec![num(10.0), num(20.0), num(30.0)]);
        assert_eq!(get_index(&v, &num(0.0)).unwrap(), num(10.0));
        assert_eq!(get_index(&v, &num(-1.0)).unwrap(), num(30.0));
        assert_eq!(
            get_index(&v, &num(3.0)).unwrap_err().code,
            MessageCode::IndexOutOfRange
        );
        assert_eq!(
            get_index(&v, &num(-4.0)).unwrap_err().code,
            MessageCode::IndexOutOfRange
        );
        assert_eq!(
            get_index(&v, &s("0")).unwrap_err().code,
            MessageCode::InvalidIndexType
        );
    }

    #[test]
    fn test_get_index_strings_and_objects() {
        assert_eq!(get_index(&s("héllo"), &num(1.0)).unwrap(), s("é"));
        assert_eq!(get_index(&s("abc"), &num(-1.0)).unwrap(), s("c"));
        let v: Value = [("k".to_string(), num(1.0))].into_iter().collect();
        assert_eq!(get_index(&v, &s("k")).unwrap(), num(1.0));
        assert_eq!(get_index(&v, &s("absent")).unwrap(), Value::Null);
        assert_eq!(
            get_index(&Value::Null, &num(0.0)).unwrap_err().code,
            MessageCode::IndexAccessOnNull
        );
        assert_eq!(
            get_index(&Value::Bool(true), &num(0.0)).unwrap_err().code,
            MessageCode::IndexAccessInvalidType
        );
    }

    #[test]
    fn test_set_index_rejects_negative() {
        let mut v = Value::Array(vec![num(1.0)]);
        assert_eq!(
            set_index(&mut v, &num(-1.0), num(9.0)).unwrap_err().code,
            MessageCode::NegativeIndex
        );
        set_index(&mut v, &num(0.0), num(9.0)).unwrap();
        assert_eq!(v, Value::Array(vec![num(9.0)]));
    }

    #[test]
    fn test_set_on_non_containers() {
        let mut v = Value::Null;
        assert_eq!(
            set_property(&mut v, "a", num(1.0)).unwrap_err().code,
            MessageCode::SetPropertyOnNonObject
        );
        assert_eq!(
            set_index(&mut v, &num(0.0), num(1.0)).unwrap_err().code,
            MessageCode::SetIndexOnNonContainer
        );
        let mut st = s("abc");
        assert_eq!(
            set_index(&mut st, &num(0.0), s("x")).unwrap_err().code,
            MessageCode::SetIndexOnNonContainer
        );
    }

    #[test]
    fn test_coerce_to_hint() {
        assert!(coerce_to_hint(&num(1.0), TypeHint::Number, "x").is_ok());
        assert!(coerce_to_hint(&num(1.0), TypeHint::Any, "x").is_ok());
        let err = coerce_to_hint(&s("hi"), TypeHint::Number, "x").unwrap_err();
        assert_eq!(err.code, MessageCode::InvalidType);
        assert_eq!(err.args, vec!["x", "Number", "String"]);
    }

    #[test]
    fn test_to_iterable() {
        let arr = Value::Array(vec![num(1.0), num(2.0)]);
        assert_eq!(to_iterable(&arr).unwrap().len(), 2);

        let obj: Value = [("a".to_string(), num(1.0))].into_iter().collect();
        let pairs = to_iterable(&obj).unwrap();
        assert_eq!(get_property(&pairs[0], "key").unwrap(), s("a"));
        assert_eq!(get_property(&pairs[0], "value").unwrap(), num(1.0));

        assert_eq!(to_iterable(&s("ab")).unwrap(), vec![s("a"), s("b")]);
        assert_eq!(
            to_iterable(&num(1.0)).unwrap_err().code,
            MessageCode::NotIterable
        );
    }
}
