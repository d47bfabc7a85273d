//! Array manipulation builtins.

use jam_core::diag::MessageCode;
use jam_core::error::RuntimeError;
use jam_core::signature::{FunctionSignature, ParameterType as P};
use jam_core::value::Value;

use crate::executor::Invocation;
use crate::registry::FunctionRegistry;

use super::register;

/// Largest array `Range` will materialize.
const MAX_RANGE: f64 = 100_000.0;

pub(crate) fn install(registry: &mut FunctionRegistry) {
    register(
        registry,
        FunctionSignature::new("Length")
            .required("value", P::Any)
            .returns(P::Number),
        length,
    );
    register(
        registry,
        FunctionSignature::new("Append")
            .required("array", P::Array)
            .required("value", P::Any)
            .returns(P::Array),
        append,
    );
    register(
        registry,
        FunctionSignature::new("Insert")
            .required("array", P::Array)
            .required("index", P::Number)
            .required("value", P::Any)
            .returns(P::Array),
        insert,
    );
    register(
        registry,
        FunctionSignature::new("RemoveAt")
            .required("array", P::Array)
            .required("index", P::Number)
            .returns(P::Array),
        remove_at,
    );
    register(
        registry,
        FunctionSignature::new("IndexOf")
            .required("array", P::Array)
            .required("value", P::Any)
            .returns(P::Number),
        index_of,
    );
    register(
        registry,
        FunctionSignature::new("Contains")
            .required("collection", P::Any)
            .required("value", P::Any)
            .returns(P::Boolean),
        contains,
    );
    register(
        registry,
        FunctionSignature::new("Reverse")
            .required("array", P::Array)
            .returns(P::Array),
        reverse,
    );
    register(
        registry,
        FunctionSignature::new("Sort")
            .required("array", P::Array)
            .returns(P::Array),
        sort,
    );
    register(
        registry,
        FunctionSignature::new("Concatenate")
            .required("first", P::Array)
            .required("second", P::Array)
            .returns(P::Array),
        concatenate,
    );
    register(
        registry,
        FunctionSignature::new("Flatten")
            .required("array", P::Array)
            .returns(P::Array),
        flatten,
    );
    register(
        registry,
        FunctionSignature::new("Range")
            .required("start", P::Number)
            .required("end", P::Number)
            .returns(P::Array),
        range,
    );
}

fn length(inv: &mut Invocation<'_, '_, '_>) -> Result<Value, RuntimeError> {
    let count = match inv.value(0) {
        Value::Array(items) => items.len(),
        Value::String(s) => s.chars().count(),
        Value::Object(map) => map.len(),
        _ => return Err(inv.expected(0, "Array, String, or Object")),
    };
    Ok(Value::from(count))
}

fn append(inv: &mut Invocation<'_, '_, '_>) -> Result<Value, RuntimeError> {
    let value = inv.take(1);
    let mut items = match inv.take(0) {
        Value::Array(items) => items,
        _ => return Err(inv.expected(0, "Array")),
    };
    items.push(value);
    Ok(Value::Array(items))
}

fn insert(inv: &mut Invocation<'_, '_, '_>) -> Result<Value, RuntimeError> {
    let index = inv.integer(1)?;
    let value = inv.take(2);
    let mut items = match inv.take(0) {
        Value::Array(items) => items,
        _ => return Err(inv.expected(0, "Array")),
    };
    if index < 0 {
        return Err(RuntimeError::new(
            MessageCode::NegativeIndex,
            vec![index.to_string()],
        ));
    }
    if index as usize > items.len() {
        return Err(RuntimeError::new(
            MessageCode::IndexOutOfRange,
            vec![index.to_string(), items.len().to_string()],
        ));
    }
    items.insert(index as usize, value);
    Ok(Value::Array(items))
}

fn remove_at(inv: &mut Invocation<'_, '_, '_>) -> Result<Value, RuntimeError> {
    let index = inv.integer(1)?;
    let mut items = match inv.take(0) {
        Value::Array(items) => items,
        _ => return Err(inv.expected(0, "Array")),
    };
    if index < 0 {
        return Err(RuntimeError::new(
            MessageCode::NegativeIndex,
            vec![index.to_string()],
        ));
    }
    if index as usize >= items.len() {
        return Err(RuntimeError::new(
            MessageCode::IndexOutOfRange,
            vec![index.to_string(), items.len().to_string()],
        ));
    }
    items.remove(index as usize);
    Ok(Value::Array(items))
}

fn index_of(inv: &mut Invocation<'_, '_, '_>) -> Result<Value, RuntimeError> {
    let needle = inv.value(1).clone();
    let items = inv.array(0)?;
    let index = items
        .iter()
        .position(|item| *item == needle)
        .map(|i| i as f64)
        .unwrap_or(-1.0);
    Ok(Value::Number(index))
}

fn contains(inv: &mut Invocation<'_, '_, '_>) -> Result<Value, RuntimeError> {
    let found = match (inv.value(0), inv.value(1)) {
        (Value::Array(items), needle) => items.contains(needle),
        (Value::String(haystack), Value::String(needle)) => haystack.contains(needle.as_str()),
        (Value::String(_), _) => return Err(inv.expected(1, "String")),
        (Value::Object(map), Value::String(key)) => map.contains_key(key.as_str()),
        (Value::Object(_), _) => return Err(inv.expected(1, "String")),
        _ => return Err(inv.expected(0, "Array, String, or Object")),
    };
    Ok(Value::Bool(found))
}

fn reverse(inv: &mut Invocation<'_, '_, '_>) -> Result<Value, RuntimeError> {
    let mut items = match inv.take(0) {
        Value::Array(items) => items,
        _ => return Err(inv.expected(0, "Array")),
    };
    items.reverse();
    Ok(Value::Array(items))
}

fn sort(inv: &mut Invocation<'_, '_, '_>) -> Result<Value, RuntimeError> {
    let mut items = match inv.take(0) {
        Value::Array(items) => items,
        _ => return Err(inv.expected(0, "Array")),
    };
    sort_values(&mut items)?;
    Ok(Value::Array(items))
}

/// Stable sort for all-number or all-string arrays.
pub(crate) fn sort_values(items: &mut [Value]) -> Result<(), RuntimeError> {
    if items.is_empty() {
        return Ok(());
    }
    match items[0] {
        Value::Number(_) => {
            for item in items.iter() {
                if !matches!(item, Value::Number(_)) {
                    return Err(incomparable(&items[0], item));
                }
            }
            items.sort_by(|a, b| {
                let (Value::Number(x), Value::Number(y)) = (a, b) else {
                    return std::cmp::Ordering::Equal;
                };
                x.total_cmp(y)
            });
            Ok(())
        }
        Value::String(_) => {
            for item in items.iter() {
                if !matches!(item, Value::String(_)) {
                    return Err(incomparable(&items[0], item));
                }
            }
            items.sort_by(|a, b| {
                let (Value::String(x), Value::String(y)) = (a, b) else {
                    return std::cmp::Ordering::Equal;
                };
                x.cmp(y)
            });
            Ok(())
        }
        _ => Err(incomparable(&items[0], &items[0])),
    }
}

fn incomparable(a: &Value, b: &Value) -> RuntimeError {
    RuntimeError::new(
        MessageCode::IncomparableTypes,
        vec![a.kind().to_string(), b.kind().to_string()],
    )
}

fn concatenate(inv: &mut Invocation<'_, '_, '_>) -> Result<Value, RuntimeError> {
    let second = match inv.take(1) {
        Value::Array(items) => items,
        _ => return Err(inv.expected(1, "Array")),
    };
    let mut first = match inv.take(0) {
        Value::Array(items) => items,
        _ => return Err(inv.expected(0, "Array")),
    };
    first.extend(second);
    Ok(Value::Array(first))
}

fn flatten(inv: &mut Invocation<'_, '_, '_>) -> Result<Value, RuntimeError> {
    let items = match inv.take(0) {
        Value::Array(items) => items,
        _ => return Err(inv.expected(0, "Array")),
    };
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Value::Array(inner) => out.extend(inner),
            other => out.push(other),
        }
    }
    Ok(Value::Array(out))
}

fn range(inv: &mut Invocation<'_, '_, '_>) -> Result<Value, RuntimeError> {
    let start = inv.integer(0)?;
    let end = inv.integer(1)?;
    if end <= start {
        return Ok(Value::Array(Vec::new()));
    }
    if (end - start) as f64 > MAX_RANGE {
        return Err(inv.failure(format!("range of {} elements is too large", end - start)));
    }
    Ok(Value::Array(
        (start..end).map(|n| Value::Number(n as f64)).collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_values_numbers_and_strings() {
        let mut items = vec![Value::Number(3.0), Value::Number(1.0), Value::Number(2.0)];
        sort_values(&mut items).unwrap();
        assert_eq!(
            items,
            vec![Value::Number(1.0), Value::Number(2.0), Value::Number(3.0)]
        );

        let mut items = vec![Value::String("b".into()), Value::String("a".into())];
        sort_values(&mut items).unwrap();
        assert_eq!(items, vec![Value::String("a".into()), Value::String("b".into())]);
    }

    #[test]
    fn test_sort_values_rejects_mixed_kinds() {
        let mut items = vec![Value::Number(1.0), Value::String("a".into())];
        let err = sort_values(&mut items).unwrap_err();
        assert_eq!(err.code, MessageCode::IncomparableTypes);
    }

    #[test]
    fn test_sort_values_empty_is_fine() {
        sort_values(&mut []).unwrap();
    }
}
