//! Utility builtins: type introspection, deep clone/equality/diff, JSON
//! in/out, identifiers, base-64, randomness, and sleep.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use indexmap::IndexMap;
use jam_core::diag::MessageCode;
use jam_core::error::RuntimeError;
use jam_core::limits::CancelReason;
use jam_core::signature::{FunctionSignature, ParameterType as P};
use jam_core::value::Value;
use rand::Rng;
use std::time::Duration;

use crate::executor::Invocation;
use crate::registry::FunctionRegistry;

use super::register;

/// Longest string `RandomString` will produce.
const MAX_RANDOM_STRING: i64 = 10_000;

const DEFAULT_ALPHABET: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

pub(crate) fn install(registry: &mut FunctionRegistry) {
    register(
        registry,
        FunctionSignature::new("TypeOf")
            .required("value", P::Any)
            .returns(P::String),
        |inv| Ok(Value::String(inv.value(0).kind().to_string())),
    );
    register(
        registry,
        FunctionSignature::new("Clone")
            .required("value", P::Any)
            .returns(P::Any),
        |inv| Ok(inv.take(0)),
    );
    register(
        registry,
        FunctionSignature::new("Equal")
            .required("first", P::Any)
            .required("second", P::Any)
            .returns(P::Boolean),
        |inv| Ok(Value::Bool(inv.value(0) == inv.value(1))),
    );
    register(
        registry,
        FunctionSignature::new("Diff")
            .required("first", P::Any)
            .required("second", P::Any)
            .returns(P::Any),
        |inv| Ok(diff_values(inv.value(0), inv.value(1))),
    );
    register(
        registry,
        FunctionSignature::new("ToJson")
            .required("value", P::Any)
            .returns(P::String),
        to_json,
    );
    register(
        registry,
        FunctionSignature::new("FromJson")
            .required("text", P::String)
            .returns(P::Any),
        from_json,
    );
    register(
        registry,
        FunctionSignature::new("Coalesce")
            .required("first", P::Any)
            .required("second", P::Any)
            .optional("third", P::Any)
            .optional("fourth", P::Any)
            .returns(P::Any),
        coalesce,
    );
    register(
        registry,
        FunctionSignature::new("NewGuid").returns(P::String),
        |_| Ok(Value::String(uuid::Uuid::new_v4().to_string())),
    );
    register(
        registry,
        FunctionSignature::new("Base64Encode")
            .required("text", P::String)
            .returns(P::String),
        |inv| Ok(Value::String(BASE64.encode(inv.string(0)?.as_bytes()))),
    );
    register(
        registry,
        FunctionSignature::new("Base64Decode")
            .required("text", P::String)
            .returns(P::String),
        base64_decode,
    );
    register(
        registry,
        FunctionSignature::new("RandomInt")
            .required("min", P::Number)
            .required("max", P::Number)
            .returns(P::Number),
        random_int,
    );
    register(
        registry,
        FunctionSignature::new("RandomString")
            .required("length", P::Number)
            .optional("alphabet", P::String)
            .returns(P::String),
        random_string,
    );
    register(
        registry,
        FunctionSignature::new("Sleep")
            .required("milliseconds", P::Number)
            .returns(P::Null),
        sleep,
    );
}

/// Structural difference: Null when equal, per-key recursion for two
/// objects, otherwise a `{before, after}` pair. Two nulls are equal.
fn diff_values(first: &Value, second: &Value) -> Value {
    if first == second {
        return Value::Null;
    }
    match (first, second) {
        (Value::Object(a), Value::Object(b)) => {
            let mut out = IndexMap::new();
            for (key, value_a) in a {
                match b.get(key) {
                    Some(value_b) => {
                        let nested = diff_values(value_a, value_b);
                        if !nested.is_null() {
                            out.insert(key.clone(), nested);
                        }
                    }
                    None => {
                        out.insert(key.clone(), before_after(value_a.clone(), Value::Null));
                    }
                }
            }
            for (key, value_b) in b {
                if !a.contains_key(key.as_str()) {
                    out.insert(key.clone(), before_after(Value::Null, value_b.clone()));
                }
            }
            Value::Object(out)
        }
        _ => before_after(first.clone(), second.clone()),
    }
}

fn before_after(before: Value, after: Value) -> Value {
    Value::Object(
        [("before".to_string(), before), ("after".to_string(), after)]
            .into_iter()
            .collect(),
    )
}

fn to_json(inv: &mut Invocation<'_, '_, '_>) -> Result<Value, RuntimeError> {
    let json = inv
        .value(0)
        .to_json()
        .map_err(|e| RuntimeError::new(MessageCode::InvalidJson, vec![e]))?;
    serde_json::to_string(&json)
        .map(Value::String)
        .map_err(|e| RuntimeError::new(MessageCode::InvalidJson, vec![e.to_string()]))
}

fn from_json(inv: &mut Invocation<'_, '_, '_>) -> Result<Value, RuntimeError> {
    Value::parse_json(inv.string(0)?)
        .map_err(|e| RuntimeError::new(MessageCode::InvalidJson, vec![e]))
}

fn coalesce(inv: &mut Invocation<'_, '_, '_>) -> Result<Value, RuntimeError> {
    for i in 0..inv.arg_count() {
        if !inv.value(i).is_null() {
            return Ok(inv.take(i));
        }
    }
    Ok(Value::Null)
}

fn base64_decode(inv: &mut Invocation<'_, '_, '_>) -> Result<Value, RuntimeError> {
    let bytes = BASE64
        .decode(inv.string(0)?)
        .map_err(|e| RuntimeError::new(MessageCode::InvalidBase64, vec![e.to_string()]))?;
    String::from_utf8(bytes)
        .map(Value::String)
        .map_err(|_| {
            RuntimeError::new(
                MessageCode::InvalidBase64,
                vec!["decoded bytes are not valid UTF-8".to_string()],
            )
        })
}

fn random_int(inv: &mut Invocation<'_, '_, '_>) -> Result<Value, RuntimeError> {
    let min = inv.integer(0)?;
    let max = inv.integer(1)?;
    if min > max {
        return Err(inv.failure("min is greater than max"));
    }
    // The thread RNG is a CSPRNG, as required for random generation.
    let value = rand::thread_rng().gen_range(min..=max);
    Ok(Value::Number(value as f64))
}

fn random_string(inv: &mut Invocation<'_, '_, '_>) -> Result<Value, RuntimeError> {
    let length = inv.integer(0)?;
    if !(0..=MAX_RANDOM_STRING).contains(&length) {
        return Err(inv.failure(format!(
            "length must be between 0 and {MAX_RANDOM_STRING}"
        )));
    }
    let alphabet: Vec<char> = match inv.opt(1) {
        Some(_) => inv.string(1)?.chars().collect(),
        None => DEFAULT_ALPHABET.chars().collect(),
    };
    if alphabet.is_empty() {
        return Err(inv.failure("alphabet is empty"));
    }
    let mut rng = rand::thread_rng();
    let out: String = (0..length)
        .map(|_| alphabet[rng.gen_range(0..alphabet.len())])
        .collect();
    Ok(Value::String(out))
}

/// Blocks for the requested duration, polling the combined cancellation
/// token in small slices so cancellation is observed promptly rather than
/// at the next statement boundary.
fn sleep(inv: &mut Invocation<'_, '_, '_>) -> Result<Value, RuntimeError> {
    let millis = inv.number(0)?;
    if !millis.is_finite() || millis < 0.0 {
        return Err(inv.expected(0, "non-negative Number"));
    }
    let token = inv.context().cancellation_token().clone();
    match token.sleep(Duration::from_millis(millis as u64)) {
        None => Ok(Value::Null),
        Some(CancelReason::Host) => {
            Err(RuntimeError::new(MessageCode::CancelledByHost, vec![]))
        }
        Some(CancelReason::Timeout) => {
            let ms = inv
                .context()
                .options()
                .max_execution_time
                .map(|d| d.as_millis().to_string())
                .unwrap_or_default();
            Err(RuntimeError::new(
                MessageCode::ExecutionTimeLimitExceeded,
                vec![ms],
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diff_equal_values_is_null() {
        assert_eq!(diff_values(&Value::Null, &Value::Null), Value::Null);
        assert_eq!(
            diff_values(&Value::Number(1.0), &Value::Number(1.0)),
            Value::Null
        );
    }

    #[test]
    fn test_diff_objects_recurses_per_key() {
        let a: Value = [
            ("same".to_string(), Value::Number(1.0)),
            ("changed".to_string(), Value::Number(2.0)),
        ]
        .into_iter()
        .collect();
        let b: Value = [
            ("same".to_string(), Value::Number(1.0)),
            ("changed".to_string(), Value::Number(3.0)),
            ("added".to_string(), Value::Bool(true)),
        ]
        .into_iter()
        .collect();
        let diff = diff_values(&a, &b);
        let map = diff.as_object().unwrap();
        assert!(!map.contains_key("same"));
        assert_eq!(
            map.get("changed"),
            Some(&before_after(Value::Number(2.0), Value::Number(3.0)))
        );
        assert_eq!(
            map.get("added"),
            Some(&before_after(Value::Null, Value::Bool(true)))
        );
    }

    #[test]
    fn test_diff_mismatched_kinds() {
        let diff = diff_values(&Value::Number(1.0), &Value::String("1".into()));
        assert_eq!(
            diff,
            before_after(Value::Number(1.0), Value::String("1".into()))
        );
    }
}
