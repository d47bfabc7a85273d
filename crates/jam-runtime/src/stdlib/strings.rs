//! String manipulation, padding, and regex builtins.

use jam_core::diag::MessageCode;
use jam_core::error::RuntimeError;
use jam_core::signature::{FunctionSignature, ParameterType as P};
use jam_core::value::Value;
use regex::RegexBuilder;

use crate::executor::Invocation;
use crate::registry::FunctionRegistry;

use super::register;

/// Hard upper cap on the padded length of `PadLeft`/`PadRight`.
const MAX_PADDED_LENGTH: i64 = 10_000;

/// Compiled-program size cap for user-supplied regular expressions. The
/// regex engine is linear-time in the haystack, so bounding the compiled
/// size bounds the per-call matching budget.
const REGEX_SIZE_LIMIT: usize = 1 << 20;

pub(crate) fn install(registry: &mut FunctionRegistry) {
    register(
        registry,
        FunctionSignature::new("Upper")
            .required("text", P::String)
            .returns(P::String),
        |inv| Ok(Value::String(inv.string(0)?.to_uppercase())),
    );
    register(
        registry,
        FunctionSignature::new("Lower")
            .required("text", P::String)
            .returns(P::String),
        |inv| Ok(Value::String(inv.string(0)?.to_lowercase())),
    );
    register(
        registry,
        FunctionSignature::new("Trim")
            .required("text", P::String)
            .returns(P::String),
        |inv| Ok(Value::String(inv.string(0)?.trim().to_string())),
    );
    register(
        registry,
        FunctionSignature::new("Split")
            .required("text", P::String)
            .required("separator", P::String)
            .returns(P::Array),
        split,
    );
    register(
        registry,
        FunctionSignature::new("Join")
            .required("values", P::Array)
            .required("separator", P::String)
            .returns(P::String),
        join,
    );
    register(
        registry,
        FunctionSignature::new("Replace")
            .required("text", P::String)
            .required("find", P::String)
            .required("replacement", P::String)
            .returns(P::String),
        |inv| {
            Ok(Value::String(
                inv.string(0)?.replace(inv.string(1)?, inv.string(2)?),
            ))
        },
    );
    register(
        registry,
        FunctionSignature::new("StartsWith")
            .required("text", P::String)
            .required("prefix", P::String)
            .returns(P::Boolean),
        |inv| Ok(Value::Bool(inv.string(0)?.starts_with(inv.string(1)?))),
    );
    register(
        registry,
        FunctionSignature::new("EndsWith")
            .required("text", P::String)
            .required("suffix", P::String)
            .returns(P::Boolean),
        |inv| Ok(Value::Bool(inv.string(0)?.ends_with(inv.string(1)?))),
    );
    register(
        registry,
        FunctionSignature::new("Substring")
            .required("text", P::String)
            .required("start", P::Number)
            .optional("length", P::Number)
            .returns(P::String),
        substring,
    );
    register(
        registry,
        FunctionSignature::new("PadLeft")
            .required("text", P::String)
            .required("width", P::Number)
            .optional("pad", P::String)
            .returns(P::String),
        pad_left,
    );
    register(
        registry,
        FunctionSignature::new("PadRight")
            .required("text", P::String)
            .required("width", P::Number)
            .optional("pad", P::String)
            .returns(P::String),
        pad_right,
    );
    register(
        registry,
        FunctionSignature::new("ToString")
            .required("value", P::Any)
            .returns(P::String),
        to_string,
    );
    register(
        registry,
        FunctionSignature::new("IsMatch")
            .required("text", P::String)
            .required("pattern", P::String)
            .returns(P::Boolean),
        is_match,
    );
    register(
        registry,
        FunctionSignature::new("RegexReplace")
            .required("text", P::String)
            .required("pattern", P::String)
            .required("replacement", P::String)
            .returns(P::String),
        regex_replace,
    );
}

fn split(inv: &mut Invocation<'_, '_, '_>) -> Result<Value, RuntimeError> {
    let text = inv.string(0)?;
    let separator = inv.string(1)?;
    let parts: Vec<Value> = if separator.is_empty() {
        text.chars().map(|c| Value::String(c.to_string())).collect()
    } else {
        text.split(separator)
            .map(|p| Value::String(p.to_string()))
            .collect()
    };
    Ok(Value::Array(parts))
}

fn join(inv: &mut Invocation<'_, '_, '_>) -> Result<Value, RuntimeError> {
    let separator = inv.string(1)?.to_string();
    let parts: Vec<String> = inv
        .array(0)?
        .iter()
        .map(|v| match v {
            Value::String(s) => s.clone(),
            other => format!("{other}"),
        })
        .collect();
    Ok(Value::String(parts.join(&separator)))
}

fn substring(inv: &mut Invocation<'_, '_, '_>) -> Result<Value, RuntimeError> {
    let chars: Vec<char> = inv.string(0)?.chars().collect();
    let start = inv.integer(1)?.max(0) as usize;
    let length = match inv.opt(2) {
        Some(_) => inv.integer(2)?.max(0) as usize,
        None => chars.len().saturating_sub(start),
    };
    let start = start.min(chars.len());
    let end = start.saturating_add(length).min(chars.len());
    Ok(Value::String(chars[start..end].iter().collect()))
}

fn pad(inv: &mut Invocation<'_, '_, '_>, left: bool) -> Result<Value, RuntimeError> {
    let text = inv.string(0)?.to_string();
    let width = inv.integer(1)?;
    if width > MAX_PADDED_LENGTH {
        return Err(RuntimeError::new(
            MessageCode::PaddingLimitExceeded,
            vec![width.to_string(), MAX_PADDED_LENGTH.to_string()],
        ));
    }
    let pad_char = match inv.opt(2) {
        Some(_) => inv
            .string(2)?
            .chars()
            .next()
            .ok_or_else(|| inv.failure("pad string is empty"))?,
        None => ' ',
    };
    let current = text.chars().count() as i64;
    if width <= current {
        return Ok(Value::String(text));
    }
    let fill: String = std::iter::repeat(pad_char)
        .take((width - current) as usize)
        .collect();
    Ok(Value::String(if left {
        format!("{fill}{text}")
    } else {
        format!("{text}{fill}")
    }))
}

fn pad_left(inv: &mut Invocation<'_, '_, '_>) -> Result<Value, RuntimeError> {
    pad(inv, true)
}

fn pad_right(inv: &mut Invocation<'_, '_, '_>) -> Result<Value, RuntimeError> {
    pad(inv, false)
}

fn to_string(inv: &mut Invocation<'_, '_, '_>) -> Result<Value, RuntimeError> {
    Ok(Value::String(match inv.value(0) {
        Value::String(s) => s.clone(),
        other => format!("{other}"),
    }))
}

/// Compile a user-supplied pattern under the size budget.
///
/// A pattern that is syntactically valid but compiles past the budget is
/// reported as a budget breach, not as a malformed pattern.
pub(crate) fn compile_regex(pattern: &str) -> Result<regex::Regex, RuntimeError> {
    RegexBuilder::new(pattern)
        .size_limit(REGEX_SIZE_LIMIT)
        .dfa_size_limit(REGEX_SIZE_LIMIT)
        .build()
        .map_err(|e| match e {
            regex::Error::CompiledTooBig(_) => {
                RuntimeError::new(MessageCode::RegexBudgetExceeded, vec![])
            }
            other => RuntimeError::new(MessageCode::InvalidRegex, vec![other.to_string()]),
        })
}

fn is_match(inv: &mut Invocation<'_, '_, '_>) -> Result<Value, RuntimeError> {
    let regex = compile_regex(inv.string(1)?)?;
    Ok(Value::Bool(regex.is_match(inv.string(0)?)))
}

fn regex_replace(inv: &mut Invocation<'_, '_, '_>) -> Result<Value, RuntimeError> {
    let regex = compile_regex(inv.string(1)?)?;
    Ok(Value::String(
        regex.replace_all(inv.string(0)?, inv.string(2)?).into_owned(),
    ))
}
