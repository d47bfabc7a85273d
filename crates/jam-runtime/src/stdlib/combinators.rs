//! Higher-order combinators over arrays.
//!
//! Each combinator takes a lambda and invokes it once per element through
//! the invocation handle, which routes every invocation through call-depth
//! accounting. Lambdas receive `(element, index)`; declared parameters
//! beyond what the lambda names are simply not bound.

use jam_core::error::RuntimeError;
use jam_core::signature::{FunctionSignature, ParameterType as P};
use jam_core::value::Value;

use crate::executor::Invocation;
use crate::registry::FunctionRegistry;

use super::arrays::sort_values;
use super::register;

pub(crate) fn install(registry: &mut FunctionRegistry) {
    register(
        registry,
        FunctionSignature::new("Map")
            .required("array", P::Array)
            .required("transform", P::Lambda)
            .returns(P::Array),
        map,
    );
    register(
        registry,
        FunctionSignature::new("Where")
            .required("array", P::Array)
            .required("predicate", P::Lambda)
            .returns(P::Array),
        where_,
    );
    register(
        registry,
        FunctionSignature::new("All")
            .required("array", P::Array)
            .required("predicate", P::Lambda)
            .returns(P::Boolean),
        all,
    );
    register(
        registry,
        FunctionSignature::new("Any")
            .required("array", P::Array)
            .required("predicate", P::Lambda)
            .returns(P::Boolean),
        any,
    );
    register(
        registry,
        FunctionSignature::new("Find")
            .required("array", P::Array)
            .required("predicate", P::Lambda)
            .returns(P::Any),
        find,
    );
    register(
        registry,
        FunctionSignature::new("Reduce")
            .required("array", P::Array)
            .required("accumulator", P::Lambda)
            .required("initial", P::Any)
            .returns(P::Any),
        reduce,
    );
    register(
        registry,
        FunctionSignature::new("SortBy")
            .required("array", P::Array)
            .required("selector", P::Lambda)
            .returns(P::Array),
        sort_by,
    );
    register(
        registry,
        FunctionSignature::new("Each")
            .required("array", P::Array)
            .required("action", P::Lambda)
            .returns(P::Null),
        each,
    );
}

fn map(inv: &mut Invocation<'_, '_, '_>) -> Result<Value, RuntimeError> {
    let items = inv.array(0)?.clone();
    let mut out = Vec::with_capacity(items.len());
    for (i, item) in items.into_iter().enumerate() {
        out.push(inv.invoke_lambda(1, &[item, Value::from(i)])?);
    }
    Ok(Value::Array(out))
}

fn where_(inv: &mut Invocation<'_, '_, '_>) -> Result<Value, RuntimeError> {
    let items = inv.array(0)?.clone();
    let mut out = Vec::new();
    for (i, item) in items.into_iter().enumerate() {
        if inv
            .invoke_lambda(1, &[item.clone(), Value::from(i)])?
            .is_truthy()
        {
            out.push(item);
        }
    }
    Ok(Value::Array(out))
}

fn all(inv: &mut Invocation<'_, '_, '_>) -> Result<Value, RuntimeError> {
    let items = inv.array(0)?.clone();
    for (i, item) in items.into_iter().enumerate() {
        if !inv.invoke_lambda(1, &[item, Value::from(i)])?.is_truthy() {
            return Ok(Value::Bool(false));
        }
    }
    Ok(Value::Bool(true))
}

fn any(inv: &mut Invocation<'_, '_, '_>) -> Result<Value, RuntimeError> {
    let items = inv.array(0)?.clone();
    for (i, item) in items.into_iter().enumerate() {
        if inv.invoke_lambda(1, &[item, Value::from(i)])?.is_truthy() {
            return Ok(Value::Bool(true));
        }
    }
    Ok(Value::Bool(false))
}

fn find(inv: &mut Invocation<'_, '_, '_>) -> Result<Value, RuntimeError> {
    let items = inv.array(0)?.clone();
    for (i, item) in items.into_iter().enumerate() {
        if inv
            .invoke_lambda(1, &[item.clone(), Value::from(i)])?
            .is_truthy()
        {
            return Ok(item);
        }
    }
    Ok(Value::Null)
}

fn reduce(inv: &mut Invocation<'_, '_, '_>) -> Result<Value, RuntimeError> {
    let items = inv.array(0)?.clone();
    let mut acc = inv.take(2);
    for item in items {
        acc = inv.invoke_lambda(1, &[acc, item])?;
    }
    Ok(acc)
}

fn sort_by(inv: &mut Invocation<'_, '_, '_>) -> Result<Value, RuntimeError> {
    let items = inv.array(0)?.clone();
    let mut keyed = Vec::with_capacity(items.len());
    for item in items {
        let key = inv.invoke_lambda(1, &[item.clone()])?;
        keyed.push((key, item));
    }
    // Validate key comparability by sorting the keys alone first.
    let mut keys: Vec<Value> = keyed.iter().map(|(k, _)| k.clone()).collect();
    sort_values(&mut keys)?;
    keyed.sort_by(|(a, _), (b, _)| match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.total_cmp(y),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => std::cmp::Ordering::Equal,
    });
    Ok(Value::Array(keyed.into_iter().map(|(_, v)| v).collect()))
}

fn each(inv: &mut Invocation<'_, '_, '_>) -> Result<Value, RuntimeError> {
    let items = inv.array(0)?.clone();
    for (i, item) in items.into_iter().enumerate() {
        inv.invoke_lambda(1, &[item, Value::from(i)])?;
    }
    Ok(Value::Null)
}
