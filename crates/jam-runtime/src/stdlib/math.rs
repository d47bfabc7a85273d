//! Math and aggregation builtins.

use jam_core::error::RuntimeError;
use jam_core::signature::{FunctionSignature, ParameterType as P};
use jam_core::value::Value;

use crate::executor::Invocation;
use crate::registry::FunctionRegistry;

use super::register;

pub(crate) fn install(registry: &mut FunctionRegistry) {
    register(
        registry,
        FunctionSignature::new("Abs")
            .required("value", P::Number)
            .returns(P::Number),
        |inv| Ok(Value::Number(inv.number(0)?.abs())),
    );
    register(
        registry,
        FunctionSignature::new("Floor")
            .required("value", P::Number)
            .returns(P::Number),
        |inv| Ok(Value::Number(inv.number(0)?.floor())),
    );
    register(
        registry,
        FunctionSignature::new("Ceiling")
            .required("value", P::Number)
            .returns(P::Number),
        |inv| Ok(Value::Number(inv.number(0)?.ceil())),
    );
    register(
        registry,
        FunctionSignature::new("Round")
            .required("value", P::Number)
            .returns(P::Number),
        |inv| Ok(Value::Number(inv.number(0)?.round())),
    );
    register(
        registry,
        FunctionSignature::new("Sqrt")
            .required("value", P::Number)
            .returns(P::Number),
        sqrt,
    );
    register(
        registry,
        FunctionSignature::new("Pow")
            .required("base", P::Number)
            .required("exponent", P::Number)
            .returns(P::Number),
        |inv| Ok(Value::Number(inv.number(0)?.powf(inv.number(1)?))),
    );
    register(
        registry,
        FunctionSignature::new("Clamp")
            .required("value", P::Number)
            .required("min", P::Number)
            .required("max", P::Number)
            .returns(P::Number),
        clamp,
    );
    register(
        registry,
        FunctionSignature::new("Min")
            .required("first", P::Number)
            .required("second", P::Number)
            .returns(P::Number),
        |inv| Ok(Value::Number(inv.number(0)?.min(inv.number(1)?))),
    );
    register(
        registry,
        FunctionSignature::new("Max")
            .required("first", P::Number)
            .required("second", P::Number)
            .returns(P::Number),
        |inv| Ok(Value::Number(inv.number(0)?.max(inv.number(1)?))),
    );
    register(
        registry,
        FunctionSignature::new("Sum")
            .required("values", P::Array)
            .returns(P::Number),
        sum,
    );
    register(
        registry,
        FunctionSignature::new("Average")
            .required("values", P::Array)
            .returns(P::Number),
        average,
    );
    register(
        registry,
        FunctionSignature::new("MinOf")
            .required("values", P::Array)
            .returns(P::Number),
        min_of,
    );
    register(
        registry,
        FunctionSignature::new("MaxOf")
            .required("values", P::Array)
            .returns(P::Number),
        max_of,
    );
}

fn sqrt(inv: &mut Invocation<'_, '_, '_>) -> Result<Value, RuntimeError> {
    let value = inv.number(0)?;
    if value < 0.0 {
        return Err(inv.failure("square root of a negative number"));
    }
    Ok(Value::Number(value.sqrt()))
}

fn clamp(inv: &mut Invocation<'_, '_, '_>) -> Result<Value, RuntimeError> {
    let (value, min, max) = (inv.number(0)?, inv.number(1)?, inv.number(2)?);
    if min > max {
        return Err(inv.failure("min is greater than max"));
    }
    Ok(Value::Number(value.clamp(min, max)))
}

fn numbers(inv: &Invocation<'_, '_, '_>) -> Result<Vec<f64>, RuntimeError> {
    inv.array(0)?
        .iter()
        .map(|v| v.as_number().ok_or_else(|| inv.expected(0, "Array of Number")))
        .collect()
}

fn sum(inv: &mut Invocation<'_, '_, '_>) -> Result<Value, RuntimeError> {
    Ok(Value::Number(numbers(inv)?.iter().sum()))
}

fn average(inv: &mut Invocation<'_, '_, '_>) -> Result<Value, RuntimeError> {
    let values = numbers(inv)?;
    if values.is_empty() {
        return Err(inv.failure("average of an empty array"));
    }
    Ok(Value::Number(values.iter().sum::<f64>() / values.len() as f64))
}

fn min_of(inv: &mut Invocation<'_, '_, '_>) -> Result<Value, RuntimeError> {
    let values = numbers(inv)?;
    values
        .into_iter()
        .reduce(f64::min)
        .map(Value::Number)
        .ok_or_else(|| inv.failure("minimum of an empty array"))
}

fn max_of(inv: &mut Invocation<'_, '_, '_>) -> Result<Value, RuntimeError> {
    let values = numbers(inv)?;
    values
        .into_iter()
        .reduce(f64::max)
        .map(Value::Number)
        .ok_or_else(|| inv.failure("maximum of an empty array"))
}
