//! Structural validation builtins: required-field checks and a
//! JSON-Schema subset (type / required / properties / items / enum).

use indexmap::IndexMap;
use jam_core::error::RuntimeError;
use jam_core::signature::{FunctionSignature, ParameterType as P};
use jam_core::value::{Value, ValueKind};

use crate::executor::Invocation;
use crate::registry::FunctionRegistry;

use super::register;

pub(crate) fn install(registry: &mut FunctionRegistry) {
    register(
        registry,
        FunctionSignature::new("HasRequiredFields")
            .required("object", P::Object)
            .required("fields", P::Array)
            .returns(P::Boolean),
        has_required_fields,
    );
    register(
        registry,
        FunctionSignature::new("ValidateSchema")
            .required("value", P::Any)
            .required("schema", P::Object)
            .returns(P::Array),
        validate_schema,
    );
}

fn has_required_fields(inv: &mut Invocation<'_, '_, '_>) -> Result<Value, RuntimeError> {
    let object = inv.object(0)?;
    for field in inv.array(1)? {
        let Value::String(name) = field else {
            return Err(inv.expected(1, "Array of String"));
        };
        if !object.contains_key(name.as_str()) {
            return Ok(Value::Bool(false));
        }
    }
    Ok(Value::Bool(true))
}

fn validate_schema(inv: &mut Invocation<'_, '_, '_>) -> Result<Value, RuntimeError> {
    let schema = inv.object(1)?.clone();
    let value = inv.value(0);
    let mut violations = Vec::new();
    check(value, &schema, "value", &mut violations);
    Ok(Value::Array(
        violations.into_iter().map(Value::String).collect(),
    ))
}

fn kind_name(kind: ValueKind) -> &'static str {
    match kind {
        ValueKind::Null => "null",
        ValueKind::Boolean => "boolean",
        ValueKind::Number => "number",
        ValueKind::String => "string",
        ValueKind::Array => "array",
        ValueKind::Object => "object",
    }
}

fn check(
    value: &Value,
    schema: &IndexMap<String, Value>,
    path: &str,
    violations: &mut Vec<String>,
) {
    if let Some(Value::String(expected)) = schema.get("type") {
        if expected != "any" && kind_name(value.kind()) != expected {
            violations.push(format!(
                "{path}: expected {expected}, got {}",
                kind_name(value.kind())
            ));
            return;
        }
    }

    if let Some(Value::Array(allowed)) = schema.get("enum") {
        if !allowed.contains(value) {
            violations.push(format!("{path}: value is not one of the allowed values"));
        }
    }

    if let Value::Object(object) = value {
        if let Some(Value::Array(required)) = schema.get("required") {
            for field in required {
                if let Value::String(name) = field {
                    if !object.contains_key(name.as_str()) {
                        violations.push(format!("{path}: missing required field '{name}'"));
                    }
                }
            }
        }
        if let Some(Value::Object(properties)) = schema.get("properties") {
            for (key, sub_schema) in properties {
                if let (Some(sub_value), Value::Object(sub_schema)) =
                    (object.get(key.as_str()), sub_schema)
                {
                    check(sub_value, sub_schema, &format!("{path}.{key}"), violations);
                }
            }
        }
    }

    if let (Value::Array(items), Some(Value::Object(item_schema))) =
        (value, schema.get("items"))
    {
        for (i, item) in items.iter().enumerate() {
            check(item, item_schema, &format!("{path}[{i}]"), violations);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obj(pairs: &[(&str, Value)]) -> IndexMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_type_and_required() {
        let schema = obj(&[
            ("type", Value::String("object".into())),
            (
                "required",
                Value::Array(vec![Value::String("name".into())]),
            ),
        ]);
        let mut violations = Vec::new();
        check(&Value::Object(obj(&[])), &schema, "value", &mut violations);
        assert_eq!(violations, vec!["value: missing required field 'name'"]);
    }

    #[test]
    fn test_nested_properties_and_items() {
        let schema = obj(&[(
            "properties",
            Value::Object(obj(&[(
                "tags",
                Value::Object(obj(&[
                    ("type", Value::String("array".into())),
                    (
                        "items",
                        Value::Object(obj(&[("type", Value::String("string".into()))])),
                    ),
                ])),
            )])),
        )]);
        let value = Value::Object(obj(&[(
            "tags",
            Value::Array(vec![Value::String("a".into()), Value::Number(1.0)]),
        )]));
        let mut violations = Vec::new();
        check(&value, &schema, "value", &mut violations);
        assert_eq!(violations, vec!["value.tags[1]: expected string, got number"]);
    }

    #[test]
    fn test_enum() {
        let schema = obj(&[(
            "enum",
            Value::Array(vec![Value::String("a".into()), Value::String("b".into())]),
        )]);
        let mut violations = Vec::new();
        check(&Value::String("c".into()), &schema, "value", &mut violations);
        assert_eq!(violations.len(), 1);
    }
}
