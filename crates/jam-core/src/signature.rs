//! Function signatures and the merged builtin + host function table.
//!
//! Every callable - builtin or host-authored - declares a signature: an
//! ordered parameter list with per-parameter types and a required flag,
//! plus a declared return type. Min and max arity fall out of the
//! parameter list. The linker checks every call site against these.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::value::ValueKind;

/// Declared type of a parameter or return value. `Lambda` marks parameters
/// that take an inline closure; the linker enforces that obligation
/// structurally at the call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParameterType {
    Any,
    Boolean,
    Number,
    String,
    Array,
    Object,
    Null,
    Lambda,
}

impl ParameterType {
    /// Whether an evaluated value of `kind` satisfies this parameter type.
    /// Lambda parameters are never satisfied by a value.
    pub fn accepts(self, kind: ValueKind) -> bool {
        match self {
            ParameterType::Any => true,
            ParameterType::Boolean => kind == ValueKind::Boolean,
            ParameterType::Number => kind == ValueKind::Number,
            ParameterType::String => kind == ValueKind::String,
            ParameterType::Array => kind == ValueKind::Array,
            ParameterType::Object => kind == ValueKind::Object,
            ParameterType::Null => kind == ValueKind::Null,
            ParameterType::Lambda => false,
        }
    }
}

impl fmt::Display for ParameterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParameterType::Any => "Any",
            ParameterType::Boolean => "Boolean",
            ParameterType::Number => "Number",
            ParameterType::String => "String",
            ParameterType::Array => "Array",
            ParameterType::Object => "Object",
            ParameterType::Null => "Null",
            ParameterType::Lambda => "Lambda",
        };
        write!(f, "{name}")
    }
}

/// One declared parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub ty: ParameterType,
    pub required: bool,
}

/// The declared shape of a callable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionSignature {
    pub name: String,
    pub params: Vec<Parameter>,
    pub returns: ParameterType,
}

impl FunctionSignature {
    pub fn new(name: impl Into<String>) -> Self {
        FunctionSignature {
            name: name.into(),
            params: Vec::new(),
            returns: ParameterType::Any,
        }
    }

    /// Append a required parameter.
    pub fn required(mut self, name: &str, ty: ParameterType) -> Self {
        self.params.push(Parameter {
            name: name.to_string(),
            ty,
            required: true,
        });
        self
    }

    /// Append an optional parameter. Optional parameters must trail the
    /// required ones; [`FunctionSignature::validate`] enforces this.
    pub fn optional(mut self, name: &str, ty: ParameterType) -> Self {
        self.params.push(Parameter {
            name: name.to_string(),
            ty,
            required: false,
        });
        self
    }

    pub fn returns(mut self, ty: ParameterType) -> Self {
        self.returns = ty;
        self
    }

    /// Minimum arity: the count of required parameters.
    pub fn min_arity(&self) -> usize {
        self.params.iter().filter(|p| p.required).count()
    }

    /// Maximum arity: the total parameter count.
    pub fn max_arity(&self) -> usize {
        self.params.len()
    }

    /// Check structural well-formedness: a non-empty name and no required
    /// parameter after an optional one.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.is_empty() {
            return Err("function signature has an empty name".to_string());
        }
        let mut seen_optional = false;
        for p in &self.params {
            if !p.required && !seen_optional {
                seen_optional = true;
            } else if p.required && seen_optional {
                return Err(format!(
                    "function '{}': required parameter '{}' follows an optional one",
                    self.name, p.name
                ));
            }
        }
        Ok(())
    }
}

/// The merged builtin + host function table the linker resolves against.
///
/// Entries keep registration order. Host functions replace builtins of the
/// same name; each replaced name is recorded so the linker can emit its
/// override warning.
#[derive(Debug, Clone, Default)]
pub struct FunctionTable {
    entries: IndexMap<String, FunctionSignature>,
    overridden: Vec<String>,
}

impl FunctionTable {
    pub fn new() -> Self {
        FunctionTable::default()
    }

    /// Merge builtin signatures with host signatures. A host name that
    /// collides with a builtin wins and is recorded as overridden.
    pub fn merge(
        builtins: impl IntoIterator<Item = FunctionSignature>,
        host: impl IntoIterator<Item = FunctionSignature>,
    ) -> Self {
        let mut table = FunctionTable::new();
        for sig in builtins {
            table.entries.insert(sig.name.clone(), sig);
        }
        for sig in host {
            if table.entries.contains_key(&sig.name) {
                table.overridden.push(sig.name.clone());
            }
            table.entries.insert(sig.name.clone(), sig);
        }
        table
    }

    pub fn get(&self, name: &str) -> Option<&FunctionSignature> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Builtin names replaced by host functions, in registration order.
    pub fn overridden(&self) -> &[String] {
        &self.overridden
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FunctionSignature> {
        self.entries.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sig(name: &str) -> FunctionSignature {
        FunctionSignature::new(name)
            .required("value", ParameterType::Any)
            .optional("extra", ParameterType::Number)
    }

    #[test]
    fn test_arity_from_parameters() {
        let s = FunctionSignature::new("Substring")
            .required("text", ParameterType::String)
            .required("start", ParameterType::Number)
            .optional("length", ParameterType::Number)
            .returns(ParameterType::String);
        assert_eq!(s.min_arity(), 2);
        assert_eq!(s.max_arity(), 3);
    }

    #[test]
    fn test_validate_rejects_required_after_optional() {
        let s = FunctionSignature::new("Bad")
            .optional("a", ParameterType::Any)
            .required("b", ParameterType::Any);
        assert!(s.validate().is_err());
        assert!(sig("Good").validate().is_ok());
    }

    #[test]
    fn test_parameter_type_accepts() {
        assert!(ParameterType::Any.accepts(ValueKind::Null));
        assert!(ParameterType::Number.accepts(ValueKind::Number));
        assert!(!ParameterType::Number.accepts(ValueKind::String));
        assert!(!ParameterType::Lambda.accepts(ValueKind::Object));
    }

    #[test]
    fn test_merge_records_overrides() {
        let table = FunctionTable::merge(
            vec![sig("Sum"), sig("Map")],
            vec![sig("Sum"), sig("Custom")],
        );
        assert_eq!(table.len(), 3);
        assert_eq!(table.overridden(), &["Sum".to_string()]);
        assert!(table.contains("Custom"));
    }

    #[test]
    fn test_merge_preserves_registration_order() {
        let table = FunctionTable::merge(vec![sig("B"), sig("A")], vec![sig("C")]);
        let names: Vec<&str> = table.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["B", "A", "C"]);
    }
}
