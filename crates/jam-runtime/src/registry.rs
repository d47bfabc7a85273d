//! Function registry: registration and lookup for script-callable
//! functions.
//!
//! The registry keeps registration order, rejects duplicates, and
//! validates each signature at registration time. The engine merges the
//! builtin registry with host functions into the table the linker resolves
//! against; host functions shadow builtins of the same name.

use indexmap::IndexMap;
use std::sync::Arc;

use jam_core::signature::FunctionSignature;

use crate::function::ScriptFunction;

/// Insertion-ordered registry of callable functions.
#[derive(Default)]
pub struct FunctionRegistry {
    entries: IndexMap<String, Arc<dyn ScriptFunction>>,
}

impl FunctionRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        FunctionRegistry::default()
    }

    /// The full builtin library.
    pub fn builtins() -> Self {
        let mut registry = FunctionRegistry::new();
        crate::stdlib::install(&mut registry);
        registry
    }

    /// Register a function.
    ///
    /// # Errors
    ///
    /// Fails when the signature is malformed or the name is already
    /// registered.
    pub fn register(&mut self, function: Arc<dyn ScriptFunction>) -> Result<(), String> {
        let signature = function.signature();
        signature.validate()?;
        let name = signature.name.clone();
        if self.entries.contains_key(&name) {
            return Err(format!("function '{name}' is already registered"));
        }
        tracing::debug!(function = %name, "registered function");
        self.entries.insert(name, function);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ScriptFunction>> {
        self.entries.get(name).map(Arc::clone)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered names, in registration order.
    pub fn names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// Signatures of every registered function, in registration order.
    pub fn signatures(&self) -> Vec<FunctionSignature> {
        self.entries
            .values()
            .map(|f| f.signature().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::NativeFunction;
    use jam_core::signature::ParameterType;
    use jam_core::value::Value;

    fn echo() -> Arc<dyn ScriptFunction> {
        NativeFunction::new(
            FunctionSignature::new("Echo")
                .required("value", ParameterType::Any)
                .returns(ParameterType::Any),
            |inv| Ok(inv.take(0)),
        )
    }

    #[test]
    fn test_register_and_get() {
        let mut registry = FunctionRegistry::new();
        registry.register(echo()).unwrap();
        assert_eq!(registry.len(), 1);
        assert!(registry.contains("Echo"));
        assert!(registry.get("Echo").is_some());
        assert!(registry.get("Missing").is_none());
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let mut registry = FunctionRegistry::new();
        registry.register(echo()).unwrap();
        assert!(registry.register(echo()).is_err());
    }

    #[test]
    fn test_malformed_signature_rejected() {
        let bad = NativeFunction::new(
            FunctionSignature::new("Bad")
                .optional("a", ParameterType::Any)
                .required("b", ParameterType::Any),
            |_| Ok(Value::Null),
        );
        assert!(FunctionRegistry::new().register(bad).is_err());
    }

    #[test]
    fn test_builtins_present() {
        let registry = FunctionRegistry::builtins();
        for name in ["Map", "Where", "Reduce", "Append", "TypeOf", "Sleep", "NewGuid"] {
            assert!(registry.contains(name), "missing builtin {name}");
        }
    }

    #[test]
    fn test_builtin_signatures_are_valid() {
        for signature in FunctionRegistry::builtins().signatures() {
            signature.validate().expect("builtin signature must validate");
        }
    }
}
