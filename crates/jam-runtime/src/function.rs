//! The callable trait shared by builtins and host functions.

use std::sync::Arc;

use jam_core::error::RuntimeError;
use jam_core::signature::FunctionSignature;
use jam_core::value::Value;

use crate::executor::Invocation;

/// A function callable from Jam scripts.
///
/// Implementations receive an [`Invocation`] holding the already-evaluated
/// argument values, any lambda arguments as invocable handles, and the
/// execution context. Lambda invocations route through the same call-depth
/// accounting as regular calls.
pub trait ScriptFunction: Send + Sync {
    /// The declared signature the linker checks call sites against.
    fn signature(&self) -> &FunctionSignature;

    /// Execute the function.
    fn call(&self, invocation: &mut Invocation<'_, '_, '_>) -> Result<Value, RuntimeError>;
}

/// Handler type for [`NativeFunction`].
pub type NativeHandler = fn(&mut Invocation<'_, '_, '_>) -> Result<Value, RuntimeError>;

/// A builtin backed by a plain function pointer.
pub struct NativeFunction {
    signature: FunctionSignature,
    handler: NativeHandler,
}

impl NativeFunction {
    pub fn new(signature: FunctionSignature, handler: NativeHandler) -> Arc<dyn ScriptFunction> {
        Arc::new(NativeFunction { signature, handler })
    }
}

impl ScriptFunction for NativeFunction {
    fn signature(&self) -> &FunctionSignature {
        &self.signature
    }

    fn call(&self, invocation: &mut Invocation<'_, '_, '_>) -> Result<Value, RuntimeError> {
        (self.handler)(invocation)
    }
}
