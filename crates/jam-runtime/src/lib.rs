//! Jam Runtime - executor and standard library.
//!
//! The executor walks the compiled program against the input value bound to
//! `data`, enforcing the statement / loop-iteration / call-depth accounting
//! contracts and stamping statement spans onto location-less errors. The
//! standard library is a registry of (name, signature, implementation)
//! triples; host applications extend the same registry with their own
//! functions.

pub mod executor;
pub mod function;
pub mod registry;
pub mod stdlib;

pub use executor::{run_program, Invocation, LambdaValue};
pub use function::{NativeFunction, ScriptFunction};
pub use registry::FunctionRegistry;
