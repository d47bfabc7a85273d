//! Jam Core - Fundamental types for the Jam scripting language.
//!
//! This crate provides the foundational types that all other Jam components
//! depend on: the closed value universe, the operator and coercion tables,
//! the diagnostic system with its stable `JMnnnn` message codes, function
//! signatures, the resource limiter, and the abstract syntax tree.

pub mod ast;
pub mod context;
pub mod diag;
pub mod error;
pub mod limits;
pub mod ops;
pub mod signature;
pub mod value;

pub use context::ExecutionContext;
pub use diag::{
    codes::{MessageCode, Stage},
    diagnostic::{Diagnostic, Severity, SourceSpan},
    templates::{format_template, TemplateProvider},
};
pub use error::RuntimeError;
pub use limits::{CancelReason, CancellationToken, ExecutionOptions};
pub use signature::{FunctionSignature, FunctionTable, Parameter, ParameterType};
pub use value::{TypeHint, Value, ValueKind};
