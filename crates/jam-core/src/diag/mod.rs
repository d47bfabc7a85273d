//! Diagnostic system for all Jam pipeline stages.
//!
//! Every issue the pipeline reports - from the lexer through the runtime -
//! is a [`Diagnostic`](diagnostic::Diagnostic) carrying a stable `JMnnnn`
//! [`MessageCode`](codes::MessageCode), a severity, a pre-formatted English
//! message, the raw positional args used to build it, and an optional
//! source span.

/// Stable message codes for every diagnostic the pipeline can emit.
pub mod codes;
/// The diagnostic record and source spans.
pub mod diagnostic;
/// Default English templates and the localization hook.
pub mod templates;

pub use codes::{MessageCode, Stage};
pub use diagnostic::{Diagnostic, Severity, SourceSpan};
pub use templates::{format_template, TemplateProvider};
