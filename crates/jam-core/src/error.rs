//! The single runtime domain error.
//!
//! Runtime failures propagate out of the executor as one structured error
//! carrying a [`MessageCode`], the raw positional args, the pre-formatted
//! message, and an optional source span. The executor's location wrapper
//! attaches the current statement's span to any error that has none;
//! errors that already carry a span pass through unchanged.

use thiserror::Error;

use crate::diag::codes::MessageCode;
use crate::diag::diagnostic::{Diagnostic, Severity, SourceSpan};
use crate::diag::templates::{default_template, format_template};

/// A runtime failure, resource-limit breach, or cancellation.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct RuntimeError {
    pub code: MessageCode,
    pub args: Vec<String>,
    pub message: String,
    pub span: Option<SourceSpan>,
}

impl RuntimeError {
    /// Build an error from a code and positional args; the message is
    /// formatted from the default English template.
    pub fn new(code: MessageCode, args: Vec<String>) -> Self {
        let message = format_template(default_template(code), &args);
        RuntimeError {
            code,
            args,
            message,
            span: None,
        }
    }

    /// Wrap an arbitrary failure message as a JM5000 runtime fault.
    pub fn fault(message: impl Into<String>) -> Self {
        RuntimeError::new(MessageCode::RuntimeFault, vec![message.into()])
    }

    /// Failure reported by a named builtin or host function.
    pub fn function_failed(name: &str, message: impl Into<String>) -> Self {
        RuntimeError::new(
            MessageCode::FunctionCallFailed,
            vec![name.to_string(), message.into()],
        )
    }

    pub fn has_span(&self) -> bool {
        self.span.is_some()
    }

    /// Attach a span if the error does not already carry one.
    pub fn or_span(mut self, span: SourceSpan) -> Self {
        if self.span.is_none() {
            self.span = Some(span);
        }
        self
    }

    /// Attach a span unconditionally.
    pub fn with_span(mut self, span: SourceSpan) -> Self {
        self.span = Some(span);
        self
    }

    /// Convert into the diagnostic surfaced to the host.
    pub fn into_diagnostic(self) -> Diagnostic {
        Diagnostic {
            code: self.code,
            severity: Severity::Error,
            message: self.message,
            args: self.args,
            span: self.span,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_formatting() {
        let e = RuntimeError::new(
            MessageCode::InvalidType,
            vec!["x".into(), "Number".into(), "String".into()],
        );
        assert_eq!(e.message, "Variable 'x' expects Number but was assigned String");
        assert_eq!(e.to_string(), e.message);
    }

    #[test]
    fn test_or_span_keeps_existing() {
        let inner = SourceSpan::new(2, 1, 4);
        let outer = SourceSpan::new(9, 9, 9);
        let e = RuntimeError::new(MessageCode::DivisionByZero, vec![])
            .or_span(inner)
            .or_span(outer);
        assert_eq!(e.span, Some(inner));
    }

    #[test]
    fn test_into_diagnostic() {
        let d = RuntimeError::new(MessageCode::DivisionByZero, vec![])
            .with_span(SourceSpan::new(4, 9, 1))
            .into_diagnostic();
        assert_eq!(d.code, MessageCode::DivisionByZero);
        assert_eq!(d.severity, Severity::Error);
        assert_eq!(d.span, Some(SourceSpan::new(4, 9, 1)));
    }

    #[test]
    fn test_fault_wraps_message() {
        let e = RuntimeError::fault("boom");
        assert_eq!(e.code, MessageCode::RuntimeFault);
        assert_eq!(e.message, "Runtime error: boom");
    }
}
