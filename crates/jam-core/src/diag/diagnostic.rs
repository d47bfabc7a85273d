//! The diagnostic record shared by every pipeline stage.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::diag::codes::MessageCode;
use crate::diag::templates::format_template;

/// Severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "{name}")
    }
}

/// A region of source text: 1-indexed line and column plus a length in
/// characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpan {
    pub line: u32,
    pub column: u32,
    pub length: u32,
}

impl SourceSpan {
    pub fn new(line: u32, column: u32, length: u32) -> Self {
        SourceSpan {
            line,
            column,
            length,
        }
    }
}

impl fmt::Display for SourceSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ln {}, Col {}", self.line, self.column)
    }
}

/// One issue reported by any pipeline stage.
///
/// Carries the stable code, a severity, the pre-formatted English message,
/// the raw positional args the message was built from, and an optional
/// source span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub code: MessageCode,
    pub severity: Severity,
    pub message: String,
    pub args: Vec<String>,
    pub span: Option<SourceSpan>,
}

impl Diagnostic {
    /// Build a diagnostic from a code and args using the default English
    /// template and the code's default severity.
    pub fn new(code: MessageCode, args: Vec<String>, span: Option<SourceSpan>) -> Self {
        let message = format_template(
            crate::diag::templates::default_template(code),
            &args,
        );
        Diagnostic {
            code,
            severity: default_severity(code),
            message,
            args,
            span,
        }
    }

    /// Error-severity diagnostic.
    pub fn error(code: MessageCode, args: Vec<String>, span: Option<SourceSpan>) -> Self {
        Diagnostic {
            severity: Severity::Error,
            ..Diagnostic::new(code, args, span)
        }
    }

    /// Warning-severity diagnostic.
    pub fn warning(code: MessageCode, args: Vec<String>, span: Option<SourceSpan>) -> Self {
        Diagnostic {
            severity: Severity::Warning,
            ..Diagnostic::new(code, args, span)
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Structured form carrying the lower-cased subsystem name derived from
    /// the code range.
    pub fn to_structured(&self) -> StructuredDiagnostic {
        StructuredDiagnostic {
            code: self.code,
            subsystem: self.code.subsystem().to_string(),
            severity: self.severity,
            message: self.message.clone(),
            args: self.args.clone(),
            span: self.span,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)?;
        if let Some(span) = &self.span {
            write!(f, " ({span})")?;
        }
        Ok(())
    }
}

/// Wire form of a diagnostic with the subsystem name spelled out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredDiagnostic {
    pub code: MessageCode,
    pub subsystem: String,
    pub severity: Severity,
    pub message: String,
    pub args: Vec<String>,
    pub span: Option<SourceSpan>,
}

/// Default severity of a code: warnings for the two advisory codes, errors
/// for everything else.
fn default_severity(code: MessageCode) -> Severity {
    match code {
        MessageCode::UnreachableCode | MessageCode::FunctionOverride => Severity::Warning,
        _ => Severity::Error,
    }
}
