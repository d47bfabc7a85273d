//! Default English message templates and the localization hook.
//!
//! Templates use positional placeholders `{0} {1} ...` bound to a
//! diagnostic's argument array. A host may register a [`TemplateProvider`]
//! to supply alternative templates; formatting falls back to the default
//! English template when the provider returns `None` for a code.

use crate::diag::codes::MessageCode;

/// Host-supplied template lookup. Returning `None` falls back to the
/// default English template for that code.
pub trait TemplateProvider: Send + Sync {
    fn template(&self, code: MessageCode) -> Option<String>;
}

/// The default English template for a message code.
pub fn default_template(code: MessageCode) -> &'static str {
    match code {
        MessageCode::UnexpectedCharacter => "Unexpected character '{0}'",
        MessageCode::UnterminatedString => "Unterminated string literal",
        MessageCode::InvalidNumber => "Invalid number literal '{0}'",
        MessageCode::InvalidEscape => "Invalid escape sequence '\\{0}'",
        MessageCode::UnexpectedToken => "Unexpected token '{0}', expected {1}",
        MessageCode::ExpectedExpression => "Expected an expression, found '{0}'",
        MessageCode::ExpectedIdentifier => "Expected an identifier, found '{0}'",
        MessageCode::UnknownTypeName => "Unknown type name '{0}'",
        MessageCode::UnexpectedEndOfInput => "Unexpected end of input, expected {0}",
        MessageCode::InvalidAssignmentTarget => "Invalid assignment target",
        MessageCode::UndeclaredVariable => "Variable '{0}' is not declared",
        MessageCode::DuplicateVariable => "Variable '{0}' is already declared in this scope",
        MessageCode::BreakOutsideLoop => "'break' is only allowed inside a loop",
        MessageCode::ContinueOutsideLoop => "'continue' is only allowed inside a loop",
        MessageCode::UnreachableCode => "Unreachable code after '{0}'",
        MessageCode::ReservedIdentifier => "'{0}' is a reserved name and cannot be declared",
        MessageCode::LoopNestingTooDeep => "Loops nested deeper than {0} levels",
        MessageCode::LambdaNotAllowed => "A lambda is only allowed as a function argument",
        MessageCode::InvalidExpressionStatement => {
            "Only function calls can be used as statements"
        }
        MessageCode::UndefinedFunction => "Function '{0}' is not defined",
        MessageCode::TooFewArguments => {
            "Function '{0}' expects at least {1} argument(s), got {2}"
        }
        MessageCode::TooManyArguments => {
            "Function '{0}' expects at most {1} argument(s), got {2}"
        }
        MessageCode::LambdaRequired => "Argument {1} of '{0}' must be a lambda",
        MessageCode::LambdaNotExpected => "Argument {1} of '{0}' cannot be a lambda",
        MessageCode::FunctionOverride => {
            "Host function '{0}' overrides a builtin of the same name"
        }
        MessageCode::RuntimeFault => "Runtime error: {0}",
        MessageCode::ScriptFailure => "Script failed: {0}",
        MessageCode::InvalidType => "Variable '{0}' expects {1} but was assigned {2}",
        MessageCode::IncomparableTypes => "Cannot compare {0} with {1}",
        MessageCode::NotIterable => "Value of type {0} is not iterable",
        MessageCode::NonNegativeIntegerRequired => {
            "Loop step must be a positive integer, got {0}"
        }
        MessageCode::InvalidArgumentType => "Argument '{0}' of '{1}' expects {2}, got {3}",
        MessageCode::LoopBoundNotNumeric => "For-loop bounds must be numbers, got {0}",
        MessageCode::DivisionByZero => "Division by zero",
        MessageCode::ModuloByZero => "Modulo by zero",
        MessageCode::InvalidOperands => "Operator '{0}' cannot be applied to {1} and {2}",
        MessageCode::PropertyAccessOnNull => "Cannot read property '{0}' of null",
        MessageCode::PropertyAccessInvalidType => "Cannot read property '{0}' of a {1}",
        MessageCode::IndexAccessOnNull => "Cannot index into null",
        MessageCode::IndexAccessInvalidType => "Cannot index into a {0}",
        MessageCode::IndexOutOfRange => "Index {0} is out of range for length {1}",
        MessageCode::NegativeIndex => "Negative index {0} is not allowed here",
        MessageCode::SetPropertyOnNonObject => "Cannot set property '{0}' on a {1}",
        MessageCode::SetIndexOnNonContainer => "Cannot set index on a {0}",
        MessageCode::InvalidIndexType => "A {0} cannot be used as an index",
        MessageCode::FunctionCallFailed => "Function '{0}' failed: {1}",
        MessageCode::InvalidRegex => "Invalid regular expression: {0}",
        MessageCode::RegexBudgetExceeded => "Regular expression exceeded its matching budget",
        MessageCode::PaddingLimitExceeded => "Padded length {0} exceeds the maximum of {1}",
        MessageCode::InvalidDateTime => "Invalid date/time value '{0}'",
        MessageCode::InvalidDateUnit => "Unknown date/time unit '{0}'",
        MessageCode::InvalidJson => "Invalid JSON: {0}",
        MessageCode::InvalidBase64 => "Invalid base-64 input: {0}",
        MessageCode::StatementLimitExceeded => "Statement limit of {0} exceeded",
        MessageCode::LoopIterationLimitExceeded => "Loop iteration limit of {0} exceeded",
        MessageCode::CallDepthLimitExceeded => "Call depth limit of {0} exceeded",
        MessageCode::ExecutionTimeLimitExceeded => "Execution time limit of {0} ms exceeded",
        MessageCode::CancelledByHost => "Execution was cancelled by the host",
    }
}

/// Substitute positional placeholders `{0} {1} ...` with `args`.
///
/// Placeholders with no matching argument are left as-is; arguments with no
/// placeholder are ignored.
pub fn format_template(template: &str, args: &[String]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '{' {
            out.push(c);
            continue;
        }
        let mut digits = String::new();
        while let Some(d) = chars.peek().filter(|d| d.is_ascii_digit()) {
            digits.push(*d);
            chars.next();
        }
        if !digits.is_empty() && chars.peek() == Some(&'}') {
            chars.next();
            match digits.parse::<usize>().ok().and_then(|i| args.get(i)) {
                Some(arg) => out.push_str(arg),
                None => {
                    out.push('{');
                    out.push_str(&digits);
                    out.push('}');
                }
            }
        } else {
            out.push('{');
            out.push_str(&digits);
        }
    }
    out
}

/// Format a code's message, honoring an optional provider override.
pub fn format_message(
    code: MessageCode,
    args: &[String],
    provider: Option<&dyn TemplateProvider>,
) -> String {
    match provider.and_then(|p| p.template(code)) {
        Some(template) => format_template(&template, args),
        None => format_template(default_template(code), args),
    }
}
