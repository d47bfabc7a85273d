//! Message codes for all Jam diagnostics.
//!
//! Codes are stable identifiers of the form `JMnnnn`. The thousands digit
//! names the pipeline stage that produced the diagnostic:
//! - JM1xxx: lexer
//! - JM2xxx: parser
//! - JM3xxx: validator
//! - JM4xxx: linker
//! - JM5xxx: runtime
//!
//! Within a stage, the hundreds digit groups related categories (for the
//! runtime: 51xx types, 52xx arithmetic, 53xx property/index access,
//! 54xx functions and builtins, 59xx resource limits and cancellation).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Pipeline stage a message code belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    Lexer,
    Parser,
    Validator,
    Linker,
    Runtime,
}

impl Stage {
    /// Lower-cased subsystem name used in the structured diagnostic form.
    pub fn subsystem(&self) -> &'static str {
        match self {
            Stage::Lexer => "lexer",
            Stage::Parser => "parser",
            Stage::Validator => "validator",
            Stage::Linker => "linker",
            Stage::Runtime => "runtime",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.subsystem())
    }
}

/// Stable identifier for one diagnostic message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum MessageCode {
    // ========================================================================
    // Lexer (JM1xxx)
    // ========================================================================
    /// JM1000: a character that starts no token.
    UnexpectedCharacter = 1000,
    /// JM1001: string literal not closed before end of line/input.
    UnterminatedString = 1001,
    /// JM1002: malformed number literal.
    InvalidNumber = 1002,
    /// JM1003: unknown escape sequence inside a string literal.
    InvalidEscape = 1003,

    // ========================================================================
    // Parser (JM2xxx)
    // ========================================================================
    /// JM2000: token does not fit the grammar at this point.
    UnexpectedToken = 2000,
    /// JM2001: an expression was required.
    ExpectedExpression = 2001,
    /// JM2002: an identifier was required.
    ExpectedIdentifier = 2002,
    /// JM2003: a type name that is not one of the known hints.
    UnknownTypeName = 2003,
    /// JM2004: source ended in the middle of a construct.
    UnexpectedEndOfInput = 2004,
    /// JM2005: left side of an assignment is not assignable.
    InvalidAssignmentTarget = 2005,

    // ========================================================================
    // Validator (JM3xxx)
    // ========================================================================
    /// JM3000: use of a variable with no visible declaration.
    UndeclaredVariable = 3000,
    /// JM3001: second declaration of a name in the same scope.
    DuplicateVariable = 3001,
    /// JM3002: `break` outside any loop.
    BreakOutsideLoop = 3002,
    /// JM3003: `continue` outside any loop.
    ContinueOutsideLoop = 3003,
    /// JM3004 (warning): statements after a terminator never run.
    UnreachableCode = 3004,
    /// JM3005: declaration of a reserved name such as `data`.
    ReservedIdentifier = 3005,
    /// JM3006: loops nested beyond the supported depth.
    LoopNestingTooDeep = 3006,
    /// JM3007: lambda literal outside a call-argument position.
    LambdaNotAllowed = 3007,
    /// JM3008: expression statement that is not a function call.
    InvalidExpressionStatement = 3008,

    // ========================================================================
    // Linker (JM4xxx)
    // ========================================================================
    /// JM4000: call to a function absent from the merged table.
    UndefinedFunction = 4000,
    /// JM4001: fewer arguments than the signature's minimum arity.
    TooFewArguments = 4001,
    /// JM4002: more arguments than the signature's maximum arity.
    TooManyArguments = 4002,
    /// JM4003: a Lambda-typed parameter given a non-lambda argument.
    LambdaRequired = 4003,
    /// JM4004: a lambda literal given to a non-Lambda parameter.
    LambdaNotExpected = 4004,
    /// JM4100 (warning): a host function shadows a builtin of the same name.
    FunctionOverride = 4100,

    // ========================================================================
    // Runtime - general (JM50xx)
    // ========================================================================
    /// JM5000: non-domain failure wrapped with the statement's position.
    RuntimeFault = 5000,
    /// JM5001: the script executed a `fail` statement.
    ScriptFailure = 5001,

    // ========================================================================
    // Runtime - types (JM51xx)
    // ========================================================================
    /// JM5100: assignment violates a declared type hint.
    InvalidType = 5100,
    /// JM5101: relational comparison across different primitive types.
    IncomparableTypes = 5101,
    /// JM5102: `foreach` over a value that cannot be iterated.
    NotIterable = 5102,
    /// JM5103: a `for` step that is not a strictly positive integer.
    NonNegativeIntegerRequired = 5103,
    /// JM5104: a function argument whose kind violates the signature.
    InvalidArgumentType = 5104,
    /// JM5105: a `for` bound that is not a number.
    LoopBoundNotNumeric = 5105,

    // ========================================================================
    // Runtime - arithmetic (JM52xx)
    // ========================================================================
    /// JM5200: division by zero.
    DivisionByZero = 5200,
    /// JM5201: modulo by zero.
    ModuloByZero = 5201,
    /// JM5202: operator applied to operand kinds it does not support.
    InvalidOperands = 5202,

    // ========================================================================
    // Runtime - property and index access (JM53xx)
    // ========================================================================
    /// JM5300: property read on null.
    PropertyAccessOnNull = 5300,
    /// JM5301: property read on a non-object, non-null value.
    PropertyAccessInvalidType = 5301,
    /// JM5302: index read on null.
    IndexAccessOnNull = 5302,
    /// JM5303: index read on a value that is not indexable.
    IndexAccessInvalidType = 5303,
    /// JM5304: index outside the container's bounds.
    IndexOutOfRange = 5304,
    /// JM5305: negative index where only non-negative is allowed (writes).
    NegativeIndex = 5305,
    /// JM5306: property write on a non-object.
    SetPropertyOnNonObject = 5306,
    /// JM5307: index write on a non-container.
    SetIndexOnNonContainer = 5307,
    /// JM5308: index value of the wrong kind (e.g. string index on array).
    InvalidIndexType = 5308,

    // ========================================================================
    // Runtime - functions and builtins (JM54xx)
    // ========================================================================
    /// JM5400: a builtin or host function reported a failure.
    FunctionCallFailed = 5400,
    /// JM5401: malformed regular expression.
    InvalidRegex = 5401,
    /// JM5402: a well-formed regular expression compiled past the
    /// per-call size budget that bounds worst-case matching.
    RegexBudgetExceeded = 5402,
    /// JM5403: requested padded length above the hard cap.
    PaddingLimitExceeded = 5403,
    /// JM5404: unparseable date/time value.
    InvalidDateTime = 5404,
    /// JM5405: unknown date/time unit name.
    InvalidDateUnit = 5405,
    /// JM5406: JSON that cannot be parsed or produced.
    InvalidJson = 5406,
    /// JM5407: base-64 input that cannot be decoded.
    InvalidBase64 = 5407,

    // ========================================================================
    // Runtime - resource limits and cancellation (JM59xx)
    // ========================================================================
    /// JM5900: the statement budget was exhausted.
    StatementLimitExceeded = 5900,
    /// JM5901: the cumulative loop-iteration budget was exhausted.
    LoopIterationLimitExceeded = 5901,
    /// JM5902: the call-depth ceiling was exceeded.
    CallDepthLimitExceeded = 5902,
    /// JM5903: the wall-clock execution budget was exhausted.
    ExecutionTimeLimitExceeded = 5903,
    /// JM5904: the host cancelled execution.
    CancelledByHost = 5904,
}

impl MessageCode {
    /// Numeric form of the code (e.g. `5200`).
    pub fn as_u16(self) -> u16 {
        self as u16
    }

    /// Canonical string form (e.g. `"JM5200"`).
    pub fn as_str(self) -> &'static str {
        match self {
            MessageCode::UnexpectedCharacter => "JM1000",
            MessageCode::UnterminatedString => "JM1001",
            MessageCode::InvalidNumber => "JM1002",
            MessageCode::InvalidEscape => "JM1003",
            MessageCode::UnexpectedToken => "JM2000",
            MessageCode::ExpectedExpression => "JM2001",
            MessageCode::ExpectedIdentifier => "JM2002",
            MessageCode::UnknownTypeName => "JM2003",
            MessageCode::UnexpectedEndOfInput => "JM2004",
            MessageCode::InvalidAssignmentTarget => "JM2005",
            MessageCode::UndeclaredVariable => "JM3000",
            MessageCode::DuplicateVariable => "JM3001",
            MessageCode::BreakOutsideLoop => "JM3002",
            MessageCode::ContinueOutsideLoop => "JM3003",
            MessageCode::UnreachableCode => "JM3004",
            MessageCode::ReservedIdentifier => "JM3005",
            MessageCode::LoopNestingTooDeep => "JM3006",
            MessageCode::LambdaNotAllowed => "JM3007",
            MessageCode::InvalidExpressionStatement => "JM3008",
            MessageCode::UndefinedFunction => "JM4000",
            MessageCode::TooFewArguments => "JM4001",
            MessageCode::TooManyArguments => "JM4002",
            MessageCode::LambdaRequired => "JM4003",
            MessageCode::LambdaNotExpected => "JM4004",
            MessageCode::FunctionOverride => "JM4100",
            MessageCode::RuntimeFault => "JM5000",
            MessageCode::ScriptFailure => "JM5001",
            MessageCode::InvalidType => "JM5100",
            MessageCode::IncomparableTypes => "JM5101",
            MessageCode::NotIterable => "JM5102",
            MessageCode::NonNegativeIntegerRequired => "JM5103",
            MessageCode::InvalidArgumentType => "JM5104",
            MessageCode::LoopBoundNotNumeric => "JM5105",
            MessageCode::DivisionByZero => "JM5200",
            MessageCode::ModuloByZero => "JM5201",
            MessageCode::InvalidOperands => "JM5202",
            MessageCode::PropertyAccessOnNull => "JM5300",
            MessageCode::PropertyAccessInvalidType => "JM5301",
            MessageCode::IndexAccessOnNull => "JM5302",
            MessageCode::IndexAccessInvalidType => "JM5303",
            MessageCode::IndexOutOfRange => "JM5304",
            MessageCode::NegativeIndex => "JM5305",
            MessageCode::SetPropertyOnNonObject => "JM5306",
            MessageCode::SetIndexOnNonContainer => "JM5307",
            MessageCode::InvalidIndexType => "JM5308",
            MessageCode::FunctionCallFailed => "JM5400",
            MessageCode::InvalidRegex => "JM5401",
            MessageCode::RegexBudgetExceeded => "JM5402",
            MessageCode::PaddingLimitExceeded => "JM5403",
            MessageCode::InvalidDateTime => "JM5404",
            MessageCode::InvalidDateUnit => "JM5405",
            MessageCode::InvalidJson => "JM5406",
            MessageCode::InvalidBase64 => "JM5407",
            MessageCode::StatementLimitExceeded => "JM5900",
            MessageCode::LoopIterationLimitExceeded => "JM5901",
            MessageCode::CallDepthLimitExceeded => "JM5902",
            MessageCode::ExecutionTimeLimitExceeded => "JM5903",
            MessageCode::CancelledByHost => "JM5904",
        }
    }

    /// Pipeline stage derived from the thousands digit.
    pub fn stage(self) -> Stage {
        match self.as_u16() / 1000 {
            1 => Stage::Lexer,
            2 => Stage::Parser,
            3 => Stage::Validator,
            4 => Stage::Linker,
            _ => Stage::Runtime,
        }
    }

    /// Lower-cased subsystem name derived from the code range.
    pub fn subsystem(self) -> &'static str {
        self.stage().subsystem()
    }

    /// Convert from the numeric form.
    pub fn from_u16(code: u16) -> Option<Self> {
        ALL_CODES.iter().copied().find(|c| c.as_u16() == code)
    }
}

impl fmt::Display for MessageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Every defined message code, in numeric order.
pub const ALL_CODES: &[MessageCode] = &[
    MessageCode::UnexpectedCharacter,
    MessageCode::UnterminatedString,
    MessageCode::InvalidNumber,
    MessageCode::InvalidEscape,
    MessageCode::UnexpectedToken,
    MessageCode::ExpectedExpression,
    MessageCode::ExpectedIdentifier,
    MessageCode::UnknownTypeName,
    MessageCode::UnexpectedEndOfInput,
    MessageCode::InvalidAssignmentTarget,
    MessageCode::UndeclaredVariable,
    MessageCode::DuplicateVariable,
    MessageCode::BreakOutsideLoop,
    MessageCode::ContinueOutsideLoop,
    MessageCode::UnreachableCode,
    MessageCode::ReservedIdentifier,
    MessageCode::LoopNestingTooDeep,
    MessageCode::LambdaNotAllowed,
    MessageCode::InvalidExpressionStatement,
    MessageCode::UndefinedFunction,
    MessageCode::TooFewArguments,
    MessageCode::TooManyArguments,
    MessageCode::LambdaRequired,
    MessageCode::LambdaNotExpected,
    MessageCode::FunctionOverride,
    MessageCode::RuntimeFault,
    MessageCode::ScriptFailure,
    MessageCode::InvalidType,
    MessageCode::IncomparableTypes,
    MessageCode::NotIterable,
    MessageCode::NonNegativeIntegerRequired,
    MessageCode::InvalidArgumentType,
    MessageCode::LoopBoundNotNumeric,
    MessageCode::DivisionByZero,
    MessageCode::ModuloByZero,
    MessageCode::InvalidOperands,
    MessageCode::PropertyAccessOnNull,
    MessageCode::PropertyAccessInvalidType,
    MessageCode::IndexAccessOnNull,
    MessageCode::IndexAccessInvalidType,
    MessageCode::IndexOutOfRange,
    MessageCode::NegativeIndex,
    MessageCode::SetPropertyOnNonObject,
    MessageCode::SetIndexOnNonContainer,
    MessageCode::InvalidIndexType,
    MessageCode::FunctionCallFailed,
    MessageCode::InvalidRegex,
    MessageCode::RegexBudgetExceeded,
    MessageCode::PaddingLimitExceeded,
    MessageCode::InvalidDateTime,
    MessageCode::InvalidDateUnit,
    MessageCode::InvalidJson,
    MessageCode::InvalidBase64,
    MessageCode::StatementLimitExceeded,
    MessageCode::LoopIterationLimitExceeded,
    MessageCode::CallDepthLimitExceeded,
    MessageCode::ExecutionTimeLimitExceeded,
    MessageCode::CancelledByHost,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_display() {
        assert_eq!(MessageCode::DivisionByZero.as_str(), "JM5200");
        assert_eq!(MessageCode::InvalidType.as_str(), "JM5100");
        assert_eq!(MessageCode::StatementLimitExceeded.as_str(), "JM5900");
        assert_eq!(MessageCode::UnexpectedToken.to_string(), "JM2000");
    }

    #[test]
    fn test_code_stage() {
        assert_eq!(MessageCode::UnterminatedString.stage(), Stage::Lexer);
        assert_eq!(MessageCode::ExpectedExpression.stage(), Stage::Parser);
        assert_eq!(MessageCode::UndeclaredVariable.stage(), Stage::Validator);
        assert_eq!(MessageCode::UndefinedFunction.stage(), Stage::Linker);
        assert_eq!(MessageCode::CancelledByHost.stage(), Stage::Runtime);
    }

    #[test]
    fn test_code_subsystem() {
        assert_eq!(MessageCode::FunctionOverride.subsystem(), "linker");
        assert_eq!(MessageCode::DivisionByZero.subsystem(), "runtime");
    }

    #[test]
    fn test_from_u16() {
        assert_eq!(
            MessageCode::from_u16(5200),
            Some(MessageCode::DivisionByZero)
        );
        assert_eq!(MessageCode::from_u16(9999), None);
    }

    #[test]
    fn test_as_str_matches_numeric_value() {
        for code in ALL_CODES {
            assert_eq!(code.as_str(), format!("JM{}", code.as_u16()));
        }
    }
}
