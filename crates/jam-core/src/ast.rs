//! Abstract syntax tree for Jam scripts.
//!
//! Every statement and expression carries the source span it was parsed
//! from; the executor uses those spans to attach `Ln N, Col N` locations to
//! runtime errors. The tree is immutable after construction and
//! serde-serializable so the precompiled artifact can persist it.

use serde::{Deserialize, Serialize};

use crate::diag::diagnostic::SourceSpan;
use crate::ops::{BinaryOp, UnaryOp};
use crate::value::TypeHint;

/// Direction of a counted `for` loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ForDirection {
    Ascending,
    Descending,
}

/// Assignment operators, including the compound forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignOp {
    Assign,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
}

impl AssignOp {
    /// The binary operator a compound assignment applies, if any.
    pub fn binary_op(self) -> Option<BinaryOp> {
        match self {
            AssignOp::Assign => None,
            AssignOp::Add => Some(BinaryOp::Add),
            AssignOp::Subtract => Some(BinaryOp::Subtract),
            AssignOp::Multiply => Some(BinaryOp::Multiply),
            AssignOp::Divide => Some(BinaryOp::Divide),
            AssignOp::Modulo => Some(BinaryOp::Modulo),
        }
    }
}

/// The target of an assignment: an identifier, a property access, or an
/// index access.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AssignTarget {
    Variable {
        name: String,
    },
    Property {
        object: Box<Expr>,
        name: String,
    },
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
    },
}

/// One arm of a `switch` statement. The arm matches when the scrutinee
/// deep-equals any comparand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchCase {
    pub comparands: Vec<Expr>,
    pub body: Vec<Stmt>,
}

/// A statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    VarDecl {
        name: String,
        hint: Option<TypeHint>,
        init: Option<Expr>,
        span: SourceSpan,
    },
    Assign {
        target: AssignTarget,
        op: AssignOp,
        value: Expr,
        span: SourceSpan,
    },
    If {
        cond: Expr,
        then_block: Vec<Stmt>,
        else_ifs: Vec<(Expr, Vec<Stmt>)>,
        else_block: Option<Vec<Stmt>>,
        span: SourceSpan,
    },
    Switch {
        scrutinee: Expr,
        cases: Vec<SwitchCase>,
        default: Option<Vec<Stmt>>,
        span: SourceSpan,
    },
    While {
        cond: Expr,
        body: Vec<Stmt>,
        span: SourceSpan,
    },
    For {
        var: String,
        start: Expr,
        end: Expr,
        step: Option<Expr>,
        direction: ForDirection,
        body: Vec<Stmt>,
        span: SourceSpan,
    },
    ForEach {
        var: String,
        collection: Expr,
        body: Vec<Stmt>,
        span: SourceSpan,
    },
    /// With a message expression, its evaluated value becomes the result
    /// handed to the host and its string form is recorded on the execution
    /// context as the completion reason. A bare `return` (like falling off
    /// the end of the script) yields the current `data` and records no
    /// completion message.
    Return {
        message: Option<Expr>,
        span: SourceSpan,
    },
    Fail {
        message: Option<Expr>,
        span: SourceSpan,
    },
    Break {
        span: SourceSpan,
    },
    Continue {
        span: SourceSpan,
    },
    /// An expression statement; the validator restricts these to calls.
    Expression {
        expr: Expr,
        span: SourceSpan,
    },
}

impl Stmt {
    pub fn span(&self) -> SourceSpan {
        match self {
            Stmt::VarDecl { span, .. }
            | Stmt::Assign { span, .. }
            | Stmt::If { span, .. }
            | Stmt::Switch { span, .. }
            | Stmt::While { span, .. }
            | Stmt::For { span, .. }
            | Stmt::ForEach { span, .. }
            | Stmt::Return { span, .. }
            | Stmt::Fail { span, .. }
            | Stmt::Break { span }
            | Stmt::Continue { span }
            | Stmt::Expression { span, .. } => *span,
        }
    }

    /// Statement keyword for diagnostics (e.g. the unreachable-code note).
    pub fn keyword(&self) -> &'static str {
        match self {
            Stmt::VarDecl { .. } => "var",
            Stmt::Assign { .. } => "assignment",
            Stmt::If { .. } => "if",
            Stmt::Switch { .. } => "switch",
            Stmt::While { .. } => "while",
            Stmt::For { .. } => "for",
            Stmt::ForEach { .. } => "foreach",
            Stmt::Return { .. } => "return",
            Stmt::Fail { .. } => "fail",
            Stmt::Break { .. } => "break",
            Stmt::Continue { .. } => "continue",
            Stmt::Expression { .. } => "expression",
        }
    }

    /// True for statements after which the rest of a block cannot run.
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            Stmt::Return { .. } | Stmt::Fail { .. } | Stmt::Break { .. } | Stmt::Continue { .. }
        )
    }
}

/// An expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Null {
        span: SourceSpan,
    },
    Bool {
        value: bool,
        span: SourceSpan,
    },
    Number {
        value: f64,
        span: SourceSpan,
    },
    String {
        value: String,
        span: SourceSpan,
    },
    Array {
        items: Vec<Expr>,
        span: SourceSpan,
    },
    /// Object literal; duplicate keys keep the last value.
    Object {
        entries: Vec<(String, Expr)>,
        span: SourceSpan,
    },
    Identifier {
        name: String,
        span: SourceSpan,
    },
    Property {
        object: Box<Expr>,
        name: String,
        span: SourceSpan,
    },
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
        span: SourceSpan,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        span: SourceSpan,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
        span: SourceSpan,
    },
    /// `value is type`
    TypeTest {
        operand: Box<Expr>,
        hint: TypeHint,
        span: SourceSpan,
    },
    Call {
        name: String,
        args: Vec<Expr>,
        span: SourceSpan,
    },
    /// Inline lambda; only valid as a direct call argument.
    Lambda {
        params: Vec<String>,
        body: Box<Expr>,
        span: SourceSpan,
    },
}

impl Expr {
    pub fn span(&self) -> SourceSpan {
        match self {
            Expr::Null { span }
            | Expr::Bool { span, .. }
            | Expr::Number { span, .. }
            | Expr::String { span, .. }
            | Expr::Array { span, .. }
            | Expr::Object { span, .. }
            | Expr::Identifier { span, .. }
            | Expr::Property { span, .. }
            | Expr::Index { span, .. }
            | Expr::Binary { span, .. }
            | Expr::Unary { span, .. }
            | Expr::TypeTest { span, .. }
            | Expr::Call { span, .. }
            | Expr::Lambda { span, .. } => *span,
        }
    }
}
