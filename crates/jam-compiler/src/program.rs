//! The executable program form the compiler emits and the runtime walks.
//!
//! The program is an immutable tree closed over the shared value model:
//! literals are pre-built [`Value`]s, call sites are resolved to indices
//! into the linked slot list, and lambda literals are compiled in place as
//! shared bodies the runtime can invoke per element. Every statement keeps
//! the source span the executor stamps onto location-less runtime errors.

use std::sync::Arc;

use jam_core::diag::SourceSpan;
use jam_core::ops::{BinaryOp, UnaryOp};
use jam_core::signature::FunctionSignature;
use jam_core::value::{TypeHint, Value};

/// One linked callable: its name and the signature it was resolved with.
#[derive(Debug, Clone)]
pub struct FunctionSlot {
    pub name: String,
    pub signature: FunctionSignature,
}

/// A compiled, linked, executable program.
#[derive(Debug, Clone)]
pub struct Program {
    pub body: Vec<Instr>,
    pub slots: Vec<FunctionSlot>,
}

/// A compiled statement.
#[derive(Debug, Clone)]
pub enum Instr {
    Declare {
        name: String,
        hint: Option<TypeHint>,
        init: Option<Ir>,
        span: SourceSpan,
    },
    Assign {
        target: Target,
        /// `Some` for compound assignment: read, apply, write back.
        op: Option<BinaryOp>,
        value: Ir,
        span: SourceSpan,
    },
    If {
        cond: Ir,
        then_block: Vec<Instr>,
        else_ifs: Vec<(Ir, Vec<Instr>)>,
        else_block: Option<Vec<Instr>>,
        span: SourceSpan,
    },
    Switch {
        scrutinee: Ir,
        cases: Vec<(Vec<Ir>, Vec<Instr>)>,
        default: Option<Vec<Instr>>,
        span: SourceSpan,
    },
    While {
        cond: Ir,
        body: Vec<Instr>,
        span: SourceSpan,
    },
    For {
        var: String,
        start: Ir,
        end: Ir,
        step: Option<Ir>,
        descending: bool,
        body: Vec<Instr>,
        span: SourceSpan,
    },
    ForEach {
        var: String,
        collection: Ir,
        body: Vec<Instr>,
        span: SourceSpan,
    },
    Return {
        message: Option<Ir>,
        span: SourceSpan,
    },
    Fail {
        message: Option<Ir>,
        span: SourceSpan,
    },
    Break {
        span: SourceSpan,
    },
    Continue {
        span: SourceSpan,
    },
    /// An expression statement (a call, after validation), evaluated for
    /// its effect.
    Expression {
        expr: Ir,
        span: SourceSpan,
    },
}

impl Instr {
    pub fn span(&self) -> SourceSpan {
        match self {
            Instr::Declare { span, .. }
            | Instr::Assign { span, .. }
            | Instr::If { span, .. }
            | Instr::Switch { span, .. }
            | Instr::While { span, .. }
            | Instr::For { span, .. }
            | Instr::ForEach { span, .. }
            | Instr::Return { span, .. }
            | Instr::Fail { span, .. }
            | Instr::Break { span }
            | Instr::Continue { span }
            | Instr::Expression { span, .. } => *span,
        }
    }
}

/// A compiled assignment target.
#[derive(Debug, Clone)]
pub enum Target {
    Variable { name: String },
    Property { object: Ir, name: String },
    Index { object: Ir, index: Ir },
}

/// A compiled expression.
#[derive(Debug, Clone)]
pub enum Ir {
    /// A literal or constant-folded value.
    Const(Value),
    Array(Vec<Ir>),
    Object(Vec<(String, Ir)>),
    Local(String),
    Property {
        object: Box<Ir>,
        name: String,
    },
    Index {
        object: Box<Ir>,
        index: Box<Ir>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Ir>,
        rhs: Box<Ir>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Ir>,
    },
    TypeTest {
        operand: Box<Ir>,
        hint: TypeHint,
    },
    Call(CallIr),
}

/// A resolved call site.
#[derive(Debug, Clone)]
pub struct CallIr {
    /// Index into [`Program::slots`].
    pub slot: usize,
    pub args: Vec<ArgIr>,
}

/// One compiled call argument.
#[derive(Debug, Clone)]
pub enum ArgIr {
    Value(Ir),
    Lambda(Arc<LambdaIr>),
}

/// A lambda compiled in place at its call site.
#[derive(Debug, Clone)]
pub struct LambdaIr {
    pub params: Vec<String>,
    pub body: Ir,
}
