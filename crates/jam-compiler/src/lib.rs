//! Jam Compiler - source text to executable program.
//!
//! The pipeline is a strict sequence of stages, each consuming the previous
//! stage's artifact: lexing and parsing produce the AST, the validator
//! checks scopes and control flow, the linker resolves call sites against
//! the merged function table, and lowering emits the executable program
//! the runtime walks. No stage runs after a prior stage reported an
//! error-severity diagnostic.

pub mod lexer;
pub mod linker;
pub mod lower;
pub mod parser;
pub mod program;
pub mod validator;

pub use lexer::tokenize;
pub use linker::link;
pub use lower::lower;
pub use parser::parse;
pub use program::{ArgIr, CallIr, FunctionSlot, Instr, Ir, LambdaIr, Program, Target};
pub use validator::validate;
