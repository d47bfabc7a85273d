//! Lowering from the validated, linked AST to the executable program.
//!
//! Lowering resolves call names to slot indices, compiles lambda literals
//! in place, turns literals into pre-built values, and folds
//! constant-only operator applications. Folding never folds an expression
//! whose evaluation would raise (such as division by zero): those must
//! fail at runtime, where the statement span is attached.

use std::collections::HashMap;
use std::sync::Arc;

use jam_core::ast::{AssignTarget, Expr, ForDirection, Stmt, SwitchCase};
use jam_core::ops::{self, BinaryOp};
use jam_core::value::Value;

use crate::program::{ArgIr, CallIr, FunctionSlot, Instr, Ir, LambdaIr, Program, Target};

/// Lower a validated, linked statement list into a [`Program`].
pub fn lower(stmts: &[Stmt], slots: Vec<FunctionSlot>) -> Program {
    let slot_index: HashMap<String, usize> = slots
        .iter()
        .enumerate()
        .map(|(i, slot)| (slot.name.clone(), i))
        .collect();
    let lowerer = Lowerer { slot_index };
    let body = lowerer.lower_stmts(stmts);
    tracing::debug!(
        statements = body.len(),
        functions = slots.len(),
        "lowered program"
    );
    Program { body, slots }
}

struct Lowerer {
    slot_index: HashMap<String, usize>,
}

impl Lowerer {
    fn lower_stmts(&self, stmts: &[Stmt]) -> Vec<Instr> {
        stmts.iter().map(|s| self.lower_stmt(s)).collect()
    }

    fn lower_stmt(&self, stmt: &Stmt) -> Instr {
        match stmt {
            Stmt::VarDecl {
                name,
                hint,
                init,
                span,
            } => Instr::Declare {
                name: name.clone(),
                hint: *hint,
                init: init.as_ref().map(|e| self.lower_expr(e)),
                span: *span,
            },
            Stmt::Assign {
                target,
                op,
                value,
                span,
            } => Instr::Assign {
                target: self.lower_target(target),
                op: op.binary_op(),
                value: self.lower_expr(value),
                span: *span,
            },
            Stmt::If {
                cond,
                then_block,
                else_ifs,
                else_block,
                span,
            } => Instr::If {
                cond: self.lower_expr(cond),
                then_block: self.lower_stmts(then_block),
                else_ifs: else_ifs
                    .iter()
                    .map(|(c, b)| (self.lower_expr(c), self.lower_stmts(b)))
                    .collect(),
                else_block: else_block.as_ref().map(|b| self.lower_stmts(b)),
                span: *span,
            },
            Stmt::Switch {
                scrutinee,
                cases,
                default,
                span,
            } => Instr::Switch {
                scrutinee: self.lower_expr(scrutinee),
                cases: cases
                    .iter()
                    .map(|SwitchCase { comparands, body }| {
                        (
                            comparands.iter().map(|c| self.lower_expr(c)).collect(),
                            self.lower_stmts(body),
                        )
                    })
                    .collect(),
                default: default.as_ref().map(|b| self.lower_stmts(b)),
                span: *span,
            },
            Stmt::While { cond, body, span } => Instr::While {
                cond: self.lower_expr(cond),
                body: self.lower_stmts(body),
                span: *span,
            },
            Stmt::For {
                var,
                start,
                end,
                step,
                direction,
                body,
                span,
            } => Instr::For {
                var: var.clone(),
                start: self.lower_expr(start),
                end: self.lower_expr(end),
                step: step.as_ref().map(|e| self.lower_expr(e)),
                descending: *direction == ForDirection::Descending,
                body: self.lower_stmts(body),
                span: *span,
            },
            Stmt::ForEach {
                var,
                collection,
                body,
                span,
            } => Instr::ForEach {
                var: var.clone(),
                collection: self.lower_expr(collection),
                body: self.lower_stmts(body),
                span: *span,
            },
            Stmt::Return { message, span } => Instr::Return {
                message: message.as_ref().map(|e| self.lower_expr(e)),
                span: *span,
            },
            Stmt::Fail { message, span } => Instr::Fail {
                message: message.as_ref().map(|e| self.lower_expr(e)),
                span: *span,
            },
            Stmt::Break { span } => Instr::Break { span: *span },
            Stmt::Continue { span } => Instr::Continue { span: *span },
            Stmt::Expression { expr, span } => Instr::Expression {
                expr: self.lower_expr(expr),
                span: *span,
            },
        }
    }

    fn lower_target(&self, target: &AssignTarget) -> Target {
        match target {
            AssignTarget::Variable { name } => Target::Variable { name: name.clone() },
            AssignTarget::Property { object, name } => Target::Property {
                object: self.lower_expr(object),
                name: name.clone(),
            },
            AssignTarget::Index { object, index } => Target::Index {
                object: self.lower_expr(object),
                index: self.lower_expr(index),
            },
        }
    }

    fn lower_expr(&self, expr: &Expr) -> Ir {
        match expr {
            Expr::Null { .. } => Ir::Const(Value::Null),
            Expr::Bool { value, .. } => Ir::Const(Value::Bool(*value)),
            Expr::Number { value, .. } => Ir::Const(Value::Number(*value)),
            Expr::String { value, .. } => Ir::Const(Value::String(value.clone())),
            Expr::Array { items, .. } => {
                Ir::Array(items.iter().map(|e| self.lower_expr(e)).collect())
            }
            Expr::Object { entries, .. } => Ir::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), self.lower_expr(v)))
                    .collect(),
            ),
            Expr::Identifier { name, .. } => Ir::Local(name.clone()),
            Expr::Property { object, name, .. } => Ir::Property {
                object: Box::new(self.lower_expr(object)),
                name: name.clone(),
            },
            Expr::Index { object, index, .. } => Ir::Index {
                object: Box::new(self.lower_expr(object)),
                index: Box::new(self.lower_expr(index)),
            },
            Expr::Binary { op, lhs, rhs, .. } => {
                let lhs = self.lower_expr(lhs);
                let rhs = self.lower_expr(rhs);
                if let (Ir::Const(a), Ir::Const(b)) = (&lhs, &rhs) {
                    if let Some(folded) = fold_binary(*op, a, b) {
                        return Ir::Const(folded);
                    }
                }
                Ir::Binary {
                    op: *op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                }
            }
            Expr::Unary { op, operand, .. } => {
                let operand = self.lower_expr(operand);
                if let Ir::Const(v) = &operand {
                    if let Ok(folded) = ops::evaluate_unary(*op, v) {
                        return Ir::Const(folded);
                    }
                }
                Ir::Unary {
                    op: *op,
                    operand: Box::new(operand),
                }
            }
            Expr::TypeTest { operand, hint, .. } => Ir::TypeTest {
                operand: Box::new(self.lower_expr(operand)),
                hint: *hint,
            },
            Expr::Call { name, args, .. } => {
                let slot = self.slot_index.get(name).copied().unwrap_or(usize::MAX);
                let args = args
                    .iter()
                    .map(|arg| match arg {
                        Expr::Lambda { params, body, .. } => ArgIr::Lambda(Arc::new(LambdaIr {
                            params: params.clone(),
                            body: self.lower_expr(body),
                        })),
                        other => ArgIr::Value(self.lower_expr(other)),
                    })
                    .collect();
                Ir::Call(CallIr { slot, args })
            }
            // Unreachable after validation; kept total for robustness.
            Expr::Lambda { .. } => Ir::Const(Value::Null),
        }
    }
}

/// Fold a constant binary application when it cannot raise.
///
/// Short-circuit operators and any application that would produce a
/// runtime error (division/modulo by zero, mixed-kind operands) are left
/// for the executor.
fn fold_binary(op: BinaryOp, lhs: &Value, rhs: &Value) -> Option<Value> {
    match op {
        BinaryOp::And | BinaryOp::Or => None,
        BinaryOp::Divide | BinaryOp::Modulo => match rhs {
            Value::Number(n) if *n != 0.0 => ops::evaluate_binary(op, lhs, rhs).ok(),
            _ => None,
        },
        _ => ops::evaluate_binary(op, lhs, rhs).ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::linker::link;
    use crate::parser::parse;
    use jam_core::signature::{FunctionSignature, FunctionTable, ParameterType};

    fn lower_source(source: &str) -> Program {
        let stmts = parse(tokenize(source).unwrap()).unwrap();
        let table = FunctionTable::merge(
            vec![FunctionSignature::new("Map")
                .required("array", ParameterType::Array)
                .required("transform", ParameterType::Lambda)],
            vec![],
        );
        let (slots, diags) = link(&stmts, &table);
        assert!(diags.iter().all(|d| !d.is_error()), "{diags:?}");
        lower(&stmts, slots)
    }

    #[test]
    fn test_constant_folding() {
        let program = lower_source("var x = 1 + 2 * 3");
        match &program.body[0] {
            Instr::Declare { init, .. } => {
                assert!(matches!(init, Some(Ir::Const(Value::Number(n))) if *n == 7.0));
            }
            other => panic!("expected declare, got {other:?}"),
        }
    }

    #[test]
    fn test_division_by_zero_not_folded() {
        let program = lower_source("var x = 10 / 0");
        match &program.body[0] {
            Instr::Declare { init, .. } => {
                assert!(matches!(init, Some(Ir::Binary { op: BinaryOp::Divide, .. })));
            }
            other => panic!("expected declare, got {other:?}"),
        }
    }

    #[test]
    fn test_string_folding() {
        let program = lower_source("var x = \"a\" + \"b\"");
        match &program.body[0] {
            Instr::Declare { init, .. } => {
                assert!(matches!(init, Some(Ir::Const(Value::String(s))) if s == "ab"));
            }
            other => panic!("expected declare, got {other:?}"),
        }
    }

    #[test]
    fn test_call_resolved_to_slot() {
        let program = lower_source("data.out = Map(data.items, (x) => x * 2)");
        assert_eq!(program.slots[0].name, "Map");
        match &program.body[0] {
            Instr::Assign { value: Ir::Call(call), .. } => {
                assert_eq!(call.slot, 0);
                assert!(matches!(&call.args[1], ArgIr::Lambda(l) if l.params == vec!["x".to_string()]));
            }
            other => panic!("expected call assignment, got {other:?}"),
        }
    }

    #[test]
    fn test_compound_assignment_keeps_operator() {
        let program = lower_source("data.n += 2");
        match &program.body[0] {
            Instr::Assign { op, .. } => assert_eq!(*op, Some(BinaryOp::Add)),
            other => panic!("expected assignment, got {other:?}"),
        }
    }
}
