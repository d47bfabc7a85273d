//! Call-site resolution against the merged builtin + host function table.
//!
//! Linking runs once per program, after validation. Every call expression
//! is looked up in the table, its argument count is checked against the
//! signature's arity range, and lambda obligations are enforced in both
//! directions: a Lambda-typed parameter requires a lambda literal, and a
//! lambda literal requires a Lambda-typed parameter. Host functions that
//! shadow builtins produce one non-fatal JM4100 warning each.
//!
//! A program loaded from a precompiled artifact re-runs linking, because
//! the host's function set is not part of the artifact.

use jam_core::ast::{AssignTarget, Expr, Stmt, SwitchCase};
use jam_core::diag::{Diagnostic, MessageCode, SourceSpan};
use jam_core::signature::FunctionTable;

use crate::program::FunctionSlot;

/// Resolve every call site in `stmts` against `table`.
///
/// Returns the function slots in first-use order plus all link
/// diagnostics. The slot list is only meaningful when no diagnostic has
/// error severity.
pub fn link(stmts: &[Stmt], table: &FunctionTable) -> (Vec<FunctionSlot>, Vec<Diagnostic>) {
    let mut linker = Linker {
        table,
        slots: Vec::new(),
        diags: Vec::new(),
    };
    for name in table.overridden() {
        linker.diags.push(Diagnostic::warning(
            MessageCode::FunctionOverride,
            vec![name.clone()],
            None,
        ));
    }
    linker.link_stmts(stmts);
    (linker.slots, linker.diags)
}

struct Linker<'a> {
    table: &'a FunctionTable,
    slots: Vec<FunctionSlot>,
    diags: Vec<Diagnostic>,
}

impl<'a> Linker<'a> {
    fn error(&mut self, code: MessageCode, args: Vec<String>, span: SourceSpan) {
        self.diags.push(Diagnostic::error(code, args, Some(span)));
    }

    fn link_stmts(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            self.link_stmt(stmt);
        }
    }

    fn link_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::VarDecl { init, .. } => {
                if let Some(init) = init {
                    self.link_expr(init);
                }
            }
            Stmt::Assign { target, value, .. } => {
                match target {
                    AssignTarget::Variable { .. } => {}
                    AssignTarget::Property { object, .. } => self.link_expr(object),
                    AssignTarget::Index { object, index } => {
                        self.link_expr(object);
                        self.link_expr(index);
                    }
                }
                self.link_expr(value);
            }
            Stmt::If {
                cond,
                then_block,
                else_ifs,
                else_block,
                ..
            } => {
                self.link_expr(cond);
                self.link_stmts(then_block);
                for (elif_cond, elif_block) in else_ifs {
                    self.link_expr(elif_cond);
                    self.link_stmts(elif_block);
                }
                if let Some(else_block) = else_block {
                    self.link_stmts(else_block);
                }
            }
            Stmt::Switch {
                scrutinee,
                cases,
                default,
                ..
            } => {
                self.link_expr(scrutinee);
                for SwitchCase { comparands, body } in cases {
                    for comparand in comparands {
                        self.link_expr(comparand);
                    }
                    self.link_stmts(body);
                }
                if let Some(default) = default {
                    self.link_stmts(default);
                }
            }
            Stmt::While { cond, body, .. } => {
                self.link_expr(cond);
                self.link_stmts(body);
            }
            Stmt::For {
                start,
                end,
                step,
                body,
                ..
            } => {
                self.link_expr(start);
                self.link_expr(end);
                if let Some(step) = step {
                    self.link_expr(step);
                }
                self.link_stmts(body);
            }
            Stmt::ForEach {
                collection, body, ..
            } => {
                self.link_expr(collection);
                self.link_stmts(body);
            }
            Stmt::Return { message, .. } | Stmt::Fail { message, .. } => {
                if let Some(message) = message {
                    self.link_expr(message);
                }
            }
            Stmt::Break { .. } | Stmt::Continue { .. } => {}
            Stmt::Expression { expr, .. } => self.link_expr(expr),
        }
    }

    fn link_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Null { .. }
            | Expr::Bool { .. }
            | Expr::Number { .. }
            | Expr::String { .. }
            | Expr::Identifier { .. } => {}
            Expr::Array { items, .. } => {
                for item in items {
                    self.link_expr(item);
                }
            }
            Expr::Object { entries, .. } => {
                for (_, value) in entries {
                    self.link_expr(value);
                }
            }
            Expr::Property { object, .. } => self.link_expr(object),
            Expr::Index { object, index, .. } => {
                self.link_expr(object);
                self.link_expr(index);
            }
            Expr::Binary { lhs, rhs, .. } => {
                self.link_expr(lhs);
                self.link_expr(rhs);
            }
            Expr::Unary { operand, .. } | Expr::TypeTest { operand, .. } => {
                self.link_expr(operand)
            }
            Expr::Call { name, args, span } => self.link_call(name, args, *span),
            // Unreachable after validation; lambdas outside call arguments
            // were already rejected.
            Expr::Lambda { body, .. } => self.link_expr(body),
        }
    }

    fn link_call(&mut self, name: &str, args: &[Expr], span: SourceSpan) {
        for arg in args {
            if let Expr::Lambda { body, .. } = arg {
                self.link_expr(body);
            } else {
                self.link_expr(arg);
            }
        }

        let signature = match self.table.get(name) {
            Some(signature) => signature,
            None => {
                self.error(MessageCode::UndefinedFunction, vec![name.to_string()], span);
                return;
            }
        };

        let (min, max) = (signature.min_arity(), signature.max_arity());
        if args.len() < min {
            self.error(
                MessageCode::TooFewArguments,
                vec![name.to_string(), min.to_string(), args.len().to_string()],
                span,
            );
        } else if args.len() > max {
            self.error(
                MessageCode::TooManyArguments,
                vec![name.to_string(), max.to_string(), args.len().to_string()],
                span,
            );
        }

        // Structural lambda obligations, checked here rather than at
        // runtime.
        for (i, arg) in args.iter().enumerate() {
            let Some(param) = signature.params.get(i) else {
                break;
            };
            let is_lambda_literal = matches!(arg, Expr::Lambda { .. });
            let wants_lambda = param.ty == jam_core::ParameterType::Lambda;
            if wants_lambda && !is_lambda_literal {
                self.error(
                    MessageCode::LambdaRequired,
                    vec![name.to_string(), (i + 1).to_string()],
                    span,
                );
            } else if !wants_lambda && is_lambda_literal {
                self.error(
                    MessageCode::LambdaNotExpected,
                    vec![name.to_string(), (i + 1).to_string()],
                    span,
                );
            }
        }

        if !self.slots.iter().any(|slot| slot.name == name) {
            self.slots.push(FunctionSlot {
                name: name.to_string(),
                signature: signature.clone(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::parser::parse;
    use jam_core::diag::Severity;
    use jam_core::signature::{FunctionSignature, ParameterType};

    fn table() -> FunctionTable {
        FunctionTable::merge(
            vec![
                FunctionSignature::new("Append")
                    .required("array", ParameterType::Array)
                    .required("value", ParameterType::Any)
                    .returns(ParameterType::Array),
                FunctionSignature::new("Map")
                    .required("array", ParameterType::Array)
                    .required("transform", ParameterType::Lambda)
                    .returns(ParameterType::Array),
                FunctionSignature::new("Substring")
                    .required("text", ParameterType::String)
                    .required("start", ParameterType::Number)
                    .optional("length", ParameterType::Number)
                    .returns(ParameterType::String),
            ],
            vec![],
        )
    }

    fn link_source(source: &str) -> (Vec<FunctionSlot>, Vec<Diagnostic>) {
        let stmts = parse(tokenize(source).unwrap()).unwrap();
        link(&stmts, &table())
    }

    #[test]
    fn test_resolves_slots_in_first_use_order() {
        let (slots, diags) = link_source(
            "data.a = Map(data.items, (x) => Append(data.items, x))\ndata.b = Append(data.items, 1)",
        );
        assert!(diags.is_empty());
        let names: Vec<&str> = slots.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Append", "Map"]);
    }

    #[test]
    fn test_undefined_function() {
        let (_, diags) = link_source("data.a = Missing(1)");
        assert_eq!(diags[0].code, MessageCode::UndefinedFunction);
        assert_eq!(diags[0].args, vec!["Missing"]);
    }

    #[test]
    fn test_arity_checks() {
        let (_, diags) = link_source("data.a = Append(data.items)");
        assert_eq!(diags[0].code, MessageCode::TooFewArguments);
        let (_, diags) = link_source("data.a = Substring(\"x\", 0, 1, 2)");
        assert_eq!(diags[0].code, MessageCode::TooManyArguments);
    }

    #[test]
    fn test_optional_parameter_allows_omission() {
        let (_, diags) = link_source("data.a = Substring(\"abc\", 1)");
        assert!(diags.is_empty());
    }

    #[test]
    fn test_lambda_obligations() {
        let (_, diags) = link_source("data.a = Map(data.items, 1)");
        assert_eq!(diags[0].code, MessageCode::LambdaRequired);
        let (_, diags) = link_source("data.a = Append(data.items, (x) => x)");
        assert_eq!(diags[0].code, MessageCode::LambdaNotExpected);
    }

    #[test]
    fn test_override_warning_is_non_fatal() {
        let merged = FunctionTable::merge(
            vec![FunctionSignature::new("Append")
                .required("array", ParameterType::Array)
                .required("value", ParameterType::Any)],
            vec![FunctionSignature::new("Append")
                .required("array", ParameterType::Array)
                .required("value", ParameterType::Any)],
        );
        let stmts = parse(tokenize("data.a = Append(data.items, 1)").unwrap()).unwrap();
        let (slots, diags) = link(&stmts, &merged);
        assert_eq!(slots.len(), 1);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, MessageCode::FunctionOverride);
        assert_eq!(diags[0].severity, Severity::Warning);
    }
}
