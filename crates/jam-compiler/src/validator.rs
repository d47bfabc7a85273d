//! Scope and control-flow validation over the AST.
//!
//! Runs after parsing and before linking. All findings accumulate into one
//! diagnostic list; the pipeline stops before linking when any finding has
//! error severity. Blocks introduce nested scopes, inner declarations
//! shadow outer ones, loop header variables are scoped to the loop body,
//! and there is no hoisting.

use std::collections::HashSet;

use jam_core::ast::{AssignTarget, Expr, Stmt};
use jam_core::diag::{Diagnostic, MessageCode};

/// Deepest loop nesting a script may use.
pub const MAX_LOOP_NESTING: usize = 16;

/// The ambient input binding every script receives.
pub const DATA_VARIABLE: &str = "data";

/// Validate a top-level statement list, returning every finding.
pub fn validate(stmts: &[Stmt]) -> Vec<Diagnostic> {
    let mut v = Validator {
        scopes: vec![HashSet::from([DATA_VARIABLE.to_string()])],
        loop_depth: 0,
        diags: Vec::new(),
    };
    v.check_stmts(stmts);
    v.diags
}

struct Validator {
    scopes: Vec<HashSet<String>>,
    loop_depth: usize,
    diags: Vec<Diagnostic>,
}

impl Validator {
    fn error(&mut self, code: MessageCode, args: Vec<String>, stmt_span: jam_core::SourceSpan) {
        self.diags
            .push(Diagnostic::error(code, args, Some(stmt_span)));
    }

    fn is_declared(&self, name: &str) -> bool {
        self.scopes.iter().rev().any(|s| s.contains(name))
    }

    fn declare(&mut self, name: &str, span: jam_core::SourceSpan) {
        if name == DATA_VARIABLE {
            self.error(
                MessageCode::ReservedIdentifier,
                vec![name.to_string()],
                span,
            );
            return;
        }
        let current = self
            .scopes
            .last_mut()
            .expect("validator always has a scope");
        if !current.insert(name.to_string()) {
            self.error(MessageCode::DuplicateVariable, vec![name.to_string()], span);
        }
    }

    fn with_scope(&mut self, f: impl FnOnce(&mut Self)) {
        self.scopes.push(HashSet::new());
        f(self);
        self.scopes.pop();
    }

    /// Check a statement sequence, warning once about code after the first
    /// terminator.
    fn check_stmts(&mut self, stmts: &[Stmt]) {
        let mut terminated_by: Option<&Stmt> = None;
        for stmt in stmts {
            if let Some(term) = terminated_by.take() {
                self.diags.push(Diagnostic::warning(
                    MessageCode::UnreachableCode,
                    vec![term.keyword().to_string()],
                    Some(stmt.span()),
                ));
            }
            self.check_stmt(stmt);
            if stmt.is_terminator() {
                terminated_by = Some(stmt);
            }
        }
    }

    fn check_block(&mut self, stmts: &[Stmt]) {
        self.with_scope(|v| v.check_stmts(stmts));
    }

    fn enter_loop(&mut self, span: jam_core::SourceSpan) {
        self.loop_depth += 1;
        if self.loop_depth == MAX_LOOP_NESTING + 1 {
            self.error(
                MessageCode::LoopNestingTooDeep,
                vec![MAX_LOOP_NESTING.to_string()],
                span,
            );
        }
    }

    fn exit_loop(&mut self) {
        self.loop_depth -= 1;
    }

    fn check_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::VarDecl {
                name, init, span, ..
            } => {
                if let Some(init) = init {
                    self.check_expr(init);
                }
                self.declare(name, *span);
            }
            Stmt::Assign {
                target,
                value,
                span,
                ..
            } => {
                match target {
                    AssignTarget::Variable { name } => {
                        if name != DATA_VARIABLE && !self.is_declared(name) {
                            self.error(
                                MessageCode::UndeclaredVariable,
                                vec![name.clone()],
                                *span,
                            );
                        }
                    }
                    AssignTarget::Property { object, .. } => self.check_expr(object),
                    AssignTarget::Index { object, index } => {
                        self.check_expr(object);
                        self.check_expr(index);
                    }
                }
                self.check_expr(value);
            }
            Stmt::If {
                cond,
                then_block,
                else_ifs,
                else_block,
                ..
            } => {
                self.check_expr(cond);
                self.check_block(then_block);
                for (elif_cond, elif_block) in else_ifs {
                    self.check_expr(elif_cond);
                    self.check_block(elif_block);
                }
                if let Some(else_block) = else_block {
                    self.check_block(else_block);
                }
            }
            Stmt::Switch {
                scrutinee,
                cases,
                default,
                ..
            } => {
                self.check_expr(scrutinee);
                for case in cases {
                    for comparand in &case.comparands {
                        self.check_expr(comparand);
                    }
                    self.check_block(&case.body);
                }
                if let Some(default) = default {
                    self.check_block(default);
                }
            }
            Stmt::While { cond, body, span } => {
                self.check_expr(cond);
                self.enter_loop(*span);
                self.check_block(body);
                self.exit_loop();
            }
            Stmt::For {
                var,
                start,
                end,
                step,
                body,
                span,
                ..
            } => {
                self.check_expr(start);
                self.check_expr(end);
                if let Some(step) = step {
                    self.check_expr(step);
                }
                self.enter_loop(*span);
                self.with_scope(|v| {
                    v.declare(var, *span);
                    v.check_stmts(body);
                });
                self.exit_loop();
            }
            Stmt::ForEach {
                var,
                collection,
                body,
                span,
            } => {
                self.check_expr(collection);
                self.enter_loop(*span);
                self.with_scope(|v| {
                    v.declare(var, *span);
                    v.check_stmts(body);
                });
                self.exit_loop();
            }
            Stmt::Return { message, .. } | Stmt::Fail { message, .. } => {
                if let Some(message) = message {
                    self.check_expr(message);
                }
            }
            Stmt::Break { span } => {
                if self.loop_depth == 0 {
                    self.error(MessageCode::BreakOutsideLoop, vec![], *span);
                }
            }
            Stmt::Continue { span } => {
                if self.loop_depth == 0 {
                    self.error(MessageCode::ContinueOutsideLoop, vec![], *span);
                }
            }
            Stmt::Expression { expr, span } => {
                if !matches!(expr, Expr::Call { .. }) {
                    self.error(MessageCode::InvalidExpressionStatement, vec![], *span);
                }
                self.check_expr(expr);
            }
        }
    }

    fn check_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Null { .. }
            | Expr::Bool { .. }
            | Expr::Number { .. }
            | Expr::String { .. } => {}
            Expr::Array { items, .. } => {
                for item in items {
                    self.check_expr(item);
                }
            }
            Expr::Object { entries, .. } => {
                for (_, value) in entries {
                    self.check_expr(value);
                }
            }
            Expr::Identifier { name, span } => {
                if !self.is_declared(name) {
                    self.error(MessageCode::UndeclaredVariable, vec![name.clone()], *span);
                }
            }
            Expr::Property { object, .. } => self.check_expr(object),
            Expr::Index { object, index, .. } => {
                self.check_expr(object);
                self.check_expr(index);
            }
            Expr::Binary { lhs, rhs, .. } => {
                self.check_expr(lhs);
                self.check_expr(rhs);
            }
            Expr::Unary { operand, .. } | Expr::TypeTest { operand, .. } => {
                self.check_expr(operand);
            }
            Expr::Call { args, .. } => {
                for arg in args {
                    // Lambdas are legal exactly here, as direct arguments.
                    if let Expr::Lambda { params, body, span } = arg {
                        self.with_scope(|v| {
                            for param in params {
                                v.declare(param, *span);
                            }
                            v.check_expr(body);
                        });
                    } else {
                        self.check_expr(arg);
                    }
                }
            }
            Expr::Lambda { span, .. } => {
                self.error(MessageCode::LambdaNotAllowed, vec![], *span);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::parser::parse;
    use jam_core::diag::Severity;

    fn validate_source(source: &str) -> Vec<Diagnostic> {
        validate(&parse(tokenize(source).unwrap()).unwrap())
    }

    fn codes(source: &str) -> Vec<MessageCode> {
        validate_source(source).into_iter().map(|d| d.code).collect()
    }

    #[test]
    fn test_clean_script() {
        assert!(codes("var x = 1\nx = x + 1\ndata.n = x").is_empty());
    }

    #[test]
    fn test_undeclared_variable() {
        assert_eq!(codes("x = 1"), vec![MessageCode::UndeclaredVariable]);
        assert_eq!(codes("var y = x"), vec![MessageCode::UndeclaredVariable]);
    }

    #[test]
    fn test_data_is_predeclared() {
        assert!(codes("data.n = data.n + 1").is_empty());
    }

    #[test]
    fn test_duplicate_in_same_scope() {
        assert_eq!(
            codes("var x = 1\nvar x = 2"),
            vec![MessageCode::DuplicateVariable]
        );
    }

    #[test]
    fn test_shadowing_in_inner_scope_is_legal() {
        assert!(codes("var x = 1\nif true { var x = 2\nx = 3 }").is_empty());
    }

    #[test]
    fn test_declaring_data_is_reserved() {
        assert_eq!(codes("var data = 1"), vec![MessageCode::ReservedIdentifier]);
    }

    #[test]
    fn test_break_continue_outside_loop() {
        assert_eq!(codes("break"), vec![MessageCode::BreakOutsideLoop]);
        assert_eq!(codes("continue"), vec![MessageCode::ContinueOutsideLoop]);
        assert!(codes("while true { break }").is_empty());
    }

    #[test]
    fn test_unreachable_code_is_a_warning() {
        let diags = validate_source("return\nvar x = 1");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, MessageCode::UnreachableCode);
        assert_eq!(diags[0].severity, Severity::Warning);
    }

    #[test]
    fn test_loop_variable_scoped_to_body() {
        assert_eq!(
            codes("for i from 1 to 3 { }\nvar x = i"),
            vec![MessageCode::UndeclaredVariable]
        );
        assert!(codes("foreach item in data.items { var y = item }").is_empty());
    }

    #[test]
    fn test_loop_nesting_limit() {
        let mut source = String::new();
        for _ in 0..17 {
            source.push_str("while true {");
        }
        source.push_str(&"}".repeat(17));
        assert_eq!(codes(&source), vec![MessageCode::LoopNestingTooDeep]);
    }

    #[test]
    fn test_lambda_only_as_call_argument() {
        assert!(codes("var f = Map(data.items, (x) => x)").is_empty());
        assert_eq!(
            codes("var f = (x) => x"),
            vec![MessageCode::LambdaNotAllowed]
        );
    }

    #[test]
    fn test_lambda_params_visible_in_body() {
        assert!(codes("var out = Map(data.items, (x) => x * 2)").is_empty());
    }

    #[test]
    fn test_expression_statement_must_be_call() {
        assert_eq!(
            codes("1 + 2"),
            vec![MessageCode::InvalidExpressionStatement]
        );
        assert!(codes("Each(data.items, (x) => x)").is_empty());
    }
}
