//! Recursive-descent parser producing the Jam AST.
//!
//! Expressions are parsed with a precedence ladder (or < and < equality <
//! relational/type-test < additive < multiplicative < unary < postfix).
//! Statement-level `x++`/`x--` desugar to compound assignments. On a parse
//! error the parser records a JM2xxx diagnostic and resynchronizes at the
//! next statement boundary, so one pass reports every error it can.

use jam_core::ast::{AssignOp, AssignTarget, Expr, ForDirection, Stmt, SwitchCase};
use jam_core::diag::{Diagnostic, MessageCode, SourceSpan};
use jam_core::ops::{BinaryOp, UnaryOp};
use jam_core::value::TypeHint;

use crate::lexer::{Token, TokenKind};

/// Internal signal: a diagnostic was recorded, unwind to the sync point.
struct ParseAbort;

type PResult<T> = Result<T, ParseAbort>;

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    diags: Vec<Diagnostic>,
}

/// Parse a token stream into a top-level statement list.
///
/// # Errors
///
/// Returns all accumulated parser diagnostics when any statement failed to
/// parse.
pub fn parse(tokens: Vec<Token>) -> Result<Vec<Stmt>, Vec<Diagnostic>> {
    let mut parser = Parser {
        tokens,
        pos: 0,
        diags: Vec::new(),
    };
    let stmts = parser.parse_statements(true);
    if parser.diags.is_empty() {
        Ok(stmts)
    } else {
        Err(parser.diags)
    }
}

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    fn peek_at(&self, offset: usize) -> &TokenKind {
        let idx = (self.pos + offset).min(self.tokens.len() - 1);
        &self.tokens[idx].kind
    }

    fn span(&self) -> SourceSpan {
        self.peek().span
    }

    fn at_end(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Eof)
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn check(&self, kind: &TokenKind) -> bool {
        self.peek_kind() == kind
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind) -> PResult<Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(&format!("'{}'", kind.describe())))
        }
    }

    fn unexpected(&mut self, expected: &str) -> ParseAbort {
        let (code, args) = if self.at_end() {
            (MessageCode::UnexpectedEndOfInput, vec![expected.to_string()])
        } else {
            (
                MessageCode::UnexpectedToken,
                vec![self.peek_kind().describe(), expected.to_string()],
            )
        };
        self.diags
            .push(Diagnostic::error(code, args, Some(self.span())));
        ParseAbort
    }

    fn expect_identifier(&mut self) -> PResult<(String, SourceSpan)> {
        match self.peek_kind().clone() {
            TokenKind::Identifier(name) => {
                let span = self.span();
                self.advance();
                Ok((name, span))
            }
            other => {
                self.diags.push(Diagnostic::error(
                    MessageCode::ExpectedIdentifier,
                    vec![other.describe()],
                    Some(self.span()),
                ));
                Err(ParseAbort)
            }
        }
    }

    /// Skip to the next plausible statement start after an error.
    fn synchronize(&mut self) {
        while !self.at_end() {
            if matches!(
                self.peek_kind(),
                TokenKind::Var
                    | TokenKind::If
                    | TokenKind::Switch
                    | TokenKind::While
                    | TokenKind::For
                    | TokenKind::ForEach
                    | TokenKind::Return
                    | TokenKind::Fail
                    | TokenKind::Break
                    | TokenKind::Continue
                    | TokenKind::RBrace
            ) {
                return;
            }
            if matches!(self.advance().kind, TokenKind::Semicolon) {
                return;
            }
        }
    }

    // ── Statements ───────────────────────────────────────────────────────

    fn parse_statements(&mut self, top_level: bool) -> Vec<Stmt> {
        let mut stmts = Vec::new();
        loop {
            while self.eat(&TokenKind::Semicolon) {}
            if self.at_end() || (!top_level && self.check(&TokenKind::RBrace)) {
                break;
            }
            if top_level && self.check(&TokenKind::RBrace) {
                let _ = self.unexpected("a statement");
                self.advance();
                continue;
            }
            match self.parse_statement() {
                Ok(stmt) => stmts.push(stmt),
                Err(ParseAbort) => self.synchronize(),
            }
        }
        stmts
    }

    fn parse_block(&mut self) -> PResult<Vec<Stmt>> {
        self.expect(&TokenKind::LBrace)?;
        let stmts = self.parse_statements(false);
        self.expect(&TokenKind::RBrace)?;
        Ok(stmts)
    }

    fn parse_statement(&mut self) -> PResult<Stmt> {
        match self.peek_kind() {
            TokenKind::Var => self.parse_var_decl(),
            TokenKind::If => self.parse_if(),
            TokenKind::Switch => self.parse_switch(),
            TokenKind::While => self.parse_while(),
            TokenKind::For => self.parse_for(),
            TokenKind::ForEach => self.parse_foreach(),
            TokenKind::Return => {
                let span = self.span();
                self.advance();
                let message = self.parse_optional_message(span.line)?;
                Ok(Stmt::Return { message, span })
            }
            TokenKind::Fail => {
                let span = self.span();
                self.advance();
                let message = self.parse_optional_message(span.line)?;
                Ok(Stmt::Fail { message, span })
            }
            TokenKind::Break => {
                let span = self.span();
                self.advance();
                Ok(Stmt::Break { span })
            }
            TokenKind::Continue => {
                let span = self.span();
                self.advance();
                Ok(Stmt::Continue { span })
            }
            _ => self.parse_expression_statement(),
        }
    }

    /// The message expression must start on the keyword's own line, so a
    /// bare `return` followed by another statement does not swallow it.
    fn parse_optional_message(&mut self, keyword_line: u32) -> PResult<Option<Expr>> {
        if self.can_start_expression() && self.span().line == keyword_line {
            Ok(Some(self.parse_expr()?))
        } else {
            Ok(None)
        }
    }

    fn parse_var_decl(&mut self) -> PResult<Stmt> {
        let span = self.span();
        self.advance(); // var
        let (name, _) = self.expect_identifier()?;
        let hint = if self.eat(&TokenKind::Colon) {
            Some(self.parse_type_hint()?)
        } else {
            None
        };
        let init = if self.eat(&TokenKind::Assign) {
            Some(self.parse_expr()?)
        } else {
            None
        };
        Ok(Stmt::VarDecl {
            name,
            hint,
            init,
            span,
        })
    }

    fn parse_type_hint(&mut self) -> PResult<TypeHint> {
        if self.eat(&TokenKind::Null) {
            return Ok(TypeHint::Null);
        }
        let (name, span) = self.expect_identifier()?;
        match name.as_str() {
            "any" => Ok(TypeHint::Any),
            "boolean" => Ok(TypeHint::Boolean),
            "number" => Ok(TypeHint::Number),
            "string" => Ok(TypeHint::String),
            "array" => Ok(TypeHint::Array),
            "object" => Ok(TypeHint::Object),
            _ => {
                self.diags.push(Diagnostic::error(
                    MessageCode::UnknownTypeName,
                    vec![name],
                    Some(span),
                ));
                Err(ParseAbort)
            }
        }
    }

    fn parse_if(&mut self) -> PResult<Stmt> {
        let span = self.span();
        self.advance(); // if
        let cond = self.parse_expr()?;
        let then_block = self.parse_block()?;
        let mut else_ifs = Vec::new();
        let mut else_block = None;
        while self.eat(&TokenKind::Else) {
            if self.check(&TokenKind::If) {
                self.advance();
                let elif_cond = self.parse_expr()?;
                let elif_block = self.parse_block()?;
                else_ifs.push((elif_cond, elif_block));
            } else {
                else_block = Some(self.parse_block()?);
                break;
            }
        }
        Ok(Stmt::If {
            cond,
            then_block,
            else_ifs,
            else_block,
            span,
        })
    }

    fn parse_switch(&mut self) -> PResult<Stmt> {
        let span = self.span();
        self.advance(); // switch
        let scrutinee = self.parse_expr()?;
        self.expect(&TokenKind::LBrace)?;
        let mut cases = Vec::new();
        let mut default = None;
        loop {
            if self.eat(&TokenKind::Case) {
                let mut comparands = vec![self.parse_expr()?];
                while self.eat(&TokenKind::Comma) {
                    comparands.push(self.parse_expr()?);
                }
                let body = self.parse_block()?;
                cases.push(SwitchCase { comparands, body });
            } else if self.eat(&TokenKind::Default) {
                default = Some(self.parse_block()?);
            } else {
                break;
            }
        }
        self.expect(&TokenKind::RBrace)?;
        Ok(Stmt::Switch {
            scrutinee,
            cases,
            default,
            span,
        })
    }

    fn parse_while(&mut self) -> PResult<Stmt> {
        let span = self.span();
        self.advance(); // while
        let cond = self.parse_expr()?;
        let body = self.parse_block()?;
        Ok(Stmt::While { cond, body, span })
    }

    fn parse_for(&mut self) -> PResult<Stmt> {
        let span = self.span();
        self.advance(); // for
        let (var, _) = self.expect_identifier()?;
        self.expect(&TokenKind::From)?;
        let start = self.parse_expr()?;
        self.expect(&TokenKind::To)?;
        let end = self.parse_expr()?;
        let step = if self.eat(&TokenKind::Step) {
            Some(self.parse_expr()?)
        } else {
            None
        };
        let direction = if self.eat(&TokenKind::Descending) {
            ForDirection::Descending
        } else {
            self.eat(&TokenKind::Ascending);
            ForDirection::Ascending
        };
        let body = self.parse_block()?;
        Ok(Stmt::For {
            var,
            start,
            end,
            step,
            direction,
            body,
            span,
        })
    }

    fn parse_foreach(&mut self) -> PResult<Stmt> {
        let span = self.span();
        self.advance(); // foreach
        let (var, _) = self.expect_identifier()?;
        self.expect(&TokenKind::In)?;
        let collection = self.parse_expr()?;
        let body = self.parse_block()?;
        Ok(Stmt::ForEach {
            var,
            collection,
            body,
            span,
        })
    }

    fn parse_expression_statement(&mut self) -> PResult<Stmt> {
        let span = self.span();
        if !self.can_start_expression() {
            return Err(self.unexpected("a statement"));
        }
        let expr = self.parse_expr()?;

        // Assignment forms and the ++/-- statement sugar.
        let op = match self.peek_kind() {
            TokenKind::Assign => Some(AssignOp::Assign),
            TokenKind::PlusAssign => Some(AssignOp::Add),
            TokenKind::MinusAssign => Some(AssignOp::Subtract),
            TokenKind::StarAssign => Some(AssignOp::Multiply),
            TokenKind::SlashAssign => Some(AssignOp::Divide),
            TokenKind::PercentAssign => Some(AssignOp::Modulo),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let target = self.expr_to_target(expr)?;
            let value = self.parse_expr()?;
            return Ok(Stmt::Assign {
                target,
                op,
                value,
                span,
            });
        }
        if matches!(self.peek_kind(), TokenKind::PlusPlus | TokenKind::MinusMinus) {
            let op = if matches!(self.advance().kind, TokenKind::PlusPlus) {
                AssignOp::Add
            } else {
                AssignOp::Subtract
            };
            let target = self.expr_to_target(expr)?;
            return Ok(Stmt::Assign {
                target,
                op,
                value: Expr::Number { value: 1.0, span },
                span,
            });
        }
        Ok(Stmt::Expression { expr, span })
    }

    fn expr_to_target(&mut self, expr: Expr) -> PResult<AssignTarget> {
        match expr {
            Expr::Identifier { name, .. } => Ok(AssignTarget::Variable { name }),
            Expr::Property { object, name, .. } => Ok(AssignTarget::Property { object, name }),
            Expr::Index { object, index, .. } => Ok(AssignTarget::Index { object, index }),
            other => {
                self.diags.push(Diagnostic::error(
                    MessageCode::InvalidAssignmentTarget,
                    vec![],
                    Some(other.span()),
                ));
                Err(ParseAbort)
            }
        }
    }

    // ── Expressions ──────────────────────────────────────────────────────

    fn can_start_expression(&self) -> bool {
        matches!(
            self.peek_kind(),
            TokenKind::Number(_)
                | TokenKind::String(_)
                | TokenKind::Identifier(_)
                | TokenKind::True
                | TokenKind::False
                | TokenKind::Null
                | TokenKind::LParen
                | TokenKind::LBracket
                | TokenKind::LBrace
                | TokenKind::Minus
                | TokenKind::Not
                | TokenKind::PlusPlus
                | TokenKind::MinusMinus
        )
    }

    fn parse_expr(&mut self) -> PResult<Expr> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_and()?;
        while self.check(&TokenKind::Or) {
            let span = lhs.span();
            self.advance();
            let rhs = self.parse_and()?;
            lhs = Expr::Binary {
                op: BinaryOp::Or,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                span,
            };
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_equality()?;
        while self.check(&TokenKind::And) {
            let span = lhs.span();
            self.advance();
            let rhs = self.parse_equality()?;
            lhs = Expr::Binary {
                op: BinaryOp::And,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                span,
            };
        }
        Ok(lhs)
    }

    fn parse_equality(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_relational()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Eq => BinaryOp::Equal,
                TokenKind::Ne => BinaryOp::NotEqual,
                _ => break,
            };
            let span = lhs.span();
            self.advance();
            let rhs = self.parse_relational()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                span,
            };
        }
        Ok(lhs)
    }

    fn parse_relational(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_additive()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Lt => BinaryOp::Less,
                TokenKind::Le => BinaryOp::LessEqual,
                TokenKind::Gt => BinaryOp::Greater,
                TokenKind::Ge => BinaryOp::GreaterEqual,
                TokenKind::Is => {
                    let span = lhs.span();
                    self.advance();
                    let hint = self.parse_type_hint()?;
                    lhs = Expr::TypeTest {
                        operand: Box::new(lhs),
                        hint,
                        span,
                    };
                    continue;
                }
                _ => break,
            };
            let span = lhs.span();
            self.advance();
            let rhs = self.parse_additive()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                span,
            };
        }
        Ok(lhs)
    }

    fn parse_additive(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Subtract,
                _ => break,
            };
            let span = lhs.span();
            self.advance();
            let rhs = self.parse_multiplicative()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                span,
            };
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Star => BinaryOp::Multiply,
                TokenKind::Slash => BinaryOp::Divide,
                TokenKind::Percent => BinaryOp::Modulo,
                _ => break,
            };
            let span = lhs.span();
            self.advance();
            let rhs = self.parse_unary()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                span,
            };
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> PResult<Expr> {
        let op = match self.peek_kind() {
            TokenKind::Minus => Some(UnaryOp::Negate),
            TokenKind::Not => Some(UnaryOp::Not),
            TokenKind::PlusPlus => Some(UnaryOp::Increment),
            TokenKind::MinusMinus => Some(UnaryOp::Decrement),
            _ => None,
        };
        if let Some(op) = op {
            let span = self.span();
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(Expr::Unary {
                op,
                operand: Box::new(operand),
                span,
            });
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> PResult<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.eat(&TokenKind::Dot) {
                let span = expr.span();
                let (name, _) = self.expect_identifier()?;
                expr = Expr::Property {
                    object: Box::new(expr),
                    name,
                    span,
                };
            } else if self.check(&TokenKind::LBracket) {
                let span = expr.span();
                self.advance();
                let index = self.parse_expr()?;
                self.expect(&TokenKind::RBracket)?;
                expr = Expr::Index {
                    object: Box::new(expr),
                    index: Box::new(index),
                    span,
                };
            } else {
                break;
            }
        }
        Ok(expr)
    }

    /// True when the tokens from the current position spell a lambda
    /// parameter list: `( )`, `( ident (, ident)* )`, followed by `=>`.
    fn lambda_ahead(&self) -> bool {
        if !matches!(self.peek_kind(), TokenKind::LParen) {
            return false;
        }
        let mut offset = 1;
        if matches!(self.peek_at(offset), TokenKind::RParen) {
            return matches!(self.peek_at(offset + 1), TokenKind::Arrow);
        }
        loop {
            if !matches!(self.peek_at(offset), TokenKind::Identifier(_)) {
                return false;
            }
            offset += 1;
            match self.peek_at(offset) {
                TokenKind::Comma => offset += 1,
                TokenKind::RParen => {
                    return matches!(self.peek_at(offset + 1), TokenKind::Arrow)
                }
                _ => return false,
            }
        }
    }

    fn parse_lambda(&mut self) -> PResult<Expr> {
        let span = self.span();
        let mut params = Vec::new();
        if self.eat(&TokenKind::LParen) {
            if !self.check(&TokenKind::RParen) {
                loop {
                    let (name, _) = self.expect_identifier()?;
                    params.push(name);
                    if !self.eat(&TokenKind::Comma) {
                        break;
                    }
                }
            }
            self.expect(&TokenKind::RParen)?;
        } else {
            let (name, _) = self.expect_identifier()?;
            params.push(name);
        }
        self.expect(&TokenKind::Arrow)?;
        let body = self.parse_expr()?;
        Ok(Expr::Lambda {
            params,
            body: Box::new(body),
            span,
        })
    }

    fn parse_primary(&mut self) -> PResult<Expr> {
        let span = self.span();
        match self.peek_kind().clone() {
            TokenKind::Number(value) => {
                self.advance();
                Ok(Expr::Number { value, span })
            }
            TokenKind::String(value) => {
                self.advance();
                Ok(Expr::String { value, span })
            }
            TokenKind::True => {
                self.advance();
                Ok(Expr::Bool { value: true, span })
            }
            TokenKind::False => {
                self.advance();
                Ok(Expr::Bool { value: false, span })
            }
            TokenKind::Null => {
                self.advance();
                Ok(Expr::Null { span })
            }
            TokenKind::Identifier(name) => {
                if matches!(self.peek_at(1), TokenKind::Arrow) {
                    return self.parse_lambda();
                }
                self.advance();
                if self.check(&TokenKind::LParen) {
                    self.advance();
                    let mut args = Vec::new();
                    if !self.check(&TokenKind::RParen) {
                        loop {
                            args.push(self.parse_expr()?);
                            if !self.eat(&TokenKind::Comma) {
                                break;
                            }
                        }
                    }
                    self.expect(&TokenKind::RParen)?;
                    Ok(Expr::Call { name, args, span })
                } else {
                    Ok(Expr::Identifier { name, span })
                }
            }
            TokenKind::LParen => {
                if self.lambda_ahead() {
                    return self.parse_lambda();
                }
                self.advance();
                let expr = self.parse_expr()?;
                self.expect(&TokenKind::RParen)?;
                Ok(expr)
            }
            TokenKind::LBracket => {
                self.advance();
                let mut items = Vec::new();
                if !self.check(&TokenKind::RBracket) {
                    loop {
                        items.push(self.parse_expr()?);
                        if !self.eat(&TokenKind::Comma) {
                            break;
                        }
                    }
                }
                self.expect(&TokenKind::RBracket)?;
                Ok(Expr::Array { items, span })
            }
            TokenKind::LBrace => {
                self.advance();
                let mut entries = Vec::new();
                if !self.check(&TokenKind::RBrace) {
                    loop {
                        let key = match self.peek_kind().clone() {
                            TokenKind::Identifier(name) => {
                                self.advance();
                                name
                            }
                            TokenKind::String(text) => {
                                self.advance();
                                text
                            }
                            _ => return Err(self.unexpected("an object key")),
                        };
                        self.expect(&TokenKind::Colon)?;
                        let value = self.parse_expr()?;
                        entries.push((key, value));
                        if !self.eat(&TokenKind::Comma) {
                            break;
                        }
                    }
                }
                self.expect(&TokenKind::RBrace)?;
                Ok(Expr::Object { entries, span })
            }
            _ => {
                self.diags.push(Diagnostic::error(
                    MessageCode::ExpectedExpression,
                    vec![self.peek_kind().describe()],
                    Some(span),
                ));
                Err(ParseAbort)
            }
        }
    }
}
