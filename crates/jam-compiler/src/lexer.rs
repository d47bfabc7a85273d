//! Hand-written, position-tracking lexer for Jam source text.
//!
//! Produces a flat token stream with 1-indexed line/column spans. Lexical
//! errors are accumulated as JM1xxx diagnostics and lexing continues past
//! them, so the parser can still report everything it finds.

use jam_core::diag::{Diagnostic, MessageCode, SourceSpan};

/// Kind of one lexical token.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals and names
    Number(f64),
    String(String),
    Identifier(String),

    // Keywords
    Var,
    If,
    Else,
    Switch,
    Case,
    Default,
    While,
    For,
    From,
    To,
    Step,
    Ascending,
    Descending,
    ForEach,
    In,
    Return,
    Fail,
    Break,
    Continue,
    True,
    False,
    Null,
    And,
    Or,
    Not,
    Is,

    // Operators and punctuation
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    PlusAssign,
    MinusAssign,
    StarAssign,
    SlashAssign,
    PercentAssign,
    PlusPlus,
    MinusMinus,
    Assign,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Colon,
    Semicolon,
    Dot,
    Arrow,

    Eof,
}

impl TokenKind {
    /// Human-readable description used in parser diagnostics.
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Number(_) => "number".to_string(),
            TokenKind::String(_) => "string".to_string(),
            TokenKind::Identifier(name) => format!("identifier '{name}'"),
            TokenKind::Eof => "end of input".to_string(),
            other => format!("{}", other.lexeme()),
        }
    }

    fn lexeme(&self) -> &'static str {
        match self {
            TokenKind::Var => "var",
            TokenKind::If => "if",
            TokenKind::Else => "else",
            TokenKind::Switch => "switch",
            TokenKind::Case => "case",
            TokenKind::Default => "default",
            TokenKind::While => "while",
            TokenKind::For => "for",
            TokenKind::From => "from",
            TokenKind::To => "to",
            TokenKind::Step => "step",
            TokenKind::Ascending => "ascending",
            TokenKind::Descending => "descending",
            TokenKind::ForEach => "foreach",
            TokenKind::In => "in",
            TokenKind::Return => "return",
            TokenKind::Fail => "fail",
            TokenKind::Break => "break",
            TokenKind::Continue => "continue",
            TokenKind::True => "true",
            TokenKind::False => "false",
            TokenKind::Null => "null",
            TokenKind::And => "and",
            TokenKind::Or => "or",
            TokenKind::Not => "not",
            TokenKind::Is => "is",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::Percent => "%",
            TokenKind::PlusAssign => "+=",
            TokenKind::MinusAssign => "-=",
            TokenKind::StarAssign => "*=",
            TokenKind::SlashAssign => "/=",
            TokenKind::PercentAssign => "%=",
            TokenKind::PlusPlus => "++",
            TokenKind::MinusMinus => "--",
            TokenKind::Assign => "=",
            TokenKind::Eq => "==",
            TokenKind::Ne => "!=",
            TokenKind::Lt => "<",
            TokenKind::Le => "<=",
            TokenKind::Gt => ">",
            TokenKind::Ge => ">=",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::LBrace => "{",
            TokenKind::RBrace => "}",
            TokenKind::LBracket => "[",
            TokenKind::RBracket => "]",
            TokenKind::Comma => ",",
            TokenKind::Colon => ":",
            TokenKind::Semicolon => ";",
            TokenKind::Dot => ".",
            TokenKind::Arrow => "=>",
            TokenKind::Number(_)
            | TokenKind::String(_)
            | TokenKind::Identifier(_)
            | TokenKind::Eof => "",
        }
    }
}

/// One token with the span it was read from.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: SourceSpan,
}

struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: u32,
    column: u32,
    tokens: Vec<Token>,
    diags: Vec<Diagnostic>,
}

/// Lex `source` into a token stream ending in an `Eof` token.
///
/// # Errors
///
/// Returns the accumulated JM1xxx diagnostics when any lexical error was
/// found.
pub fn tokenize(source: &str) -> Result<Vec<Token>, Vec<Diagnostic>> {
    let mut lexer = Lexer {
        chars: source.chars().peekable(),
        line: 1,
        column: 1,
        tokens: Vec::new(),
        diags: Vec::new(),
    };
    lexer.run();
    if lexer.diags.is_empty() {
        Ok(lexer.tokens)
    } else {
        Err(lexer.diags)
    }
}

impl<'a> Lexer<'a> {
    fn advance(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn push(&mut self, kind: TokenKind, line: u32, column: u32) {
        let length = if self.line == line {
            self.column.saturating_sub(column).max(1)
        } else {
            1
        };
        self.tokens.push(Token {
            kind,
            span: SourceSpan::new(line, column, length),
        });
    }

    fn error(&mut self, code: MessageCode, args: Vec<String>, line: u32, column: u32) {
        self.diags.push(Diagnostic::error(
            code,
            args,
            Some(SourceSpan::new(line, column, 1)),
        ));
    }

    fn run(&mut self) {
        while let Some(c) = self.peek() {
            let (line, column) = (self.line, self.column);
            match c {
                ' ' | '\t' | '\r' | '\n' => {
                    self.advance();
                }
                '/' => {
                    self.advance();
                    if self.eat('/') {
                        while matches!(self.peek(), Some(ch) if ch != '\n') {
                            self.advance();
                        }
                    } else if self.eat('*') {
                        self.skip_block_comment();
                    } else if self.eat('=') {
                        self.push(TokenKind::SlashAssign, line, column);
                    } else {
                        self.push(TokenKind::Slash, line, column);
                    }
                }
                '"' => self.read_string(line, column),
                c if c.is_ascii_digit() => self.read_number(line, column),
                c if c.is_ascii_alphabetic() || c == '_' => self.read_word(line, column),
                _ => self.read_operator(line, column),
            }
        }
        let (line, column) = (self.line, self.column);
        self.tokens.push(Token {
            kind: TokenKind::Eof,
            span: SourceSpan::new(line, column, 0),
        });
    }

    fn skip_block_comment(&mut self) {
        loop {
            match self.advance() {
                None => return,
                Some('*') if self.eat('/') => return,
                Some(_) => {}
            }
        }
    }

    fn read_string(&mut self, line: u32, column: u32) {
        self.advance(); // opening quote
        let mut text = String::new();
        loop {
            match self.peek() {
                None | Some('\n') => {
                    self.error(MessageCode::UnterminatedString, vec![], line, column);
                    return;
                }
                Some('"') => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    self.advance();
                    let (esc_line, esc_column) = (self.line, self.column);
                    match self.advance() {
                        Some('n') => text.push('\n'),
                        Some('t') => text.push('\t'),
                        Some('r') => text.push('\r'),
                        Some('"') => text.push('"'),
                        Some('\\') => text.push('\\'),
                        Some(other) => {
                            self.error(
                                MessageCode::InvalidEscape,
                                vec![other.to_string()],
                                esc_line,
                                esc_column,
                            );
                        }
                        None => {
                            self.error(MessageCode::UnterminatedString, vec![], line, column);
                            return;
                        }
                    }
                }
                Some(c) => {
                    text.push(c);
                    self.advance();
                }
            }
        }
        self.push(TokenKind::String(text), line, column);
    }

    fn read_number(&mut self, line: u32, column: u32) {
        let mut text = String::new();
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            text.push(self.advance().unwrap_or_default());
        }
        if self.peek() == Some('.') {
            // A dot only belongs to the number when digits follow; `1.foo`
            // is a number then a property access.
            let mut clone = self.chars.clone();
            clone.next();
            if matches!(clone.peek(), Some(c) if c.is_ascii_digit()) {
                text.push(self.advance().unwrap_or_default());
                while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                    text.push(self.advance().unwrap_or_default());
                }
            }
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            text.push(self.advance().unwrap_or_default());
            if matches!(self.peek(), Some('+' | '-')) {
                text.push(self.advance().unwrap_or_default());
            }
            let mut saw_digit = false;
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                text.push(self.advance().unwrap_or_default());
                saw_digit = true;
            }
            if !saw_digit {
                self.error(MessageCode::InvalidNumber, vec![text.clone()], line, column);
                return;
            }
        }
        match text.parse::<f64>() {
            Ok(value) => self.push(TokenKind::Number(value), line, column),
            Err(_) => self.error(MessageCode::InvalidNumber, vec![text], line, column),
        }
    }

    fn read_word(&mut self, line: u32, column: u32) {
        let mut word = String::new();
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == '_') {
            word.push(self.advance().unwrap_or_default());
        }
        let kind = match word.as_str() {
            "var" => TokenKind::Var,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "switch" => TokenKind::Switch,
            "case" => TokenKind::Case,
            "default" => TokenKind::Default,
            "while" => TokenKind::While,
            "for" => TokenKind::For,
            "from" => TokenKind::From,
            "to" => TokenKind::To,
            "step" => TokenKind::Step,
            "ascending" => TokenKind::Ascending,
            "descending" => TokenKind::Descending,
            "foreach" => TokenKind::ForEach,
            "in" => TokenKind::In,
            "return" => TokenKind::Return,
            "fail" => TokenKind::Fail,
            "break" => TokenKind::Break,
            "continue" => TokenKind::Continue,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "null" => TokenKind::Null,
            "and" => TokenKind::And,
            "or" => TokenKind::Or,
            "not" => TokenKind::Not,
            "is" => TokenKind::Is,
            _ => TokenKind::Identifier(word),
        };
        self.push(kind, line, column);
    }

    fn read_operator(&mut self, line: u32, column: u32) {
        let c = match self.advance() {
            Some(c) => c,
            None => return,
        };
        let kind = match c {
            '+' => {
                if self.eat('=') {
                    TokenKind::PlusAssign
                } else if self.eat('+') {
                    TokenKind::PlusPlus
                } else {
                    TokenKind::Plus
                }
            }
            '-' => {
                if self.eat('=') {
                    TokenKind::MinusAssign
                } else if self.eat('-') {
                    TokenKind::MinusMinus
                } else {
                    TokenKind::Minus
                }
            }
            '*' => {
                if self.eat('=') {
                    TokenKind::StarAssign
                } else {
                    TokenKind::Star
                }
            }
            '%' => {
                if self.eat('=') {
                    TokenKind::PercentAssign
                } else {
                    TokenKind::Percent
                }
            }
            '=' => {
                if self.eat('=') {
                    TokenKind::Eq
                } else if self.eat('>') {
                    TokenKind::Arrow
                } else {
                    TokenKind::Assign
                }
            }
            '!' => {
                if self.eat('=') {
                    TokenKind::Ne
                } else {
                    self.error(MessageCode::UnexpectedCharacter, vec!["!".into()], line, column);
                    return;
                }
            }
            '<' => {
                if self.eat('=') {
                    TokenKind::Le
                } else {
                    TokenKind::Lt
                }
            }
            '>' => {
                if self.eat('=') {
                    TokenKind::Ge
                } else {
                    TokenKind::Gt
                }
            }
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,
            ';' => TokenKind::Semicolon,
            '.' => TokenKind::Dot,
            other => {
                self.error(
                    MessageCode::UnexpectedCharacter,
                    vec![other.to_string()],
                    line,
                    column,
                );
                return;
            }
        };
        self.push(kind, line, column);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_keywords_and_identifiers() {
        assert_eq!(
            kinds("var total"),
            vec![
                TokenKind::Var,
                TokenKind::Identifier("total".into()),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("1 2.5 1e3"),
            vec![
                TokenKind::Number(1.0),
                TokenKind::Number(2.5),
                TokenKind::Number(1000.0),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_number_then_property() {
        assert_eq!(
            kinds("1.foo"),
            vec![
                TokenKind::Number(1.0),
                TokenKind::Dot,
                TokenKind::Identifier("foo".into()),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_strings_with_escapes() {
        assert_eq!(
            kinds(r#""a\nb""#),
            vec![TokenKind::String("a\nb".into()), TokenKind::Eof]
        );
    }

    #[test]
    fn test_unterminated_string() {
        let diags = tokenize("\"abc").unwrap_err();
        assert_eq!(diags[0].code, MessageCode::UnterminatedString);
    }

    #[test]
    fn test_compound_operators() {
        assert_eq!(
            kinds("+= == != <= >= => ++ --"),
            vec![
                TokenKind::PlusAssign,
                TokenKind::Eq,
                TokenKind::Ne,
                TokenKind::Le,
                TokenKind::Ge,
                TokenKind::Arrow,
                TokenKind::PlusPlus,
                TokenKind::MinusMinus,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_comments_skipped() {
        assert_eq!(
            kinds("1 // comment\n/* block\nstill */ 2"),
            vec![TokenKind::Number(1.0), TokenKind::Number(2.0), TokenKind::Eof]
        );
    }

    #[test]
    fn test_spans_track_lines_and_columns() {
        let tokens = tokenize("var x\n  x = 1").unwrap();
        assert_eq!(tokens[0].span, SourceSpan::new(1, 1, 3));
        assert_eq!(tokens[1].span, SourceSpan::new(1, 5, 1));
        assert_eq!(tokens[2].span.line, 2);
        assert_eq!(tokens[2].span.column, 3);
    }

    #[test]
    fn test_unexpected_character() {
        let diags = tokenize("var x = @").unwrap_err();
        assert_eq!(diags[0].code, MessageCode::UnexpectedCharacter);
        assert_eq!(diags[0].args, vec!["@"]);
    }
}
