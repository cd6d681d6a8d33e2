use crate::token::{Token, TokenKind};
use inliner_span::Span;
use inliner_utils::errors::{Diagnostic, DiagnosticSeverity};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LexerError {
    #[error("unterminated string literal (line {line}, column {column})")]
    UnterminatedString {
        line: usize,
        column: usize,
        span: Span,
    },
    #[error("unterminated character literal (line {line}, column {column})")]
    UnterminatedChar {
        line: usize,
        column: usize,
        span: Span,
    },
    #[error("unterminated block comment (line {line}, column {column})")]
    UnterminatedComment {
        line: usize,
        column: usize,
        span: Span,
    },
    #[error("unexpected character `{ch}` (line {line}, column {column})")]
    UnexpectedCharacter {
        ch: char,
        line: usize,
        column: usize,
        span: Span,
    },
}

impl LexerError {
    pub fn span(&self) -> Span {
        match self {
            LexerError::UnterminatedString { span, .. }
            | LexerError::UnterminatedChar { span, .. }
            | LexerError::UnterminatedComment { span, .. }
            | LexerError::UnexpectedCharacter { span, .. } => *span,
        }
    }

    pub fn to_diagnostic(&self, source_id: &str) -> Diagnostic {
        let diag = Diagnostic::new(
            DiagnosticSeverity::Error,
            source_id,
            self.span(),
            self.to_string(),
        )
        .with_code("lex");

        match self {
            LexerError::UnterminatedString { .. } => diag
                .with_suggestion("Add a closing quote (\") to terminate the string")
                .with_help("String literals cannot span multiple lines."),
            LexerError::UnterminatedChar { .. } => {
                diag.with_suggestion("Add a closing quote (') to terminate the character literal")
            }
            LexerError::UnterminatedComment { .. } => {
                diag.with_suggestion("Close the comment with `*/`")
            }
            LexerError::UnexpectedCharacter { ch, .. } => match ch {
                '#' => diag.with_suggestion("Did you mean a line comment (`//`)?"),
                '`' => diag.with_suggestion("Did you mean a double quote (\")?"),
                _ => diag.with_help("This character is not valid in this position."),
            },
        }
    }
}

pub type LexResult<T> = Result<T, Vec<LexerError>>;

struct LexerState<'src> {
    tokens: Vec<Token>,
    errors: Vec<LexerError>,
    text: &'src str,
    source: &'src [u8],
    offset: usize,
    line: usize,
    column: usize,
}

impl<'src> LexerState<'src> {
    fn new(source: &'src str) -> Self {
        Self {
            tokens: Vec::new(),
            errors: Vec::new(),
            text: source,
            source: source.as_bytes(),
            offset: 0,
            line: 1,
            column: 1,
        }
    }

    fn current_char(&self) -> Option<u8> {
        self.source.get(self.offset).copied()
    }

    fn peek_char(&self, ahead: usize) -> Option<u8> {
        self.source.get(self.offset + ahead).copied()
    }

    fn advance(&mut self, count: usize) {
        for _ in 0..count {
            if self.current_char() == Some(b'\n') {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
            self.offset += 1;
        }
    }

    fn slice(&self, start: usize, end: usize) -> &'src str {
        self.text.get(start..end).unwrap_or_default()
    }

    fn emit_token(&mut self, kind: TokenKind, start: usize, len: usize) {
        let span = Span::new(start, start + len);
        self.tokens.push(Token::new(kind, span));
        self.advance(len);
    }

    fn emit_error(&mut self, error: LexerError) {
        self.errors.push(error);
    }

    fn is_at_end(&self) -> bool {
        self.offset >= self.source.len()
    }
}

/// Tokenize a whole source file (or snippet). The token stream always ends
/// with [`TokenKind::Eof`].
pub fn tokenize(source: &str) -> LexResult<Vec<Token>> {
    let mut state = LexerState::new(source);
    state.tokens.reserve(source.len() / 4);

    while !state.is_at_end() {
        state.next_token();
    }

    let eof_span = Span::empty_at(state.offset);
    state.tokens.push(Token::new(TokenKind::Eof, eof_span));

    if state.errors.is_empty() {
        Ok(state.tokens)
    } else {
        Err(state.errors)
    }
}

impl<'src> LexerState<'src> {
    fn next_token(&mut self) {
        let Some(ch) = self.current_char() else {
            return;
        };
        let start = self.offset;

        match ch {
            b' ' | b'\t' | b'\r' | b'\n' => self.advance(1),
            b'/' if self.peek_char(1) == Some(b'/') => self.skip_line_comment(),
            b'/' if self.peek_char(1) == Some(b'*') => self.skip_block_comment(),
            b'(' => self.emit_token(TokenKind::LParen, start, 1),
            b')' => self.emit_token(TokenKind::RParen, start, 1),
            b'{' => self.emit_token(TokenKind::LBrace, start, 1),
            b'}' => self.emit_token(TokenKind::RBrace, start, 1),
            b'[' => self.emit_token(TokenKind::LBracket, start, 1),
            b']' => self.emit_token(TokenKind::RBracket, start, 1),
            b';' => self.emit_token(TokenKind::Semicolon, start, 1),
            b',' => self.emit_token(TokenKind::Comma, start, 1),
            b'@' => self.emit_token(TokenKind::At, start, 1),
            b'?' => self.emit_token(TokenKind::Question, start, 1),
            b'~' => self.emit_token(TokenKind::Tilde, start, 1),
            b'.' => {
                if self.peek_char(1) == Some(b'.') && self.peek_char(2) == Some(b'.') {
                    self.emit_token(TokenKind::Ellipsis, start, 3);
                } else if self.peek_char(1).is_some_and(|c| c.is_ascii_digit()) {
                    self.tokenize_number();
                } else {
                    self.emit_token(TokenKind::Dot, start, 1);
                }
            }
            b':' => {
                if self.peek_char(1) == Some(b':') {
                    self.emit_token(TokenKind::ColonColon, start, 2);
                } else {
                    self.emit_token(TokenKind::Colon, start, 1);
                }
            }
            b'+' => match self.peek_char(1) {
                Some(b'+') => self.emit_token(TokenKind::PlusPlus, start, 2),
                Some(b'=') => self.emit_token(TokenKind::PlusEq, start, 2),
                _ => self.emit_token(TokenKind::Plus, start, 1),
            },
            b'-' => match self.peek_char(1) {
                Some(b'-') => self.emit_token(TokenKind::MinusMinus, start, 2),
                Some(b'=') => self.emit_token(TokenKind::MinusEq, start, 2),
                Some(b'>') => self.emit_token(TokenKind::Arrow, start, 2),
                _ => self.emit_token(TokenKind::Minus, start, 1),
            },
            b'*' => self.with_assign(TokenKind::Star, TokenKind::StarEq, start),
            b'/' => self.with_assign(TokenKind::Slash, TokenKind::SlashEq, start),
            b'%' => self.with_assign(TokenKind::Percent, TokenKind::PercentEq, start),
            b'^' => self.with_assign(TokenKind::Caret, TokenKind::CaretEq, start),
            b'!' => self.with_assign(TokenKind::Bang, TokenKind::Neq, start),
            b'=' => self.with_assign(TokenKind::Equals, TokenKind::EqEq, start),
            b'&' => match self.peek_char(1) {
                Some(b'&') => self.emit_token(TokenKind::AndAnd, start, 2),
                Some(b'=') => self.emit_token(TokenKind::AmpEq, start, 2),
                _ => self.emit_token(TokenKind::Amp, start, 1),
            },
            b'|' => match self.peek_char(1) {
                Some(b'|') => self.emit_token(TokenKind::OrOr, start, 2),
                Some(b'=') => self.emit_token(TokenKind::PipeEq, start, 2),
                _ => self.emit_token(TokenKind::Pipe, start, 1),
            },
            b'<' => match self.peek_char(1) {
                Some(b'<') => self.emit_token(TokenKind::Shl, start, 2),
                Some(b'=') => self.emit_token(TokenKind::LtEq, start, 2),
                _ => self.emit_token(TokenKind::Lt, start, 1),
            },
            // `>>` stays two tokens so that nested type arguments close; the
            // parser joins adjacent `>` into shift operators.
            b'>' => self.with_assign(TokenKind::Gt, TokenKind::GtEq, start),
            b'"' => self.tokenize_string(),
            b'\'' => self.tokenize_char(),
            ch if ch.is_ascii_digit() => self.tokenize_number(),
            ch if ch.is_ascii_alphabetic() || ch == b'_' || ch == b'$' || ch > 127 => {
                self.tokenize_identifier_or_keyword();
            }
            _ => {
                let ch = self.slice(start, start + 1).chars().next().unwrap_or('?');
                self.emit_error(LexerError::UnexpectedCharacter {
                    ch,
                    line: self.line,
                    column: self.column,
                    span: Span::new(start, start + 1),
                });
                self.advance(1);
            }
        }
    }

    fn with_assign(&mut self, plain: TokenKind, assign: TokenKind, start: usize) {
        if self.peek_char(1) == Some(b'=') {
            self.emit_token(assign, start, 2);
        } else {
            self.emit_token(plain, start, 1);
        }
    }

    fn skip_line_comment(&mut self) {
        while let Some(ch) = self.current_char() {
            if ch == b'\n' {
                return;
            }
            self.advance(1);
        }
    }

    fn skip_block_comment(&mut self) {
        let start = self.offset;
        let (line, column) = (self.line, self.column);
        self.advance(2);
        while !self.is_at_end() {
            if self.current_char() == Some(b'*') && self.peek_char(1) == Some(b'/') {
                self.advance(2);
                return;
            }
            self.advance(1);
        }
        self.emit_error(LexerError::UnterminatedComment {
            line,
            column,
            span: Span::new(start, self.offset),
        });
    }

    fn tokenize_quoted(&mut self, quote: u8) -> Option<&'src str> {
        let start = self.offset;
        self.advance(1);

        while let Some(ch) = self.current_char() {
            match ch {
                b'\\' => self.advance(2),
                b'\n' => return None,
                ch if ch == quote => {
                    self.advance(1);
                    return Some(self.slice(start, self.offset));
                }
                _ => self.advance(1),
            }
        }
        None
    }

    fn tokenize_string(&mut self) {
        let start = self.offset;
        let (line, column) = (self.line, self.column);
        match self.tokenize_quoted(b'"') {
            Some(text) => {
                let kind = TokenKind::StringLiteral(text.to_string());
                self.tokens.push(Token::new(kind, Span::new(start, self.offset)));
            }
            None => self.emit_error(LexerError::UnterminatedString {
                line,
                column,
                span: Span::new(start, self.offset),
            }),
        }
    }

    fn tokenize_char(&mut self) {
        let start = self.offset;
        let (line, column) = (self.line, self.column);
        match self.tokenize_quoted(b'\'') {
            Some(text) => {
                let kind = TokenKind::CharLiteral(text.to_string());
                self.tokens.push(Token::new(kind, Span::new(start, self.offset)));
            }
            None => self.emit_error(LexerError::UnterminatedChar {
                line,
                column,
                span: Span::new(start, self.offset),
            }),
        }
    }

    fn tokenize_number(&mut self) {
        let start = self.offset;

        if self.current_char() == Some(b'0')
            && matches!(self.peek_char(1), Some(b'x' | b'X' | b'b' | b'B'))
        {
            self.advance(2);
            while let Some(ch) = self.current_char() {
                if ch.is_ascii_hexdigit() || ch == b'_' {
                    self.advance(1);
                } else {
                    break;
                }
            }
        } else {
            self.consume_digits();
            if self.current_char() == Some(b'.')
                && self.peek_char(1).is_some_and(|c| c.is_ascii_digit())
            {
                self.advance(1);
                self.consume_digits();
            }
            if matches!(self.current_char(), Some(b'e' | b'E')) {
                let sign = usize::from(matches!(self.peek_char(1), Some(b'+' | b'-')));
                if self.peek_char(1 + sign).is_some_and(|c| c.is_ascii_digit()) {
                    self.advance(1 + sign);
                    self.consume_digits();
                }
            }
        }

        // Type suffix (L, f, d)
        if matches!(
            self.current_char(),
            Some(b'l' | b'L' | b'f' | b'F' | b'd' | b'D')
        ) {
            self.advance(1);
        }

        let value = self.slice(start, self.offset).to_string();
        self.tokens
            .push(Token::new(TokenKind::Number(value), Span::new(start, self.offset)));
    }

    fn consume_digits(&mut self) {
        while let Some(ch) = self.current_char() {
            if ch.is_ascii_digit() || ch == b'_' {
                self.advance(1);
            } else {
                break;
            }
        }
    }

    fn tokenize_identifier_or_keyword(&mut self) {
        let start = self.offset;

        while let Some(ch) = self.current_char() {
            if ch.is_ascii_alphanumeric() || ch == b'_' || ch == b'$' || ch > 127 {
                self.advance(1);
            } else {
                break;
            }
        }

        let value = self.slice(start, self.offset);
        let kind =
            TokenKind::keyword(value).unwrap_or_else(|| TokenKind::Identifier(value.to_string()));
        self.tokens.push(Token::new(kind, Span::new(start, self.offset)));
    }
}
