//! Lexical analyzer.

use crate::diag::{ErrorKind, KobyError};
use crate::token::{keyword_kind, Literal, Position, Token, TokenKind};

/// Tokens and lexical diagnostics produced by one scan.
#[derive(Debug)]
pub struct ScanResult {
    pub tokens: Vec<Token>,
    pub errors: Vec<KobyError>,
}

impl ScanResult {
    pub fn success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Turns a source string into a sequence of tokens.
///
/// Scanning never aborts: bad input is collected as a diagnostic and the
/// scan continues with the next character.  The token stream always ends
/// with a synthetic [`TokenKind::End`].
pub struct Scanner {
    source: Vec<char>,
    tokens: Vec<Token>,
    errors: Vec<KobyError>,

    // Two indices walk the source: `start` marks the first character of the
    // lexeme being scanned, `cursor` sits one past the last consumed one.
    start: usize,
    cursor: usize,

    line: Position,
}

impl std::fmt::Debug for Scanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scanner")
            .field("cursor", &self.cursor)
            .field("line", &self.line)
            .finish()
    }
}

impl Scanner {
    pub fn from_source(source: &str) -> Scanner {
        Scanner {
            source: source.chars().collect(),
            tokens: Vec::new(),
            errors: Vec::new(),
            start: 0,
            cursor: 0,
            line: 1,
        }
    }

    pub fn scan_tokens(mut self) -> ScanResult {
        while self.cursor < self.source.len() {
            let c = self.advance();
            match c {
                '\n' => self.line += 1,
                ' ' | '\t' | '\r' => (),

                '(' => self.add_token(TokenKind::LeftParen),
                ')' => self.add_token(TokenKind::RightParen),
                '{' => self.add_token(TokenKind::LeftBrace),
                '}' => self.add_token(TokenKind::RightBrace),
                ',' => self.add_token(TokenKind::Comma),
                '.' => self.add_token(TokenKind::Dot),
                ';' => self.add_token(TokenKind::Semicolon),
                '+' => self.add_token(TokenKind::Plus),
                '*' => self.add_token(TokenKind::Star),
                '%' => self.add_token(TokenKind::Percent),

                '-' => {
                    if self.peek_match('>') {
                        self.add_token(TokenKind::Arrow);
                    } else {
                        self.add_token(TokenKind::Minus);
                    }
                }
                '/' => {
                    if self.peek_match('/') {
                        self.skip_comment();
                    } else {
                        self.add_token(TokenKind::Slash);
                    }
                }

                '!' => {
                    if self.peek_match('=') {
                        self.add_token(TokenKind::BangEqual);
                    } else {
                        self.add_token(TokenKind::Bang);
                    }
                }
                '=' => {
                    if self.peek_match('=') {
                        self.add_token(TokenKind::EqualEqual);
                    } else {
                        self.add_token(TokenKind::Equal);
                    }
                }
                '>' => {
                    if self.peek_match('=') {
                        self.add_token(TokenKind::GreaterEqual);
                    } else {
                        self.add_token(TokenKind::Greater);
                    }
                }
                '<' => {
                    if self.peek_match('=') {
                        self.add_token(TokenKind::LessEqual);
                    } else {
                        self.add_token(TokenKind::Less);
                    }
                }

                '"' => self.scan_string(),

                _ => {
                    if c.is_ascii_digit() {
                        self.scan_number();
                    } else if is_identifier_start(c) {
                        self.scan_identifier();
                    } else {
                        self.collect_err(
                            ErrorKind::LexicalError,
                            format!("Unexpected character: {}", c),
                        );
                    }
                }
            }
        }
        self.tokens
            .push(Token::new(TokenKind::End, String::new(), Literal::None, self.line));
        ScanResult {
            tokens: self.tokens,
            errors: self.errors,
        }
    }

    /// Consumes one character and starts a new lexeme at it.
    fn advance(&mut self) -> char {
        let c = self.source[self.cursor];
        self.start = self.cursor;
        self.cursor += 1;
        c
    }

    /// Looks `n` characters past the last consumed one without consuming.
    fn peek(&self, n: usize) -> Option<char> {
        self.source.get(self.cursor + n - 1).copied()
    }

    /// Consumes the next character only if it equals `expected`.
    fn peek_match(&mut self, expected: char) -> bool {
        if self.peek(1) == Some(expected) {
            self.cursor += 1;
            return true;
        }
        false
    }

    /// Consumes one more character into the current lexeme.
    fn consume(&mut self) {
        self.cursor += 1;
    }

    fn lexeme(&self) -> String {
        self.source[self.start..self.cursor].iter().collect()
    }

    fn add_token(&mut self, kind: TokenKind) {
        self.add_literal_token(kind, Literal::None);
    }

    fn add_literal_token(&mut self, kind: TokenKind, literal: Literal) {
        self.tokens
            .push(Token::new(kind, self.lexeme(), literal, self.line));
    }

    fn collect_err(&mut self, kind: ErrorKind, message: String) {
        self.errors.push(KobyError::new(kind, message, self.line));
    }

    fn skip_comment(&mut self) {
        while self.peek(1).is_some() && self.peek(1) != Some('\n') {
            self.consume();
        }
    }

    /// The enclosed characters become the literal verbatim; there is no
    /// escape processing.  Newlines inside a string do not bump the line
    /// counter, so the token keeps the line of its opening quote.
    fn scan_string(&mut self) {
        while self.peek(1).is_some() && self.peek(1) != Some('"') {
            self.consume();
        }
        if self.peek(1).is_none() {
            self.collect_err(ErrorKind::UnterminatedString, "Unterminated string.".to_string());
            return;
        }
        self.consume();
        let value: String = self.source[self.start + 1..self.cursor - 1].iter().collect();
        self.add_literal_token(TokenKind::Str, Literal::Str(value));
    }

    fn scan_number(&mut self) {
        while matches!(self.peek(1), Some(c) if c.is_ascii_digit()) {
            self.consume();
        }
        // A dot only belongs to the number when a digit follows it.
        if self.peek(1) == Some('.') && matches!(self.peek(2), Some(c) if c.is_ascii_digit()) {
            self.consume();
            while matches!(self.peek(1), Some(c) if c.is_ascii_digit()) {
                self.consume();
            }
        }
        let text = self.lexeme();
        match text.parse::<f64>() {
            Ok(value) => self.add_literal_token(TokenKind::Number, Literal::Num(value)),
            Err(_) => self.collect_err(
                ErrorKind::LexicalError,
                format!("Cannot parse number literal: {}", text),
            ),
        }
    }

    fn scan_identifier(&mut self) {
        while matches!(self.peek(1), Some(c) if is_identifier_char(c)) {
            self.consume();
        }
        // Identifiers may end in a single question mark, e.g. `empty?`.
        if self.peek(1) == Some('?') {
            self.consume();
        }
        let text = self.lexeme();
        match keyword_kind(&text) {
            Some(kind) => self.add_token(kind),
            None => self.add_token(TokenKind::Identifier),
        }
    }
}

fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}
