//! Script scanner.
//!
//! Operators are matched longest first (`===` before `==` before `=`).
//! Malformed input becomes a `TokenKind::Error` token rather than stopping
//! the scan.

use std::rc::Rc;

use crate::token::{Token, TokenKind};

pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: u32,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
        }
    }

    fn current(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos + 1).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.current()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.current() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn skip_trivia(&mut self) {
        loop {
            match (self.current(), self.peek()) {
                (Some(c), _) if c.is_whitespace() => {
                    self.bump();
                }
                (Some('/'), Some('/')) => {
                    while self.current().is_some_and(|c| c != '\n') {
                        self.bump();
                    }
                }
                (Some('/'), Some('*')) => {
                    self.pos += 2;
                    loop {
                        match self.bump() {
                            Some('*') if self.eat('/') => break,
                            Some(_) => {}
                            None => break,
                        }
                    }
                }
                _ => return,
            }
        }
    }

    pub fn next_token(&mut self) -> Token {
        self.skip_trivia();
        let line = self.line;
        let kind = match self.bump() {
            None => TokenKind::Eof,
            Some(c) => self.scan(c),
        };
        Token { kind, line }
    }

    fn scan(&mut self, c: char) -> TokenKind {
        match c {
            '(' => TokenKind::LeftParen,
            ')' => TokenKind::RightParen,
            '{' => TokenKind::LeftBrace,
            '}' => TokenKind::RightBrace,
            '[' => TokenKind::LeftBracket,
            ']' => TokenKind::RightBracket,
            ',' => TokenKind::Comma,
            ';' => TokenKind::Semicolon,
            ':' => TokenKind::Colon,
            '?' => TokenKind::Question,
            '%' => TokenKind::Percent,
            '.' if self.current().is_some_and(|d| d.is_ascii_digit()) => self.number(c),
            '.' => TokenKind::Dot,
            '+' if self.eat('+') => TokenKind::PlusPlus,
            '+' if self.eat('=') => TokenKind::PlusEqual,
            '+' => TokenKind::Plus,
            '-' if self.eat('-') => TokenKind::MinusMinus,
            '-' if self.eat('=') => TokenKind::MinusEqual,
            '-' => TokenKind::Minus,
            '*' if self.eat('=') => TokenKind::StarEqual,
            '*' => TokenKind::Star,
            '/' if self.eat('=') => TokenKind::SlashEqual,
            '/' => TokenKind::Slash,
            '&' if self.eat('&') => TokenKind::AmpAmp,
            '&' => TokenKind::Amp,
            '|' if self.eat('|') => TokenKind::PipePipe,
            '|' => TokenKind::Pipe,
            '!' if self.eat('=') => {
                if self.eat('=') {
                    TokenKind::BangEqualEqual
                } else {
                    TokenKind::BangEqual
                }
            }
            '!' => TokenKind::Bang,
            '=' if self.eat('=') => {
                if self.eat('=') {
                    TokenKind::EqualEqualEqual
                } else {
                    TokenKind::EqualEqual
                }
            }
            '=' if self.eat('>') => TokenKind::Arrow,
            '=' => TokenKind::Equal,
            '<' if self.eat('=') => TokenKind::LessEqual,
            '<' => TokenKind::Less,
            '>' if self.eat('=') => TokenKind::GreaterEqual,
            '>' => TokenKind::Greater,
            '"' | '\'' => self.string(c),
            c if c.is_ascii_digit() => self.number(c),
            c if is_identifier_start(c) => self.identifier(c),
            other => TokenKind::Error(format!("unexpected character '{other}'")),
        }
    }

    fn number(&mut self, first: char) -> TokenKind {
        if first == '0' && matches!(self.current(), Some('x' | 'X')) {
            self.pos += 1;
            let start = self.pos;
            while self.current().is_some_and(|c| c.is_ascii_hexdigit()) {
                self.pos += 1;
            }
            let digits: String = self.chars[start..self.pos].iter().collect();
            return match u64::from_str_radix(&digits, 16) {
                Ok(n) => TokenKind::Number(n as f64),
                Err(_) => TokenKind::Error("malformed hex literal".to_string()),
            };
        }

        let mut text = String::from(first);
        let digits = |lexer: &mut Lexer, text: &mut String| {
            while let Some(c) = lexer.current().filter(char::is_ascii_digit) {
                text.push(c);
                lexer.pos += 1;
            }
        };
        digits(self, &mut text);
        if first != '.' && self.current() == Some('.') && self.peek().is_some_and(|c| c.is_ascii_digit()) {
            text.push('.');
            self.pos += 1;
            digits(self, &mut text);
        }
        if matches!(self.current(), Some('e' | 'E')) {
            let sign = matches!(self.peek(), Some('+' | '-'));
            let digit_at = if sign { self.pos + 2 } else { self.pos + 1 };
            if self.chars.get(digit_at).is_some_and(char::is_ascii_digit) {
                for _ in 0..(digit_at - self.pos) {
                    if let Some(c) = self.bump() {
                        text.push(c);
                    }
                }
                digits(self, &mut text);
            }
        }
        match text.parse::<f64>() {
            Ok(n) => TokenKind::Number(n),
            Err(_) => TokenKind::Error(format!("malformed number '{text}'")),
        }
    }

    fn string(&mut self, quote: char) -> TokenKind {
        let mut out = String::new();
        loop {
            match self.bump() {
                None | Some('\n') => {
                    return TokenKind::Error("unterminated string".to_string());
                }
                Some(c) if c == quote => return TokenKind::String(Rc::from(out)),
                Some('\\') => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('r') => out.push('\r'),
                    Some('0') => out.push('\0'),
                    Some('u') => match self.unicode_escape() {
                        Some(c) => out.push(c),
                        None => return TokenKind::Error("malformed \\u escape".to_string()),
                    },
                    // Line continuation.
                    Some('\n') => {}
                    Some(other) => out.push(other),
                    None => return TokenKind::Error("unterminated string".to_string()),
                },
                Some(c) => out.push(c),
            }
        }
    }

    fn unicode_escape(&mut self) -> Option<char> {
        let end = self.pos + 4;
        let hex: String = self.chars.get(self.pos..end)?.iter().collect();
        let code = u32::from_str_radix(&hex, 16).ok()?;
        self.pos = end;
        char::from_u32(code)
    }

    fn identifier(&mut self, first: char) -> TokenKind {
        let mut name = String::from(first);
        while let Some(c) = self.current().filter(|c| is_identifier_part(*c)) {
            name.push(c);
            self.pos += 1;
        }
        TokenKind::keyword(&name).unwrap_or_else(|| TokenKind::Identifier(Rc::from(name)))
    }
}

impl Iterator for Lexer {
    type Item = Token;

    /// Yields tokens up to and including `Eof`.
    fn next(&mut self) -> Option<Token> {
        if self.pos > self.chars.len() {
            return None;
        }
        let token = self.next_token();
        if token.kind == TokenKind::Eof {
            self.pos = self.chars.len() + 1;
        }
        Some(token)
    }
}

fn is_identifier_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_identifier_part(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Scans `source` to a token list ending in `Eof`.
pub fn tokenize(source: &str) -> Vec<Token> {
    Lexer::new(source).collect()
}
