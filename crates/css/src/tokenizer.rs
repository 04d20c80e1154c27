//! CSS tokenizer.
//!
//! A hand-rolled scanner over code points. The lookahead predicates
//! (`would_start_identifier`, `is_valid_escape`, `starts_number`) decide how a
//! token begins; everything unrecognised degrades to a `Delim` so the parser
//! can recover at rule or declaration granularity.

use std::fmt;

#[derive(Clone, Debug, PartialEq)]
pub enum CssToken {
    Ident(String),
    Function(String),
    AtKeyword(String),
    /// `is_id` is set when the hash value would start an identifier.
    Hash { value: String, is_id: bool },
    String(String),
    BadString,
    Url(String),
    BadUrl,
    Delim(char),
    Number(f32),
    Percentage(f32),
    Dimension { value: f32, unit: String },
    Whitespace,
    Cdo,
    Cdc,
    Colon,
    Semicolon,
    Comma,
    LeftBracket,
    RightBracket,
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
}

impl fmt::Display for CssToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CssToken::Ident(s) => write!(f, "{s}"),
            CssToken::Function(s) => write!(f, "{s}("),
            CssToken::AtKeyword(s) => write!(f, "@{s}"),
            CssToken::Hash { value, .. } => write!(f, "#{value}"),
            CssToken::String(s) => write!(f, "\"{s}\""),
            CssToken::BadString => write!(f, "\""),
            CssToken::Url(s) => write!(f, "url({s})"),
            CssToken::BadUrl => write!(f, "url()"),
            CssToken::Delim(c) => write!(f, "{c}"),
            CssToken::Number(n) => write!(f, "{n}"),
            CssToken::Percentage(n) => write!(f, "{n}%"),
            CssToken::Dimension { value, unit } => write!(f, "{value}{unit}"),
            CssToken::Whitespace => write!(f, " "),
            CssToken::Cdo => write!(f, "<!--"),
            CssToken::Cdc => write!(f, "-->"),
            CssToken::Colon => write!(f, ":"),
            CssToken::Semicolon => write!(f, ";"),
            CssToken::Comma => write!(f, ","),
            CssToken::LeftBracket => write!(f, "["),
            CssToken::RightBracket => write!(f, "]"),
            CssToken::LeftParen => write!(f, "("),
            CssToken::RightParen => write!(f, ")"),
            CssToken::LeftBrace => write!(f, "{{"),
            CssToken::RightBrace => write!(f, "}}"),
        }
    }
}

fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || !c.is_ascii()
}

fn is_name(c: char) -> bool {
    is_name_start(c) || c.is_ascii_digit() || c == '-'
}

fn is_css_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r' | '\x0C')
}

fn is_valid_escape(a: Option<char>, b: Option<char>) -> bool {
    a == Some('\\') && !matches!(b, Some('\n') | None)
}

fn would_start_identifier(a: Option<char>, b: Option<char>, c: Option<char>) -> bool {
    match a {
        Some('-') => {
            matches!(b, Some(ch) if is_name_start(ch) || ch == '-') || is_valid_escape(b, c)
        }
        Some(ch) if is_name_start(ch) => true,
        Some('\\') => is_valid_escape(a, b),
        _ => false,
    }
}

fn starts_number(a: Option<char>, b: Option<char>, c: Option<char>) -> bool {
    match a {
        Some('+') | Some('-') => match b {
            Some(d) if d.is_ascii_digit() => true,
            Some('.') => matches!(c, Some(d) if d.is_ascii_digit()),
            _ => false,
        },
        Some('.') => matches!(b, Some(d) if d.is_ascii_digit()),
        Some(d) => d.is_ascii_digit(),
        None => false,
    }
}

pub struct Tokenizer {
    input: Vec<char>,
    pos: usize,
}

impl Tokenizer {
    pub fn new(input: &str) -> Self {
        // Preprocessing: normalize newlines, replace NUL.
        let normalized = input.replace("\r\n", "\n").replace(['\r', '\x0C'], "\n");
        Self {
            input: normalized
                .chars()
                .map(|c| if c == '\0' { '\u{FFFD}' } else { c })
                .collect(),
            pos: 0,
        }
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.input.get(self.pos + offset).copied()
    }

    fn peek(&self) -> Option<char> {
        self.peek_at(0)
    }

    fn consume(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn reconsume(&mut self) {
        self.pos = self.pos.saturating_sub(1);
    }

    pub fn next_token(&mut self) -> Option<CssToken> {
        self.consume_comments();
        let c = self.consume()?;
        let token = match c {
            c if is_css_whitespace(c) => {
                while self.peek().is_some_and(is_css_whitespace) {
                    self.pos += 1;
                }
                CssToken::Whitespace
            }
            '"' | '\'' => self.consume_string(c),
            '#' => {
                if self.peek().is_some_and(is_name) || is_valid_escape(self.peek(), self.peek_at(1))
                {
                    let is_id = would_start_identifier(self.peek(), self.peek_at(1), self.peek_at(2));
                    let value = self.consume_ident_sequence();
                    CssToken::Hash { value, is_id }
                } else {
                    CssToken::Delim('#')
                }
            }
            '(' => CssToken::LeftParen,
            ')' => CssToken::RightParen,
            '+' | '.' => {
                if starts_number(Some(c), self.peek(), self.peek_at(1)) {
                    self.reconsume();
                    self.consume_numeric()
                } else {
                    CssToken::Delim(c)
                }
            }
            ',' => CssToken::Comma,
            '-' => {
                if starts_number(Some(c), self.peek(), self.peek_at(1)) {
                    self.reconsume();
                    self.consume_numeric()
                } else if self.peek() == Some('-') && self.peek_at(1) == Some('>') {
                    self.pos += 2;
                    CssToken::Cdc
                } else if would_start_identifier(Some(c), self.peek(), self.peek_at(1)) {
                    self.reconsume();
                    self.consume_ident_like()
                } else {
                    CssToken::Delim('-')
                }
            }
            ':' => CssToken::Colon,
            ';' => CssToken::Semicolon,
            '<' => {
                if self.peek() == Some('!') && self.peek_at(1) == Some('-') && self.peek_at(2) == Some('-')
                {
                    self.pos += 3;
                    CssToken::Cdo
                } else {
                    CssToken::Delim('<')
                }
            }
            '@' => {
                if would_start_identifier(self.peek(), self.peek_at(1), self.peek_at(2)) {
                    CssToken::AtKeyword(self.consume_ident_sequence())
                } else {
                    CssToken::Delim('@')
                }
            }
            '[' => CssToken::LeftBracket,
            '\\' => {
                if is_valid_escape(Some(c), self.peek()) {
                    self.reconsume();
                    self.consume_ident_like()
                } else {
                    CssToken::Delim('\\')
                }
            }
            ']' => CssToken::RightBracket,
            '{' => CssToken::LeftBrace,
            '}' => CssToken::RightBrace,
            d if d.is_ascii_digit() => {
                self.reconsume();
                self.consume_numeric()
            }
            n if is_name_start(n) => {
                self.reconsume();
                self.consume_ident_like()
            }
            other => CssToken::Delim(other),
        };
        Some(token)
    }

    fn consume_comments(&mut self) {
        while self.peek() == Some('/') && self.peek_at(1) == Some('*') {
            self.pos += 2;
            loop {
                match self.consume() {
                    Some('*') if self.peek() == Some('/') => {
                        self.pos += 1;
                        break;
                    }
                    Some(_) => {}
                    None => return,
                }
            }
        }
    }

    fn consume_string(&mut self, ending: char) -> CssToken {
        let mut value = String::new();
        loop {
            match self.consume() {
                Some(c) if c == ending => return CssToken::String(value),
                None => return CssToken::String(value),
                Some('\n') => {
                    self.reconsume();
                    return CssToken::BadString;
                }
                Some('\\') => match self.peek() {
                    None => {}
                    Some('\n') => self.pos += 1,
                    Some(_) => value.push(self.consume_escaped()),
                },
                Some(c) => value.push(c),
            }
        }
    }

    /// Assumes the backslash has been consumed.
    fn consume_escaped(&mut self) -> char {
        let Some(c) = self.consume() else {
            return '\u{FFFD}';
        };
        if !c.is_ascii_hexdigit() {
            return c;
        }
        let mut hex = String::from(c);
        while hex.len() < 6 && self.peek().is_some_and(|h| h.is_ascii_hexdigit()) {
            hex.push(self.consume().unwrap_or('0'));
        }
        if self.peek().is_some_and(is_css_whitespace) {
            self.pos += 1;
        }
        let code = u32::from_str_radix(&hex, 16).unwrap_or(0xFFFD);
        match char::from_u32(code) {
            Some(ch) if code != 0 => ch,
            _ => '\u{FFFD}',
        }
    }

    fn consume_ident_sequence(&mut self) -> String {
        let mut out = String::new();
        loop {
            match self.peek() {
                Some(c) if is_name(c) => {
                    out.push(c);
                    self.pos += 1;
                }
                Some('\\') if is_valid_escape(Some('\\'), self.peek_at(1)) => {
                    self.pos += 1;
                    out.push(self.consume_escaped());
                }
                _ => return out,
            }
        }
    }

    fn consume_number(&mut self) -> (f32, bool) {
        let mut repr = String::new();
        let mut integer = true;
        if matches!(self.peek(), Some('+') | Some('-')) {
            repr.push(self.consume().unwrap_or('+'));
        }
        self.consume_digits(&mut repr);
        if self.peek() == Some('.') && self.peek_at(1).is_some_and(|d| d.is_ascii_digit()) {
            integer = false;
            repr.push('.');
            self.pos += 1;
            self.consume_digits(&mut repr);
        }
        if matches!(self.peek(), Some('e') | Some('E')) {
            let sign = matches!(self.peek_at(1), Some('+') | Some('-'));
            let digit_at = if sign { 2 } else { 1 };
            if self.peek_at(digit_at).is_some_and(|d| d.is_ascii_digit()) {
                integer = false;
                repr.push('e');
                self.pos += 1;
                if sign {
                    repr.push(self.consume().unwrap_or('+'));
                }
                self.consume_digits(&mut repr);
            }
        }
        (repr.parse::<f32>().unwrap_or(0.0), integer)
    }

    fn consume_digits(&mut self, out: &mut String) {
        while let Some(d) = self.peek().filter(|d| d.is_ascii_digit()) {
            out.push(d);
            self.pos += 1;
        }
    }

    fn consume_numeric(&mut self) -> CssToken {
        let (value, _integer) = self.consume_number();
        if would_start_identifier(self.peek(), self.peek_at(1), self.peek_at(2)) {
            let unit = self.consume_ident_sequence();
            CssToken::Dimension { value, unit }
        } else if self.peek() == Some('%') {
            self.pos += 1;
            CssToken::Percentage(value)
        } else {
            CssToken::Number(value)
        }
    }

    fn consume_ident_like(&mut self) -> CssToken {
        let name = self.consume_ident_sequence();
        if name.eq_ignore_ascii_case("url") && self.peek() == Some('(') {
            self.pos += 1;
            while self.peek().is_some_and(is_css_whitespace)
                && self.peek_at(1).is_some_and(is_css_whitespace)
            {
                self.pos += 1;
            }
            let next = if self.peek().is_some_and(is_css_whitespace) {
                self.peek_at(1)
            } else {
                self.peek()
            };
            if matches!(next, Some('"') | Some('\'')) {
                return CssToken::Function(name);
            }
            return self.consume_url();
        }
        if self.peek() == Some('(') {
            self.pos += 1;
            return CssToken::Function(name);
        }
        CssToken::Ident(name)
    }

    fn consume_url(&mut self) -> CssToken {
        let mut value = String::new();
        while self.peek().is_some_and(is_css_whitespace) {
            self.pos += 1;
        }
        loop {
            match self.consume() {
                Some(')') | None => return CssToken::Url(value),
                Some(c) if is_css_whitespace(c) => {
                    while self.peek().is_some_and(is_css_whitespace) {
                        self.pos += 1;
                    }
                    if matches!(self.peek(), Some(')') | None) {
                        self.pos += usize::from(self.peek().is_some());
                        return CssToken::Url(value);
                    }
                    self.consume_bad_url_remnants();
                    return CssToken::BadUrl;
                }
                Some('"') | Some('\'') | Some('(') => {
                    self.consume_bad_url_remnants();
                    return CssToken::BadUrl;
                }
                Some('\\') => {
                    if is_valid_escape(Some('\\'), self.peek()) {
                        value.push(self.consume_escaped());
                    } else {
                        self.consume_bad_url_remnants();
                        return CssToken::BadUrl;
                    }
                }
                Some(c) => value.push(c),
            }
        }
    }

    fn consume_bad_url_remnants(&mut self) {
        loop {
            match self.consume() {
                Some(')') | None => return,
                Some('\\') if is_valid_escape(Some('\\'), self.peek()) => {
                    let _ = self.consume_escaped();
                }
                Some(_) => {}
            }
        }
    }
}

impl Iterator for Tokenizer {
    type Item = CssToken;

    fn next(&mut self) -> Option<CssToken> {
        self.next_token()
    }
}

pub fn tokenize(input: &str) -> Vec<CssToken> {
    Tokenizer::new(input).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idents_hashes_and_punctuation() {
        let tokens = tokenize("#main .a:hover{color:red}");
        assert_eq!(
            tokens,
            vec![
                CssToken::Hash {
                    value: "main".into(),
                    is_id: true
                },
                CssToken::Whitespace,
                CssToken::Delim('.'),
                CssToken::Ident("a".into()),
                CssToken::Colon,
                CssToken::Ident("hover".into()),
                CssToken::LeftBrace,
                CssToken::Ident("color".into()),
                CssToken::Colon,
                CssToken::Ident("red".into()),
                CssToken::RightBrace,
            ]
        );
    }

    #[test]
    fn numeric_forms() {
        let tokens = tokenize("12px -1.5em 50% +3 .5 1e2");
        let numeric: Vec<CssToken> = tokens
            .into_iter()
            .filter(|t| *t != CssToken::Whitespace)
            .collect();
        assert_eq!(
            numeric,
            vec![
                CssToken::Dimension {
                    value: 12.0,
                    unit: "px".into()
                },
                CssToken::Dimension {
                    value: -1.5,
                    unit: "em".into()
                },
                CssToken::Percentage(50.0),
                CssToken::Number(3.0),
                CssToken::Number(0.5),
                CssToken::Number(100.0),
            ]
        );
    }

    #[test]
    fn hash_starting_with_digit_is_not_an_id() {
        let tokens = tokenize("#1a2b3c");
        assert!(
            matches!(&tokens[0], CssToken::Hash { value, is_id: false } if value == "1a2b3c"),
            "got: {tokens:?}"
        );
    }

    #[test]
    fn comments_are_skipped_and_unterminated_comment_ends_input() {
        assert_eq!(
            tokenize("a/* x */b /* open"),
            vec![
                CssToken::Ident("a".into()),
                CssToken::Ident("b".into()),
                CssToken::Whitespace
            ]
        );
    }

    #[test]
    fn strings_urls_and_bad_tokens() {
        let tokens = tokenize("'it\\'s' url( a.png ) url(b c) \"line\nbreak\"");
        assert_eq!(tokens[0], CssToken::String("it's".into()));
        assert!(tokens.contains(&CssToken::Url("a.png".into())), "got: {tokens:?}");
        assert!(tokens.contains(&CssToken::BadUrl), "got: {tokens:?}");
        assert!(tokens.contains(&CssToken::BadString), "got: {tokens:?}");
    }

    #[test]
    fn escapes_in_identifiers() {
        assert_eq!(tokenize("\\31 0"), vec![CssToken::Ident("10".into())]);
    }

    #[test]
    fn cdo_cdc_and_functions() {
        let tokens = tokenize("<!-- rgb(1,2,3) -->");
        assert_eq!(tokens[0], CssToken::Cdo);
        assert_eq!(tokens[2], CssToken::Function("rgb".into()));
        assert_eq!(tokens.last(), Some(&CssToken::Cdc));
    }
}
