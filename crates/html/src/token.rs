//! Markup tokens produced by [`crate::Tokenizer`].
//!
//! Tokens are created per scan step and consumed immediately by the tree
//! builder; nothing downstream retains them.
//!
//! Duplicate attribute policy: within one start tag the first occurrence of an
//! attribute name wins and later duplicates are dropped at scan time, so the
//! attribute list carried by a tag never contains repeated names.

use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Start or end tag payload. Names are ASCII-lowercased on ingestion.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Tag {
    pub name: String,
    pub attributes: Vec<Attribute>,
    pub self_closing: bool,
}

impl Tag {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attr| attr.name == name)
            .map(|attr| attr.value.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
    Doctype { name: Option<String> },
    StartTag(Tag),
    EndTag(Tag),
    Character(char),
    Comment(String),
    Eof,
}

impl Token {
    pub fn is_eof(&self) -> bool {
        matches!(self, Token::Eof)
    }

    /// True for the HTML whitespace set (tab, LF, FF, CR, space).
    pub fn is_whitespace_char(&self) -> bool {
        matches!(self, Token::Character(c) if is_html_whitespace(*c))
    }

    pub fn is_start_tag(&self, name: &str) -> bool {
        matches!(self, Token::StartTag(tag) if tag.name == name)
    }

    pub fn is_end_tag(&self, name: &str) -> bool {
        matches!(self, Token::EndTag(tag) if tag.name == name)
    }
}

pub(crate) fn is_html_whitespace(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\x0C' | '\r' | ' ')
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Doctype { name } => {
                write!(f, "DOCTYPE {}", name.as_deref().unwrap_or(""))
            }
            Token::StartTag(tag) => {
                write!(f, "START {}", tag.name)?;
                for attr in &tag.attributes {
                    write!(f, " {}=\"{}\"", attr.name, attr.value)?;
                }
                if tag.self_closing {
                    write!(f, " /")?;
                }
                Ok(())
            }
            Token::EndTag(tag) => write!(f, "END {}", tag.name),
            Token::Character(c) => write!(f, "CHAR {c:?}"),
            Token::Comment(text) => write!(f, "COMMENT {text:?}"),
            Token::Eof => write!(f, "EOF"),
        }
    }
}
