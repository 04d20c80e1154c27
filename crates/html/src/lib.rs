//! Markup parsing: tokenizer, tree builder and the arena document they produce.
//!
//! ```text
//! bytes -> Tokenizer -> Token -> TreeBuilder -> Document
//! ```

pub mod dom;
pub mod head;
pub mod token;
pub mod tokenizer;
pub mod traverse;
pub mod tree_builder;

mod entities;

use memchr::{memchr, memchr2};

pub use dom::{Document, ElementData, Node, NodeData, NodeId};
pub use token::{Attribute, Tag, Token};
pub use tokenizer::{RawKind, State as TokenizerState, Tokenizer, TokenizerStats, tokenize};
pub use tree_builder::{
    InsertionMode, TreeBuilder, TreeBuilderConfig, VOID_ELEMENTS, parse, parse_with_config,
};

/// Whether a `Content-Type` header value denotes an HTML document.
pub fn is_html(ct: &Option<String>) -> bool {
    let Some(value) = ct.as_deref() else {
        return false;
    };
    contains_ignore_ascii_case(value, b"text/html")
        || contains_ignore_ascii_case(value, b"application/xhtml")
}

pub(crate) fn contains_ignore_ascii_case(haystack: &str, needle: &[u8]) -> bool {
    let hay = haystack.as_bytes();
    let n = needle.len();
    if n == 0 {
        return true;
    }
    if hay.len() < n {
        return false;
    }
    let first = needle[0];
    let (a, b) = (first.to_ascii_lowercase(), first.to_ascii_uppercase());
    let mut i = 0;
    while i + n <= hay.len() {
        let rel = if a == b {
            memchr(a, &hay[i..])
        } else {
            memchr2(a, b, &hay[i..])
        };
        let Some(rel) = rel else {
            return false;
        };
        let pos = i + rel;
        if pos + n <= hay.len() && hay[pos..pos + n].eq_ignore_ascii_case(needle) {
            return true;
        }
        i = pos + 1;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_sniffing() {
        assert!(is_html(&Some("Text/HTML; charset=utf-8".to_string())));
        assert!(is_html(&Some("application/xhtml+xml".to_string())));
        assert!(!is_html(&Some("text/css".to_string())));
        assert!(!is_html(&None));
    }
}
