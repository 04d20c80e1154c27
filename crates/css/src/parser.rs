//! Component-value grammar: tokens -> component values -> rules and declarations.
//!
//! Error recovery follows the usual CSS rules: a broken qualified rule is
//! skipped up to the end of its block, a broken declaration up to the next
//! semicolon. Nothing here returns an error.

use std::fmt;

use crate::tokenizer::{CssToken, tokenize};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockKind {
    Brace,
    Bracket,
    Paren,
}

impl BlockKind {
    fn from_open(token: &CssToken) -> Option<Self> {
        match token {
            CssToken::LeftBrace => Some(BlockKind::Brace),
            CssToken::LeftBracket => Some(BlockKind::Bracket),
            CssToken::LeftParen => Some(BlockKind::Paren),
            _ => None,
        }
    }

    fn closes(self, token: &CssToken) -> bool {
        matches!(
            (self, token),
            (BlockKind::Brace, CssToken::RightBrace)
                | (BlockKind::Bracket, CssToken::RightBracket)
                | (BlockKind::Paren, CssToken::RightParen)
        )
    }

    fn delimiters(self) -> (char, char) {
        match self {
            BlockKind::Brace => ('{', '}'),
            BlockKind::Bracket => ('[', ']'),
            BlockKind::Paren => ('(', ')'),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SimpleBlock {
    pub kind: BlockKind,
    pub values: Vec<ComponentValue>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FunctionValue {
    pub name: String,
    pub args: Vec<ComponentValue>,
}

impl FunctionValue {
    /// Arguments split on top-level commas, whitespace trimmed.
    pub fn arguments(&self) -> Vec<&[ComponentValue]> {
        self.args
            .split(|v| v.is_token(&CssToken::Comma))
            .map(trim_whitespace)
            .collect()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ComponentValue {
    Token(CssToken),
    Block(SimpleBlock),
    Function(FunctionValue),
}

impl ComponentValue {
    pub fn is_token(&self, token: &CssToken) -> bool {
        matches!(self, ComponentValue::Token(t) if t == token)
    }

    pub fn is_whitespace(&self) -> bool {
        self.is_token(&CssToken::Whitespace)
    }

    pub fn as_token(&self) -> Option<&CssToken> {
        match self {
            ComponentValue::Token(t) => Some(t),
            _ => None,
        }
    }
}

impl fmt::Display for ComponentValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComponentValue::Token(t) => write!(f, "{t}"),
            ComponentValue::Block(block) => {
                let (open, close) = block.kind.delimiters();
                write!(f, "{open}")?;
                for v in &block.values {
                    write!(f, "{v}")?;
                }
                write!(f, "{close}")
            }
            ComponentValue::Function(func) => {
                write!(f, "{}(", func.name)?;
                for v in &func.args {
                    write!(f, "{v}")?;
                }
                write!(f, ")")
            }
        }
    }
}

/// Renders component values back to text.
pub fn to_css_text(values: &[ComponentValue]) -> String {
    values.iter().map(|v| v.to_string()).collect()
}

pub fn trim_whitespace(values: &[ComponentValue]) -> &[ComponentValue] {
    let start = values
        .iter()
        .position(|v| !v.is_whitespace())
        .unwrap_or(values.len());
    let end = values
        .iter()
        .rposition(|v| !v.is_whitespace())
        .map_or(start, |i| i + 1);
    &values[start..end]
}

#[derive(Clone, Debug, PartialEq)]
pub struct QualifiedRule {
    pub prelude: Vec<ComponentValue>,
    pub block: Vec<ComponentValue>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AtRule {
    pub name: String,
    pub prelude: Vec<ComponentValue>,
    pub block: Option<Vec<ComponentValue>>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum RawRule {
    Qualified(QualifiedRule),
    At(AtRule),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Declaration {
    pub name: String,
    pub value: Vec<ComponentValue>,
    pub important: bool,
}

impl Declaration {
    pub fn value_text(&self) -> String {
        to_css_text(&self.value)
    }
}

/// Cursor over a flat token list.
struct TokenStream {
    tokens: Vec<CssToken>,
    pos: usize,
}

impl TokenStream {
    fn next(&mut self) -> Option<CssToken> {
        let t = self.tokens.get(self.pos).cloned();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn consume_component_value(&mut self, first: CssToken) -> ComponentValue {
        if let Some(kind) = BlockKind::from_open(&first) {
            return ComponentValue::Block(self.consume_simple_block(kind));
        }
        if let CssToken::Function(name) = first {
            return ComponentValue::Function(self.consume_function(name));
        }
        ComponentValue::Token(first)
    }

    fn consume_simple_block(&mut self, kind: BlockKind) -> SimpleBlock {
        let mut values = Vec::new();
        while let Some(token) = self.next() {
            if kind.closes(&token) {
                break;
            }
            values.push(self.consume_component_value(token));
        }
        SimpleBlock { kind, values }
    }

    fn consume_function(&mut self, name: String) -> FunctionValue {
        let mut args = Vec::new();
        while let Some(token) = self.next() {
            if token == CssToken::RightParen {
                break;
            }
            args.push(self.consume_component_value(token));
        }
        FunctionValue {
            name: name.to_ascii_lowercase(),
            args,
        }
    }

    fn consume_list_of_rules(&mut self, top_level: bool) -> Vec<RawRule> {
        let mut rules = Vec::new();
        while let Some(token) = self.next() {
            match token {
                CssToken::Whitespace => {}
                CssToken::Cdo | CssToken::Cdc if top_level => {}
                CssToken::AtKeyword(name) => rules.push(RawRule::At(self.consume_at_rule(name))),
                other => {
                    if let Some(rule) = self.consume_qualified_rule(other) {
                        rules.push(RawRule::Qualified(rule));
                    }
                }
            }
        }
        rules
    }

    fn consume_at_rule(&mut self, name: String) -> AtRule {
        let mut prelude = Vec::new();
        while let Some(token) = self.next() {
            match token {
                CssToken::Semicolon => break,
                CssToken::LeftBrace => {
                    let block = self.consume_simple_block(BlockKind::Brace);
                    return AtRule {
                        name: name.to_ascii_lowercase(),
                        prelude,
                        block: Some(block.values),
                    };
                }
                other => prelude.push(self.consume_component_value(other)),
            }
        }
        AtRule {
            name: name.to_ascii_lowercase(),
            prelude,
            block: None,
        }
    }

    fn consume_qualified_rule(&mut self, first: CssToken) -> Option<QualifiedRule> {
        let mut prelude = Vec::new();
        let mut token = Some(first);
        while let Some(t) = token {
            if t == CssToken::LeftBrace {
                let block = self.consume_simple_block(BlockKind::Brace);
                return Some(QualifiedRule {
                    prelude,
                    block: block.values,
                });
            }
            prelude.push(self.consume_component_value(t));
            token = self.next();
        }
        log::debug!(target: "css.parser", "qualified rule without a block dropped");
        None
    }
}

fn stream(text: &str) -> TokenStream {
    TokenStream {
        tokens: tokenize(text),
        pos: 0,
    }
}

/// Parses a stylesheet body into raw rules.
pub fn parse_rules(text: &str) -> Vec<RawRule> {
    stream(text).consume_list_of_rules(true)
}

/// Parses text into a flat list of component values.
pub fn parse_component_values(text: &str) -> Vec<ComponentValue> {
    let mut s = stream(text);
    let mut out = Vec::new();
    while let Some(token) = s.next() {
        out.push(s.consume_component_value(token));
    }
    out
}

/// Parses the contents of a declaration block (or a `style` attribute).
pub fn parse_declaration_list(values: &[ComponentValue]) -> Vec<Declaration> {
    let mut declarations = Vec::new();
    let mut i = 0;
    while i < values.len() {
        match &values[i] {
            ComponentValue::Token(CssToken::Whitespace | CssToken::Semicolon) => i += 1,
            ComponentValue::Token(CssToken::AtKeyword(name)) => {
                log::debug!(target: "css.parser", "at-rule @{name} inside declarations skipped");
                i = skip_past_semicolon(values, i);
            }
            ComponentValue::Token(CssToken::Ident(name)) => {
                let end = values[i..]
                    .iter()
                    .position(|v| v.is_token(&CssToken::Semicolon))
                    .map_or(values.len(), |p| i + p);
                match consume_declaration(name, &values[i + 1..end]) {
                    Some(decl) => declarations.push(decl),
                    None => log::debug!(
                        target: "css.parser",
                        "invalid declaration dropped: {}",
                        to_css_text(&values[i..end])
                    ),
                }
                i = end;
            }
            other => {
                log::debug!(target: "css.parser", "unexpected {other} in declaration list");
                i = skip_past_semicolon(values, i);
            }
        }
    }
    declarations
}

fn skip_past_semicolon(values: &[ComponentValue], from: usize) -> usize {
    values[from..]
        .iter()
        .position(|v| v.is_token(&CssToken::Semicolon))
        .map_or(values.len(), |p| from + p + 1)
}

fn consume_declaration(name: &str, rest: &[ComponentValue]) -> Option<Declaration> {
    let rest = trim_whitespace(rest);
    let (colon, value) = rest.split_first()?;
    if !colon.is_token(&CssToken::Colon) {
        return None;
    }
    let mut value = trim_whitespace(value);
    let mut important = false;

    // `! important` at the tail.
    if let Some((last, before)) = value.split_last() {
        if matches!(last, ComponentValue::Token(CssToken::Ident(word)) if word.eq_ignore_ascii_case("important"))
        {
            let before = trim_whitespace(before);
            if let Some((bang, head)) = before.split_last() {
                if bang.is_token(&CssToken::Delim('!')) {
                    important = true;
                    value = trim_whitespace(head);
                }
            }
        }
    }

    if value.is_empty() {
        return None;
    }
    Some(Declaration {
        name: name.to_ascii_lowercase(),
        value: value.to_vec(),
        important,
    })
}

/// Parses the text of a `style="..."` attribute.
pub fn parse_style_attribute(text: &str) -> Vec<Declaration> {
    parse_declaration_list(&parse_component_values(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rules_blocks_and_at_rules() {
        let rules = parse_rules("@import url(a.css); p { color: red } @media screen { b {} }");
        assert_eq!(rules.len(), 3, "got: {rules:?}");
        assert!(matches!(&rules[0], RawRule::At(at) if at.name == "import" && at.block.is_none()));
        assert!(matches!(&rules[1], RawRule::Qualified(q) if to_css_text(&q.prelude).trim() == "p"));
        assert!(matches!(&rules[2], RawRule::At(at) if at.name == "media" && at.block.is_some()));
    }

    #[test]
    fn rule_without_block_is_dropped() {
        let rules = parse_rules("p { a: b } div");
        assert_eq!(rules.len(), 1);
    }

    #[test]
    fn bad_declaration_does_not_invalidate_the_rest() {
        let decls = parse_style_attribute("color: red; 12px; width; margin: 0 auto ; height:");
        let names: Vec<&str> = decls.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["color", "margin"]);
        assert_eq!(decls[1].value_text(), "0 auto");
    }

    #[test]
    fn important_flag_is_split_off() {
        let decls = parse_style_attribute("COLOR: blue ! important; width: 1px");
        assert_eq!(decls[0].name, "color");
        assert!(decls[0].important);
        assert_eq!(decls[0].value_text(), "blue");
        assert!(!decls[1].important);
    }

    #[test]
    fn functions_capture_their_arguments() {
        let values = parse_component_values("rgb(1, 2 ,3)");
        let Some(ComponentValue::Function(func)) = values.first() else {
            panic!("expected function, got: {values:?}");
        };
        assert_eq!(func.name, "rgb");
        assert_eq!(func.arguments().len(), 3);
    }

    #[test]
    fn unclosed_block_runs_to_end_of_input() {
        let rules = parse_rules("p { color: red");
        let Some(RawRule::Qualified(rule)) = rules.first() else {
            panic!("expected rule, got: {rules:?}");
        };
        assert_eq!(parse_declaration_list(&rule.block).len(), 1);
    }
}
