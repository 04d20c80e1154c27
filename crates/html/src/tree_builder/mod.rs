//! Tree construction over insertion modes.
//!
//! Each mode handler returns a [`Step`]: either the token was handled, or it
//! must be reprocessed under another mode. [`TreeBuilder::process`] drives that
//! loop, which is how implied `<html>`, `<head>` and `<body>` elements are
//! synthesized without re-entering the handler recursively.
//!
//! The builder never fails: malformed markup always yields a best-effort tree
//! with exactly one root.

use crate::dom::{Document, NodeId};
use crate::token::{Tag, Token};
use crate::tokenizer::{RawKind, State, Tokenizer};

mod modes;
mod stack;
#[cfg(test)]
mod tests;

pub use modes::InsertionMode;
use stack::{OpenElementsStack, ScopeKind};

/// Tree builder configuration.
#[derive(Clone, Debug)]
pub struct TreeBuilderConfig {
    /// Maximum depth of the open-element stack. Start tags beyond it are
    /// inserted as children of the deepest open element without being opened.
    pub max_depth: usize,
}

impl Default for TreeBuilderConfig {
    fn default() -> Self {
        Self { max_depth: 512 }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Step {
    Done,
    Reprocess(InsertionMode),
}

const HEAD_CONTENT: &[&str] = &[
    "base", "basefont", "bgsound", "link", "meta", "noframes", "script", "style", "title",
];

const BLOCK_CONTAINERS: &[&str] = &[
    "address", "article", "aside", "blockquote", "center", "details", "dialog", "dir", "div",
    "dl", "fieldset", "figcaption", "figure", "footer", "header", "hgroup", "main", "menu",
    "nav", "ol", "p", "section", "summary", "ul",
];

const BLOCK_END_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "button", "center", "details", "dialog",
    "dir", "div", "dl", "fieldset", "figcaption", "figure", "footer", "form", "header",
    "hgroup", "listing", "main", "menu", "nav", "ol", "pre", "section", "summary", "ul",
];

const HEADINGS: &[&str] = &["h1", "h2", "h3", "h4", "h5", "h6"];

pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "basefont", "bgsound", "br", "col", "embed", "hr", "img", "input", "keygen",
    "link", "meta", "param", "source", "track", "wbr",
];

const IMPLIED_END_TAGS: &[&str] = &[
    "dd", "dt", "li", "optgroup", "option", "p", "rb", "rp", "rt", "rtc",
];

const SPECIAL: &[&str] = &[
    "address", "applet", "area", "article", "aside", "base", "basefont", "bgsound",
    "blockquote", "body", "br", "button", "caption", "center", "col", "colgroup", "dd",
    "details", "dir", "div", "dl", "dt", "embed", "fieldset", "figcaption", "figure", "footer",
    "form", "frame", "frameset", "h1", "h2", "h3", "h4", "h5", "h6", "head", "header", "hgroup",
    "hr", "html", "iframe", "img", "input", "li", "link", "listing", "main", "marquee", "menu",
    "meta", "nav", "noembed", "noframes", "noscript", "object", "ol", "p", "param", "plaintext",
    "pre", "script", "section", "select", "source", "style", "summary", "table", "tbody", "td",
    "template", "textarea", "tfoot", "th", "thead", "title", "tr", "track", "ul", "wbr", "xmp",
];

pub struct TreeBuilder {
    doc: Document,
    config: TreeBuilderConfig,
    mode: InsertionMode,
    original_mode: InsertionMode,
    open: OpenElementsStack,
    head: Option<NodeId>,
    tokenizer_switch: Option<State>,
    stopped: bool,
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new(TreeBuilderConfig::default())
    }
}

impl TreeBuilder {
    pub fn new(config: TreeBuilderConfig) -> Self {
        Self {
            doc: Document::new(),
            config,
            mode: InsertionMode::Initial,
            original_mode: InsertionMode::Initial,
            open: OpenElementsStack::default(),
            head: None,
            tokenizer_switch: None,
            stopped: false,
        }
    }

    pub fn mode(&self) -> InsertionMode {
        self.mode
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Deepest the open-element stack has been.
    pub fn max_depth(&self) -> usize {
        self.open.max_depth()
    }

    /// Content-model switch the tokenizer must apply before the next token.
    pub fn take_tokenizer_switch(&mut self) -> Option<State> {
        self.tokenizer_switch.take()
    }

    pub fn finish(mut self) -> Document {
        if !self.stopped {
            self.process(&Token::Eof);
        }
        self.doc.set_needs_reflow();
        self.doc
    }

    pub fn process(&mut self, token: &Token) {
        if self.stopped {
            return;
        }
        let mut mode = self.mode;
        loop {
            let step = match mode {
                InsertionMode::Initial => self.handle_initial(token),
                InsertionMode::BeforeHtml => self.handle_before_html(token),
                InsertionMode::BeforeHead => self.handle_before_head(token),
                InsertionMode::InHead => self.handle_in_head(token),
                InsertionMode::AfterHead => self.handle_after_head(token),
                InsertionMode::InBody => self.handle_in_body(token),
                InsertionMode::Text => self.handle_text(token),
                InsertionMode::AfterBody => self.handle_after_body(token),
                InsertionMode::AfterAfterBody => self.handle_after_after_body(token),
            };
            match step {
                Step::Done => break,
                Step::Reprocess(next) => {
                    self.switch_mode(next);
                    mode = next;
                }
            }
        }
    }

    fn switch_mode(&mut self, next: InsertionMode) {
        if self.mode != next {
            log::trace!(target: "html.tree_builder", "mode {:?} -> {:?}", self.mode, next);
            self.mode = next;
        }
    }

    fn insertion_point(&self) -> NodeId {
        self.open.current_node().unwrap_or(self.doc.root())
    }

    fn create_element_for(&mut self, tag: &Tag) -> NodeId {
        let id = self.doc.create_element(tag.name.as_str());
        if let Some(el) = self.doc.element_mut(id) {
            for attr in &tag.attributes {
                el.set_attribute(attr.name.as_str(), attr.value.as_str());
            }
        }
        id
    }

    /// Insert an element at the current insertion point and open it.
    fn insert_element(&mut self, tag: &Tag) -> NodeId {
        let id = self.create_element_for(tag);
        let parent = self.insertion_point();
        self.doc.append_child(parent, id);
        if self.open.len() < self.config.max_depth {
            self.open.push(id, &tag.name);
        } else {
            log::debug!(
                target: "html.tree_builder",
                "open-element stack at limit {}; <{}> inserted without opening",
                self.config.max_depth,
                tag.name
            );
        }
        id
    }

    fn insert_synthetic(&mut self, name: &str) -> NodeId {
        self.insert_element(&Tag {
            name: name.to_string(),
            ..Tag::default()
        })
    }

    fn insert_void(&mut self, tag: &Tag) {
        let id = self.create_element_for(tag);
        let parent = self.insertion_point();
        self.doc.append_child(parent, id);
    }

    fn insert_char(&mut self, c: char) {
        let parent = self.insertion_point();
        if parent == self.doc.root() {
            return;
        }
        let mut buf = [0u8; 4];
        self.doc.append_text(parent, c.encode_utf8(&mut buf));
    }

    /// Raw text elements are opened even at the depth limit: Text mode
    /// always closes them again before anything else is inserted.
    fn start_raw_text(&mut self, tag: &Tag, kind: RawKind) -> Step {
        let id = self.create_element_for(tag);
        let parent = self.insertion_point();
        self.doc.append_child(parent, id);
        self.open.push(id, &tag.name);
        self.tokenizer_switch = Some(State::for_raw(kind));
        self.original_mode = self.mode;
        self.switch_mode(InsertionMode::Text);
        Step::Done
    }

    /// Copy attributes missing on an open `html`/`body` element from `tag`.
    fn merge_attributes(&mut self, name: &str, tag: &Tag) {
        let Some(node) = self
            .open
            .iter_from_top()
            .find(|e| e.name == name)
            .map(|e| e.node)
        else {
            return;
        };
        if let Some(el) = self.doc.element_mut(node) {
            for attr in &tag.attributes {
                if !el.has_attribute(&attr.name) {
                    el.set_attribute(attr.name.as_str(), attr.value.as_str());
                }
            }
        }
    }

    fn generate_implied_end_tags(&mut self, except: Option<&str>) {
        while let Some(current) = self.open.current() {
            let name = current.name.as_str();
            if Some(name) == except || !IMPLIED_END_TAGS.contains(&name) {
                break;
            }
            self.open.pop();
        }
    }

    fn close_p_element(&mut self) {
        if self.open.has_in_scope("p", ScopeKind::Button) {
            self.generate_implied_end_tags(Some("p"));
            self.open.pop_until_including("p", ScopeKind::Button);
        }
    }

    fn handle_initial(&mut self, token: &Token) -> Step {
        match token {
            t if t.is_whitespace_char() => Step::Done,
            Token::Comment(_) => Step::Done,
            Token::Doctype { name } => {
                self.doc.set_doctype(name.clone());
                self.switch_mode(InsertionMode::BeforeHtml);
                Step::Done
            }
            _ => Step::Reprocess(InsertionMode::BeforeHtml),
        }
    }

    fn handle_before_html(&mut self, token: &Token) -> Step {
        match token {
            t if t.is_whitespace_char() => Step::Done,
            Token::Comment(_) | Token::Doctype { .. } => Step::Done,
            Token::StartTag(tag) if tag.name == "html" => {
                self.insert_element(tag);
                self.switch_mode(InsertionMode::BeforeHead);
                Step::Done
            }
            Token::EndTag(tag) if !matches!(tag.name.as_str(), "head" | "body" | "html" | "br") => {
                Step::Done
            }
            _ => {
                self.insert_synthetic("html");
                Step::Reprocess(InsertionMode::BeforeHead)
            }
        }
    }

    fn handle_before_head(&mut self, token: &Token) -> Step {
        match token {
            t if t.is_whitespace_char() => Step::Done,
            Token::Comment(_) | Token::Doctype { .. } => Step::Done,
            Token::StartTag(tag) if tag.name == "html" => {
                self.merge_attributes("html", tag);
                Step::Done
            }
            Token::StartTag(tag) if tag.name == "head" => {
                self.head = Some(self.insert_element(tag));
                self.switch_mode(InsertionMode::InHead);
                Step::Done
            }
            Token::EndTag(tag) if !matches!(tag.name.as_str(), "head" | "body" | "html" | "br") => {
                Step::Done
            }
            _ => {
                self.head = Some(self.insert_synthetic("head"));
                Step::Reprocess(InsertionMode::InHead)
            }
        }
    }

    fn handle_in_head(&mut self, token: &Token) -> Step {
        match token {
            // Whitespace before body content is not kept in the tree.
            t if t.is_whitespace_char() => Step::Done,
            Token::Comment(_) | Token::Doctype { .. } => Step::Done,
            Token::StartTag(tag) => match tag.name.as_str() {
                "html" => {
                    self.merge_attributes("html", tag);
                    Step::Done
                }
                "base" | "basefont" | "bgsound" | "link" | "meta" => {
                    self.insert_void(tag);
                    Step::Done
                }
                "title" => self.start_raw_text(tag, RawKind::RcData),
                "noframes" | "style" | "noscript" => self.start_raw_text(tag, RawKind::RawText),
                "script" => self.start_raw_text(tag, RawKind::ScriptData),
                "head" => Step::Done,
                _ => self.leave_head(),
            },
            Token::EndTag(tag) => match tag.name.as_str() {
                "head" => {
                    self.open.pop();
                    self.switch_mode(InsertionMode::AfterHead);
                    Step::Done
                }
                "body" | "html" | "br" => self.leave_head(),
                _ => Step::Done,
            },
            _ => self.leave_head(),
        }
    }

    fn leave_head(&mut self) -> Step {
        if self.open.current_is("head") {
            self.open.pop();
        }
        Step::Reprocess(InsertionMode::AfterHead)
    }

    fn handle_after_head(&mut self, token: &Token) -> Step {
        match token {
            t if t.is_whitespace_char() => Step::Done,
            Token::Comment(_) | Token::Doctype { .. } => Step::Done,
            Token::StartTag(tag) if tag.name == "html" => {
                self.merge_attributes("html", tag);
                Step::Done
            }
            Token::StartTag(tag) if tag.name == "body" => {
                self.insert_element(tag);
                self.switch_mode(InsertionMode::InBody);
                Step::Done
            }
            Token::StartTag(tag) if HEAD_CONTENT.contains(&tag.name.as_str()) => {
                // Late head content goes back into <head>.
                let Some(head) = self.head else {
                    return self.handle_in_head(token);
                };
                self.open.push(head, "head");
                let step = self.handle_in_head(token);
                self.open.remove_node(head);
                step
            }
            Token::StartTag(tag) if tag.name == "head" => Step::Done,
            Token::EndTag(tag) if !matches!(tag.name.as_str(), "body" | "html" | "br") => Step::Done,
            _ => {
                self.insert_synthetic("body");
                Step::Reprocess(InsertionMode::InBody)
            }
        }
    }

    fn handle_in_body(&mut self, token: &Token) -> Step {
        match token {
            Token::Character('\0') => Step::Done,
            Token::Character(c) => {
                self.insert_char(*c);
                Step::Done
            }
            Token::Comment(_) | Token::Doctype { .. } => Step::Done,
            Token::StartTag(tag) => self.in_body_start_tag(tag, token),
            Token::EndTag(tag) => self.in_body_end_tag(tag),
            Token::Eof => {
                self.stopped = true;
                Step::Done
            }
        }
    }

    fn in_body_start_tag(&mut self, tag: &Tag, token: &Token) -> Step {
        let name = tag.name.as_str();
        match name {
            "html" => self.merge_attributes("html", tag),
            "body" => self.merge_attributes("body", tag),
            _ if HEAD_CONTENT.contains(&name) => return self.handle_in_head(token),
            _ if BLOCK_CONTAINERS.contains(&name) => {
                self.close_p_element();
                self.insert_element(tag);
            }
            _ if HEADINGS.contains(&name) => {
                self.close_p_element();
                if self
                    .open
                    .current()
                    .is_some_and(|e| HEADINGS.contains(&e.name.as_str()))
                {
                    self.open.pop();
                }
                self.insert_element(tag);
            }
            "pre" | "listing" | "form" | "table" => {
                self.close_p_element();
                self.insert_element(tag);
            }
            "li" => {
                self.close_list_item(&["li"]);
                self.close_p_element();
                self.insert_element(tag);
            }
            "dd" | "dt" => {
                self.close_list_item(&["dd", "dt"]);
                self.close_p_element();
                self.insert_element(tag);
            }
            "button" => {
                if self.open.has_in_scope("button", ScopeKind::InScope) {
                    self.generate_implied_end_tags(None);
                    self.open.pop_until_including("button", ScopeKind::InScope);
                }
                self.insert_element(tag);
            }
            "hr" => {
                self.close_p_element();
                self.insert_void(tag);
            }
            "textarea" => return self.start_raw_text(tag, RawKind::RcData),
            "xmp" | "iframe" | "noembed" => {
                self.close_p_element();
                return self.start_raw_text(tag, RawKind::RawText);
            }
            _ if VOID_ELEMENTS.contains(&name) => self.insert_void(tag),
            _ => {
                self.insert_element(tag);
            }
        }
        Step::Done
    }

    /// Close an open `li` (or `dd`/`dt`) before a new one starts.
    fn close_list_item(&mut self, names: &[&str]) {
        let mut target = None;
        for entry in self.open.iter_from_top() {
            let name = entry.name.as_str();
            if names.contains(&name) {
                target = Some((entry.node, entry.name.clone()));
                break;
            }
            if SPECIAL.contains(&name) && !matches!(name, "address" | "div" | "p") {
                break;
            }
        }
        if let Some((node, name)) = target {
            self.generate_implied_end_tags(Some(&name));
            self.open.pop_until_node(node);
        }
    }

    fn in_body_end_tag(&mut self, tag: &Tag) -> Step {
        let name = tag.name.as_str();
        match name {
            "body" => {
                if self.open.has_in_scope("body", ScopeKind::InScope) {
                    self.switch_mode(InsertionMode::AfterBody);
                }
                Step::Done
            }
            "html" => {
                if self.open.has_in_scope("body", ScopeKind::InScope) {
                    Step::Reprocess(InsertionMode::AfterBody)
                } else {
                    Step::Done
                }
            }
            "p" => {
                if !self.open.has_in_scope("p", ScopeKind::Button) {
                    self.insert_synthetic("p");
                }
                self.close_p_element();
                Step::Done
            }
            "li" => {
                if self.open.has_in_scope("li", ScopeKind::ListItem) {
                    self.generate_implied_end_tags(Some("li"));
                    self.open.pop_until_including("li", ScopeKind::ListItem);
                }
                Step::Done
            }
            "dd" | "dt" => {
                if self.open.has_in_scope(name, ScopeKind::InScope) {
                    self.generate_implied_end_tags(Some(name));
                    self.open.pop_until_including(name, ScopeKind::InScope);
                }
                Step::Done
            }
            _ if HEADINGS.contains(&name) => {
                let open_heading = HEADINGS
                    .iter()
                    .find(|h| self.open.has_in_scope(h, ScopeKind::InScope))
                    .copied();
                if open_heading.is_some() {
                    self.generate_implied_end_tags(None);
                    while let Some(popped) = self.open.pop() {
                        if HEADINGS.contains(&popped.name.as_str()) {
                            break;
                        }
                    }
                }
                Step::Done
            }
            _ if BLOCK_END_TAGS.contains(&name) => {
                if self.open.has_in_scope(name, ScopeKind::InScope) {
                    self.generate_implied_end_tags(None);
                    self.open.pop_until_including(name, ScopeKind::InScope);
                }
                Step::Done
            }
            "br" => {
                // `</br>` is treated as `<br>`.
                self.insert_void(&Tag {
                    name: "br".to_string(),
                    ..Tag::default()
                });
                Step::Done
            }
            _ => {
                self.any_other_end_tag(name);
                Step::Done
            }
        }
    }

    fn any_other_end_tag(&mut self, name: &str) {
        let mut target = None;
        for entry in self.open.iter_from_top() {
            if entry.name == name {
                target = Some(entry.node);
                break;
            }
            if SPECIAL.contains(&entry.name.as_str()) {
                log::trace!(target: "html.tree_builder", "ignoring stray </{name}>");
                return;
            }
        }
        if let Some(node) = target {
            self.generate_implied_end_tags(Some(name));
            self.open.pop_until_node(node);
        }
    }

    fn handle_text(&mut self, token: &Token) -> Step {
        match token {
            Token::Character(c) => {
                self.insert_char(*c);
                Step::Done
            }
            Token::Eof => {
                self.open.pop();
                Step::Reprocess(self.original_mode)
            }
            Token::EndTag(_) => {
                self.open.pop();
                self.switch_mode(self.original_mode);
                Step::Done
            }
            _ => Step::Done,
        }
    }

    fn handle_after_body(&mut self, token: &Token) -> Step {
        match token {
            t if t.is_whitespace_char() => self.handle_in_body(token),
            Token::Comment(_) | Token::Doctype { .. } => Step::Done,
            Token::StartTag(tag) if tag.name == "html" => self.handle_in_body(token),
            Token::EndTag(tag) if tag.name == "html" => {
                self.switch_mode(InsertionMode::AfterAfterBody);
                Step::Done
            }
            Token::Eof => {
                self.stopped = true;
                Step::Done
            }
            _ => Step::Reprocess(InsertionMode::InBody),
        }
    }

    fn handle_after_after_body(&mut self, token: &Token) -> Step {
        match token {
            Token::Comment(_) | Token::Doctype { .. } => Step::Done,
            t if t.is_whitespace_char() => self.handle_in_body(token),
            Token::StartTag(tag) if tag.name == "html" => self.handle_in_body(token),
            Token::Eof => {
                self.stopped = true;
                Step::Done
            }
            _ => Step::Reprocess(InsertionMode::InBody),
        }
    }
}

/// Parse a complete document with the default configuration.
pub fn parse(input: &str) -> Document {
    parse_with_config(input, TreeBuilderConfig::default())
}

pub fn parse_with_config(input: &str, config: TreeBuilderConfig) -> Document {
    let mut tokenizer = Tokenizer::new(input);
    let mut builder = TreeBuilder::new(config);
    while let Some(token) = tokenizer.next_token() {
        builder.process(&token);
        if let Some(state) = builder.take_tokenizer_switch() {
            tokenizer.switch_to(state);
        }
        if builder.is_stopped() {
            break;
        }
    }
    builder.finish()
}
