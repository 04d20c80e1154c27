//! Markup tokenizer.
//!
//! The whole input is buffered up front; tokens are produced one at a time by
//! [`Tokenizer::next_token`] (also available through `Iterator`) or all at once
//! by [`Tokenizer::scan_all`]. The tokenizer is an explicit state machine: each
//! step consumes at most one code point (plus bounded lookahead) and either
//! emits tokens, transitions, or both.
//!
//! Invariants:
//! - `reconsume_in` rewinds exactly the code point consumed by the current step
//!   and never rewinds past EOF.
//! - EOF is emitted once. After it, `next_token` returns `None`.
//! - Malformed input never aborts tokenization: a stray `<` is emitted as a
//!   character and scanning resumes in `Data`.

use std::collections::VecDeque;

use crate::entities;
use crate::token::{Attribute, Tag, Token, is_html_whitespace};

mod states;
#[cfg(test)]
mod tests;

pub use states::{RawKind, State};

/// Minimal tokenizer instrumentation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TokenizerStats {
    pub steps: u64,
    pub state_transitions: u64,
    pub tokens_emitted: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TagKind {
    Start,
    End,
}

#[derive(Debug)]
struct TagInProgress {
    kind: TagKind,
    tag: Tag,
    attribute: Option<Attribute>,
}

pub struct Tokenizer {
    input: Vec<char>,
    cursor: usize,
    state: State,
    return_state: State,
    pending: VecDeque<Token>,
    tag: Option<TagInProgress>,
    comment: String,
    doctype_name: Option<String>,
    temp: String,
    char_ref_code: u32,
    last_start_tag: Option<String>,
    eof_emitted: bool,
    stats: TokenizerStats,
}

impl Tokenizer {
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            cursor: 0,
            state: State::Data,
            return_state: State::Data,
            pending: VecDeque::new(),
            tag: None,
            comment: String::new(),
            doctype_name: None,
            temp: String::new(),
            char_ref_code: 0,
            last_start_tag: None,
            eof_emitted: false,
            stats: TokenizerStats::default(),
        }
    }

    /// Rewind to the start of the buffered source.
    pub fn reset(&mut self) {
        self.cursor = 0;
        self.state = State::Data;
        self.return_state = State::Data;
        self.pending.clear();
        self.tag = None;
        self.comment.clear();
        self.doctype_name = None;
        self.temp.clear();
        self.char_ref_code = 0;
        self.last_start_tag = None;
        self.eof_emitted = false;
        self.stats = TokenizerStats::default();
    }

    /// Tokenize the whole buffered source from the beginning, EOF included.
    pub fn scan_all(&mut self) -> Vec<Token> {
        self.reset();
        let mut out = Vec::new();
        while let Some(token) = self.next_token() {
            out.push(token);
        }
        out
    }

    pub fn next_token(&mut self) -> Option<Token> {
        loop {
            if let Some(token) = self.pending.pop_front() {
                return Some(token);
            }
            if self.eof_emitted {
                return None;
            }
            self.stats.steps = self.stats.steps.saturating_add(1);
            self.step();
        }
    }

    /// Switch the content model, e.g. into RAWTEXT after a `<style>` start tag.
    ///
    /// Raw states only leave on an end tag matching the last emitted start tag.
    pub fn switch_to(&mut self, state: State) {
        self.transition_to(state);
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn stats(&self) -> TokenizerStats {
        self.stats
    }

    fn transition_to(&mut self, next: State) {
        if self.state == next {
            return;
        }
        #[cfg(any(test, feature = "debug-stats"))]
        log::trace!(
            target: "html.tokenizer",
            "state {:?} -> {:?} @{}",
            self.state,
            next,
            self.cursor
        );
        self.state = next;
        self.stats.state_transitions = self.stats.state_transitions.saturating_add(1);
    }

    fn consume(&mut self) -> Option<char> {
        let c = self.input.get(self.cursor).copied();
        if c.is_some() {
            self.cursor += 1;
        }
        c
    }

    /// Give back the code point consumed by this step and switch state.
    fn reconsume_in(&mut self, state: State, consumed: Option<char>) {
        if consumed.is_some() {
            debug_assert!(self.cursor > 0);
            self.cursor -= 1;
        }
        self.transition_to(state);
    }

    fn lookahead_is(&self, expected: &str, ignore_case: bool) -> bool {
        let mut idx = self.cursor;
        for want in expected.chars() {
            let Some(&got) = self.input.get(idx) else {
                return false;
            };
            let same = if ignore_case {
                got.eq_ignore_ascii_case(&want)
            } else {
                got == want
            };
            if !same {
                return false;
            }
            idx += 1;
        }
        true
    }

    fn emit(&mut self, token: Token) {
        if token.is_eof() {
            self.eof_emitted = true;
        }
        self.stats.tokens_emitted = self.stats.tokens_emitted.saturating_add(1);
        self.pending.push_back(token);
    }

    fn emit_char(&mut self, c: char) {
        self.emit(Token::Character(c));
    }

    fn emit_str(&mut self, s: &str) {
        for c in s.chars() {
            self.emit_char(c);
        }
    }

    fn emit_eof(&mut self) {
        self.emit(Token::Eof);
    }

    fn emit_comment(&mut self) {
        let text = std::mem::take(&mut self.comment);
        self.emit(Token::Comment(text));
    }

    fn emit_doctype(&mut self) {
        let name = self.doctype_name.take();
        self.emit(Token::Doctype { name });
    }

    fn begin_tag(&mut self, kind: TagKind) {
        self.tag = Some(TagInProgress {
            kind,
            tag: Tag::default(),
            attribute: None,
        });
    }

    fn push_tag_name(&mut self, c: char) {
        if let Some(tip) = self.tag.as_mut() {
            tip.tag.name.push(c.to_ascii_lowercase());
        }
    }

    fn begin_attribute(&mut self, first: Option<char>) {
        self.finish_attribute();
        if let Some(tip) = self.tag.as_mut() {
            let mut name = String::new();
            if let Some(c) = first {
                name.push(c);
            }
            tip.attribute = Some(Attribute::new(name, String::new()));
        }
    }

    fn push_attribute_name(&mut self, c: char) {
        if let Some(attr) = self.tag.as_mut().and_then(|tip| tip.attribute.as_mut()) {
            attr.name.push(c.to_ascii_lowercase());
        }
    }

    fn push_attribute_value(&mut self, c: char) {
        if let Some(attr) = self.tag.as_mut().and_then(|tip| tip.attribute.as_mut()) {
            attr.value.push(c);
        }
    }

    /// Move the attribute under construction into the tag. First occurrence wins.
    fn finish_attribute(&mut self) {
        let Some(tip) = self.tag.as_mut() else {
            return;
        };
        let Some(attr) = tip.attribute.take() else {
            return;
        };
        if tip.tag.attributes.iter().any(|a| a.name == attr.name) {
            log::trace!(
                target: "html.tokenizer",
                "dropping duplicate attribute {:?} on <{}>",
                attr.name,
                tip.tag.name
            );
            return;
        }
        tip.tag.attributes.push(attr);
    }

    fn emit_current_tag(&mut self) {
        self.finish_attribute();
        let Some(tip) = self.tag.take() else {
            return;
        };
        match tip.kind {
            TagKind::Start => {
                self.last_start_tag = Some(tip.tag.name.clone());
                self.emit(Token::StartTag(tip.tag));
            }
            TagKind::End => {
                let mut tag = tip.tag;
                tag.attributes.clear();
                self.emit(Token::EndTag(tag));
            }
        }
    }

    fn is_appropriate_end_tag(&self) -> bool {
        match (&self.tag, &self.last_start_tag) {
            (Some(tip), Some(last)) => tip.kind == TagKind::End && tip.tag.name == *last,
            _ => false,
        }
    }

    /// Flush the temporary buffer of a character reference as plain text.
    fn flush_temp(&mut self) {
        let temp = std::mem::take(&mut self.temp);
        self.flush_code_points(&temp);
    }

    fn flush_code_points(&mut self, s: &str) {
        if self.return_state.is_attribute_value() {
            for c in s.chars() {
                self.push_attribute_value(c);
            }
        } else {
            self.emit_str(s);
        }
    }

    fn step(&mut self) {
        match self.state {
            State::Data => self.step_data(),
            State::RcData => self.step_raw(RawKind::RcData),
            State::RawText => self.step_raw(RawKind::RawText),
            State::ScriptData => self.step_raw(RawKind::ScriptData),
            State::TagOpen => self.step_tag_open(),
            State::EndTagOpen => self.step_end_tag_open(),
            State::TagName => self.step_tag_name(),
            State::RawLessThanSign(kind) => self.step_raw_less_than_sign(kind),
            State::RawEndTagOpen(kind) => self.step_raw_end_tag_open(kind),
            State::RawEndTagName(kind) => self.step_raw_end_tag_name(kind),
            State::BeforeAttributeName => self.step_before_attribute_name(),
            State::AttributeName => self.step_attribute_name(),
            State::AfterAttributeName => self.step_after_attribute_name(),
            State::BeforeAttributeValue => self.step_before_attribute_value(),
            State::AttributeValueDoubleQuoted => self.step_attribute_value_quoted('"'),
            State::AttributeValueSingleQuoted => self.step_attribute_value_quoted('\''),
            State::AttributeValueUnquoted => self.step_attribute_value_unquoted(),
            State::AfterAttributeValueQuoted => self.step_after_attribute_value_quoted(),
            State::SelfClosingStartTag => self.step_self_closing_start_tag(),
            State::BogusComment => self.step_bogus_comment(),
            State::MarkupDeclarationOpen => self.step_markup_declaration_open(),
            State::CommentStart => self.step_comment_start(),
            State::CommentStartDash => self.step_comment_start_dash(),
            State::Comment => self.step_comment(),
            State::CommentEndDash => self.step_comment_end_dash(),
            State::CommentEnd => self.step_comment_end(),
            State::CommentEndBang => self.step_comment_end_bang(),
            State::Doctype => self.step_doctype(),
            State::BeforeDoctypeName => self.step_before_doctype_name(),
            State::DoctypeName => self.step_doctype_name(),
            State::AfterDoctypeName => self.step_after_doctype_name(),
            State::BogusDoctype => self.step_bogus_doctype(),
            State::CharacterReference => self.step_character_reference(),
            State::NamedCharacterReference => self.step_named_character_reference(),
            State::NumericCharacterReference => self.step_numeric_character_reference(),
            State::HexadecimalCharacterReferenceStart => self.step_numeric_start(true),
            State::DecimalCharacterReferenceStart => self.step_numeric_start(false),
            State::HexadecimalCharacterReference => self.step_numeric_digits(16),
            State::DecimalCharacterReference => self.step_numeric_digits(10),
            State::NumericCharacterReferenceEnd => self.step_numeric_end(),
        }
    }

    fn step_data(&mut self) {
        match self.consume() {
            Some('&') => {
                self.return_state = State::Data;
                self.transition_to(State::CharacterReference);
            }
            Some('<') => self.transition_to(State::TagOpen),
            Some(c) => self.emit_char(c),
            None => self.emit_eof(),
        }
    }

    fn step_raw(&mut self, kind: RawKind) {
        match self.consume() {
            Some('&') if kind == RawKind::RcData => {
                self.return_state = State::RcData;
                self.transition_to(State::CharacterReference);
            }
            Some('<') => self.transition_to(State::RawLessThanSign(kind)),
            Some(c) => self.emit_char(c),
            None => self.emit_eof(),
        }
    }

    fn step_tag_open(&mut self) {
        let c = self.consume();
        match c {
            Some('!') => self.transition_to(State::MarkupDeclarationOpen),
            Some('/') => self.transition_to(State::EndTagOpen),
            Some(ch) if ch.is_ascii_alphabetic() => {
                self.begin_tag(TagKind::Start);
                self.reconsume_in(State::TagName, c);
            }
            Some('?') => {
                self.comment.clear();
                self.reconsume_in(State::BogusComment, c);
            }
            None => {
                self.emit_char('<');
                self.emit_eof();
            }
            Some(_) => {
                // Stray `<`: keep it as text and rescan the following code point.
                self.emit_char('<');
                self.reconsume_in(State::Data, c);
            }
        }
    }

    fn step_end_tag_open(&mut self) {
        let c = self.consume();
        match c {
            Some(ch) if ch.is_ascii_alphabetic() => {
                self.begin_tag(TagKind::End);
                self.reconsume_in(State::TagName, c);
            }
            Some('>') => self.transition_to(State::Data),
            None => {
                self.emit_str("</");
                self.emit_eof();
            }
            Some(_) => {
                self.comment.clear();
                self.reconsume_in(State::BogusComment, c);
            }
        }
    }

    fn step_tag_name(&mut self) {
        match self.consume() {
            Some(c) if is_html_whitespace(c) => self.transition_to(State::BeforeAttributeName),
            Some('/') => self.transition_to(State::SelfClosingStartTag),
            Some('>') => {
                self.transition_to(State::Data);
                self.emit_current_tag();
            }
            Some('\0') => self.push_tag_name('\u{FFFD}'),
            Some(c) => self.push_tag_name(c),
            None => self.emit_eof(),
        }
    }

    fn step_raw_less_than_sign(&mut self, kind: RawKind) {
        let c = self.consume();
        if c == Some('/') {
            self.temp.clear();
            self.transition_to(State::RawEndTagOpen(kind));
        } else {
            self.emit_char('<');
            self.reconsume_in(State::for_raw(kind), c);
        }
    }

    fn step_raw_end_tag_open(&mut self, kind: RawKind) {
        let c = self.consume();
        match c {
            Some(ch) if ch.is_ascii_alphabetic() => {
                self.begin_tag(TagKind::End);
                self.reconsume_in(State::RawEndTagName(kind), c);
            }
            _ => {
                self.emit_str("</");
                self.reconsume_in(State::for_raw(kind), c);
            }
        }
    }

    fn step_raw_end_tag_name(&mut self, kind: RawKind) {
        let c = self.consume();
        match c {
            Some(ch) if is_html_whitespace(ch) && self.is_appropriate_end_tag() => {
                self.transition_to(State::BeforeAttributeName);
            }
            Some('/') if self.is_appropriate_end_tag() => {
                self.transition_to(State::SelfClosingStartTag);
            }
            Some('>') if self.is_appropriate_end_tag() => {
                self.transition_to(State::Data);
                self.emit_current_tag();
            }
            Some(ch) if ch.is_ascii_alphabetic() => {
                self.push_tag_name(ch);
                self.temp.push(ch);
            }
            _ => {
                // Not our end tag: everything scanned so far is raw text.
                self.tag = None;
                self.emit_str("</");
                let temp = std::mem::take(&mut self.temp);
                self.emit_str(&temp);
                self.reconsume_in(State::for_raw(kind), c);
            }
        }
    }

    fn step_before_attribute_name(&mut self) {
        let c = self.consume();
        match c {
            Some(ch) if is_html_whitespace(ch) => {}
            Some('/') | Some('>') | None => self.reconsume_in(State::AfterAttributeName, c),
            Some('=') => {
                self.begin_attribute(Some('='));
                self.transition_to(State::AttributeName);
            }
            Some(_) => {
                self.begin_attribute(None);
                self.reconsume_in(State::AttributeName, c);
            }
        }
    }

    fn step_attribute_name(&mut self) {
        let c = self.consume();
        match c {
            Some(ch) if is_html_whitespace(ch) => self.reconsume_in(State::AfterAttributeName, c),
            Some('/') | Some('>') | None => self.reconsume_in(State::AfterAttributeName, c),
            Some('=') => self.transition_to(State::BeforeAttributeValue),
            Some('\0') => self.push_attribute_name('\u{FFFD}'),
            Some(ch) => self.push_attribute_name(ch),
        }
    }

    fn step_after_attribute_name(&mut self) {
        let c = self.consume();
        match c {
            Some(ch) if is_html_whitespace(ch) => {}
            Some('/') => self.transition_to(State::SelfClosingStartTag),
            Some('=') => self.transition_to(State::BeforeAttributeValue),
            Some('>') => {
                self.transition_to(State::Data);
                self.emit_current_tag();
            }
            None => self.emit_eof(),
            Some(_) => {
                self.begin_attribute(None);
                self.reconsume_in(State::AttributeName, c);
            }
        }
    }

    fn step_before_attribute_value(&mut self) {
        let c = self.consume();
        match c {
            Some(ch) if is_html_whitespace(ch) => {}
            Some('"') => self.transition_to(State::AttributeValueDoubleQuoted),
            Some('\'') => self.transition_to(State::AttributeValueSingleQuoted),
            Some('>') => {
                self.transition_to(State::Data);
                self.emit_current_tag();
            }
            _ => self.reconsume_in(State::AttributeValueUnquoted, c),
        }
    }

    fn step_attribute_value_quoted(&mut self, quote: char) {
        match self.consume() {
            Some(c) if c == quote => self.transition_to(State::AfterAttributeValueQuoted),
            Some('&') => {
                self.return_state = self.state;
                self.transition_to(State::CharacterReference);
            }
            Some('\0') => self.push_attribute_value('\u{FFFD}'),
            Some(c) => self.push_attribute_value(c),
            None => self.emit_eof(),
        }
    }

    fn step_attribute_value_unquoted(&mut self) {
        match self.consume() {
            Some(c) if is_html_whitespace(c) => self.transition_to(State::BeforeAttributeName),
            Some('&') => {
                self.return_state = State::AttributeValueUnquoted;
                self.transition_to(State::CharacterReference);
            }
            Some('>') => {
                self.transition_to(State::Data);
                self.emit_current_tag();
            }
            Some('\0') => self.push_attribute_value('\u{FFFD}'),
            Some(c) => self.push_attribute_value(c),
            None => self.emit_eof(),
        }
    }

    fn step_after_attribute_value_quoted(&mut self) {
        let c = self.consume();
        match c {
            Some(ch) if is_html_whitespace(ch) => self.transition_to(State::BeforeAttributeName),
            Some('/') => self.transition_to(State::SelfClosingStartTag),
            Some('>') => {
                self.transition_to(State::Data);
                self.emit_current_tag();
            }
            None => self.emit_eof(),
            Some(_) => self.reconsume_in(State::BeforeAttributeName, c),
        }
    }

    fn step_self_closing_start_tag(&mut self) {
        let c = self.consume();
        match c {
            Some('>') => {
                if let Some(tip) = self.tag.as_mut() {
                    tip.tag.self_closing = true;
                }
                self.transition_to(State::Data);
                self.emit_current_tag();
            }
            None => self.emit_eof(),
            Some(_) => self.reconsume_in(State::BeforeAttributeName, c),
        }
    }

    fn step_bogus_comment(&mut self) {
        match self.consume() {
            Some('>') => {
                self.transition_to(State::Data);
                self.emit_comment();
            }
            Some('\0') => self.comment.push('\u{FFFD}'),
            Some(c) => self.comment.push(c),
            None => {
                self.emit_comment();
                self.emit_eof();
            }
        }
    }

    fn step_markup_declaration_open(&mut self) {
        if self.lookahead_is("--", false) {
            self.cursor += 2;
            self.comment.clear();
            self.transition_to(State::CommentStart);
        } else if self.lookahead_is("doctype", true) {
            self.cursor += "doctype".len();
            self.transition_to(State::Doctype);
        } else if self.lookahead_is("[CDATA[", false) {
            // CDATA is only meaningful in foreign content, which is not supported.
            self.cursor += "[CDATA[".len();
            self.comment = "[CDATA[".to_string();
            self.transition_to(State::BogusComment);
        } else {
            self.comment.clear();
            self.transition_to(State::BogusComment);
        }
    }

    fn step_comment_start(&mut self) {
        let c = self.consume();
        match c {
            Some('-') => self.transition_to(State::CommentStartDash),
            Some('>') => {
                self.transition_to(State::Data);
                self.emit_comment();
            }
            _ => self.reconsume_in(State::Comment, c),
        }
    }

    fn step_comment_start_dash(&mut self) {
        let c = self.consume();
        match c {
            Some('-') => self.transition_to(State::CommentEnd),
            Some('>') => {
                self.transition_to(State::Data);
                self.emit_comment();
            }
            None => {
                self.emit_comment();
                self.emit_eof();
            }
            Some(_) => {
                self.comment.push('-');
                self.reconsume_in(State::Comment, c);
            }
        }
    }

    fn step_comment(&mut self) {
        match self.consume() {
            Some('-') => self.transition_to(State::CommentEndDash),
            Some('\0') => self.comment.push('\u{FFFD}'),
            Some(c) => self.comment.push(c),
            None => {
                self.emit_comment();
                self.emit_eof();
            }
        }
    }

    fn step_comment_end_dash(&mut self) {
        let c = self.consume();
        match c {
            Some('-') => self.transition_to(State::CommentEnd),
            None => {
                self.emit_comment();
                self.emit_eof();
            }
            Some(_) => {
                self.comment.push('-');
                self.reconsume_in(State::Comment, c);
            }
        }
    }

    fn step_comment_end(&mut self) {
        let c = self.consume();
        match c {
            Some('>') => {
                self.transition_to(State::Data);
                self.emit_comment();
            }
            Some('!') => self.transition_to(State::CommentEndBang),
            Some('-') => self.comment.push('-'),
            None => {
                self.emit_comment();
                self.emit_eof();
            }
            Some(_) => {
                self.comment.push_str("--");
                self.reconsume_in(State::Comment, c);
            }
        }
    }

    fn step_comment_end_bang(&mut self) {
        let c = self.consume();
        match c {
            Some('-') => {
                self.comment.push_str("--!");
                self.transition_to(State::CommentEndDash);
            }
            Some('>') => {
                self.transition_to(State::Data);
                self.emit_comment();
            }
            None => {
                self.emit_comment();
                self.emit_eof();
            }
            Some(_) => {
                self.comment.push_str("--!");
                self.reconsume_in(State::Comment, c);
            }
        }
    }

    fn step_doctype(&mut self) {
        let c = self.consume();
        match c {
            Some(ch) if is_html_whitespace(ch) => self.transition_to(State::BeforeDoctypeName),
            None => {
                self.emit_doctype();
                self.emit_eof();
            }
            Some(_) => self.reconsume_in(State::BeforeDoctypeName, c),
        }
    }

    fn step_before_doctype_name(&mut self) {
        match self.consume() {
            Some(c) if is_html_whitespace(c) => {}
            Some('>') => {
                self.transition_to(State::Data);
                self.emit_doctype();
            }
            None => {
                self.emit_doctype();
                self.emit_eof();
            }
            Some(c) => {
                self.doctype_name = Some(c.to_ascii_lowercase().to_string());
                self.transition_to(State::DoctypeName);
            }
        }
    }

    fn step_doctype_name(&mut self) {
        match self.consume() {
            Some(c) if is_html_whitespace(c) => self.transition_to(State::AfterDoctypeName),
            Some('>') => {
                self.transition_to(State::Data);
                self.emit_doctype();
            }
            None => {
                self.emit_doctype();
                self.emit_eof();
            }
            Some(c) => {
                if let Some(name) = self.doctype_name.as_mut() {
                    name.push(c.to_ascii_lowercase());
                }
            }
        }
    }

    fn step_after_doctype_name(&mut self) {
        match self.consume() {
            Some(c) if is_html_whitespace(c) => {}
            Some('>') => {
                self.transition_to(State::Data);
                self.emit_doctype();
            }
            None => {
                self.emit_doctype();
                self.emit_eof();
            }
            // PUBLIC/SYSTEM identifiers are not retained.
            Some(_) => self.transition_to(State::BogusDoctype),
        }
    }

    fn step_bogus_doctype(&mut self) {
        match self.consume() {
            Some('>') => {
                self.transition_to(State::Data);
                self.emit_doctype();
            }
            None => {
                self.emit_doctype();
                self.emit_eof();
            }
            Some(_) => {}
        }
    }

    fn step_character_reference(&mut self) {
        self.temp.clear();
        self.temp.push('&');
        let c = self.consume();
        match c {
            Some(ch) if entities::could_be_named(ch) => {
                self.reconsume_in(State::NamedCharacterReference, c);
            }
            Some('#') => {
                self.temp.push('#');
                self.transition_to(State::NumericCharacterReference);
            }
            _ => {
                self.flush_temp();
                let ret = self.return_state;
                self.reconsume_in(ret, c);
            }
        }
    }

    fn step_named_character_reference(&mut self) {
        let ret = self.return_state;
        let Some((name, decoded)) = entities::match_named(&self.input[self.cursor..]) else {
            // Unknown name: the `&` stays literal and the name is rescanned as text.
            self.flush_temp();
            self.transition_to(ret);
            return;
        };
        let terminated = name.ends_with(';');
        let next = self.input.get(self.cursor + name.len()).copied();
        let in_attribute = ret.is_attribute_value();
        self.cursor += name.len();
        if in_attribute && !terminated && next.is_some_and(|c| c == '=' || c.is_ascii_alphanumeric()) {
            // Legacy attribute rule: `href="?a=1&copy=2"` keeps `&copy` as written.
            self.temp.push_str(name);
            self.flush_temp();
        } else {
            self.temp.clear();
            let mut buf = [0u8; 4];
            self.flush_code_points(decoded.encode_utf8(&mut buf));
        }
        self.transition_to(ret);
    }

    fn step_numeric_character_reference(&mut self) {
        self.char_ref_code = 0;
        let c = self.consume();
        match c {
            Some(ch @ ('x' | 'X')) => {
                self.temp.push(ch);
                self.transition_to(State::HexadecimalCharacterReferenceStart);
            }
            _ => self.reconsume_in(State::DecimalCharacterReferenceStart, c),
        }
    }

    fn step_numeric_start(&mut self, hex: bool) {
        let c = self.consume();
        let valid = match c {
            Some(ch) if hex => ch.is_ascii_hexdigit(),
            Some(ch) => ch.is_ascii_digit(),
            None => false,
        };
        if valid {
            let next = if hex {
                State::HexadecimalCharacterReference
            } else {
                State::DecimalCharacterReference
            };
            self.reconsume_in(next, c);
        } else {
            self.flush_temp();
            let ret = self.return_state;
            self.reconsume_in(ret, c);
        }
    }

    fn step_numeric_digits(&mut self, radix: u32) {
        let c = self.consume();
        match c.and_then(|ch| ch.to_digit(radix)) {
            Some(digit) => {
                // Saturate just past the Unicode range; anything larger decodes to U+FFFD.
                self.char_ref_code = self
                    .char_ref_code
                    .saturating_mul(radix)
                    .saturating_add(digit)
                    .min(0x11_0000);
            }
            None if c == Some(';') => self.transition_to(State::NumericCharacterReferenceEnd),
            None => self.reconsume_in(State::NumericCharacterReferenceEnd, c),
        }
    }

    fn step_numeric_end(&mut self) {
        let decoded = entities::numeric_reference(self.char_ref_code);
        self.temp.clear();
        let mut buf = [0u8; 4];
        self.flush_code_points(decoded.encode_utf8(&mut buf));
        let ret = self.return_state;
        self.transition_to(ret);
    }
}

impl Iterator for Tokenizer {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        self.next_token()
    }
}

/// Tokenize a whole document.
pub fn tokenize(input: &str) -> Vec<Token> {
    Tokenizer::new(input).scan_all()
}
