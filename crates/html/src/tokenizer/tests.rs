use super::{RawKind, State, Tokenizer, tokenize};
use crate::token::{Attribute, Token};

fn text_of(tokens: &[Token]) -> String {
    tokens
        .iter()
        .filter_map(|t| match t {
            Token::Character(c) => Some(*c),
            _ => None,
        })
        .collect()
}

fn tags(tokens: &[Token]) -> Vec<String> {
    tokens
        .iter()
        .filter(|t| matches!(t, Token::StartTag(_) | Token::EndTag(_)))
        .map(|t| t.to_string())
        .collect()
}

#[test]
fn simple_element_with_text() {
    let tokens = tokenize("<div>Hello</div>");
    assert_eq!(tags(&tokens), vec!["START div", "END div"]);
    assert_eq!(text_of(&tokens), "Hello");
    assert!(matches!(tokens.last(), Some(Token::Eof)), "got: {tokens:?}");
}

#[test]
fn tag_names_and_attribute_names_are_lowercased() {
    let tokens = tokenize("<DIV CLASS=Box ID='main'></DIV>");
    let Some(Token::StartTag(tag)) = tokens.first() else {
        panic!("expected start tag, got: {tokens:?}");
    };
    assert_eq!(tag.name, "div");
    assert_eq!(
        tag.attributes,
        vec![Attribute::new("class", "Box"), Attribute::new("id", "main")]
    );
    assert!(tokens.iter().any(|t| t.is_end_tag("div")));
}

#[test]
fn duplicate_attributes_keep_first_occurrence() {
    let tokens = tokenize(r#"<p class="a" class="b" id=x>"#);
    let Some(Token::StartTag(tag)) = tokens.first() else {
        panic!("expected start tag, got: {tokens:?}");
    };
    assert_eq!(tag.attribute("class"), Some("a"));
    assert_eq!(tag.attributes.len(), 2);
}

#[test]
fn self_closing_flag_and_valueless_attribute() {
    let tokens = tokenize("<input disabled />");
    let Some(Token::StartTag(tag)) = tokens.first() else {
        panic!("expected start tag, got: {tokens:?}");
    };
    assert!(tag.self_closing);
    assert_eq!(tag.attribute("disabled"), Some(""));
}

#[test]
fn stray_less_than_is_text() {
    let tokens = tokenize("a < b <3");
    assert_eq!(text_of(&tokens), "a < b <3");
    assert!(tags(&tokens).is_empty(), "got: {tokens:?}");
}

#[test]
fn less_than_at_eof_is_text() {
    let tokens = tokenize("x<");
    assert_eq!(text_of(&tokens), "x<");
}

#[test]
fn unterminated_tag_is_dropped_and_eof_emitted_once() {
    let mut tokenizer = Tokenizer::new("hi<div class=\"open");
    let tokens: Vec<Token> = tokenizer.by_ref().collect();
    assert_eq!(text_of(&tokens), "hi");
    assert_eq!(tokens.iter().filter(|t| t.is_eof()).count(), 1);
    assert_eq!(tokenizer.next_token(), None);
    assert_eq!(tokenizer.next_token(), None);
}

#[test]
fn comments_and_doctype() {
    let tokens = tokenize("<!DOCTYPE HTML><!-- note -- here --><p>");
    assert_eq!(
        tokens[0],
        Token::Doctype {
            name: Some("html".to_string())
        }
    );
    assert_eq!(tokens[1], Token::Comment(" note -- here ".to_string()));
    assert!(tokens[2].is_start_tag("p"));
}

#[test]
fn bogus_comment_from_processing_instruction() {
    let tokens = tokenize("<?xml version=1?>x");
    assert!(
        matches!(&tokens[0], Token::Comment(text) if text == "?xml version=1?"),
        "got: {tokens:?}"
    );
    assert_eq!(text_of(&tokens), "x");
}

#[test]
fn character_references_in_text_and_attributes() {
    let tokens = tokenize("<a title=\"&lt;&#65;&#x42;\">&amp; &copy &bogus; &#</a>");
    let Some(Token::StartTag(tag)) = tokens.first() else {
        panic!("expected start tag, got: {tokens:?}");
    };
    assert_eq!(tag.attribute("title"), Some("<AB"));
    assert_eq!(text_of(&tokens), "& \u{A9} &bogus; &#");
}

#[test]
fn legacy_reference_in_attribute_followed_by_equals_stays_literal() {
    let tokens = tokenize("<a href=\"?x=1&copy=2\">");
    let Some(Token::StartTag(tag)) = tokens.first() else {
        panic!("expected start tag, got: {tokens:?}");
    };
    assert_eq!(tag.attribute("href"), Some("?x=1&copy=2"));
}

#[test]
fn rawtext_only_ends_on_matching_end_tag() {
    let mut tokenizer = Tokenizer::new("<style>p < a { }</p></style>after");
    let first = tokenizer.next_token();
    assert!(matches!(&first, Some(t) if t.is_start_tag("style")), "got: {first:?}");
    tokenizer.switch_to(State::for_raw(RawKind::RawText));
    let rest: Vec<Token> = tokenizer.collect();
    let close = rest
        .iter()
        .position(|t| t.is_end_tag("style"))
        .expect("style end tag");
    assert_eq!(text_of(&rest[..close]), "p < a { }</p>");
    assert_eq!(text_of(&rest[close..]), "after");
}

#[test]
fn rcdata_decodes_references() {
    let mut tokenizer = Tokenizer::new("<title>a &amp; <b></title>");
    let _ = tokenizer.next_token();
    tokenizer.switch_to(State::RcData);
    let rest: Vec<Token> = tokenizer.collect();
    assert_eq!(text_of(&rest), "a & <b>");
}

#[test]
fn scan_all_is_restartable() {
    let mut tokenizer = Tokenizer::new("<b>x</b>");
    let first = tokenizer.scan_all();
    let second = tokenizer.scan_all();
    assert_eq!(first, second);
}

#[test]
fn state_transitions_are_counted() {
    let mut tokenizer = Tokenizer::new("<p id=a>t</p>");
    let _ = tokenizer.scan_all();
    let stats = tokenizer.stats();
    assert!(stats.state_transitions > 0);
    assert_eq!(stats.tokens_emitted, 4);
}
