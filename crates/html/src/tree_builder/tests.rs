use super::{InsertionMode, TreeBuilder, TreeBuilderConfig, parse, parse_with_config};
use crate::dom::{Document, NodeData};
use crate::token::{Tag, Token};

fn child_names(doc: &Document, id: crate::NodeId) -> Vec<String> {
    doc.children(id)
        .iter()
        .map(|c| match &doc.node(*c).data {
            NodeData::Element(el) => el.name.clone(),
            NodeData::Text(t) => format!("#text {t:?}"),
            NodeData::Document => "#document".to_string(),
        })
        .collect()
}

#[test]
fn empty_input_synthesizes_skeleton() {
    let doc = parse("");
    let html = doc.children(doc.root())[0];
    assert_eq!(child_names(&doc, doc.root()), vec!["html"]);
    assert_eq!(child_names(&doc, html), vec!["head", "body"]);
}

#[test]
fn bare_text_lands_in_body() {
    let doc = parse("hello");
    let body = doc.body().expect("body");
    assert_eq!(child_names(&doc, body), vec!["#text \"hello\""]);
}

#[test]
fn head_content_and_title_are_raw() {
    let doc = parse("<title>a <b> c</title><style>p > a {}</style><p>x");
    let head = doc.first_element("head").expect("head");
    assert_eq!(child_names(&doc, head), vec!["title", "style"]);
    let title = doc.first_element("title").expect("title");
    assert_eq!(doc.text_content(title), "a <b> c");
    let style = doc.first_element("style").expect("style");
    assert_eq!(doc.text_content(style), "p > a {}");
    assert_eq!(doc.text_content(doc.body().expect("body")), "x");
}

#[test]
fn late_style_after_head_goes_into_head() {
    let doc = parse("<html><head></head><style>b{}</style><body>t</body></html>");
    let head = doc.first_element("head").expect("head");
    assert_eq!(child_names(&doc, head), vec!["style"]);
}

#[test]
fn whitespace_before_body_is_dropped() {
    let doc = parse("  \n<html>  <head>  </head>  <body>x</body></html>");
    let html = doc.children(doc.root())[0];
    assert!(
        child_names(&doc, html).iter().all(|n| !n.starts_with("#text")),
        "{}",
        doc.dump()
    );
}

#[test]
fn adjacent_characters_merge_into_one_text_node() {
    let doc = parse("<p>a&amp;b c</p>");
    let p = doc.first_element("p").expect("p");
    assert_eq!(child_names(&doc, p), vec!["#text \"a&b c\""]);
}

#[test]
fn block_start_closes_open_paragraph() {
    let doc = parse("<p>one<div>two</div>");
    let body = doc.body().expect("body");
    assert_eq!(child_names(&doc, body), vec!["p", "div"]);
}

#[test]
fn list_items_close_each_other() {
    let doc = parse("<ul><li>a<li>b</ul>");
    let ul = doc.first_element("ul").expect("ul");
    assert_eq!(child_names(&doc, ul), vec!["li", "li"]);
}

#[test]
fn void_elements_do_not_capture_children() {
    let doc = parse("<p>a<br>b<img src=x.png>c</p>");
    let p = doc.first_element("p").expect("p");
    assert_eq!(
        child_names(&doc, p),
        vec!["#text \"a\"", "br", "#text \"b\"", "img", "#text \"c\""]
    );
}

#[test]
fn stray_end_tags_are_ignored() {
    let doc = parse("<div></span>x</p></div>");
    let div = doc.first_element("div").expect("div");
    assert_eq!(child_names(&doc, div), vec!["#text \"x\"", "p"]);
}

#[test]
fn text_after_body_end_is_reprocessed_in_body() {
    let doc = parse("<body>a</body>b</html>c");
    assert_eq!(doc.text_content(doc.body().expect("body")), "abc");
}

#[test]
fn doctype_is_recorded() {
    let doc = parse("<!doctype html><p>");
    assert_eq!(doc.doctype(), Some("html"));
}

#[test]
fn script_content_is_not_parsed_as_markup() {
    let doc = parse("<body><script>if (a < b) { x = '</div>'; }</script>");
    let script = doc.first_element("script").expect("script");
    assert_eq!(doc.text_content(script), "if (a < b) { x = '</div>'; }");
}

#[test]
fn depth_limit_bounds_the_stack() {
    let input = "<div>".repeat(100);
    let doc = parse_with_config(&input, TreeBuilderConfig { max_depth: 10 });
    let mut depth = 0;
    let mut node = doc.root();
    while let Some(&child) = doc.children(node).last() {
        depth += 1;
        node = child;
    }
    assert!(depth <= 11, "depth {depth}");
    assert_eq!(doc.elements_by_tag_name("div").count(), 100);
}

#[test]
fn raw_text_elements_keep_their_text_at_the_depth_limit() {
    let doc = parse_with_config(
        "<div><style>p{color:red}</style>after</div><p>sibling</p>",
        TreeBuilderConfig { max_depth: 3 },
    );
    let div = doc.first_element("div").expect("div");
    let style = doc.first_element("style").expect("style");
    assert_eq!(doc.parent(style), Some(div));
    assert_eq!(doc.text_content(style), "p{color:red}");
    assert_eq!(
        child_names(&doc, div),
        vec!["style".to_string(), "#text \"after\"".to_string()]
    );
    let body = doc.body().expect("body");
    assert_eq!(child_names(&doc, body), vec!["div", "p"]);
}

#[test]
fn modes_progress_through_reprocessing() {
    let mut builder = TreeBuilder::default();
    builder.process(&Token::StartTag(Tag {
        name: "p".to_string(),
        ..Tag::default()
    }));
    assert_eq!(builder.mode(), InsertionMode::InBody);
    builder.process(&Token::Eof);
    assert!(builder.is_stopped());
}
