use std::collections::HashSet;

use html::{Document, NodeId, parse};

const SAMPLE: &str = r#"<!DOCTYPE html><html><head><title>T &amp; t</title>
<style>p { color: red }</style></head><body class="main">
<h1 id=top>Hello <b>bold</b></h1><p>para<ul><li>one<li>two</ul>
<!-- comment --><img src="a.png" alt='x'><script>if (a < b) {}</script>
<a href="/x?y=1&z=2">link</a></body></html>"#;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Every node reachable from the root exactly once, with consistent parent keys.
fn assert_well_formed(doc: &Document, input: &str) {
    let mut seen: HashSet<NodeId> = HashSet::new();
    let mut stack = vec![doc.root()];
    assert_eq!(doc.parent(doc.root()), None, "root has a parent for {input:?}");
    while let Some(id) = stack.pop() {
        assert!(seen.insert(id), "node {id} reached twice for {input:?}");
        for &child in doc.children(id) {
            assert_eq!(
                doc.parent(child),
                Some(id),
                "child {child} disagrees about its parent for {input:?}"
            );
            stack.push(child);
        }
    }
    let html = doc.children(doc.root());
    assert_eq!(html.len(), 1, "expected a single <html> for {input:?}");
}

struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        self.0 >> 33
    }
}

#[test]
fn empty_input() {
    init_logging();
    assert_well_formed(&parse(""), "");
}

#[test]
fn every_truncation_of_a_document() {
    init_logging();
    let mut end = 0;
    while end <= SAMPLE.len() {
        if SAMPLE.is_char_boundary(end) {
            let input = &SAMPLE[..end];
            assert_well_formed(&parse(input), input);
        }
        end += 1;
    }
}

#[test]
fn random_markup_soup() {
    init_logging();
    const ALPHABET: &[&str] = &[
        "<", ">", "/", "!", "-", "--", "=", "\"", "'", "&", "#", ";", " ", "\n", "a", "p", "div",
        "li", "ul", "script", "style", "title", "body", "html", "head", "x", "amp", "DOCTYPE", "?",
        "[CDATA[",
    ];
    let mut rng = Lcg(0x5eed);
    for _ in 0..300 {
        let len = (rng.next() % 80) as usize;
        let input: String = (0..len)
            .map(|_| ALPHABET[(rng.next() as usize) % ALPHABET.len()])
            .collect();
        assert_well_formed(&parse(&input), &input);
    }
}

#[test]
fn deep_nesting_terminates() {
    init_logging();
    let depth = 10_000;
    let mut input = String::with_capacity(depth * 11);
    for _ in 0..depth {
        input.push_str("<div>");
    }
    input.push('x');
    for _ in 0..depth {
        input.push_str("</div>");
    }
    let doc = parse(&input);
    assert_well_formed(&doc, "<deep nesting>");
    assert_eq!(doc.elements_by_tag_name("div").count(), depth);
    assert_eq!(doc.text_content(doc.root()), "x");
}
