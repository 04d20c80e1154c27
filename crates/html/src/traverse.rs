use crate::dom::{Document, NodeData, NodeId};

/// Elements that never generate boxes.
pub fn is_non_rendering_element(doc: &Document, id: NodeId) -> bool {
    doc.element(id).is_some_and(|el| {
        matches!(
            el.name.as_str(),
            "head" | "style" | "script" | "title" | "meta" | "link" | "base" | "noscript"
                | "template"
        )
    })
}

/// Walk from `id` up to the root, `id` included.
pub fn ancestors(doc: &Document, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
    std::iter::successors(Some(id), move |n| doc.parent(*n))
}

/// Nearest element at or above `id` carrying `attribute`, with its value.
pub fn closest_with_attribute<'a>(
    doc: &'a Document,
    id: NodeId,
    attribute: &str,
) -> Option<(NodeId, &'a str)> {
    ancestors(doc, id).find_map(|n| doc.element(n)?.attribute(attribute).map(|v| (n, v)))
}

/// Nearest `<a href>` at or above `id`.
pub fn enclosing_link(doc: &Document, id: NodeId) -> Option<&str> {
    ancestors(doc, id).find_map(|n| {
        let el = doc.element(n)?;
        if el.name == "a" { el.attribute("href") } else { None }
    })
}

/// Text of every inline `<script>` (no `src`) in document order.
pub fn inline_scripts(doc: &Document) -> Vec<String> {
    doc.elements_by_tag_name("script")
        .filter(|id| doc.element(*id).is_some_and(|el| !el.has_attribute("src")))
        .map(|id| doc.text_content(id))
        .collect()
}

/// Concatenated text of all `<style>` elements, in document order.
pub fn style_text(doc: &Document) -> String {
    let mut out = String::new();
    for id in doc.elements_by_tag_name("style") {
        out.push_str(&doc.text_content(id));
        out.push('\n');
    }
    out
}

/// Every node id in the subtree, children before parents.
pub fn post_order(doc: &Document, root: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut stack = vec![(root, false)];
    while let Some((id, visited)) = stack.pop() {
        if visited {
            out.push(id);
            continue;
        }
        stack.push((id, true));
        for child in doc.children(id).iter().rev() {
            stack.push((*child, false));
        }
    }
    out
}

pub fn is_text(doc: &Document, id: NodeId) -> bool {
    matches!(doc.get(id).map(|n| &n.data), Some(NodeData::Text(_)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    #[test]
    fn enclosing_link_walks_ancestors() {
        let doc = parse(r#"<p><a href="/next"><b>go</b></a></p>"#);
        let b = doc.first_element("b").expect("b");
        assert_eq!(enclosing_link(&doc, b), Some("/next"));
        let p = doc.first_element("p").expect("p");
        assert_eq!(enclosing_link(&doc, p), None);
    }

    #[test]
    fn scripts_with_src_are_skipped() {
        let doc = parse(r#"<script src="a.js"></script><script>one()</script><p><script>two()</script>"#);
        assert_eq!(inline_scripts(&doc), vec!["one()", "two()"]);
    }

    #[test]
    fn post_order_visits_children_first() {
        let doc = parse("<div><span>a</span></div>");
        let order = post_order(&doc, doc.root());
        let div = doc.first_element("div").expect("div");
        let span = doc.first_element("span").expect("span");
        let pos = |id| order.iter().position(|n| *n == id).expect("visited");
        assert!(pos(span) < pos(div));
        assert_eq!(order.last(), Some(&doc.root()));
    }
}
