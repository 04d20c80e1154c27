//! Arena-backed document tree.
//!
//! Nodes live in one `Vec` owned by the [`Document`]; a [`NodeId`] is an index
//! into it. Children lists own the structure, and `parent` is a lookup key back
//! up the tree, never an owner. Detached nodes stay in the arena with
//! `parent == None` until the document is dropped.
//!
//! Every mutating operation sets `needs_reflow`. The engine never restyles on
//! its own; the host clears the flag after it has rebuilt styles and layout.

use std::fmt::{self, Write as _};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ElementData {
    pub name: String,
    attributes: Vec<(String, String)>,
}

impl ElementData {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }

    /// Keys are unique; a second write to the same name replaces the value.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name, value)),
        }
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn id(&self) -> Option<&str> {
        self.attribute("id")
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attribute("class")
            .unwrap_or("")
            .split_ascii_whitespace()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c == class)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeData {
    Document,
    Element(ElementData),
    Text(String),
}

#[derive(Clone, Debug)]
pub struct Node {
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub data: NodeData,
}

impl Node {
    fn new(data: NodeData) -> Self {
        Self {
            parent: None,
            children: Vec::new(),
            data,
        }
    }

    pub fn as_element(&self) -> Option<&ElementData> {
        match &self.data {
            NodeData::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match &self.data {
            NodeData::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn is_element_named(&self, name: &str) -> bool {
        self.as_element().is_some_and(|el| el.name == name)
    }
}

#[derive(Clone, Debug)]
pub struct Document {
    nodes: Vec<Node>,
    doctype: Option<String>,
    needs_reflow: bool,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub const ROOT: NodeId = NodeId(0);

    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new(NodeData::Document)],
            doctype: None,
            needs_reflow: true,
        }
    }

    pub fn root(&self) -> NodeId {
        Self::ROOT
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    pub fn doctype(&self) -> Option<&str> {
        self.doctype.as_deref()
    }

    pub fn set_doctype(&mut self, name: Option<String>) {
        self.doctype = name;
    }

    pub fn needs_reflow(&self) -> bool {
        self.needs_reflow
    }

    pub fn set_needs_reflow(&mut self) {
        self.needs_reflow = true;
    }

    pub fn mark_reflowed(&mut self) {
        self.needs_reflow = false;
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    /// Node lookup for ids handed out by this document.
    ///
    /// Panics on a foreign id; use [`Document::get`] for untrusted ids.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        self.get(id).and_then(Node::as_element)
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        match self.nodes.get_mut(id.index()).map(|n| &mut n.data) {
            Some(NodeData::Element(el)) => Some(el),
            _ => None,
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn create_element(&mut self, name: impl Into<String>) -> NodeId {
        self.push(Node::new(NodeData::Element(ElementData::new(name))))
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.push(Node::new(NodeData::Text(text.into())))
    }

    fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    pub fn is_ancestor_of(&self, ancestor: NodeId, mut node: NodeId) -> bool {
        while let Some(parent) = self.parent(node) {
            if parent == ancestor {
                return true;
            }
            node = parent;
        }
        false
    }

    /// Append `child` as the last child of `parent`, detaching it first.
    ///
    /// Returns `false` (and changes nothing) when the move would create a cycle
    /// or when `parent` cannot have children.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        if parent == child
            || child == Self::ROOT
            || self.is_ancestor_of(child, parent)
            || self.get(child).is_none()
            || matches!(self.get(parent).map(|n| &n.data), None | Some(NodeData::Text(_)))
        {
            return false;
        }
        self.detach(child);
        self.nodes[child.index()].parent = Some(parent);
        self.nodes[parent.index()].children.push(child);
        self.needs_reflow = true;
        true
    }

    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        if self.parent(child) != Some(parent) {
            return false;
        }
        self.detach(child);
        self.needs_reflow = true;
        true
    }

    fn detach(&mut self, child: NodeId) {
        if let Some(old) = self.nodes[child.index()].parent.take() {
            self.nodes[old.index()].children.retain(|c| *c != child);
        }
    }

    /// Append text under `parent`, merging into a trailing Text child.
    pub fn append_text(&mut self, parent: NodeId, text: &str) -> NodeId {
        if let Some(&last) = self.children(parent).last() {
            if let NodeData::Text(existing) = &mut self.nodes[last.index()].data {
                existing.push_str(text);
                self.needs_reflow = true;
                return last;
            }
        }
        let id = self.create_text(text);
        self.append_child(parent, id);
        id
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> bool {
        let Some(el) = self.element_mut(id) else {
            return false;
        };
        el.set_attribute(name, value);
        self.needs_reflow = true;
        true
    }

    /// Pre-order iterator over `start` and all its descendants.
    pub fn descendants(&self, start: NodeId) -> Descendants<'_> {
        Descendants {
            doc: self,
            stack: vec![start],
        }
    }

    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        self.descendants(Self::ROOT)
            .find(|n| self.element(*n).and_then(ElementData::id) == Some(id))
    }

    pub fn elements_by_tag_name<'a>(&'a self, name: &'a str) -> impl Iterator<Item = NodeId> + 'a {
        self.descendants(Self::ROOT)
            .filter(move |n| self.node(*n).is_element_named(name))
    }

    /// First element with this tag name in document order.
    pub fn first_element(&self, name: &str) -> Option<NodeId> {
        self.elements_by_tag_name(name).next()
    }

    pub fn body(&self) -> Option<NodeId> {
        self.first_element("body")
    }

    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        for n in self.descendants(id) {
            if let Some(text) = self.node(n).as_text() {
                out.push_str(text);
            }
        }
        out
    }

    /// Replace all children of `id` with a single text node.
    pub fn set_text_content(&mut self, id: NodeId, text: &str) {
        if let Some(NodeData::Text(existing)) = self.nodes.get_mut(id.index()).map(|n| &mut n.data) {
            *existing = text.to_string();
            self.needs_reflow = true;
            return;
        }
        let children: Vec<NodeId> = self.children(id).to_vec();
        for child in children {
            self.detach(child);
        }
        if !text.is_empty() {
            let t = self.create_text(text);
            self.append_child(id, t);
        }
        self.needs_reflow = true;
    }

    /// Indented dump, one node per line.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        let mut stack = vec![(Self::ROOT, 0usize)];
        while let Some((id, depth)) = stack.pop() {
            let node = self.node(id);
            let _ = write!(out, "{}", "  ".repeat(depth));
            match &node.data {
                NodeData::Document => out.push_str("#document"),
                NodeData::Element(el) => {
                    let _ = write!(out, "<{}", el.name);
                    for (k, v) in el.attributes() {
                        let _ = write!(out, " {k}=\"{v}\"");
                    }
                    out.push('>');
                }
                NodeData::Text(text) => {
                    let _ = write!(out, "{text:?}");
                }
            }
            out.push('\n');
            for child in node.children.iter().rev() {
                stack.push((*child, depth + 1));
            }
        }
        out
    }
}

pub struct Descendants<'a> {
    doc: &'a Document,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        let children = self.doc.children(id);
        self.stack.extend(children.iter().rev().copied());
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_child_moves_and_rejects_cycles() {
        let mut doc = Document::new();
        let a = doc.create_element("div");
        let b = doc.create_element("span");
        assert!(doc.append_child(doc.root(), a));
        assert!(doc.append_child(a, b));
        assert!(!doc.append_child(b, a), "would create a cycle");
        assert!(doc.append_child(doc.root(), b));
        assert_eq!(doc.parent(b), Some(doc.root()));
        assert!(doc.children(a).is_empty());
    }

    #[test]
    fn adjacent_text_is_merged() {
        let mut doc = Document::new();
        let p = doc.create_element("p");
        doc.append_child(doc.root(), p);
        let t1 = doc.append_text(p, "ab");
        let t2 = doc.append_text(p, "cd");
        assert_eq!(t1, t2);
        assert_eq!(doc.text_content(p), "abcd");
    }

    #[test]
    fn attribute_last_write_wins() {
        let mut el = ElementData::new("a");
        el.set_attribute("href", "/one");
        el.set_attribute("href", "/two");
        assert_eq!(el.attribute("href"), Some("/two"));
        assert_eq!(el.attributes().count(), 1);
    }

    #[test]
    fn set_text_content_replaces_children_and_flags_reflow() {
        let mut doc = Document::new();
        let div = doc.create_element("div");
        doc.append_child(doc.root(), div);
        let span = doc.create_element("span");
        doc.append_child(div, span);
        doc.mark_reflowed();
        doc.set_text_content(div, "fresh");
        assert!(doc.needs_reflow());
        assert_eq!(doc.children(div).len(), 1);
        assert_eq!(doc.text_content(div), "fresh");
        assert_eq!(doc.parent(span), None);
    }
}
