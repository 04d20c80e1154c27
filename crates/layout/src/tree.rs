//! Layout tree construction.
//!
//! Mirrors the styled tree, except that:
//! - a block container with both block-level and inline-level children wraps
//!   each run of inline children in an anonymous block,
//! - whitespace-only text between block-level siblings is dropped,
//! - a list item gets a synthetic marker as its first child,
//! - everything under an inline box is inline-level.

use css::{Display, StyledNode};
use html::NodeId;

use crate::geometry::BoxModel;
use crate::inline::Line;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayoutKind {
    Block,
    Inline,
    Text,
    Image,
    Canvas,
    ListItem,
    ListItemMarker,
}

pub struct LayoutNode<'a> {
    pub kind: LayoutKind,
    /// For anonymous boxes and markers this is the generating parent's style;
    /// only its inherited properties apply.
    pub style: &'a StyledNode,
    pub anonymous: bool,
    /// Block-level placement for boxes that are normally inline (an `img`
    /// with `display: block`).
    pub block_level: bool,
    pub dimensions: BoxModel,
    /// Line boxes of an inline formatting context; empty for other boxes.
    pub lines: Vec<Line>,
    pub children: Vec<LayoutNode<'a>>,
}

impl<'a> LayoutNode<'a> {
    fn new(kind: LayoutKind, style: &'a StyledNode) -> Self {
        let block_level = matches!(kind, LayoutKind::Block | LayoutKind::ListItem)
            || (matches!(kind, LayoutKind::Image | LayoutKind::Canvas) && style.display().is_block_level());
        Self {
            kind,
            style,
            anonymous: false,
            block_level,
            dimensions: BoxModel::default(),
            lines: Vec::new(),
            children: Vec::new(),
        }
    }

    fn anonymous_block(parent: &'a StyledNode, children: Vec<LayoutNode<'a>>) -> Self {
        let mut node = Self::new(LayoutKind::Block, parent);
        node.anonymous = true;
        node.children = children;
        node
    }

    /// The document node behind this box. Anonymous boxes report their
    /// generating parent.
    pub fn node_id(&self) -> NodeId {
        self.style.node
    }

    pub fn is_block_level(&self) -> bool {
        self.block_level
    }

    /// Whether this box lays out its children as line boxes.
    pub fn establishes_inline_context(&self) -> bool {
        self.is_block_level()
            && !matches!(self.kind, LayoutKind::Image | LayoutKind::Canvas)
            && !self.children.iter().any(|c| c.is_block_level())
            && self.children.iter().any(|c| c.kind != LayoutKind::ListItemMarker)
    }

    /// Pre-order iteration over this box and its descendants.
    pub fn iter(&self) -> impl Iterator<Item = &LayoutNode<'a>> {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let node = stack.pop()?;
            stack.extend(node.children.iter().rev());
            Some(node)
        })
    }

    pub fn find(&self, id: NodeId) -> Option<&LayoutNode<'a>> {
        self.iter().find(|n| !n.anonymous && n.node_id() == id)
    }

    pub fn line_count(&self) -> usize {
        self.iter().map(|n| n.lines.len()).sum()
    }
}

fn kind_for(styled: &StyledNode, inside_inline: bool) -> Option<LayoutKind> {
    if styled.text().is_some() {
        return Some(LayoutKind::Text);
    }
    match styled.tag_name() {
        Some("img") => return Some(LayoutKind::Image),
        Some("canvas") => return Some(LayoutKind::Canvas),
        _ => {}
    }
    if inside_inline {
        return Some(LayoutKind::Inline);
    }
    match styled.display() {
        Display::None => None,
        Display::Block => Some(LayoutKind::Block),
        Display::ListItem => Some(LayoutKind::ListItem),
        Display::Inline | Display::InlineBlock => Some(LayoutKind::Inline),
    }
}

fn is_collapsible_whitespace(node: &LayoutNode<'_>) -> bool {
    node.kind == LayoutKind::Text
        && node.style.keyword("white-space") != Some("pre")
        && node.style.text().is_some_and(|t| t.trim().is_empty())
}

/// Builds the layout tree for a styled tree. Dimensions stay zero until
/// [`LayoutNode::reflow`] runs.
pub fn build_layout_tree(root: &StyledNode) -> LayoutNode<'_> {
    build(root, LayoutKind::Block, false)
}

fn build(styled: &StyledNode, kind: LayoutKind, inside_inline: bool) -> LayoutNode<'_> {
    let mut node = LayoutNode::new(kind, styled);
    if matches!(kind, LayoutKind::Image | LayoutKind::Canvas | LayoutKind::Text) {
        return node;
    }
    let child_inline = inside_inline || kind == LayoutKind::Inline;
    let children: Vec<LayoutNode<'_>> = styled
        .children
        .iter()
        .filter_map(|child| {
            let kind = kind_for(child, child_inline)?;
            Some(build(child, kind, child_inline))
        })
        .collect();

    if kind == LayoutKind::ListItem {
        node.children.push(LayoutNode::new(LayoutKind::ListItemMarker, styled));
    }
    if child_inline || !children.iter().any(LayoutNode::is_block_level) {
        node.children.extend(children);
        return node;
    }

    let mut run: Vec<LayoutNode<'_>> = Vec::new();
    for child in children {
        if child.is_block_level() {
            flush_inline_run(&mut node, &mut run, styled);
            node.children.push(child);
        } else {
            run.push(child);
        }
    }
    flush_inline_run(&mut node, &mut run, styled);
    node
}

fn flush_inline_run<'a>(
    parent: &mut LayoutNode<'a>,
    run: &mut Vec<LayoutNode<'a>>,
    style: &'a StyledNode,
) {
    if run.iter().all(is_collapsible_whitespace) {
        run.clear();
        return;
    }
    parent
        .children
        .push(LayoutNode::anonymous_block(style, std::mem::take(run)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use css::resolve_styles;

    fn kinds(node: &LayoutNode<'_>) -> Vec<(LayoutKind, bool)> {
        node.children.iter().map(|c| (c.kind, c.anonymous)).collect()
    }

    #[test]
    fn mixed_children_get_anonymous_wrappers() {
        let doc = html::parse("<div>before<p>para</p>after <b>bold</b></div>");
        let styled = resolve_styles(&doc, &[]);
        let tree = build_layout_tree(&styled);
        let div = tree
            .find(doc.first_element("div").expect("div"))
            .expect("div box");
        assert_eq!(
            kinds(div),
            vec![
                (LayoutKind::Block, true),
                (LayoutKind::Block, false),
                (LayoutKind::Block, true)
            ]
        );
        assert_eq!(div.children[2].children.len(), 2);
    }

    #[test]
    fn whitespace_between_blocks_is_dropped() {
        let doc = html::parse("<div>\n  <p>a</p>\n  <p>b</p>\n</div>");
        let styled = resolve_styles(&doc, &[]);
        let tree = build_layout_tree(&styled);
        let div = tree
            .find(doc.first_element("div").expect("div"))
            .expect("div box");
        assert_eq!(kinds(div), vec![(LayoutKind::Block, false), (LayoutKind::Block, false)]);
    }

    #[test]
    fn list_items_start_with_a_marker() {
        let doc = html::parse("<ul><li>one</li></ul>");
        let styled = resolve_styles(&doc, &[]);
        let tree = build_layout_tree(&styled);
        let li = tree
            .find(doc.first_element("li").expect("li"))
            .expect("li box");
        assert_eq!(li.kind, LayoutKind::ListItem);
        assert_eq!(li.children[0].kind, LayoutKind::ListItemMarker);
        assert_eq!(li.children[1].kind, LayoutKind::Text);
        assert!(li.establishes_inline_context());
    }

    #[test]
    fn replaced_elements_and_inline_descendants() {
        let doc = html::parse(
            "<section><a href=x><div>in</div></a><img src=i.png><canvas></canvas></section>",
        );
        let styled = resolve_styles(&doc, &[]);
        let tree = build_layout_tree(&styled);
        let section = tree
            .find(doc.first_element("section").expect("section"))
            .expect("section box");
        assert_eq!(
            section.children.iter().map(|c| c.kind).collect::<Vec<_>>(),
            vec![LayoutKind::Inline, LayoutKind::Image, LayoutKind::Canvas]
        );
        assert_eq!(section.children[0].children[0].kind, LayoutKind::Inline);
    }
}
