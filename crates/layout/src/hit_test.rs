use html::NodeId;

use crate::geometry::Rect;
use crate::inline::FragmentContent;
use crate::tree::{LayoutKind, LayoutNode};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HitKind {
    Text,
    Link,
    Image,
    Canvas,
    BlockBox,
}

#[derive(Clone, Debug, PartialEq)]
pub struct HitResult {
    /// Deepest document node under the point.
    pub node_id: NodeId,
    pub kind: HitKind,
    /// In layout coordinates.
    pub fragment_rect: Rect,
    /// Point relative to `fragment_rect`'s origin.
    pub local_pos: (f32, f32),
    pub href: Option<String>,
}

fn local(point: (f32, f32), rect: Rect) -> (f32, f32) {
    (point.0 - rect.x, point.1 - rect.y)
}

/// Hit test in layout coordinates (the same system as `LayoutNode::dimensions`).
pub fn hit_test(root: &LayoutNode<'_>, point: (f32, f32)) -> Option<HitResult> {
    hit_test_box(root, point, None)
}

fn link_of<'s>(node: &'s LayoutNode<'_>) -> Option<&'s str> {
    if node.anonymous || node.style.tag_name() != Some("a") {
        return None;
    }
    node.style.attribute("href")
}

fn hit_test_box(node: &LayoutNode<'_>, point: (f32, f32), link: Option<&str>) -> Option<HitResult> {
    let border_box = node.dimensions.border_box();
    if !border_box.contains(point) {
        return None;
    }
    let link = link_of(node).or(link);

    // Later siblings paint on top.
    for child in node.children.iter().rev() {
        if !child.is_block_level() {
            continue;
        }
        if let Some(hit) = hit_test_box(child, point, link) {
            return Some(hit);
        }
    }

    for line in &node.lines {
        if !line.rect.contains(point) {
            continue;
        }
        for fragment in &line.fragments {
            if !fragment.rect.contains(point) {
                continue;
            }
            let href = fragment.href.clone().or_else(|| link.map(str::to_string));
            let kind = match fragment.content {
                FragmentContent::Text(_) if href.is_some() => HitKind::Link,
                FragmentContent::Text(_) => HitKind::Text,
                FragmentContent::Image => HitKind::Image,
                FragmentContent::Canvas => HitKind::Canvas,
            };
            return Some(HitResult {
                node_id: fragment.node,
                kind,
                fragment_rect: fragment.rect,
                local_pos: local(point, fragment.rect),
                href,
            });
        }
    }

    let kind = match node.kind {
        LayoutKind::Image => HitKind::Image,
        LayoutKind::Canvas => HitKind::Canvas,
        _ => HitKind::BlockBox,
    };
    Some(HitResult {
        node_id: node.node_id(),
        kind,
        fragment_rect: border_box,
        local_pos: local(point, border_box),
        href: link.map(str::to_string),
    })
}
