//! Paint walk: flattens a laid-out tree into drawing commands in painting
//! order (backgrounds and borders of a box, then its lines, then its
//! children).

use css::Color;
use html::NodeId;

use crate::geometry::Rect;
use crate::inline::FragmentContent;
use crate::tree::{LayoutKind, LayoutNode};

#[derive(Clone, Debug, PartialEq)]
pub enum PaintItem {
    Rect {
        rect: Rect,
        color: Color,
    },
    Text {
        node: NodeId,
        rect: Rect,
        text: String,
        color: Color,
        font_size: f32,
        /// Part of a link.
        link: bool,
    },
    Image {
        node: NodeId,
        rect: Rect,
        src: Option<String>,
    },
    Canvas {
        node: NodeId,
        rect: Rect,
    },
    /// List bullet, drawn as a filled circle inside `rect`.
    Marker {
        rect: Rect,
        color: Color,
    },
}

/// Calls `visit` for every item in painting order.
pub fn walk(root: &LayoutNode<'_>, visit: &mut dyn FnMut(PaintItem)) {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        paint_box(node, visit);
        stack.extend(node.children.iter().rev());
    }
}

pub fn display_list(root: &LayoutNode<'_>) -> Vec<PaintItem> {
    let mut items = Vec::new();
    walk(root, &mut |item| items.push(item));
    items
}

fn paint_box(node: &LayoutNode<'_>, visit: &mut dyn FnMut(PaintItem)) {
    let style = node.style;
    match node.kind {
        LayoutKind::ListItemMarker => {
            if style.keyword("list-style-type") != Some("none") {
                visit(PaintItem::Marker {
                    rect: node.dimensions.content,
                    color: style.color("color"),
                });
            }
            return;
        }
        // Inline content paints through its block's lines.
        LayoutKind::Text | LayoutKind::Inline => return,
        LayoutKind::Image | LayoutKind::Canvas if !node.is_block_level() => return,
        _ => {}
    }
    if node.anonymous {
        paint_lines(node, visit);
        return;
    }
    if style.keyword("visibility") == Some("hidden") {
        return;
    }

    let background = style.color("background-color");
    if !background.is_transparent() {
        visit(PaintItem::Rect {
            rect: node.dimensions.border_box(),
            color: background,
        });
    }
    paint_borders(node, visit);

    match node.kind {
        LayoutKind::Image => visit(PaintItem::Image {
            node: node.node_id(),
            rect: node.dimensions.content,
            src: style.attribute("src").map(str::to_string),
        }),
        LayoutKind::Canvas => visit(PaintItem::Canvas {
            node: node.node_id(),
            rect: node.dimensions.content,
        }),
        _ => paint_lines(node, visit),
    }
}

fn paint_borders(node: &LayoutNode<'_>, visit: &mut dyn FnMut(PaintItem)) {
    let d = &node.dimensions;
    let b = d.border;
    if b.top + b.right + b.bottom + b.left <= 0.0 {
        return;
    }
    let color = match node.style.value("border-color") {
        Some(v) => v.as_color().unwrap_or(Color::BLACK),
        None => node.style.color("color"),
    };
    let outer = d.border_box();
    let sides = [
        Rect::new(outer.x, outer.y, outer.width, b.top),
        Rect::new(outer.right() - b.right, outer.y, b.right, outer.height),
        Rect::new(outer.x, outer.bottom() - b.bottom, outer.width, b.bottom),
        Rect::new(outer.x, outer.y, b.left, outer.height),
    ];
    for rect in sides {
        if rect.width > 0.0 && rect.height > 0.0 {
            visit(PaintItem::Rect { rect, color });
        }
    }
}

fn paint_lines(node: &LayoutNode<'_>, visit: &mut dyn FnMut(PaintItem)) {
    for fragment in node.lines.iter().flat_map(|l| &l.fragments) {
        let item = match &fragment.content {
            FragmentContent::Text(text) => PaintItem::Text {
                node: fragment.node,
                rect: fragment.rect,
                text: text.clone(),
                color: fragment.color,
                font_size: fragment.font_size,
                link: fragment.href.is_some(),
            },
            FragmentContent::Image => PaintItem::Image {
                node: fragment.node,
                rect: fragment.rect,
                src: node
                    .find(fragment.node)
                    .and_then(|n| n.style.attribute("src"))
                    .map(str::to_string),
            },
            FragmentContent::Canvas => PaintItem::Canvas {
                node: fragment.node,
                rect: fragment.rect,
            },
        };
        visit(item);
    }
}
