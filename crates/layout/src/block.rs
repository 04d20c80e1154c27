//! Block flow.
//!
//! Widths follow CSS 2 §10.3.3: the sum of margins, borders, padding and
//! width equals the containing block width, with `auto` values absorbing the
//! difference. Children stack vertically; the parent's content height is the
//! running cursor. Vertical margins do not collapse.

use css::{StyledNode, Value};

use crate::geometry::{BoxModel, Edges, Rect};
use crate::inline::layout_lines;
use crate::replaced::compute_replaced_size;
use crate::text::RenderContext;
use crate::tree::{LayoutKind, LayoutNode, build_layout_tree};

pub const MARKER_SIZE: f32 = 8.0;
/// Gap between a list marker and the item's content edge.
const MARKER_GAP: f32 = 8.0;

/// Builds and lays out the tree for `root` at `viewport_width`.
pub fn layout_tree<'a>(root: &'a StyledNode, viewport_width: f32, ctx: &RenderContext) -> LayoutNode<'a> {
    let mut tree = build_layout_tree(root);
    tree.reflow(viewport_width, ctx);
    tree
}

fn side(style: &StyledNode, prefix: &str, reference: f32) -> Edges {
    let px = |s: &str| {
        style
            .length_px(&format!("{prefix}-{s}"), reference)
            .unwrap_or(0.0)
    };
    Edges {
        top: px("top"),
        right: px("right"),
        bottom: px("bottom"),
        left: px("left"),
    }
}

fn border_edges(style: &StyledNode) -> Edges {
    if matches!(style.keyword("border-style"), None | Some("none") | Some("hidden")) {
        return Edges::default();
    }
    let width = |s: &str| match style.value(&format!("border-{s}-width")) {
        Some(Value::Keyword(k)) => match k.as_str() {
            "thin" => 1.0,
            "medium" => 3.0,
            "thick" => 5.0,
            _ => 0.0,
        },
        Some(v) => v.to_px(style.font_size(), 0.0).unwrap_or(0.0).max(0.0),
        None => 0.0,
    };
    Edges {
        top: width("top"),
        right: width("right"),
        bottom: width("bottom"),
        left: width("left"),
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Horizontal {
    width: f32,
    margin_left: f32,
    margin_right: f32,
}

/// Solves the horizontal constraint. `None` means `auto`.
fn solve_horizontal(
    width: Option<f32>,
    margin_left: Option<f32>,
    margin_right: Option<f32>,
    edges: f32,
    containing_width: f32,
) -> Horizontal {
    let mut ml = margin_left.unwrap_or(0.0);
    let mut mr = margin_right.unwrap_or(0.0);
    let total = ml + mr + edges + width.unwrap_or(0.0);

    // Too wide: auto margins compute to zero.
    let (margin_left, margin_right) = if width.is_some() && total > containing_width {
        (Some(ml), Some(mr))
    } else {
        (margin_left, margin_right)
    };
    let underflow = containing_width - total;

    let width = match (width, margin_left, margin_right) {
        (Some(w), Some(_), Some(_)) => {
            mr += underflow;
            w
        }
        (Some(w), Some(_), None) => {
            mr = underflow;
            w
        }
        (Some(w), None, Some(_)) => {
            ml = underflow;
            w
        }
        (Some(w), None, None) => {
            ml = underflow / 2.0;
            mr = underflow / 2.0;
            w
        }
        (None, _, _) => {
            if underflow >= 0.0 {
                underflow
            } else {
                mr += underflow;
                0.0
            }
        }
    };
    Horizontal {
        width,
        margin_left: ml,
        margin_right: mr,
    }
}

impl<'a> LayoutNode<'a> {
    /// Recomputes every dimension and line box for a new viewport width.
    pub fn reflow(&mut self, viewport_width: f32, ctx: &RenderContext) {
        log::debug!(target: "layout", "reflow at width {viewport_width}");
        let viewport = Rect::new(0.0, 0.0, viewport_width.max(0.0), 0.0);
        self.layout_block(viewport, 0.0, ctx);
    }

    fn layout_block(&mut self, containing: Rect, cursor: f32, ctx: &RenderContext) {
        self.lines.clear();
        let style = self.style;
        let cb_w = containing.width;

        let mut d = BoxModel::default();
        let replaced = matches!(self.kind, LayoutKind::Image | LayoutKind::Canvas);
        let mut replaced_height = 0.0;

        if self.anonymous {
            d.content.width = cb_w;
        } else {
            d.padding = side(style, "padding", cb_w);
            d.border = border_edges(style);
            let margins = |s: &str| style.length_px(&format!("margin-{s}"), cb_w);
            d.margin.top = margins("top").unwrap_or(0.0);
            d.margin.bottom = margins("bottom").unwrap_or(0.0);
            let edges = d.padding.horizontal() + d.border.horizontal();

            let specified = if replaced {
                let intrinsic = ctx.intrinsic_size(style);
                let (w, h) = compute_replaced_size(style, intrinsic, cb_w, None);
                replaced_height = h;
                Some(w)
            } else {
                style.length_px("width", cb_w)
            };
            let solve = |w: Option<f32>| solve_horizontal(w, margins("left"), margins("right"), edges, cb_w);
            let mut h = solve(specified);
            if !replaced {
                if let Some(max) = style.length_px("max-width", cb_w) {
                    if h.width > max {
                        h = solve(Some(max));
                    }
                }
                if let Some(min) = style.length_px("min-width", cb_w) {
                    if h.width < min {
                        h = solve(Some(min));
                    }
                }
            }
            d.content.width = h.width;
            d.margin.left = h.margin_left;
            d.margin.right = h.margin_right;
        }

        d.content.x = containing.x + d.margin.left + d.border.left + d.padding.left;
        d.content.y = containing.y + cursor + d.margin.top + d.border.top + d.padding.top;
        self.dimensions = d;

        let content_height = if replaced {
            replaced_height
        } else if self.establishes_inline_context() {
            layout_lines(self, d.content, ctx)
        } else {
            let mut y = 0.0;
            for child in &mut self.children {
                if !child.is_block_level() {
                    continue;
                }
                child.layout_block(d.content, y, ctx);
                y += child.dimensions.margin_box().height;
            }
            y
        };

        self.dimensions.content.height = match style.value("height") {
            Some(Value::Length(len)) if !self.anonymous && !replaced => len.to_px(style.font_size()).max(0.0),
            _ => content_height,
        };

        if self.kind == LayoutKind::ListItem {
            self.place_marker();
        }
    }

    fn place_marker(&mut self) {
        let margin_box = self.dimensions.margin_box();
        let content = self.dimensions.content;
        if let Some(marker) = self
            .children
            .iter_mut()
            .find(|c| c.kind == LayoutKind::ListItemMarker)
        {
            marker.dimensions = BoxModel {
                content: Rect::new(
                    content.x - MARKER_GAP - MARKER_SIZE,
                    margin_box.y + (margin_box.height - MARKER_SIZE) / 2.0,
                    MARKER_SIZE,
                    MARKER_SIZE,
                ),
                ..BoxModel::default()
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_width_fills_the_containing_block() {
        let h = solve_horizontal(None, Some(10.0), Some(20.0), 6.0, 200.0);
        assert_eq!(h.width, 164.0);
    }

    #[test]
    fn both_auto_margins_center() {
        let h = solve_horizontal(Some(100.0), None, None, 0.0, 300.0);
        assert_eq!((h.margin_left, h.margin_right), (100.0, 100.0));
    }

    #[test]
    fn one_auto_margin_takes_the_rest() {
        let h = solve_horizontal(Some(100.0), None, Some(50.0), 0.0, 300.0);
        assert_eq!(h.margin_left, 150.0);
    }

    #[test]
    fn over_constrained_adjusts_right_margin() {
        let h = solve_horizontal(Some(250.0), Some(10.0), Some(10.0), 0.0, 200.0);
        assert_eq!((h.width, h.margin_left, h.margin_right), (250.0, 10.0, -60.0));
        let auto = solve_horizontal(Some(250.0), None, None, 0.0, 200.0);
        assert_eq!((auto.margin_left, auto.margin_right), (0.0, -50.0));
    }

    #[test]
    fn too_wide_padding_clamps_auto_width_to_zero() {
        let h = solve_horizontal(None, Some(0.0), Some(0.0), 300.0, 200.0);
        assert_eq!((h.width, h.margin_right), (0.0, -100.0));
    }
}
