//! Inline formatting: line breaking for text and inline replaced boxes.
//!
//! Text is split into whitespace-delimited words; each word becomes one
//! fragment. A word that would cross the right edge (`x + width > max_x`)
//! starts a new line, unless the line is still empty. `white-space: pre`
//! text is split on `\n` only and each segment ends its line.

use css::{Color, StyledNode};
use html::NodeId;

use crate::geometry::Rect;
use crate::replaced::compute_replaced_size;
use crate::text::RenderContext;
use crate::tree::{LayoutKind, LayoutNode};

#[derive(Clone, Debug, PartialEq)]
pub enum FragmentContent {
    Text(String),
    Image,
    Canvas,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LineFragment {
    /// Source text node (or replaced element).
    pub node: NodeId,
    pub content: FragmentContent,
    pub rect: Rect,
    pub font_size: f32,
    pub color: Color,
    /// `href` of the nearest enclosing inline link, if any.
    pub href: Option<String>,
}

impl LineFragment {
    pub fn text(&self) -> Option<&str> {
        match &self.content {
            FragmentContent::Text(t) => Some(t),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Line {
    pub rect: Rect,
    pub fragments: Vec<LineFragment>,
}

enum Item<'a> {
    Word {
        text: String,
        style: &'a StyledNode,
        href: Option<String>,
        preformatted: bool,
    },
    /// Collapsible whitespace between words.
    Space(&'a StyledNode),
    /// End of a preformatted segment.
    Break(&'a StyledNode),
    Replaced {
        kind: LayoutKind,
        style: &'a StyledNode,
        href: Option<String>,
    },
}

fn collect_items<'a>(node: &LayoutNode<'a>, href: Option<&str>, out: &mut Vec<Item<'a>>) {
    for child in &node.children {
        match child.kind {
            LayoutKind::Text => {
                let Some(text) = child.style.text() else {
                    continue;
                };
                if child.style.keyword("white-space") == Some("pre") {
                    push_preformatted(text, child.style, href, out);
                } else {
                    push_words(text, child.style, href, out);
                }
            }
            LayoutKind::Image | LayoutKind::Canvas => out.push(Item::Replaced {
                kind: child.kind,
                style: child.style,
                href: href.map(str::to_string),
            }),
            LayoutKind::ListItemMarker => {}
            _ => {
                let own = match (child.style.tag_name(), child.style.attribute("href")) {
                    (Some("a"), Some(h)) => Some(h),
                    _ => href,
                };
                collect_items(child, own, out);
            }
        }
    }
}

fn push_words<'a>(text: &str, style: &'a StyledNode, href: Option<&str>, out: &mut Vec<Item<'a>>) {
    let mut word = String::new();
    for ch in text.chars() {
        if ch.is_whitespace() {
            if !word.is_empty() {
                out.push(Item::Word {
                    text: std::mem::take(&mut word),
                    style,
                    href: href.map(str::to_string),
                    preformatted: false,
                });
            }
            if !matches!(out.last(), Some(Item::Space(_))) {
                out.push(Item::Space(style));
            }
        } else {
            word.push(ch);
        }
    }
    if !word.is_empty() {
        out.push(Item::Word {
            text: word,
            style,
            href: href.map(str::to_string),
            preformatted: false,
        });
    }
}

fn push_preformatted<'a>(
    text: &str,
    style: &'a StyledNode,
    href: Option<&str>,
    out: &mut Vec<Item<'a>>,
) {
    let mut segments = text.split('\n').peekable();
    while let Some(segment) = segments.next() {
        if !segment.is_empty() {
            out.push(Item::Word {
                text: segment.to_string(),
                style,
                href: href.map(str::to_string),
                preformatted: true,
            });
        }
        if segments.peek().is_some() {
            out.push(Item::Break(style));
        }
    }
}

struct LineBuilder<'c> {
    ctx: &'c RenderContext,
    left: f32,
    max_x: f32,
    y: f32,
    x: f32,
    pending_space: f32,
    line: Line,
    /// Height of an empty line, from the style that ended it.
    min_height: f32,
    lines: Vec<Line>,
}

impl<'c> LineBuilder<'c> {
    fn place(&mut self, width: f32, height: f32, wrap: bool, mut fragment: LineFragment) {
        let gap = if self.line.fragments.is_empty() {
            0.0
        } else {
            self.pending_space
        };
        if wrap && !self.line.fragments.is_empty() && self.x + gap + width > self.max_x {
            self.finish_line();
        } else {
            self.x += gap;
        }
        self.pending_space = 0.0;
        fragment.rect = Rect::new(self.x, self.y, width, height);
        self.x += width;
        self.line.fragments.push(fragment);
    }

    fn finish_line(&mut self) {
        let height = self
            .line
            .fragments
            .iter()
            .map(|f| f.rect.height)
            .fold(self.min_height, f32::max);
        let mut line = std::mem::take(&mut self.line);
        line.rect = Rect::new(self.left, self.y, self.x - self.left, height);
        self.y += height;
        self.x = self.left;
        self.pending_space = 0.0;
        self.min_height = 0.0;
        self.lines.push(line);
    }

    fn finish(mut self) -> Vec<Line> {
        if !self.line.fragments.is_empty() {
            self.finish_line();
        }
        self.lines
    }
}

/// Lays out the inline children of `node` into `node.lines` inside `content`
/// (only its origin and width matter). Returns the total line height.
pub fn layout_lines(node: &mut LayoutNode<'_>, content: Rect, ctx: &RenderContext) -> f32 {
    let mut items = Vec::new();
    collect_items(node, None, &mut items);
    let measurer = ctx.measurer();

    let mut builder = LineBuilder {
        ctx,
        left: content.x,
        max_x: content.right(),
        y: content.y,
        x: content.x,
        pending_space: 0.0,
        line: Line::default(),
        min_height: 0.0,
        lines: Vec::new(),
    };

    for item in items {
        match item {
            Item::Word {
                text,
                style,
                href,
                preformatted,
            } => {
                let width = measurer.measure(&text, style);
                let height = measurer.line_height(style);
                builder.place(
                    width,
                    height,
                    !preformatted,
                    LineFragment {
                        node: style.node,
                        content: FragmentContent::Text(text),
                        rect: Rect::default(),
                        font_size: style.font_size(),
                        color: style.color("color"),
                        href,
                    },
                );
            }
            Item::Space(style) => {
                if !builder.line.fragments.is_empty() {
                    builder.pending_space = measurer.measure(" ", style);
                }
            }
            Item::Break(style) => {
                builder.min_height = builder.min_height.max(measurer.line_height(style));
                builder.finish_line();
            }
            Item::Replaced { kind, style, href } => {
                let intrinsic = builder.ctx.intrinsic_size(style);
                let (w, h) =
                    compute_replaced_size(style, intrinsic, content.width, Some(content.width));
                let content = if kind == LayoutKind::Canvas {
                    FragmentContent::Canvas
                } else {
                    FragmentContent::Image
                };
                builder.place(
                    w,
                    h,
                    true,
                    LineFragment {
                        node: style.node,
                        content,
                        rect: Rect::default(),
                        font_size: style.font_size(),
                        color: style.color("color"),
                        href,
                    },
                );
            }
        }
    }

    let mut lines = builder.finish();
    align_lines(&mut lines, node.style, content);
    let height = lines.iter().map(|l| l.rect.height).sum();
    place_replaced_children(node, &lines);
    node.lines = lines;
    height
}

/// `text-align: center | right` shifts each finished line by the leftover
/// width.
fn align_lines(lines: &mut [Line], style: &StyledNode, content: Rect) {
    let factor = match style.keyword("text-align") {
        Some("center") => 0.5,
        Some("right") => 1.0,
        _ => return,
    };
    for line in lines {
        let offset = ((content.width - line.rect.width) * factor).max(0.0);
        line.rect.x += offset;
        for fragment in &mut line.fragments {
            fragment.rect.x += offset;
        }
    }
}

/// Copies fragment geometry onto the replaced boxes in the subtree so they can
/// be found by node without walking lines.
fn place_replaced_children(node: &mut LayoutNode<'_>, lines: &[Line]) {
    for child in &mut node.children {
        if matches!(child.kind, LayoutKind::Image | LayoutKind::Canvas) {
            let id = child.node_id();
            if let Some(fragment) = lines
                .iter()
                .flat_map(|l| &l.fragments)
                .find(|f| f.node == id)
            {
                child.dimensions.content = fragment.rect;
            }
        } else if child.kind == LayoutKind::Inline {
            place_replaced_children(child, lines);
        }
    }
}
