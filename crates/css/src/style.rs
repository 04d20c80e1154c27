//! Style resolution: cascade + inheritance over the document tree.
//!
//! Declarations are collected per element as candidates, sorted by
//! `(important, selector rank, sheet, rule, position)` and folded
//! last-write-wins. The rank order is universal < type < class < id, and
//! inline `style` attributes sort after every stylesheet rule. Full
//! specificity counting is not performed.

use std::collections::HashMap;

use html::{Document, ElementData, NodeData, NodeId};

use crate::parser::{Declaration, parse_style_attribute, to_css_text};
use crate::properties::{PropertyInfo, PropertyTable};
use crate::selector::SelectorRank;
use crate::stylesheet::{Stylesheet, default_stylesheet};
use crate::values::{Color, DEFAULT_FONT_SIZE_PX, Display, Length, Value, parse_value};

pub type PropertyMap = HashMap<String, Value>;

#[derive(Clone, Debug, PartialEq)]
pub enum StyledContent {
    Document,
    Element(ElementData),
    Text(String),
}

/// A node in the style tree: a snapshot of a document node plus its resolved
/// property map.
#[derive(Clone, Debug)]
pub struct StyledNode {
    pub node: NodeId,
    pub content: StyledContent,
    pub values: PropertyMap,
    pub children: Vec<StyledNode>,
}

impl StyledNode {
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn lookup<'s>(&'s self, name: &str, fallback: &'s Value) -> &'s Value {
        self.values.get(name).unwrap_or(fallback)
    }

    pub fn keyword(&self, name: &str) -> Option<&str> {
        self.value(name).and_then(Value::keyword)
    }

    pub fn display(&self) -> Display {
        match &self.content {
            StyledContent::Document => Display::Block,
            StyledContent::Text(_) => Display::Inline,
            StyledContent::Element(_) => self
                .keyword("display")
                .and_then(Display::from_keyword)
                .unwrap_or(Display::Inline),
        }
    }

    pub fn font_size(&self) -> f32 {
        match self.value("font-size") {
            Some(Value::Length(len)) => len.to_px(DEFAULT_FONT_SIZE_PX),
            _ => DEFAULT_FONT_SIZE_PX,
        }
    }

    /// Pixel value of a length property; `None` for `auto`, `none` and other
    /// keywords. Percentages resolve against `reference`.
    pub fn length_px(&self, name: &str, reference: f32) -> Option<f32> {
        self.value(name)?.to_px(self.font_size(), reference)
    }

    pub fn is_auto(&self, name: &str) -> bool {
        self.value(name).is_none_or(|v| v.is_keyword("auto"))
    }

    /// Unknown keywords and missing values resolve to black.
    pub fn color(&self, name: &str) -> Color {
        self.value(name)
            .and_then(Value::as_color)
            .unwrap_or(Color::BLACK)
    }

    pub fn element(&self) -> Option<&ElementData> {
        match &self.content {
            StyledContent::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn tag_name(&self) -> Option<&str> {
        self.element().map(|el| el.name.as_str())
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.element()?.attribute(name)
    }

    pub fn text(&self) -> Option<&str> {
        match &self.content {
            StyledContent::Text(t) => Some(t),
            _ => None,
        }
    }

    /// Finds the styled node for a document node.
    pub fn find(&self, id: NodeId) -> Option<&StyledNode> {
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            if node.node == id {
                return Some(node);
            }
            stack.extend(node.children.iter().rev());
        }
        None
    }
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Precedence {
    important: bool,
    /// `SelectorRank` as a number; inline style sorts above every rank.
    level: u8,
    sheet: usize,
    rule: usize,
}

struct Candidate<'d> {
    precedence: Precedence,
    declaration: &'d Declaration,
}

const INLINE_LEVEL: u8 = SelectorRank::Id as u8 + 1;

pub struct StyleResolver<'a> {
    table: &'a PropertyTable,
    sheets: Vec<&'a Stylesheet>,
}

impl<'a> StyleResolver<'a> {
    /// A resolver with no stylesheets.
    pub fn new(table: &'a PropertyTable) -> Self {
        Self {
            table,
            sheets: Vec::new(),
        }
    }

    /// A resolver over the built-in table and user-agent stylesheet.
    pub fn with_defaults() -> StyleResolver<'static> {
        let mut resolver = StyleResolver::new(PropertyTable::builtin());
        resolver.add_stylesheet(default_stylesheet());
        resolver
    }

    /// Sheets added later win ties against earlier ones.
    pub fn add_stylesheet(&mut self, sheet: &'a Stylesheet) {
        self.sheets.push(sheet);
    }

    pub fn resolve(&self, doc: &Document) -> StyledNode {
        let root = doc.root();
        let values = self.compute(PropertyMap::new(), None);
        let children = doc
            .children(root)
            .iter()
            .filter_map(|child| self.style_node(doc, *child, &values))
            .collect();
        StyledNode {
            node: root,
            content: StyledContent::Document,
            values,
            children,
        }
    }

    fn style_node(&self, doc: &Document, id: NodeId, parent: &PropertyMap) -> Option<StyledNode> {
        match &doc.node(id).data {
            NodeData::Document => None,
            NodeData::Text(text) => Some(StyledNode {
                node: id,
                content: StyledContent::Text(text.clone()),
                values: self.compute(PropertyMap::new(), Some(parent)),
                children: Vec::new(),
            }),
            NodeData::Element(el) => {
                let values = self.compute(self.cascade(doc, id), Some(parent));
                if values.get("display").is_some_and(|d| d.is_keyword("none")) {
                    return None;
                }
                let children = doc
                    .children(id)
                    .iter()
                    .filter_map(|child| self.style_node(doc, *child, &values))
                    .collect();
                Some(StyledNode {
                    node: id,
                    content: StyledContent::Element(el.clone()),
                    values,
                    children,
                })
            }
        }
    }

    /// Specified values for an element: every matching declaration, in
    /// cascade order, with shorthands expanded.
    pub fn cascade(&self, doc: &Document, id: NodeId) -> PropertyMap {
        let mut specified = PropertyMap::new();
        let Some(el) = doc.element(id) else {
            return specified;
        };

        let mut candidates = Vec::new();
        for (sheet_index, sheet) in self.sheets.iter().enumerate() {
            for (rule_index, rule) in sheet.rules.iter().enumerate() {
                let Some(rank) = rule.selectors.best_match(doc, id) else {
                    continue;
                };
                candidates.extend(rule.declarations.iter().map(|declaration| Candidate {
                    precedence: Precedence {
                        important: declaration.important,
                        level: rank as u8,
                        sheet: sheet_index,
                        rule: rule_index,
                    },
                    declaration,
                }));
            }
        }

        let inline = el.attribute("style").map(parse_style_attribute).unwrap_or_default();
        candidates.extend(inline.iter().map(|declaration| Candidate {
            precedence: Precedence {
                important: declaration.important,
                level: INLINE_LEVEL,
                sheet: 0,
                rule: 0,
            },
            declaration,
        }));

        // Stable: declarations within one rule keep source order.
        candidates.sort_by_key(|c| c.precedence);
        for candidate in candidates {
            self.apply(candidate.declaration, &mut specified);
        }
        specified
    }

    fn apply(&self, declaration: &Declaration, specified: &mut PropertyMap) {
        let Some(info) = self.table.get(&declaration.name) else {
            log::debug!(target: "css.style", "unknown property {} dropped", declaration.name);
            return;
        };
        let Some(value) = parse_value(&declaration.value, info) else {
            log::debug!(
                target: "css.style",
                "invalid value for {}: {}",
                declaration.name,
                to_css_text(&declaration.value)
            );
            return;
        };
        if !info.is_shorthand() {
            specified.insert(declaration.name.clone(), value);
            return;
        }
        for (longhand, value) in info.longhands.iter().zip(expand_box_shorthand(&value)) {
            specified.insert(longhand.clone(), value);
        }
    }

    fn compute(&self, mut specified: PropertyMap, parent: Option<&PropertyMap>) -> PropertyMap {
        let parent_font_size = parent
            .and_then(|p| p.get("font-size"))
            .and_then(|v| v.to_px(DEFAULT_FONT_SIZE_PX, DEFAULT_FONT_SIZE_PX))
            .unwrap_or(DEFAULT_FONT_SIZE_PX);

        let mut computed = PropertyMap::new();
        for (name, info) in self.table.longhands() {
            let inherited = || parent.and_then(|p| p.get(name)).cloned();
            let value = match specified.remove(name) {
                Some(v) if v.is_keyword("inherit") => inherited().or_else(|| info.initial.clone()),
                Some(v) if v.is_keyword("initial") => info.initial.clone(),
                Some(v) => Some(v),
                None if info.inherited => inherited().or_else(|| info.initial.clone()),
                None => info.initial.clone(),
            };
            if let Some(value) = value {
                computed.insert(name.to_string(), value);
            }
        }

        let font_size = resolve_font_size(computed.get("font-size"), parent_font_size);
        computed.insert("font-size".to_string(), Value::Length(Length::px(font_size)));
        computed
    }

    pub fn property(&self, name: &str) -> Option<&PropertyInfo> {
        self.table.get(name)
    }
}

/// One to four values mapped onto top/right/bottom/left.
fn expand_box_shorthand(value: &Value) -> Vec<Value> {
    let items = value.items();
    let pick = |i: usize| items[i].clone();
    match items.len() {
        1 => vec![pick(0), pick(0), pick(0), pick(0)],
        2 => vec![pick(0), pick(1), pick(0), pick(1)],
        3 => vec![pick(0), pick(1), pick(2), pick(1)],
        _ => items.iter().take(4).cloned().collect(),
    }
}

fn resolve_font_size(value: Option<&Value>, parent_px: f32) -> f32 {
    let px = match value {
        Some(Value::Length(len)) => len.to_px(parent_px),
        Some(Value::Percentage(p)) => parent_px * p / 100.0,
        Some(Value::Keyword(k)) => match k.as_str() {
            "xx-small" => 9.0,
            "x-small" => 10.0,
            "small" => 13.0,
            "medium" => 16.0,
            "large" => 18.0,
            "x-large" => 24.0,
            "xx-large" => 32.0,
            "larger" => parent_px * 1.2,
            "smaller" => parent_px / 1.2,
            _ => parent_px,
        },
        _ => parent_px,
    };
    if px.is_finite() && px >= 0.0 {
        px
    } else {
        parent_px
    }
}

/// Resolves `doc` against the user-agent sheet followed by `author` sheets.
pub fn resolve_styles(doc: &Document, author: &[&Stylesheet]) -> StyledNode {
    let mut resolver = StyleResolver::with_defaults();
    for sheet in author {
        resolver.add_stylesheet(sheet);
    }
    resolver.resolve(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stylesheet::parse_stylesheet;

    fn styled(markup: &str, css: &str) -> (Document, StyledNode) {
        let doc = html::parse(markup);
        let sheet = parse_stylesheet(css);
        let root = resolve_styles(&doc, &[&sheet]);
        (doc, root)
    }

    fn first<'s>(doc: &Document, root: &'s StyledNode, tag: &str) -> &'s StyledNode {
        let id = doc.first_element(tag).expect("element in document");
        root.find(id).expect("element is styled")
    }

    #[test]
    fn class_rule_overrides_universal_rule() {
        let (doc, root) = styled(r#"<p class="x">t</p>"#, "* { color: black } .x { color: blue }");
        assert_eq!(first(&doc, &root, "p").color("color"), Color::rgb(0, 0, 255));
    }

    #[test]
    fn rank_beats_source_order() {
        let (doc, root) = styled(r#"<p class="x">t</p>"#, ".x { color: blue } p { color: red }");
        assert_eq!(first(&doc, &root, "p").color("color"), Color::rgb(0, 0, 255));
    }

    #[test]
    fn later_rule_of_same_rank_wins() {
        let (doc, root) = styled("<p>t</p>", "p { color: red } p { color: green }");
        assert_eq!(first(&doc, &root, "p").color("color"), Color::rgb(0, 128, 0));
    }

    #[test]
    fn important_and_inline_ordering() {
        let (doc, root) = styled(
            r#"<p id="a" style="color: red; width: 5px">t</p>"#,
            "#a { color: blue; width: 9px !important }",
        );
        let p = first(&doc, &root, "p");
        assert_eq!(p.color("color"), Color::rgb(255, 0, 0));
        assert_eq!(p.length_px("width", 0.0), Some(9.0));
    }

    #[test]
    fn inheritance_and_initial_values() {
        let (doc, root) = styled(
            "<div><p>t</p></div>",
            "div { color: red; background-color: yellow }",
        );
        let p = first(&doc, &root, "p");
        assert_eq!(p.color("color"), Color::rgb(255, 0, 0));
        assert_eq!(p.color("background-color"), Color::TRANSPARENT);
        let text = &p.children[0];
        assert_eq!(text.text(), Some("t"));
        assert_eq!(text.color("color"), Color::rgb(255, 0, 0));
    }

    #[test]
    fn every_node_has_a_font_size() {
        let (doc, root) = styled("<div><span>a</span></div>", "div { font-size: 20px } span { font-size: 1.5em }");
        assert_eq!(root.font_size(), 16.0);
        assert_eq!(first(&doc, &root, "div").font_size(), 20.0);
        assert_eq!(first(&doc, &root, "span").font_size(), 30.0);
        let body = first(&doc, &root, "body");
        assert_eq!(body.font_size(), 16.0);
    }

    #[test]
    fn em_lengths_use_own_font_size() {
        let (doc, root) = styled("<div>x</div>", "div { font-size: 10px; width: 3em }");
        assert_eq!(first(&doc, &root, "div").length_px("width", 0.0), Some(30.0));
    }

    #[test]
    fn display_none_subtrees_are_elided() {
        let (doc, root) = styled(
            "<div><p class=hide><b>x</b></p><p>y</p></div>",
            ".hide { display: none }",
        );
        let div = first(&doc, &root, "div");
        assert_eq!(div.children.len(), 1);
        assert!(doc.first_element("b").and_then(|b| root.find(b)).is_none());
        assert!(doc.first_element("head").and_then(|h| root.find(h)).is_none());
    }

    #[test]
    fn shorthands_expand_to_longhands() {
        let (doc, root) = styled("<div>x</div>", "div { margin: 1px 2px 3px; padding: 4px }");
        let div = first(&doc, &root, "div");
        let px = |name: &str| div.length_px(name, 0.0);
        assert_eq!(px("margin-top"), Some(1.0));
        assert_eq!(px("margin-right"), Some(2.0));
        assert_eq!(px("margin-bottom"), Some(3.0));
        assert_eq!(px("margin-left"), Some(2.0));
        assert_eq!(px("padding-left"), Some(4.0));
    }

    #[test]
    fn invalid_declarations_are_dropped_and_unknown_colors_fall_back_to_black() {
        let (doc, root) = styled(
            "<div>x</div>",
            "div { width: 10px; width: #fff; width: 1px 2px; color: blurple }",
        );
        let div = first(&doc, &root, "div");
        assert_eq!(div.length_px("width", 0.0), Some(10.0));
        assert_eq!(div.color("color"), Color::BLACK);
    }

    #[test]
    fn inherit_and_initial_keywords() {
        let (doc, root) = styled(
            "<div><p>x</p></div>",
            "div { width: 50px; color: red } p { width: inherit; color: initial }",
        );
        let p = first(&doc, &root, "p");
        assert_eq!(p.length_px("width", 0.0), Some(50.0));
        assert_eq!(p.color("color"), Color::BLACK);
    }

    #[test]
    fn default_sheet_sets_display() {
        let (doc, root) = styled("<ul><li>a</li></ul><span>b</span>", "");
        assert_eq!(first(&doc, &root, "ul").display(), Display::Block);
        assert_eq!(first(&doc, &root, "li").display(), Display::ListItem);
        assert_eq!(first(&doc, &root, "span").display(), Display::Inline);
    }
}
