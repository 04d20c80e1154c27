//! Selector model, parser and matcher.
//!
//! `SimpleSelector` < `CompoundSelector` (AND) < `ComplexSelector` (chain with
//! combinators) < `SelectorList` (OR). Matching runs right to left: the last
//! compound must match the subject element, then combinators walk outward
//! through the document.

use html::{Document, ElementData, NodeId};

use crate::parser::{BlockKind, ComponentValue, to_css_text, trim_whitespace};
use crate::tokenizer::CssToken;

#[derive(Clone, Debug, PartialEq)]
pub enum SimpleSelector {
    Universal,
    Type(String),
    Class(String),
    Id(String),
    Attribute { name: String, value: Option<String> },
    PseudoClass(String),
    PseudoElement(String),
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CompoundSelector(pub Vec<SimpleSelector>);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Combinator {
    Descendant,
    Child,
    NextSibling,
    SubsequentSibling,
}

/// `compounds[0] combinators[0] compounds[1] ...`; the last compound is the subject.
#[derive(Clone, Debug, PartialEq)]
pub struct ComplexSelector {
    pub compounds: Vec<CompoundSelector>,
    pub combinators: Vec<Combinator>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SelectorList(pub Vec<ComplexSelector>);

/// Precedence class of a selector, by its most specific simple selector on the
/// subject. The cascade applies lower ranks first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum SelectorRank {
    Universal,
    Type,
    Class,
    Id,
}

impl SimpleSelector {
    fn rank(&self) -> SelectorRank {
        match self {
            SimpleSelector::Universal | SimpleSelector::PseudoElement(_) => SelectorRank::Universal,
            SimpleSelector::Type(_) => SelectorRank::Type,
            SimpleSelector::Class(_)
            | SimpleSelector::Attribute { .. }
            | SimpleSelector::PseudoClass(_) => SelectorRank::Class,
            SimpleSelector::Id(_) => SelectorRank::Id,
        }
    }

    fn matches(&self, doc: &Document, id: NodeId, el: &ElementData) -> bool {
        match self {
            SimpleSelector::Universal => true,
            SimpleSelector::Type(name) => el.name == *name,
            SimpleSelector::Class(class) => el.has_class(class),
            SimpleSelector::Id(want) => el.id() == Some(want.as_str()),
            SimpleSelector::Attribute { name, value } => match (el.attribute(name), value) {
                (Some(actual), Some(want)) => actual == want,
                (Some(_), None) => true,
                (None, _) => false,
            },
            SimpleSelector::PseudoClass(name) => match name.as_str() {
                "first-child" => preceding_element_siblings(doc, id).next().is_none(),
                "last-child" => following_element_siblings(doc, id).next().is_none(),
                _ => false,
            },
            SimpleSelector::PseudoElement(_) => false,
        }
    }
}

impl CompoundSelector {
    pub fn matches(&self, doc: &Document, id: NodeId) -> bool {
        let Some(el) = doc.element(id) else {
            return false;
        };
        self.0.iter().all(|s| s.matches(doc, id, el))
    }

    fn rank(&self) -> SelectorRank {
        self.0
            .iter()
            .map(SimpleSelector::rank)
            .max()
            .unwrap_or(SelectorRank::Universal)
    }
}

impl ComplexSelector {
    pub fn subject(&self) -> Option<&CompoundSelector> {
        self.compounds.last()
    }

    pub fn rank(&self) -> SelectorRank {
        self.subject()
            .map_or(SelectorRank::Universal, CompoundSelector::rank)
    }

    pub fn matches(&self, doc: &Document, id: NodeId) -> bool {
        match self.compounds.len() {
            0 => false,
            n => self.matches_from(n - 1, doc, id),
        }
    }

    fn matches_from(&self, index: usize, doc: &Document, id: NodeId) -> bool {
        if !self.compounds[index].matches(doc, id) {
            return false;
        }
        if index == 0 {
            return true;
        }
        let next = index - 1;
        match self.combinators[next] {
            Combinator::Child => {
                parent_element(doc, id).is_some_and(|p| self.matches_from(next, doc, p))
            }
            Combinator::Descendant => {
                let mut cursor = parent_element(doc, id);
                while let Some(ancestor) = cursor {
                    if self.matches_from(next, doc, ancestor) {
                        return true;
                    }
                    cursor = parent_element(doc, ancestor);
                }
                false
            }
            Combinator::NextSibling => preceding_element_siblings(doc, id)
                .next()
                .is_some_and(|s| self.matches_from(next, doc, s)),
            Combinator::SubsequentSibling => {
                preceding_element_siblings(doc, id).any(|s| self.matches_from(next, doc, s))
            }
        }
    }
}

impl SelectorList {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ComplexSelector> {
        self.0.iter()
    }

    /// Highest rank among the selectors matching `id`, if any does.
    pub fn best_match(&self, doc: &Document, id: NodeId) -> Option<SelectorRank> {
        self.0
            .iter()
            .filter(|s| s.matches(doc, id))
            .map(ComplexSelector::rank)
            .max()
    }

    pub fn matches(&self, doc: &Document, id: NodeId) -> bool {
        self.0.iter().any(|s| s.matches(doc, id))
    }
}

fn parent_element(doc: &Document, id: NodeId) -> Option<NodeId> {
    doc.parent(id).filter(|p| doc.element(*p).is_some())
}

fn sibling_slice(doc: &Document, id: NodeId) -> (&[NodeId], Option<usize>) {
    let siblings: &[NodeId] = match doc.parent(id) {
        Some(parent) => doc.children(parent),
        None => &[],
    };
    (siblings, siblings.iter().position(|c| *c == id))
}

/// Element siblings before `id`, nearest first.
fn preceding_element_siblings(doc: &Document, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
    let (siblings, pos) = sibling_slice(doc, id);
    siblings[..pos.unwrap_or(0)]
        .iter()
        .rev()
        .copied()
        .filter(move |c| doc.element(*c).is_some())
}

fn following_element_siblings(doc: &Document, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
    let (siblings, pos) = sibling_slice(doc, id);
    siblings[pos.map_or(siblings.len(), |p| p + 1)..]
        .iter()
        .copied()
        .filter(move |c| doc.element(*c).is_some())
}

/// Parses a rule prelude. `None` when any selector in the list is invalid,
/// which invalidates the whole rule.
pub fn parse_selector_list(prelude: &[ComponentValue]) -> Option<SelectorList> {
    let mut list = Vec::new();
    for part in prelude.split(|v| v.is_token(&CssToken::Comma)) {
        let part = trim_whitespace(part);
        match parse_complex(part) {
            Some(complex) => list.push(complex),
            None => {
                log::debug!(target: "css.parser", "invalid selector: {}", to_css_text(part));
                return None;
            }
        }
    }
    Some(SelectorList(list))
}

/// Convenience for tests and bindings.
pub fn parse_selectors(text: &str) -> Option<SelectorList> {
    parse_selector_list(&crate::parser::parse_component_values(text))
}

fn combinator_of(value: &ComponentValue) -> Option<Combinator> {
    match value.as_token()? {
        CssToken::Delim('>') => Some(Combinator::Child),
        CssToken::Delim('+') => Some(Combinator::NextSibling),
        CssToken::Delim('~') => Some(Combinator::SubsequentSibling),
        _ => None,
    }
}

fn parse_complex(values: &[ComponentValue]) -> Option<ComplexSelector> {
    if values.is_empty() {
        return None;
    }
    let mut compounds = Vec::new();
    let mut combinators = Vec::new();
    let mut i = 0;
    loop {
        let (compound, next) = parse_compound(values, i)?;
        compounds.push(compound);
        i = next;

        let mut saw_whitespace = false;
        while values.get(i).is_some_and(ComponentValue::is_whitespace) {
            saw_whitespace = true;
            i += 1;
        }
        if i >= values.len() {
            break;
        }
        match combinator_of(&values[i]) {
            Some(c) => {
                combinators.push(c);
                i += 1;
                while values.get(i).is_some_and(ComponentValue::is_whitespace) {
                    i += 1;
                }
            }
            None if saw_whitespace => combinators.push(Combinator::Descendant),
            None => return None,
        }
    }
    Some(ComplexSelector {
        compounds,
        combinators,
    })
}

fn parse_compound(values: &[ComponentValue], mut i: usize) -> Option<(CompoundSelector, usize)> {
    let mut simples = Vec::new();
    while let Some(value) = values.get(i) {
        let simple = match value {
            ComponentValue::Token(CssToken::Delim('*')) if simples.is_empty() => {
                SimpleSelector::Universal
            }
            ComponentValue::Token(CssToken::Ident(name)) if simples.is_empty() => {
                SimpleSelector::Type(name.to_ascii_lowercase())
            }
            ComponentValue::Token(CssToken::Hash { value, is_id: true }) => {
                SimpleSelector::Id(value.clone())
            }
            ComponentValue::Token(CssToken::Delim('.')) => match values.get(i + 1) {
                Some(ComponentValue::Token(CssToken::Ident(class))) => {
                    i += 1;
                    SimpleSelector::Class(class.clone())
                }
                _ => return None,
            },
            ComponentValue::Block(block) if block.kind == BlockKind::Bracket => {
                parse_attribute(&block.values)?
            }
            ComponentValue::Token(CssToken::Colon) => {
                let pseudo_element = values.get(i + 1).is_some_and(|v| v.is_token(&CssToken::Colon));
                if pseudo_element {
                    i += 1;
                }
                let name = match values.get(i + 1) {
                    Some(ComponentValue::Token(CssToken::Ident(name))) => name.to_ascii_lowercase(),
                    Some(ComponentValue::Function(func)) => func.name.clone(),
                    _ => return None,
                };
                i += 1;
                if pseudo_element {
                    SimpleSelector::PseudoElement(name)
                } else {
                    SimpleSelector::PseudoClass(name)
                }
            }
            ComponentValue::Token(CssToken::Whitespace) => break,
            other if combinator_of(other).is_some() => break,
            _ => return None,
        };
        simples.push(simple);
        i += 1;
    }
    if simples.is_empty() {
        return None;
    }
    Some((CompoundSelector(simples), i))
}

fn parse_attribute(values: &[ComponentValue]) -> Option<SimpleSelector> {
    let values: Vec<&ComponentValue> = values.iter().filter(|v| !v.is_whitespace()).collect();
    let name = match values.first()?.as_token()? {
        CssToken::Ident(name) => name.to_ascii_lowercase(),
        _ => return None,
    };
    match values.as_slice() {
        [_] => Some(SimpleSelector::Attribute { name, value: None }),
        [_, eq, value] if eq.is_token(&CssToken::Delim('=')) => {
            let value = match value.as_token()? {
                CssToken::Ident(v) | CssToken::String(v) => v.clone(),
                _ => return None,
            };
            Some(SimpleSelector::Attribute {
                name,
                value: Some(value),
            })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> Document {
        html::parse(
            r#"<div id="main" class="box wide"><p class="lead">a</p><p>b</p><span title=t>c</span></div><p>d</p>"#,
        )
    }

    fn matching(doc: &Document, selector: &str) -> Vec<String> {
        let list = parse_selectors(selector).expect("valid selector");
        doc.descendants(doc.root())
            .filter(|id| list.matches(doc, *id))
            .map(|id| doc.text_content(id))
            .collect()
    }

    #[test]
    fn type_selector_list_has_one_compound_per_entry() {
        let list = parse_selectors("body, div, h1, h2, h3, h4, h5, h6, p, ul").expect("valid");
        let names = ["body", "div", "h1", "h2", "h3", "h4", "h5", "h6", "p", "ul"];
        assert_eq!(list.len(), 10);
        for (complex, name) in list.iter().zip(names) {
            assert_eq!(complex.compounds.len(), 1);
            assert_eq!(complex.compounds[0].0, vec![SimpleSelector::Type(name.to_string())]);
        }
    }

    #[test]
    fn combinators() {
        let d = doc();
        assert_eq!(matching(&d, "div p"), vec!["a", "b"]);
        assert_eq!(matching(&d, "body > p"), vec!["d"]);
        assert_eq!(matching(&d, ".lead + p"), vec!["b"]);
        assert_eq!(matching(&d, ".lead ~ span"), vec!["c"]);
        assert_eq!(matching(&d, "#main>.lead"), vec!["a"]);
    }

    #[test]
    fn compound_and_attribute_selectors() {
        let d = doc();
        assert_eq!(matching(&d, "div.box.wide#main").len(), 1);
        assert!(matching(&d, "div.box.narrow").is_empty());
        assert_eq!(matching(&d, "[title]"), vec!["c"]);
        assert_eq!(matching(&d, "span[title=t]"), vec!["c"]);
        assert!(matching(&d, "span[title=\"x\"]").is_empty());
    }

    #[test]
    fn structural_pseudo_classes() {
        let d = doc();
        assert_eq!(matching(&d, "div > p:first-child"), vec!["a"]);
        assert_eq!(matching(&d, "div > :last-child"), vec!["c"]);
        assert!(matching(&d, "p:hover").is_empty());
        assert!(matching(&d, "p::before").is_empty());
    }

    #[test]
    fn sibling_combinators_skip_text_and_scan_wide_lists() {
        let items: String = (0..200).map(|i| format!("<i>{i}</i> ")).collect();
        let d = html::parse(&format!("<div>x <b>first</b> gap {items}<u>last</u> tail</div>"));
        assert_eq!(matching(&d, "b + i"), vec!["0"]);
        assert_eq!(matching(&d, "b ~ u"), vec!["last"]);
        assert_eq!(matching(&d, "i + u"), vec!["last"]);
        assert!(matching(&d, "u ~ i").is_empty());
        assert_eq!(matching(&d, "div > :first-child"), vec!["first"]);
        assert_eq!(matching(&d, "div > :last-child"), vec!["last"]);
    }

    #[test]
    fn invalid_selectors_reject_the_whole_list() {
        assert!(parse_selectors("p, ").is_none());
        assert!(parse_selectors("p > ").is_none());
        assert!(parse_selectors("div.").is_none());
        assert!(parse_selectors("p {").is_none());
    }

    #[test]
    fn rank_follows_subject_compound() {
        let rank = |s: &str| parse_selectors(s).expect("valid").0[0].rank();
        assert_eq!(rank("*"), SelectorRank::Universal);
        assert_eq!(rank("#x p"), SelectorRank::Type);
        assert_eq!(rank("p.a"), SelectorRank::Class);
        assert_eq!(rank("p#a"), SelectorRank::Id);
    }
}
