use std::sync::OnceLock;

use crate::parser::{AtRule, Declaration, RawRule, parse_declaration_list, parse_rules};
use crate::selector::{SelectorList, parse_selector_list};

const DEFAULT_CSS: &str = include_str!("../data/default.css");

#[derive(Clone, Debug, PartialEq)]
pub struct Rule {
    pub selectors: SelectorList,
    pub declarations: Vec<Declaration>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Stylesheet {
    pub rules: Vec<Rule>,
    /// Kept for inspection; the resolver does not apply them.
    pub at_rules: Vec<AtRule>,
}

impl Stylesheet {
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Appends another sheet's rules after this one's.
    pub fn extend(&mut self, other: Stylesheet) {
        self.rules.extend(other.rules);
        self.at_rules.extend(other.at_rules);
    }
}

pub fn parse_stylesheet(text: &str) -> Stylesheet {
    let mut sheet = Stylesheet::default();
    for raw in parse_rules(text) {
        match raw {
            RawRule::Qualified(rule) => {
                let Some(selectors) = parse_selector_list(&rule.prelude) else {
                    continue;
                };
                sheet.rules.push(Rule {
                    selectors,
                    declarations: parse_declaration_list(&rule.block),
                });
            }
            RawRule::At(at) => {
                log::debug!(target: "css.parser", "at-rule @{} not applied", at.name);
                sheet.at_rules.push(at);
            }
        }
    }
    sheet
}

/// The user-agent stylesheet shipped with the crate.
pub fn default_stylesheet() -> &'static Stylesheet {
    static SHEET: OnceLock<Stylesheet> = OnceLock::new();
    SHEET.get_or_init(|| parse_stylesheet(DEFAULT_CSS))
}

/// Whether a `Content-Type` header value denotes a stylesheet.
pub fn is_css(ct: &Option<String>) -> bool {
    ct.as_deref()
        .map(|s| s.trim_start().to_ascii_lowercase().starts_with("text/css"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rules_with_bad_selectors_are_skipped() {
        let sheet = parse_stylesheet("p { color: red } p..x { color: blue } div { width: 1px }");
        assert_eq!(sheet.rules.len(), 2);
        assert_eq!(sheet.rules[1].declarations[0].name, "width");
    }

    #[test]
    fn at_rules_are_collected_separately() {
        let sheet = parse_stylesheet("@media print { p { color: red } } p { color: blue }");
        assert_eq!(sheet.rules.len(), 1);
        assert_eq!(sheet.at_rules.len(), 1);
    }

    #[test]
    fn default_stylesheet_parses() {
        let sheet = default_stylesheet();
        assert!(sheet.rules.len() > 10, "got {} rules", sheet.rules.len());
        assert!(sheet.rules.iter().all(|r| !r.declarations.is_empty()));
    }

    #[test]
    fn css_content_type() {
        assert!(is_css(&Some("text/css; charset=utf-8".into())));
        assert!(!is_css(&Some("text/html".into())));
        assert!(!is_css(&None));
    }
}
