//! CSS: tokenizer, component-value parser, selectors, values and the style
//! resolver that turns a [`html::Document`] into a [`StyledNode`] tree.

pub mod parser;
pub mod properties;
pub mod selector;
pub mod style;
pub mod stylesheet;
pub mod tokenizer;
pub mod values;

// Re-exports so other crates can just use `css::...` nicely.
pub use parser::{ComponentValue, Declaration, parse_style_attribute};
pub use properties::{PropertyInfo, PropertyTable, PropertyTableError, ValueType};
pub use selector::{
    Combinator, ComplexSelector, CompoundSelector, SelectorList, SelectorRank, SimpleSelector,
    parse_selectors,
};
pub use style::{PropertyMap, StyleResolver, StyledContent, StyledNode, resolve_styles};
pub use stylesheet::{Rule, Stylesheet, default_stylesheet, is_css, parse_stylesheet};
pub use tokenizer::{CssToken, tokenize};
pub use values::{Color, DEFAULT_FONT_SIZE_PX, Display, Length, Unit, Value, parse_color};
