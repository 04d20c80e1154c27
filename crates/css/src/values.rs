use std::fmt;

use crate::parser::{ComponentValue, FunctionValue};
use crate::properties::{PropertyInfo, ValueType};
use crate::tokenizer::CssToken;

pub const DEFAULT_FONT_SIZE_PX: f32 = 16.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const TRANSPARENT: Color = Color {
        r: 0,
        g: 0,
        b: 0,
        a: 0,
    };

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color { r, g, b, a: 255 }
    }

    pub fn is_transparent(&self) -> bool {
        self.a == 0
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a == 255 {
            write!(f, "rgb({}, {}, {})", self.r, self.g, self.b)
        } else {
            write!(f, "rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Unit {
    Px,
    Em,
    Rem,
    In,
    Cm,
    Mm,
    Pt,
    Pc,
}

impl Unit {
    pub fn parse(unit: &str) -> Option<Unit> {
        match unit.to_ascii_lowercase().as_str() {
            "px" => Some(Unit::Px),
            "em" => Some(Unit::Em),
            "rem" => Some(Unit::Rem),
            "in" => Some(Unit::In),
            "cm" => Some(Unit::Cm),
            "mm" => Some(Unit::Mm),
            "pt" => Some(Unit::Pt),
            "pc" => Some(Unit::Pc),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Unit::Px => "px",
            Unit::Em => "em",
            Unit::Rem => "rem",
            Unit::In => "in",
            Unit::Cm => "cm",
            Unit::Mm => "mm",
            Unit::Pt => "pt",
            Unit::Pc => "pc",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Length {
    pub value: f32,
    pub unit: Unit,
}

impl Length {
    pub const fn px(value: f32) -> Self {
        Length {
            value,
            unit: Unit::Px,
        }
    }

    /// Absolute pixels; `em` against `font_size`, `rem` against the root size.
    pub fn to_px(&self, font_size: f32) -> f32 {
        match self.unit {
            Unit::Px => self.value,
            Unit::Em => self.value * font_size,
            Unit::Rem => self.value * DEFAULT_FONT_SIZE_PX,
            Unit::In => self.value * 96.0,
            Unit::Cm => self.value * 96.0 / 2.54,
            Unit::Mm => self.value * 96.0 / 25.4,
            Unit::Pt => self.value * 96.0 / 72.0,
            Unit::Pc => self.value * 16.0,
        }
    }
}

/// CSS `display` value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Display {
    Block,
    Inline,
    InlineBlock,
    ListItem,
    None,
}

impl Display {
    pub fn from_keyword(value: &str) -> Option<Display> {
        match value.to_ascii_lowercase().as_str() {
            "block" => Some(Display::Block),
            "inline" => Some(Display::Inline),
            "inline-block" => Some(Display::InlineBlock),
            "list-item" => Some(Display::ListItem),
            "none" => Some(Display::None),
            _ => None,
        }
    }

    pub fn is_block_level(self) -> bool {
        matches!(self, Display::Block | Display::ListItem)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Color(Color),
    Keyword(String),
    Length(Length),
    Percentage(f32),
    Number(f32),
    Array(Vec<Value>),
}

impl Value {
    pub fn keyword(&self) -> Option<&str> {
        match self {
            Value::Keyword(k) => Some(k),
            _ => None,
        }
    }

    pub fn is_keyword(&self, word: &str) -> bool {
        self.keyword() == Some(word)
    }

    pub fn as_color(&self) -> Option<Color> {
        match self {
            Value::Color(c) => Some(*c),
            _ => None,
        }
    }

    /// Pixels for lengths (and unitless zero); percentages against `reference`.
    pub fn to_px(&self, font_size: f32, reference: f32) -> Option<f32> {
        match self {
            Value::Length(len) => Some(len.to_px(font_size)),
            Value::Percentage(p) => Some(reference * p / 100.0),
            Value::Number(n) if *n == 0.0 => Some(0.0),
            _ => None,
        }
    }

    /// Items of a list value; a single value is a one-item list.
    pub fn items(&self) -> &[Value] {
        match self {
            Value::Array(items) => items,
            single => std::slice::from_ref(single),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Color(c) => write!(f, "{c}"),
            Value::Keyword(k) => write!(f, "{k}"),
            Value::Length(l) => write!(f, "{}{}", l.value, l.unit.as_str()),
            Value::Percentage(p) => write!(f, "{p}%"),
            Value::Number(n) => write!(f, "{n}"),
            Value::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
        }
    }
}

pub fn named_color(name: &str) -> Option<Color> {
    let c = match name.to_ascii_lowercase().as_str() {
        "black" => Color::rgb(0, 0, 0),
        "blue" => Color::rgb(0, 0, 255),
        "cyan" | "aqua" => Color::rgb(0, 255, 255),
        "gray" | "grey" => Color::rgb(128, 128, 128),
        "green" => Color::rgb(0, 128, 0),
        "lime" => Color::rgb(0, 255, 0),
        "magenta" | "fuchsia" => Color::rgb(255, 0, 255),
        "maroon" => Color::rgb(128, 0, 0),
        "navy" => Color::rgb(0, 0, 128),
        "olive" => Color::rgb(128, 128, 0),
        "orange" => Color::rgb(255, 165, 0),
        "purple" => Color::rgb(128, 0, 128),
        "red" => Color::rgb(255, 0, 0),
        "silver" => Color::rgb(192, 192, 192),
        "teal" => Color::rgb(0, 128, 128),
        "white" => Color::rgb(255, 255, 255),
        "yellow" => Color::rgb(255, 255, 0),
        "transparent" => Color::TRANSPARENT,
        _ => return None,
    };
    Some(c)
}

pub fn parse_hex_color(hex: &str) -> Option<Color> {
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let digit = |s: &str| u8::from_str_radix(s, 16).ok();
    let double = |s: &str| digit(&s.repeat(2));
    match hex.len() {
        3 => Some(Color::rgb(double(&hex[0..1])?, double(&hex[1..2])?, double(&hex[2..3])?)),
        6 => Some(Color::rgb(digit(&hex[0..2])?, digit(&hex[2..4])?, digit(&hex[4..6])?)),
        8 => Some(Color {
            r: digit(&hex[0..2])?,
            g: digit(&hex[2..4])?,
            b: digit(&hex[4..6])?,
            a: digit(&hex[6..8])?,
        }),
        _ => None,
    }
}

/// Parses a color from text: hex, named, `rgb()`/`rgba()`.
pub fn parse_color(text: &str) -> Option<Color> {
    let values = crate::parser::parse_component_values(text.trim());
    match values.as_slice() {
        [single] => color_from_component(single),
        _ => None,
    }
}

fn color_from_component(value: &ComponentValue) -> Option<Color> {
    match value {
        ComponentValue::Token(CssToken::Hash { value, .. }) => parse_hex_color(value),
        ComponentValue::Token(CssToken::Ident(name)) => named_color(name),
        ComponentValue::Function(func) if func.name == "rgb" || func.name == "rgba" => {
            rgb_function(func)
        }
        _ => None,
    }
}

fn rgb_function(func: &FunctionValue) -> Option<Color> {
    let args = func.arguments();
    if args.len() != 3 && args.len() != 4 {
        return None;
    }
    let mut channels = [0u8; 3];
    for (slot, arg) in channels.iter_mut().zip(&args) {
        let v = match arg {
            [ComponentValue::Token(CssToken::Number(n))] => *n,
            [ComponentValue::Token(CssToken::Percentage(p))] => p * 255.0 / 100.0,
            _ => return None,
        };
        *slot = v.round().clamp(0.0, 255.0) as u8;
    }
    let alpha = match args.get(3) {
        None => 255,
        Some([ComponentValue::Token(CssToken::Number(n))]) => (n.clamp(0.0, 1.0) * 255.0).round() as u8,
        Some([ComponentValue::Token(CssToken::Percentage(p))]) => {
            (p.clamp(0.0, 100.0) * 255.0 / 100.0).round() as u8
        }
        Some(_) => return None,
    };
    Some(Color {
        r: channels[0],
        g: channels[1],
        b: channels[2],
        a: alpha,
    })
}

fn parse_single(value: &ComponentValue, types: &[ValueType]) -> Option<Value> {
    let allows = |t: ValueType| types.contains(&t);
    match value {
        ComponentValue::Token(CssToken::Ident(word)) => {
            if allows(ValueType::Color) {
                if let Some(c) = named_color(word) {
                    return Some(Value::Color(c));
                }
            }
            allows(ValueType::Keyword).then(|| Value::Keyword(word.to_ascii_lowercase()))
        }
        ComponentValue::Token(CssToken::Hash { .. }) | ComponentValue::Function(_)
            if allows(ValueType::Color) =>
        {
            color_from_component(value).map(Value::Color)
        }
        ComponentValue::Token(CssToken::Dimension { value, unit }) if allows(ValueType::Length) => {
            Unit::parse(unit).map(|unit| Value::Length(Length { value: *value, unit }))
        }
        ComponentValue::Token(CssToken::Percentage(p)) if allows(ValueType::Percentage) => {
            Some(Value::Percentage(*p))
        }
        ComponentValue::Token(CssToken::Number(n)) => {
            if allows(ValueType::Number) {
                Some(Value::Number(*n))
            } else if *n == 0.0 && allows(ValueType::Length) {
                Some(Value::Length(Length::px(0.0)))
            } else {
                None
            }
        }
        _ => None,
    }
}

/// Validates a declaration value against a property's metadata.
///
/// Whitespace and commas separate items; each item must parse as one of the
/// property's `valid_types`, and there may be at most `max_values` of them.
pub fn parse_value(values: &[ComponentValue], info: &PropertyInfo) -> Option<Value> {
    let mut items = Vec::new();
    for value in values {
        if value.is_whitespace() || value.is_token(&CssToken::Comma) {
            continue;
        }
        items.push(parse_single(value, &info.valid_types)?);
    }
    if items.is_empty() || items.len() > info.max_values.max(1) {
        return None;
    }
    if items.len() == 1 {
        items.pop()
    } else {
        Some(Value::Array(items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_component_values;

    fn info(types: &[ValueType], max_values: usize) -> PropertyInfo {
        PropertyInfo {
            inherited: false,
            initial_value: String::new(),
            max_values,
            valid_types: types.to_vec(),
            longhands: Vec::new(),
            initial: None,
        }
    }

    #[test]
    fn color_forms() {
        assert_eq!(parse_color("#f00"), Some(Color::rgb(255, 0, 0)));
        assert_eq!(parse_color("#00ff00"), Some(Color::rgb(0, 255, 0)));
        assert_eq!(
            parse_color("#0000ff80"),
            Some(Color {
                r: 0,
                g: 0,
                b: 255,
                a: 128
            })
        );
        assert_eq!(parse_color("rgb(1, 2, 3)"), Some(Color::rgb(1, 2, 3)));
        assert_eq!(parse_color("rgba(255,0,0,0)").map(|c| c.a), Some(0));
        assert_eq!(parse_color("Navy"), Some(Color::rgb(0, 0, 128)));
        assert_eq!(parse_color("#12"), None);
        assert_eq!(parse_hex_color("+f+f+f"), None);
        assert_eq!(parse_hex_color("+ff"), None);
        assert_eq!(parse_hex_color("aBc"), Some(Color::rgb(0xaa, 0xbb, 0xcc)));
        assert_eq!(parse_color("rgb(1,2)"), None);
    }

    #[test]
    fn lengths_convert_to_pixels() {
        assert_eq!(Length::px(3.0).to_px(20.0), 3.0);
        assert_eq!(Length { value: 2.0, unit: Unit::Em }.to_px(20.0), 40.0);
        assert_eq!(Length { value: 1.0, unit: Unit::Rem }.to_px(20.0), 16.0);
        assert_eq!(Length { value: 1.0, unit: Unit::In }.to_px(0.0), 96.0);
        assert_eq!(Length { value: 12.0, unit: Unit::Pt }.to_px(0.0), 16.0);
        assert_eq!(Value::Percentage(50.0).to_px(16.0, 300.0), Some(150.0));
    }

    #[test]
    fn values_are_validated_against_metadata() {
        let margin = info(&[ValueType::Length, ValueType::Percentage, ValueType::Keyword], 4);
        let parsed = parse_value(&parse_component_values("0 auto"), &margin);
        assert_eq!(
            parsed,
            Some(Value::Array(vec![
                Value::Length(Length::px(0.0)),
                Value::Keyword("auto".into())
            ]))
        );
        assert_eq!(parse_value(&parse_component_values("1px 2px 3px 4px 5px"), &margin), None);
        assert_eq!(parse_value(&parse_component_values("red"), &margin), Some(Value::Keyword("red".into())));

        let width = info(&[ValueType::Length], 1);
        assert_eq!(parse_value(&parse_component_values("10furlongs"), &width), None);
        assert_eq!(parse_value(&parse_component_values("5"), &width), None);
    }

    #[test]
    fn unknown_color_keyword_is_kept_as_keyword() {
        let color = info(&[ValueType::Color, ValueType::Keyword], 1);
        assert_eq!(
            parse_value(&parse_component_values("blurple"), &color),
            Some(Value::Keyword("blurple".into()))
        );
        assert_eq!(
            parse_value(&parse_component_values("#fff"), &color),
            Some(Value::Color(Color::WHITE))
        );
    }
}
