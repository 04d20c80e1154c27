//! Property metadata table.
//!
//! Loaded from JSON: `{ "<name>": { inherited, initial_value, max_values,
//! valid_types, longhands? } }`. The built-in table ships in
//! `data/properties.json`.

use std::collections::HashMap;
use std::sync::OnceLock;

use serde::Deserialize;
use thiserror::Error;

use crate::parser::parse_component_values;
use crate::values::{Value, parse_value};

const BUILTIN_TABLE: &str = include_str!("../data/properties.json");

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Color,
    Keyword,
    Length,
    Percentage,
    Number,
}

#[derive(Clone, Debug, Deserialize)]
pub struct PropertyInfo {
    pub inherited: bool,
    pub initial_value: String,
    #[serde(default = "one")]
    pub max_values: usize,
    pub valid_types: Vec<ValueType>,
    /// Non-empty for shorthands: the longhands in top/right/bottom/left order.
    #[serde(default)]
    pub longhands: Vec<String>,
    /// `initial_value` parsed against this entry's own types.
    #[serde(skip)]
    pub initial: Option<Value>,
}

fn one() -> usize {
    1
}

impl PropertyInfo {
    pub fn is_shorthand(&self) -> bool {
        !self.longhands.is_empty()
    }
}

#[derive(Debug, Error)]
pub enum PropertyTableError {
    #[error("malformed property table: {0}")]
    Json(#[from] serde_json::Error),
    #[error("property {property}: initial value {value:?} does not match its valid types")]
    BadInitialValue { property: String, value: String },
    #[error("shorthand {shorthand} names unknown longhand {longhand}")]
    UnknownLonghand { shorthand: String, longhand: String },
}

#[derive(Clone, Debug, Default)]
pub struct PropertyTable {
    properties: HashMap<String, PropertyInfo>,
}

impl PropertyTable {
    pub fn from_json(text: &str) -> Result<Self, PropertyTableError> {
        let mut properties: HashMap<String, PropertyInfo> = serde_json::from_str(text)?;
        for (name, info) in properties.iter_mut() {
            if info.initial_value.is_empty() {
                continue;
            }
            let parsed = parse_value(&parse_component_values(&info.initial_value), info);
            if parsed.is_none() {
                return Err(PropertyTableError::BadInitialValue {
                    property: name.clone(),
                    value: info.initial_value.clone(),
                });
            }
            info.initial = parsed;
        }
        for (name, info) in &properties {
            if let Some(missing) = info.longhands.iter().find(|l| !properties.contains_key(*l)) {
                return Err(PropertyTableError::UnknownLonghand {
                    shorthand: name.clone(),
                    longhand: missing.clone(),
                });
            }
        }
        Ok(Self { properties })
    }

    /// The table shipped with the crate, parsed once.
    pub fn builtin() -> &'static PropertyTable {
        static TABLE: OnceLock<PropertyTable> = OnceLock::new();
        TABLE.get_or_init(|| {
            PropertyTable::from_json(BUILTIN_TABLE).unwrap_or_else(|err| {
                log::error!(target: "css.style", "built-in property table rejected: {err}");
                PropertyTable::default()
            })
        })
    }

    pub fn get(&self, name: &str) -> Option<&PropertyInfo> {
        self.properties.get(name)
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Longhand properties, sorted by name.
    pub fn longhands(&self) -> Vec<(&str, &PropertyInfo)> {
        let mut out: Vec<(&str, &PropertyInfo)> = self
            .properties
            .iter()
            .filter(|(_, info)| !info.is_shorthand())
            .map(|(name, info)| (name.as_str(), info))
            .collect();
        out.sort_by(|a, b| a.0.cmp(b.0));
        out
    }
}
