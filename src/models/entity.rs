//! Page entity model for records returned by tree queries.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::error::AppError;

/// A named page in the graph store.
///
/// Pages are read-only from this crate's perspective; records are transient
/// query results and are never cached between calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageEntity {
    /// Unique identifier, lower-cased by the store.
    pub name: String,
    /// Display form.
    #[serde(rename = "original-name")]
    pub original_name: String,
    /// Every other attribute the store returned.
    #[serde(flatten)]
    pub attributes: Map<String, JsonValue>,
}

impl PageEntity {
    /// Creates a page with no extra attributes.
    pub fn new(original_name: impl Into<String>) -> Self {
        let original_name = original_name.into();
        Self {
            name: original_name.to_lowercase(),
            original_name,
            attributes: Map::new(),
        }
    }

    /// Validates a loosely typed store record.
    ///
    /// `name` is required. A missing `original-name` falls back to `name`.
    pub fn from_record(record: JsonValue) -> Result<Self, AppError> {
        let JsonValue::Object(mut map) = record else {
            return Err(AppError::InvalidRecord(format!(
                "expected an entity map, got {}",
                record
            )));
        };

        let name = match map.remove("name") {
            Some(JsonValue::String(name)) if !name.is_empty() => name,
            Some(other) => {
                return Err(AppError::InvalidRecord(format!(
                    "entity name must be a non-empty string, got {}",
                    other
                )))
            }
            None => return Err(AppError::InvalidRecord("entity has no name".to_string())),
        };
        let original_name = match map.remove("original-name") {
            Some(JsonValue::String(original)) => original,
            _ => name.clone(),
        };

        Ok(Self {
            name,
            original_name,
            attributes: map,
        })
    }

    /// Orders pages by display name the way a locale-aware comparison does.
    /// See [`collate`].
    pub fn display_order(&self, other: &Self) -> Ordering {
        collate(&self.original_name, &other.original_name)
    }
}

/// Locale-style comparison of display names.
///
/// Levels, most significant first:
/// 1. base letters: accents stripped (NFD minus combining marks), case folded
/// 2. accents: unaccented before accented (`e` < `é`)
/// 3. case: lower case before upper case (`apple` < `Apple`)
pub fn collate(a: &str, b: &str) -> Ordering {
    base_key(a)
        .cmp(&base_key(b))
        .then_with(|| a.to_lowercase().cmp(&b.to_lowercase()))
        .then_with(|| b.cmp(a))
}

fn base_key(s: &str) -> String {
    s.nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
}
