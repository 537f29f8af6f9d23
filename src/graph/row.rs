//! Row and streaming types for query results.

use crate::error::AppError;
use futures::Stream;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::pin::Pin;

/// A stream of rows from a query result.
///
/// Uses `futures::Stream` so backends can produce rows lazily.
pub type RowStream<'a> = Pin<Box<dyn Stream<Item = Result<Row, AppError>> + Send + 'a>>;

/// A single result tuple, one value per `:find` element.
///
/// A Datalog result set is a collection of these groupings; a query with a
/// single `(pull ?e [*])` element yields one-element rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    values: Vec<JsonValue>,
}

impl Row {
    /// Creates a new row from its positional values.
    pub fn new(values: Vec<JsonValue>) -> Self {
        Self { values }
    }

    /// Gets a value by position, deserializing to the requested type.
    ///
    /// # Errors
    ///
    /// Returns an error if the position is out of range or if deserialization fails.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let name: String = row.get(0)?;
    /// ```
    pub fn get<T: DeserializeOwned>(&self, index: usize) -> Result<T, AppError> {
        self.values
            .get(index)
            .ok_or_else(|| AppError::InvalidRecord(format!("column {} out of range", index)))
            .and_then(|v| {
                serde_json::from_value(v.clone()).map_err(|e| {
                    AppError::InvalidRecord(format!("failed to deserialize column {}: {}", index, e))
                })
            })
    }

    /// Returns the raw JSON value at a position, if it exists.
    pub fn get_raw(&self, index: usize) -> Option<&JsonValue> {
        self.values.get(index)
    }

    /// Returns the number of values in this row.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the row has no values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Consumes the row and returns the underlying values.
    pub fn into_inner(self) -> Vec<JsonValue> {
        self.values
    }
}

impl From<Vec<JsonValue>> for Row {
    fn from(values: Vec<JsonValue>) -> Self {
        Self::new(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_row_get_string() {
        let row = Row::new(vec![json!("test")]);

        let name: String = row.get(0).unwrap();
        assert_eq!(name, "test");
    }

    #[test]
    fn test_row_get_out_of_range() {
        let row = Row::new(vec![json!(1)]);
        let result: Result<i64, _> = row.get(3);
        assert!(result.is_err());
    }

    #[test]
    fn test_row_get_wrong_type() {
        let row = Row::new(vec![json!({"name": "a"})]);
        let result: Result<i64, _> = row.get(0);
        assert!(matches!(result, Err(AppError::InvalidRecord(_))));
    }

    #[test]
    fn test_row_into_inner() {
        let row = Row::from(vec![json!(1), json!("b")]);
        assert_eq!(row.len(), 2);
        assert_eq!(row.get_raw(1), Some(&json!("b")));
        assert_eq!(row.into_inner(), vec![json!(1), json!("b")]);
    }
}
