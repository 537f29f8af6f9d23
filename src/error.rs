//! Application error types.

use thiserror::Error;

/// Application-level errors for pagetree.
#[derive(Error, Debug)]
pub enum AppError {
    // Store errors
    #[error("Graph store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Query error: {message}")]
    Query { message: String, query: String },

    #[error("Query parse error: {0}")]
    Parse(String),

    #[error("Invalid entity record: {0}")]
    InvalidRecord(String),

    // Placeholder errors
    #[error("Malformed tree placeholder: {0}")]
    MalformedConfiguration(String),

    // Document errors
    #[error("Element not found: {0}")]
    ElementNotFound(usize),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // Config errors
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

impl AppError {
    /// Builds a query error carrying the offending query text.
    pub fn query(message: impl Into<String>, query: &str) -> Self {
        AppError::Query {
            message: message.into(),
            query: query.to_string(),
        }
    }
}
