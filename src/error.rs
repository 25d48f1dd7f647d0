use thiserror::Error;

/// Custom error type for Plume operations.
#[derive(Debug, Error)]
pub enum PlumeError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(String),

    /// Requested record was not found.
    #[error("Not found: {entity_type} with id '{id}'")]
    NotFound { entity_type: String, id: String },

    /// Input validation failed.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Conflict detected (e.g., duplicate titles, already-processed changes).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Query execution failed.
    #[error("Query error: {message}")]
    Query {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Deletion blocked due to referential integrity constraint.
    #[error("Cannot delete {entity_type} '{entity_id}': {message}")]
    ReferentialIntegrityViolation {
        entity_type: String,
        entity_id: String,
        message: String,
    },

    /// LLM provider returned a typed failure.
    ///
    /// `kind` is one of the stable error codes surfaced to callers:
    /// `insufficient_credits`, `invalid_api_key`, `api_error_<status>`,
    /// `timeout`, `parse_error`.
    #[error("LLM error ({kind}): {message}")]
    Llm { kind: String, message: String },
}

impl PlumeError {
    /// Shorthand for a typed LLM failure.
    pub fn llm(kind: impl Into<String>, message: impl Into<String>) -> Self {
        PlumeError::Llm {
            kind: kind.into(),
            message: message.into(),
        }
    }
}

impl From<surrealdb::Error> for PlumeError {
    fn from(err: surrealdb::Error) -> Self {
        PlumeError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for PlumeError {
    fn from(err: serde_json::Error) -> Self {
        PlumeError::Database(format!("JSON serialization error: {}", err))
    }
}

impl From<std::io::Error> for PlumeError {
    fn from(err: std::io::Error) -> Self {
        PlumeError::Database(format!("I/O error: {}", err))
    }
}
