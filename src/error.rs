//! Error types for the todo service.

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("invalid log level: `{0}`, try: [debug, info, warn, error]")]
    InvalidLogLevel(String),
}

/// Storage errors.
///
/// `NotFound` and `NoFieldsToUpdate` are matched by the HTTP layer; their
/// messages are returned to clients verbatim.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("todo `{id}` not found")]
    NotFound { id: i64 },

    #[error("no fields to update")]
    NoFieldsToUpdate,

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query failed: {0}")]
    Query(String),
}

/// Errors raised while decoding a partial-update body.
#[derive(Debug, thiserror::Error)]
pub enum PatchError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("patch body must be a JSON object")]
    NotAnObject,

    #[error("id is required")]
    MissingId,

    #[error("id is not a number")]
    IdNotNumber,

    #[error("id `{0}` is not an integer")]
    IdNotInteger(String),

    #[error("{field} is not a string")]
    NotAString { field: &'static str },

    #[error("{field} is not a boolean")]
    NotABoolean { field: &'static str },
}
