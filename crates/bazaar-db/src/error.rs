//! Database error types.

use thiserror::Error;

/// Errors that can occur when using the document store.
#[derive(Error, Debug)]
pub enum DbError {
    /// Failed to open the data directory or load a collection file.
    #[error("Failed to open database: {0}")]
    OpenError(String),

    /// Failed to persist a collection to disk.
    #[error("Failed to persist collection {collection}: {reason}")]
    PersistError { collection: String, reason: String },

    /// A document could not be converted to or from JSON.
    #[error("Serialization error: {0}")]
    SerializeError(String),

    /// A stored document is not a JSON object or lacks an `_id`.
    #[error("Malformed document in {collection}: {reason}")]
    MalformedDocument { collection: String, reason: String },

    /// A unique index would be violated.
    #[error("Duplicate value for {fields} in {collection}")]
    DuplicateKey { collection: String, fields: String },

    /// A document with the same id already exists.
    #[error("Document {id} already exists in {collection}")]
    DuplicateId { collection: String, id: String },
}

impl DbError {
    /// Check if this error is a unique index violation.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, DbError::DuplicateKey { .. } | DbError::DuplicateId { .. })
    }
}

impl From<serde_json::Error> for DbError {
    fn from(e: serde_json::Error) -> Self {
        DbError::SerializeError(e.to_string())
    }
}
