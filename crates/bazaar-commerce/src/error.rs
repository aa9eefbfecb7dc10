//! Commerce error types.

use bazaar_db::DbError;
use thiserror::Error;

/// Errors that can occur in marketplace operations.
#[derive(Error, Debug)]
pub enum CommerceError {
    /// A referenced document does not exist.
    #[error("{entity} not found with id of {id}")]
    NotFound { entity: &'static str, id: String },

    /// Input failed validation.
    #[error("{0}")]
    Validation(String),

    /// A unique field is already taken.
    #[error("Duplicate field value entered: {0}")]
    Duplicate(String),

    /// The caller may not act on this resource.
    #[error("{0}")]
    Forbidden(String),

    /// Not enough stock to satisfy a request.
    #[error("Insufficient stock for {product}: requested {requested}, available {available}")]
    InsufficientStock {
        product: String,
        requested: i64,
        available: i64,
    },

    /// A coupon cannot be applied.
    #[error("{0}")]
    InvalidCoupon(String),

    /// Order status change not allowed.
    #[error("Cannot change order status from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    /// Arithmetic overflow.
    #[error("Arithmetic overflow in money calculation")]
    Overflow,

    /// Database error.
    #[error("Database error: {0}")]
    Database(DbError),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl CommerceError {
    /// Shorthand for a missing document.
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        CommerceError::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Shorthand for a validation failure.
    pub fn invalid(message: impl Into<String>) -> Self {
        CommerceError::Validation(message.into())
    }
}

impl From<DbError> for CommerceError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::DuplicateKey { fields, .. } => CommerceError::Duplicate(fields),
            other => CommerceError::Database(other),
        }
    }
}

impl From<serde_json::Error> for CommerceError {
    fn from(e: serde_json::Error) -> Self {
        CommerceError::Serialization(e.to_string())
    }
}

/// Result alias for marketplace operations.
pub type CommerceResult<T> = Result<T, CommerceError>;
