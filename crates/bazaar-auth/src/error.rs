//! Authentication errors.

use bazaar_commerce::CommerceError;
use bazaar_db::DbError;
use thiserror::Error;

/// Authentication error type.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Wrong email or password.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// No usable session was presented.
    #[error("Please login to access this resource")]
    NotAuthenticated,

    /// User not found.
    #[error("User not found with id of {0}")]
    UserNotFound(String),

    /// Email already registered.
    #[error("User already exists with this email")]
    UserAlreadyExists,

    /// Reset token unknown, used or expired.
    #[error("Reset password token is invalid or has been expired")]
    InvalidToken,

    /// Password does not meet the policy.
    #[error("{0}")]
    WeakPassword(String),

    /// Input failed validation.
    #[error("{0}")]
    Validation(String),

    /// Current password did not match on a password change.
    #[error("Old password is incorrect")]
    IncorrectPassword,

    /// Role does not allow the action.
    #[error("Role ({0}) is not allowed to access this resource")]
    InsufficientPermissions(String),

    /// Password hashing failed.
    #[error("hashing error: {0}")]
    Hashing(String),

    /// Cache error.
    #[error("cache error: {0}")]
    Cache(#[from] bazaar_cache::CacheError),

    /// Domain or storage error.
    #[error(transparent)]
    Commerce(#[from] CommerceError),
}

impl From<DbError> for AuthError {
    fn from(e: DbError) -> Self {
        AuthError::Commerce(e.into())
    }
}

impl AuthError {
    /// Check if this is an authentication failure.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            AuthError::InvalidCredentials | AuthError::NotAuthenticated
        )
    }

    /// Check if this is a permission error.
    pub fn is_permission_error(&self) -> bool {
        matches!(self, AuthError::InsufficientPermissions(_))
    }
}

/// Result alias for account operations.
pub type AuthResult<T> = Result<T, AuthError>;
