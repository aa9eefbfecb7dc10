//! Authentication module for Bazaar.
//!
//! Provides user accounts, password hashing, sessions and one-shot tokens.

mod error;
mod password;
mod session;
mod token;
mod user;

pub use error::{AuthError, AuthResult};
pub use password::{PasswordHasher, MIN_PASSWORD_LEN};
pub use session::{Session, SessionStore};
pub use token::{generate_token, TokenStore, TokenType};
pub use user::{
    ProfileUpdate, Registration, Role, User, UserProfile, UserService, DEFAULT_AVATAR,
};
