//! Authentication module for Minicord
//!
//! Username/password login against `/auth/login`; the returned bearer token
//! and user profile are persisted in the config file.

pub mod session;
pub mod tokens;

pub use session::{check_username, login, logout, signup, status};
pub use tokens::{StoredToken, TokenStore};

/// Environment variable consulted for the password before prompting.
pub const PASSWORD_ENV: &str = "MINICORD_PASSWORD";
