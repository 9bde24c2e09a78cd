//! Authentication module for the login API
//!
//! Password hashing, JWT issuance/verification, and the service that ties
//! them to the credential store.

pub mod extractor;
pub mod handlers;
pub mod password;
pub mod service;
pub mod token;

pub use extractor::CurrentUser;
pub use password::PasswordHasher;
pub use service::{AuthService, TokenResponse, TOKEN_TYPE};
pub use token::{Claims, TokenIssuer};
