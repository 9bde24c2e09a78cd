//! Credential store for the login API.
//!
//! `DbOperations` is the Postgres-backed store used in production;
//! `InMemoryCredentialStore` keeps the same contract in process memory.

pub mod memory;
pub mod models;
pub mod operations;

pub use memory::InMemoryCredentialStore;
pub use models::{User, UserOut};
pub use operations::{CredentialStore, DbOperations};
