use login_api::{AppState, InMemoryCredentialStore, PasswordHasher, Settings};
use std::sync::Arc;

/// App state over an in-memory store with cheap Argon2 parameters.
pub fn test_state() -> (AppState, InMemoryCredentialStore) {
    let config = Settings::new_for_test().expect("Failed to load test config");
    let store = InMemoryCredentialStore::new();
    let hasher = PasswordHasher::with_params(1024, 1, 1).expect("valid argon2 params");
    let state = AppState::with_parts(config, Arc::new(store.clone()), hasher)
        .expect("Failed to build app state");
    (state, store)
}
