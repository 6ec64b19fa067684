//! API key storage.
//!
//! The backend authenticates every request with a static API key. This
//! module keeps it in the OS keychain via `keyring` so it never lands in the
//! plain-text config file.

pub mod credentials;

pub use credentials::ApiKeyStore;
