//! `Planning Center` OAuth session handling.
//!
//! [`TokenStore`] persists credentials, [`Authenticator`] keeps them valid.

/// Authenticator and authorization redirects
pub mod authenticator;
/// Credential and state types
pub mod credentials;
/// Durable key-value backends
pub mod storage;
/// Cached credential persistence
pub mod token_store;

pub use authenticator::{Authenticator, AuthorizationRequest, Navigator, PrintNavigator};
pub use credentials::{AuthState, Credentials, TokenExchangeResult};
pub use storage::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore};
pub use token_store::TokenStore;
