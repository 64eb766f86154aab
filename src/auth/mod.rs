//! Authentication module
//!
//! Supports: API Key, Basic
//!
//! The `Authenticator` applies credentials to every request and, for
//! basic-auth sessions, caches the security token that write requests
//! must carry.

mod authenticator;
mod types;

pub use authenticator::Authenticator;
pub use types::{AuthConfig, SecurityToken, API_KEY_HEADER};
