//! HTTP client module
//!
//! Provides the request transport for every operation.
//!
//! # Features
//!
//! - **Versioned URLs**: Paths and refs resolve against `{server}/{api_path}/{version}`
//! - **Authentication**: API key or basic auth via the auth module
//! - **Security tokens**: Attached to writes, renewed once when rejected
//! - **Envelope unwrapping**: `Errors` arrays become [`crate::Error::Server`]

mod client;

pub use client::{
    unwrap_envelope, HttpClient, HttpClientConfig, HttpClientConfigBuilder, RequestConfig,
    RESULT_WRAPPERS,
};

#[cfg(test)]
mod tests;
