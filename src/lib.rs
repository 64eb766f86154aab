// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::match_wildcard_for_single_variants)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # Collection Pager
//!
//! Client-side pagination and batching for REST APIs that serve large
//! collections as start-index/page-size pages.
//!
//! ## Features
//!
//! - **Bulk queries**: Fetch every page and return one ordered result
//! - **Streamed queries**: Hand each page to an async callback that may stop early
//! - **Batched queries**: Regroup pages into fixed-size batches across page boundaries
//! - **Limits**: Trim to a record limit without over-fetching
//! - **CRUD**: Create, read, update, delete, and collection edits
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use collection_pager::{ClientConfig, Flow, QueryOptions, RestApi, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let api = RestApi::new(ClientConfig::from_env())?;
//!
//!     // Everything at once
//!     let all = api.query(&QueryOptions::new("defect").limit(500)).await?;
//!
//!     // Page by page
//!     let options = QueryOptions::new("defect").query("(State = Open)");
//!     api.query_stream(&options, |records, info| async move {
//!         println!("{} of {:?}", info.processed, info.total_result_count);
//!         Ok(Flow::from(!records.is_empty()))
//!     })
//!     .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          RestApi                            │
//! │  query()   query_stream()   query_batch()   create/get/...  │
//! └─────────────────────────────────────────────────────────────┘
//!                 │                                  │
//! ┌───────────────┴──────────────┐    ┌──────────────┴──────────┐
//! │           Pager              │    │        HttpClient       │
//! │  Accumulator │ PageStream    │───▶│  Auth │ Envelope unwrap │
//! │  BatchAggregator │ NextPage  │    │  Security token         │
//! └──────────────────────────────┘    └─────────────────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
#![allow(missing_docs)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types for the pager
pub mod error;

/// Common types and type aliases
pub mod types;

/// Authentication and security tokens
pub mod auth;

/// HTTP transport
pub mod http;

/// Object references
pub mod refs;

/// Query filter and fetch expressions
pub mod query;

/// Pagination drivers
pub mod pagination;

/// Client configuration
pub mod config;

/// REST API facade
pub mod api;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use api::RestApi;
pub use config::ClientConfig;
pub use pagination::{
    BatchInfo, BatchResult, Flow, PageFetcher, PageInfo, Pager, QueryOptions, QueryResult,
    StreamResult,
};
pub use query::{Fetch, Where};
pub use refs::Ref;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
