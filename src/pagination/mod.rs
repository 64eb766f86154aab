//! Pagination module
//!
//! Supports: bulk accumulation, page streaming, fixed-size batching
//!
//! # Overview
//!
//! Every strategy pulls pages through a [`PageFetcher`] one at a time and
//! stops when the server reports no further records, when the caller's
//! limit has been delivered, or when a callback returns [`Flow::Stop`].
//! A page whose start index or total count is missing or non-numeric also
//! ends pagination, so a malformed response can never cause an unbounded
//! number of requests.

mod batch;
mod driver;
mod types;

pub use batch::BatchAggregator;
pub use driver::{PageStream, Pager};
pub use types::{
    BatchInfo, BatchResult, DoneReason, Flow, NextPage, Page, PageEnvelope, PageFetcher,
    PageInfo, PageRequest, QueryDefaults, QueryOptions, QueryResult, ResolvedQuery,
    StreamResult, DEFAULT_PAGE_SIZE, DEFAULT_START,
};
