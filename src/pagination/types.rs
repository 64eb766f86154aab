//! Pagination types and traits
//!
//! Defines the query options, the page envelope returned by a fetch, the
//! per-page and per-batch summaries handed to callbacks, and the
//! `PageFetcher` boundary every driver pulls pages through.

use crate::error::Result;
use crate::query::Fetch;
use crate::refs::Ref;
use crate::types::JsonValue;
use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Default first record index (1-based)
pub const DEFAULT_START: u64 = 1;

/// Default and server-maximum page size
pub const DEFAULT_PAGE_SIZE: u64 = 200;

// ============================================================================
// Query options
// ============================================================================

/// Defaults merged into every query before it runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryDefaults {
    /// First record index
    #[serde(default = "default_start")]
    pub start: u64,
    /// Records per page
    #[serde(default = "default_page_size")]
    pub page_size: u64,
}

fn default_start() -> u64 {
    DEFAULT_START
}

fn default_page_size() -> u64 {
    DEFAULT_PAGE_SIZE
}

impl Default for QueryDefaults {
    fn default() -> Self {
        Self {
            start: DEFAULT_START,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Caller-supplied options for a paged query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOptions {
    /// Resource path (`defect`, `/defect/1234/tasks`)
    pub resource: String,
    /// First record index (1-based)
    pub start: Option<u64>,
    /// Requested page size
    pub page_size: Option<u64>,
    /// Maximum number of records across all pages
    pub limit: Option<u64>,
    /// Sort order
    pub order: Option<String>,
    /// Filter expression
    pub query: Option<String>,
    /// Field projection
    pub fetch: Option<Fetch>,
}

impl QueryOptions {
    /// Create options for a resource path
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            ..Default::default()
        }
    }

    /// Create options for an object's collection, e.g. a defect's tasks
    pub fn collection(reference: &Ref, collection: impl Into<String>) -> Self {
        Self::new(reference.with_collection(collection).relative())
    }

    /// Set the first record index
    #[must_use]
    pub fn start(mut self, start: u64) -> Self {
        self.start = Some(start);
        self
    }

    /// Set the requested page size
    #[must_use]
    pub fn page_size(mut self, page_size: u64) -> Self {
        self.page_size = Some(page_size);
        self
    }

    /// Set the overall record limit
    #[must_use]
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set the sort order
    #[must_use]
    pub fn order(mut self, order: impl Into<String>) -> Self {
        self.order = Some(order.into());
        self
    }

    /// Set the filter expression
    #[must_use]
    pub fn query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    /// Set the field projection
    #[must_use]
    pub fn fetch(mut self, fetch: impl Into<Fetch>) -> Self {
        self.fetch = Some(fetch.into());
        self
    }

    /// Merge defaults into a fresh, immutable query
    ///
    /// A start below 1 is raised to 1 and a page size of 0 to 1.
    pub fn resolve(&self, defaults: &QueryDefaults) -> ResolvedQuery {
        ResolvedQuery {
            resource: self.resource.clone(),
            start: self.start.unwrap_or(defaults.start).max(1),
            page_size: self.page_size.unwrap_or(defaults.page_size).max(1),
            limit: self.limit,
            order: self.order.clone(),
            query: self.query.clone(),
            fetch: self.fetch.clone(),
        }
    }
}

/// Query options with defaults applied
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedQuery {
    pub resource: String,
    pub start: u64,
    pub page_size: u64,
    pub limit: Option<u64>,
    pub order: Option<String>,
    pub query: Option<String>,
    pub fetch: Option<Fetch>,
}

impl ResolvedQuery {
    /// Page size of the first request
    ///
    /// Shrinks to a positive limit so a small limit does not over-fetch.
    pub fn first_page_size(&self) -> u64 {
        match self.limit {
            Some(limit) if limit > 0 => self.page_size.min(limit),
            _ => self.page_size,
        }
        .max(1)
    }

    /// The first page request
    pub fn first_request(&self) -> PageRequest {
        self.request(self.start, self.first_page_size())
    }

    /// A request for the page starting at `start`
    pub fn request(&self, start: u64, page_size: u64) -> PageRequest {
        PageRequest {
            resource: self.resource.clone(),
            start,
            page_size,
            query: self.query.clone(),
            order: self.order.clone(),
            fetch: self.fetch.clone(),
        }
    }

    /// Whether the limit forbids any request at all
    pub fn is_zero_limit(&self) -> bool {
        self.limit == Some(0)
    }
}

// ============================================================================
// Fetch boundary
// ============================================================================

/// Parameters of a single page request
#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    /// Resource path
    pub resource: String,
    /// First record index of this page
    pub start: u64,
    /// Records requested for this page
    pub page_size: u64,
    /// Filter expression
    pub query: Option<String>,
    /// Sort order
    pub order: Option<String>,
    /// Field projection
    pub fetch: Option<Fetch>,
}

impl PageRequest {
    /// Query-string parameters for this request
    pub fn query_params(&self) -> Vec<(String, String)> {
        let mut params = vec![
            ("start".to_string(), self.start.to_string()),
            ("pagesize".to_string(), self.page_size.to_string()),
        ];
        if let Some(query) = &self.query {
            params.push(("query".to_string(), query.clone()));
        }
        if let Some(order) = &self.order {
            params.push(("order".to_string(), order.clone()));
        }
        if let Some(fetch) = &self.fetch {
            params.push(("fetch".to_string(), fetch.to_string()));
        }
        params
    }
}

/// Raw per-request server response
///
/// Numeric fields that are missing or not non-negative integers are `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PageEnvelope {
    #[serde(default, deserialize_with = "lenient_records")]
    pub results: Vec<JsonValue>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub start_index: Option<u64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub page_size: Option<u64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub total_result_count: Option<u64>,
    #[serde(default, deserialize_with = "lenient_strings")]
    pub errors: Vec<String>,
    #[serde(default, deserialize_with = "lenient_strings")]
    pub warnings: Vec<String>,
}

impl PageEnvelope {
    /// Build an envelope from an unwrapped response body
    ///
    /// Anything that is not an object yields an empty envelope.
    pub fn from_value(value: JsonValue) -> Self {
        serde_json::from_value(value).unwrap_or_else(|e| {
            debug!("Malformed page envelope, treating as empty: {e}");
            Self::default()
        })
    }
}

fn lenient_count<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<u64>, D::Error> {
    let value = Option::<JsonValue>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(whole_number))
}

/// Non-negative integral JSON number, including float forms like `4.0`
fn whole_number(value: &JsonValue) -> Option<u64> {
    value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|f| *f >= 0.0 && f.fract() == 0.0 && *f < u64::MAX as f64)
            .map(|f| f as u64)
    })
}

fn lenient_records<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Vec<JsonValue>, D::Error> {
    match Option::<JsonValue>::deserialize(deserializer)? {
        Some(JsonValue::Array(records)) => Ok(records),
        _ => Ok(Vec::new()),
    }
}

fn lenient_strings<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Vec<String>, D::Error> {
    match Option::<JsonValue>::deserialize(deserializer)? {
        Some(JsonValue::Array(items)) => Ok(items
            .into_iter()
            .map(|item| match item {
                JsonValue::String(s) => s,
                other => other.to_string(),
            })
            .collect()),
        _ => Ok(Vec::new()),
    }
}

/// Source of pages
///
/// Implementations perform exactly one request per call. A failure carries
/// the server's error list and ends whichever driver asked for the page.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch one page
    async fn fetch_page(&self, request: &PageRequest) -> Result<PageEnvelope>;
}

#[async_trait]
impl<T: PageFetcher + ?Sized> PageFetcher for &T {
    async fn fetch_page(&self, request: &PageRequest) -> Result<PageEnvelope> {
        (**self).fetch_page(request).await
    }
}

#[async_trait]
impl<T: PageFetcher + ?Sized> PageFetcher for Arc<T> {
    async fn fetch_page(&self, request: &PageRequest) -> Result<PageEnvelope> {
        (**self).fetch_page(request).await
    }
}

// ============================================================================
// Continuation
// ============================================================================

/// Why pagination stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoneReason {
    /// The server reported no records past this page
    Exhausted,
    /// The caller's limit has been delivered
    LimitReached,
    /// Start index or total count unusable, or the start index does not
    /// match the request; more data cannot be ruled in
    MissingMetadata,
}

/// Result of the next page computation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextPage {
    /// Fetch the page starting at this index
    Continue { start: u64 },
    /// No more pages
    Done(DoneReason),
}

impl NextPage {
    /// Decide whether another page should be fetched
    ///
    /// Advances by the requested page size, never by a shrunken first-page size.
    /// The envelope must echo `requested_start`; any other start index could
    /// repeat or rewind a page, so it ends pagination.
    pub fn after(
        envelope: &PageEnvelope,
        requested_start: u64,
        page_size: u64,
        limit_reached: bool,
    ) -> Self {
        let (Some(start), Some(total)) = (
            envelope.start_index.filter(|s| *s > 0),
            envelope.total_result_count,
        ) else {
            return Self::Done(DoneReason::MissingMetadata);
        };
        if page_size == 0 || start != requested_start {
            return Self::Done(DoneReason::MissingMetadata);
        }
        if limit_reached {
            return Self::Done(DoneReason::LimitReached);
        }
        match start.checked_add(page_size) {
            Some(next) if next <= total => Self::Continue { start: next },
            _ => Self::Done(DoneReason::Exhausted),
        }
    }

    /// Check if this is a done result
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done(_))
    }
}

/// Trim a page so the running total does not pass the limit
///
/// Returns true once the limit has been met.
pub(crate) fn trim_to_limit(
    records: &mut Vec<JsonValue>,
    delivered: u64,
    limit: Option<u64>,
) -> bool {
    let Some(limit) = limit else {
        return false;
    };
    let remaining = limit.saturating_sub(delivered) as usize;
    records.truncate(remaining);
    delivered + records.len() as u64 >= limit
}

// ============================================================================
// Callback types
// ============================================================================

/// Continue-or-stop decision returned by page and batch callbacks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep fetching
    Continue,
    /// Stop after this page or batch
    Stop,
}

impl Flow {
    /// Check if we should continue
    pub fn should_continue(&self) -> bool {
        matches!(self, Self::Continue)
    }

    /// Check if we should stop
    pub fn should_stop(&self) -> bool {
        matches!(self, Self::Stop)
    }
}

impl From<bool> for Flow {
    fn from(keep_going: bool) -> Self {
        if keep_going {
            Self::Continue
        } else {
            Self::Stop
        }
    }
}

/// Summary of one delivered page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    /// Start index of this page
    pub start_index: u64,
    /// Records delivered in this page, after limit trimming
    pub count: usize,
    /// Server-reported total result count
    pub total_result_count: Option<u64>,
    /// Records delivered so far, this page included
    pub processed: u64,
}

/// One delivered page
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub records: Vec<JsonValue>,
    pub info: PageInfo,
}

/// Summary of one delivered batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchInfo {
    /// 1-based batch number
    pub batch_number: u64,
    /// Records in this batch
    pub count: usize,
    /// Records delivered so far, this batch included
    pub processed: u64,
    /// Server-reported total result count
    pub total_result_count: Option<u64>,
}

// ============================================================================
// Results
// ============================================================================

/// Outcome of a streamed query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamResult {
    /// Records delivered to the callback
    pub total_processed: u64,
    /// False when the callback asked to stop
    pub completed: bool,
}

/// Outcome of a batched query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    /// Records delivered across all batches
    pub total_processed: u64,
    /// Batches delivered
    pub total_batches: u64,
    /// False when the callback asked to stop
    pub completed: bool,
}

/// Outcome of a bulk query
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct QueryResult {
    /// All records, in server order
    pub results: Vec<JsonValue>,
    /// The caller's start index
    pub start_index: u64,
    /// Number of records returned
    pub page_size: u64,
    /// Server-reported total of the last page fetched
    pub total_result_count: Option<u64>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}
