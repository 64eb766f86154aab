//! Pagination drivers
//!
//! `Pager` runs a query to completion in one of three ways:
//!
//! - [`Pager::query`] accumulates every record into one result
//! - [`Pager::query_stream`] hands each page to a callback
//! - [`Pager::query_batch`] regroups pages into fixed-size batches
//!
//! Pages are fetched strictly one at a time and in order. Every call owns
//! its own accumulator; nothing is shared between concurrent queries.

use super::batch::BatchAggregator;
use super::types::{
    trim_to_limit, BatchInfo, BatchResult, DoneReason, Flow, NextPage, Page, PageFetcher, PageInfo,
    PageRequest, QueryDefaults, QueryOptions, QueryResult, ResolvedQuery, StreamResult,
};
use crate::error::Result;
use crate::types::JsonValue;
use futures::Stream;
use std::future::Future;
use tracing::{debug, warn};

/// Runs paged queries against a [`PageFetcher`]
#[derive(Clone, Copy)]
pub struct Pager<'a> {
    fetcher: &'a dyn PageFetcher,
    defaults: &'a QueryDefaults,
}

static BUILTIN_DEFAULTS: QueryDefaults = QueryDefaults {
    start: super::types::DEFAULT_START,
    page_size: super::types::DEFAULT_PAGE_SIZE,
};

impl<'a> Pager<'a> {
    /// Create a pager with the built-in defaults (start 1, page size 200)
    pub fn new(fetcher: &'a dyn PageFetcher) -> Self {
        Self {
            fetcher,
            defaults: &BUILTIN_DEFAULTS,
        }
    }

    /// Use different query defaults
    #[must_use]
    pub fn with_defaults(mut self, defaults: &'a QueryDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Fetch every matching record into one result
    ///
    /// A transport failure discards everything accumulated so far.
    pub async fn query(&self, options: &QueryOptions) -> Result<QueryResult> {
        let query = options.resolve(self.defaults);
        let mut acc = Accumulator::new(&query);

        if query.is_zero_limit() {
            debug!("Limit is 0, skipping fetch for {}", query.resource);
            return Ok(acc.finish());
        }

        let mut request = query.first_request();
        loop {
            let mut envelope = self.fetcher.fetch_page(&request).await?;
            log_warnings(&request, &envelope.warnings);
            acc.total_result_count = envelope.total_result_count;
            acc.note_warnings(&envelope.warnings);

            let full = acc.append(std::mem::take(&mut envelope.results));
            match NextPage::after(&envelope, request.start, query.page_size, full) {
                NextPage::Continue { start } => {
                    request = query.request(start, query.page_size);
                }
                NextPage::Done(reason) => {
                    log_done(&request, reason);
                    break;
                }
            }
        }

        Ok(acc.finish())
    }

    /// Hand each page to `on_page` until the data, the limit, or the callback runs out
    ///
    /// The callback never sees an empty page. Returning [`Flow::Stop`] ends the
    /// query with `completed: false`.
    pub async fn query_stream<F, Fut>(
        &self,
        options: &QueryOptions,
        mut on_page: F,
    ) -> Result<StreamResult>
    where
        F: FnMut(Vec<JsonValue>, PageInfo) -> Fut,
        Fut: Future<Output = Result<Flow>>,
    {
        let mut pages = self.stream(options);
        while let Some(page) = pages.next_page().await? {
            if on_page(page.records, page.info).await?.should_stop() {
                debug!(
                    "Page callback stopped {} after {} records",
                    pages.query.resource, pages.processed
                );
                return Ok(StreamResult {
                    total_processed: pages.processed(),
                    completed: false,
                });
            }
        }

        Ok(StreamResult {
            total_processed: pages.processed(),
            completed: true,
        })
    }

    /// Regroup pages into batches of `batch_size` records for `on_batch`
    ///
    /// Batch size defaults to the query's page size. Every batch holds
    /// exactly `batch_size` records except possibly the last.
    pub async fn query_batch<F, Fut>(
        &self,
        options: &QueryOptions,
        batch_size: Option<usize>,
        mut on_batch: F,
    ) -> Result<BatchResult>
    where
        F: FnMut(Vec<JsonValue>, BatchInfo) -> Fut,
        Fut: Future<Output = Result<Flow>>,
    {
        let mut pages = self.stream(options);
        let batch_size = batch_size.unwrap_or(pages.query.page_size as usize);
        let mut batches = BatchAggregator::new(batch_size);
        let mut completed = true;

        'pages: while let Some(page) = pages.next_page().await? {
            let total = page.info.total_result_count;
            for record in page.records {
                let Some((batch, info)) = batches.push(record, total) else {
                    continue;
                };
                if on_batch(batch, info).await?.should_stop() {
                    completed = false;
                    break 'pages;
                }
            }
        }

        if let Some((batch, info)) = batches.flush(pages.total_result_count) {
            on_batch(batch, info).await?;
        }

        Ok(batches.result(completed))
    }

    /// Pull-based page stream for `options`
    pub fn stream(&self, options: &QueryOptions) -> PageStream<'a> {
        PageStream::new(self.fetcher, options.resolve(self.defaults))
    }
}

/// Pages of one query, fetched on demand
pub struct PageStream<'a> {
    fetcher: &'a dyn PageFetcher,
    query: ResolvedQuery,
    next: Option<PageRequest>,
    processed: u64,
    total_result_count: Option<u64>,
}

impl<'a> PageStream<'a> {
    /// Create a stream positioned at the query's first page
    pub fn new(fetcher: &'a dyn PageFetcher, query: ResolvedQuery) -> Self {
        let next = if query.is_zero_limit() {
            debug!("Limit is 0, skipping fetch for {}", query.resource);
            None
        } else {
            Some(query.first_request())
        };
        Self {
            fetcher,
            query,
            next,
            processed: 0,
            total_result_count: None,
        }
    }

    /// Fetch the next non-empty page, trimmed to the limit
    ///
    /// Returns `None` once no more pages exist.
    pub async fn next_page(&mut self) -> Result<Option<Page>> {
        while let Some(request) = self.next.take() {
            let mut envelope = self.fetcher.fetch_page(&request).await?;
            log_warnings(&request, &envelope.warnings);
            self.total_result_count = envelope.total_result_count;

            let mut records = std::mem::take(&mut envelope.results);
            let limit_reached = trim_to_limit(&mut records, self.processed, self.query.limit);
            self.processed += records.len() as u64;

            match NextPage::after(&envelope, request.start, self.query.page_size, limit_reached) {
                NextPage::Continue { start } => {
                    self.next = Some(self.query.request(start, self.query.page_size));
                }
                NextPage::Done(reason) => log_done(&request, reason),
            }

            if records.is_empty() {
                continue;
            }

            let info = PageInfo {
                start_index: request.start,
                count: records.len(),
                total_result_count: envelope.total_result_count,
                processed: self.processed,
            };
            return Ok(Some(Page { records, info }));
        }
        Ok(None)
    }

    /// Records delivered so far
    pub fn processed(&self) -> u64 {
        self.processed
    }

    /// Whether another fetch is pending
    pub fn is_done(&self) -> bool {
        self.next.is_none()
    }

    /// Adapt into a `futures` stream of pages
    pub fn into_stream(self) -> impl Stream<Item = Result<Page>> + 'a {
        futures::stream::try_unfold(self, |mut pages| async move {
            Ok(pages.next_page().await?.map(|page| (page, pages)))
        })
    }
}

/// Records gathered by a bulk query
struct Accumulator {
    records: Vec<JsonValue>,
    start: u64,
    limit: Option<u64>,
    total_result_count: Option<u64>,
    warnings: Vec<String>,
}

impl Accumulator {
    fn new(query: &ResolvedQuery) -> Self {
        Self {
            records: Vec::new(),
            start: query.start,
            limit: query.limit,
            total_result_count: None,
            warnings: Vec::new(),
        }
    }

    fn is_full(&self) -> bool {
        self.limit
            .is_some_and(|limit| self.records.len() as u64 >= limit)
    }

    /// Append a page; returns true once the limit has been met
    fn append(&mut self, mut page: Vec<JsonValue>) -> bool {
        if self.is_full() {
            return true;
        }
        let full = trim_to_limit(&mut page, self.records.len() as u64, self.limit);
        self.records.append(&mut page);
        full
    }

    fn note_warnings(&mut self, warnings: &[String]) {
        for warning in warnings {
            if !self.warnings.contains(warning) {
                self.warnings.push(warning.clone());
            }
        }
    }

    fn finish(self) -> QueryResult {
        QueryResult {
            page_size: self.records.len() as u64,
            results: self.records,
            start_index: self.start,
            total_result_count: self.total_result_count,
            errors: Vec::new(),
            warnings: self.warnings,
        }
    }
}

fn log_warnings(request: &PageRequest, warnings: &[String]) {
    for warning in warnings {
        warn!("{} (start {}): {warning}", request.resource, request.start);
    }
}

fn log_done(request: &PageRequest, reason: DoneReason) {
    debug!(
        "Pagination of {} done after start {}: {reason:?}",
        request.resource, request.start
    );
}
