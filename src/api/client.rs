//! REST API facade
//!
//! [`RestApi`] binds one HTTP client and one set of query defaults, and
//! exposes the paged query operations alongside thin single-request CRUD.

use crate::config::ClientConfig;
use crate::error::Result;
use crate::http::{HttpClient, RequestConfig};
use crate::pagination::{
    BatchInfo, BatchResult, Flow, PageEnvelope, PageFetcher, PageInfo, PageRequest, PageStream,
    Pager, QueryDefaults, QueryOptions, QueryResult, StreamResult,
};
use crate::query::Fetch;
use crate::refs::Ref;
use crate::types::{JsonObject, JsonValue};
use async_trait::async_trait;
use serde_json::json;
use std::future::Future;
use tracing::debug;

/// Client for a paged-collection REST API
#[derive(Debug)]
pub struct RestApi {
    http: HttpClient,
    defaults: QueryDefaults,
}

impl RestApi {
    /// Create a client from a validated config
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let http = HttpClient::with_auth(config.http_config(), config.auth())?;
        Ok(Self::with_http(http, config.defaults))
    }

    /// Create a client around an existing transport
    pub fn with_http(http: HttpClient, defaults: QueryDefaults) -> Self {
        Self { http, defaults }
    }

    /// Underlying transport
    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    /// Query defaults applied to every paged query
    pub fn defaults(&self) -> &QueryDefaults {
        &self.defaults
    }

    /// Pager bound to this client and its defaults
    pub fn pager(&self) -> Pager<'_> {
        Pager::new(self).with_defaults(&self.defaults)
    }

    // ========================================================================
    // Paged queries
    // ========================================================================

    /// Fetch every matching record
    pub async fn query(&self, options: &QueryOptions) -> Result<QueryResult> {
        self.pager().query(options).await
    }

    /// Hand each page to `on_page`
    pub async fn query_stream<F, Fut>(
        &self,
        options: &QueryOptions,
        on_page: F,
    ) -> Result<StreamResult>
    where
        F: FnMut(Vec<JsonValue>, PageInfo) -> Fut,
        Fut: Future<Output = Result<Flow>>,
    {
        self.pager().query_stream(options, on_page).await
    }

    /// Hand records to `on_batch` in batches of `batch_size`
    ///
    /// `None` uses the query's page size.
    pub async fn query_batch<F, Fut>(
        &self,
        options: &QueryOptions,
        batch_size: Option<usize>,
        on_batch: F,
    ) -> Result<BatchResult>
    where
        F: FnMut(Vec<JsonValue>, BatchInfo) -> Fut,
        Fut: Future<Output = Result<Flow>>,
    {
        self.pager().query_batch(options, batch_size, on_batch).await
    }

    /// Run a bulk query and hand its outcome to `done`
    pub async fn query_with_callback<F>(&self, options: &QueryOptions, done: F)
    where
        F: FnOnce(Result<QueryResult>),
    {
        done(self.query(options).await);
    }

    /// Pull-based pages of a query
    pub fn stream(&self, options: &QueryOptions) -> PageStream<'_> {
        self.pager().stream(options)
    }

    // ========================================================================
    // Single objects
    // ========================================================================

    /// Create an object of `object_type` and return it
    pub async fn create(
        &self,
        object_type: &str,
        data: JsonValue,
        fetch: Option<Fetch>,
    ) -> Result<JsonValue> {
        let object_type = object_type.trim_matches('/').to_lowercase();
        let path = format!("/{object_type}/create");
        let body = wrap_object(&object_type, data);

        let result = self.http.post(&path, body, fetch_config(fetch)).await?;
        Ok(take_object(result))
    }

    /// Read one object
    pub async fn get(&self, reference: &Ref, fetch: Option<Fetch>) -> Result<JsonValue> {
        let body = self
            .http
            .get(&reference.relative(), fetch_config(fetch))
            .await?;
        Ok(unwrap_object(reference.object_type(), body))
    }

    /// Update fields of one object and return it
    pub async fn update(
        &self,
        reference: &Ref,
        data: JsonValue,
        fetch: Option<Fetch>,
    ) -> Result<JsonValue> {
        let body = wrap_object(reference.object_type(), data);
        let result = self
            .http
            .post(&reference.relative(), body, fetch_config(fetch))
            .await?;
        Ok(take_object(result))
    }

    /// Delete one object
    pub async fn delete(&self, reference: &Ref) -> Result<JsonValue> {
        debug!("Deleting {reference}");
        self.http
            .delete(&reference.relative(), RequestConfig::new())
            .await
    }

    /// Add items to one of an object's collections
    ///
    /// Items may be refs (strings or `_ref` objects) or new objects.
    pub async fn add(
        &self,
        reference: &Ref,
        collection: &str,
        items: Vec<JsonValue>,
        fetch: Option<Fetch>,
    ) -> Result<JsonValue> {
        self.modify_collection(reference, collection, "add", items, fetch_config(fetch))
            .await
    }

    /// Remove items from one of an object's collections
    pub async fn remove(
        &self,
        reference: &Ref,
        collection: &str,
        items: Vec<JsonValue>,
    ) -> Result<JsonValue> {
        self.modify_collection(reference, collection, "remove", items, RequestConfig::new())
            .await
    }

    async fn modify_collection(
        &self,
        reference: &Ref,
        collection: &str,
        action: &str,
        items: Vec<JsonValue>,
        config: RequestConfig,
    ) -> Result<JsonValue> {
        let path = format!(
            "{}/{action}",
            reference.with_collection(collection).relative()
        );
        let items: Vec<JsonValue> = items.into_iter().map(collection_item).collect();
        self.http
            .post(&path, json!({ "CollectionItems": items }), config)
            .await
    }
}

#[async_trait]
impl PageFetcher for RestApi {
    async fn fetch_page(&self, request: &PageRequest) -> Result<PageEnvelope> {
        let config = RequestConfig::new().queries(request.query_params());
        let body = self.http.get(&request.resource, config).await?;
        Ok(PageEnvelope::from_value(body))
    }
}

fn fetch_config(fetch: Option<Fetch>) -> RequestConfig {
    match fetch {
        Some(fetch) => RequestConfig::new().query("fetch", fetch.to_string()),
        None => RequestConfig::new(),
    }
}

/// Body key for an object type: `Defect` for `defect`, `Feature` for `portfolioitem/feature`
fn object_key(object_type: &str) -> String {
    let name = object_type.rsplit('/').next().unwrap_or(object_type);
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `{"Defect": data}`
fn wrap_object(object_type: &str, data: JsonValue) -> JsonValue {
    let mut object = JsonObject::new();
    object.insert(object_key(object_type), data);
    JsonValue::Object(object)
}

/// The object inside a `{"Defect": {...}}` read response
fn unwrap_object(object_type: &str, body: JsonValue) -> JsonValue {
    let key = object_key(object_type);
    match body {
        JsonValue::Object(mut map) if map.len() == 1 => {
            let found = map.keys().find(|k| k.eq_ignore_ascii_case(&key)).cloned();
            match found.and_then(|k| map.remove(&k)) {
                Some(object) => object,
                None => JsonValue::Object(map),
            }
        }
        other => other,
    }
}

/// The written object from a create or update result
fn take_object(mut result: JsonValue) -> JsonValue {
    if let Some(object) = result.get_mut("Object") {
        return object.take();
    }
    result
}

/// Refs become `{"_ref": "/type/id"}`; anything else is sent as-is
fn collection_item(item: JsonValue) -> JsonValue {
    match Ref::from_value(&item) {
        Ok(reference) => json!({ "_ref": reference.relative() }),
        Err(_) => item,
    }
}
