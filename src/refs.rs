//! Object references
//!
//! A ref identifies one object (or one of its collections) on the server.
//! Accepted forms:
//!
//! - `/defect/1234`
//! - `defect/1234.js`
//! - `https://host/slm/webservice/v2.0/defect/1234`
//! - `/portfolioitem/feature/1234`
//! - `/defect/1234/tasks` (collection)
//! - `{"_ref": "/defect/1234"}`

use crate::error::{Error, Result};
use crate::types::JsonValue;
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

/// Matches the API-relative part of a ref: `type[/subtype]/id[.js][/collection]`
static REF_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^/?(?P<type>[A-Za-z]+(?:/[A-Za-z]+)?)/(?P<id>-?\d+|[0-9A-Fa-f]{8}-[0-9A-Fa-f]{4}-[0-9A-Fa-f]{4}-[0-9A-Fa-f]{4}-[0-9A-Fa-f]{12})(?:\.js)?(?:/(?P<collection>[A-Za-z]+))?/?$",
    )
    .unwrap()
});

/// Matches the service prefix of an absolute ref
static PREFIX_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:https?://[^/]+)?(?:/[^/]+)*?/webservice/[^/]+").unwrap()
});

/// A parsed object reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ref {
    object_type: String,
    object_id: String,
    collection: Option<String>,
}

impl Ref {
    /// Parse a ref from its string form
    pub fn parse(value: &str) -> Result<Self> {
        let trimmed = value.trim();
        let without_query = trimmed.split('?').next().unwrap_or_default();
        let relative = PREFIX_REGEX.replace(without_query, "");
        let relative = strip_host(&relative);

        let caps = REF_REGEX
            .captures(relative)
            .ok_or_else(|| Error::invalid_ref(trimmed))?;

        Ok(Self {
            object_type: caps["type"].to_lowercase(),
            object_id: caps["id"].to_string(),
            collection: caps.name("collection").map(|m| m.as_str().to_string()),
        })
    }

    /// Parse a ref from a JSON string or an object carrying `_ref`
    pub fn from_value(value: &JsonValue) -> Result<Self> {
        match value {
            JsonValue::String(s) => Self::parse(s),
            JsonValue::Object(map) => match map.get("_ref") {
                Some(JsonValue::String(s)) => Self::parse(s),
                _ => Err(Error::invalid_ref(value.to_string())),
            },
            other => Err(Error::invalid_ref(other.to_string())),
        }
    }

    /// Object type, lowercased (`defect`, `portfolioitem/feature`)
    pub fn object_type(&self) -> &str {
        &self.object_type
    }

    /// Object id
    pub fn object_id(&self) -> &str {
        &self.object_id
    }

    /// Collection name, when the ref points at a collection
    pub fn collection(&self) -> Option<&str> {
        self.collection.as_deref()
    }

    /// Ref to one of this object's collections
    #[must_use]
    pub fn with_collection(&self, collection: impl Into<String>) -> Self {
        Self {
            collection: Some(collection.into()),
            ..self.clone()
        }
    }

    /// API-relative form: `/type/id[/collection]`
    pub fn relative(&self) -> String {
        match &self.collection {
            Some(collection) => format!("/{}/{}/{collection}", self.object_type, self.object_id),
            None => format!("/{}/{}", self.object_type, self.object_id),
        }
    }
}

impl fmt::Display for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.relative())
    }
}

impl std::str::FromStr for Ref {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Check whether a value is a valid ref
pub fn is_ref(value: &JsonValue) -> bool {
    Ref::from_value(value).is_ok()
}

/// Drop `scheme://host` from absolute URLs without a service prefix
fn strip_host(value: &str) -> &str {
    let Some(rest) = value
        .strip_prefix("https://")
        .or_else(|| value.strip_prefix("http://"))
    else {
        return value;
    };
    rest.find('/').map_or("", |idx| &rest[idx..])
}
