//! Filter expressions and field projections
//!
//! Builds the `query` and `fetch` parameters understood by the collection API.
//!
//! ```rust,ignore
//! use collection_pager::query::Where;
//!
//! let filter = Where::new("State", "=", "In Progress").and(Where::new("Priority", "<", 3));
//! assert_eq!(filter.to_string(), r#"((State = "In Progress") AND (Priority < 3))"#);
//! ```

use crate::types::JsonValue;
use std::fmt;

/// A filter expression
#[derive(Debug, Clone, PartialEq)]
pub enum Where {
    /// Single comparison: `(field op value)`
    Condition {
        /// Field name (dotted paths allowed, e.g. `Owner.Name`)
        field: String,
        /// Operator (`=`, `!=`, `<`, `contains`, ...)
        op: String,
        /// Right-hand value
        value: JsonValue,
    },
    /// Both sides must match
    And(Box<Where>, Box<Where>),
    /// Either side may match
    Or(Box<Where>, Box<Where>),
}

impl Where {
    /// Create a single comparison
    pub fn new(
        field: impl Into<String>,
        op: impl Into<String>,
        value: impl Into<JsonValue>,
    ) -> Self {
        Self::Condition {
            field: field.into(),
            op: op.into(),
            value: value.into(),
        }
    }

    /// Combine with another expression using AND
    #[must_use]
    pub fn and(self, other: Where) -> Self {
        Self::And(Box::new(self), Box::new(other))
    }

    /// Combine with another expression using OR
    #[must_use]
    pub fn or(self, other: Where) -> Self {
        Self::Or(Box::new(self), Box::new(other))
    }
}

impl fmt::Display for Where {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Where::Condition { field, op, value } => {
                write!(f, "({field} {op} {})", render_value(value))
            }
            Where::And(left, right) => write!(f, "({left} AND {right})"),
            Where::Or(left, right) => write!(f, "({left} OR {right})"),
        }
    }
}

impl From<Where> for String {
    fn from(filter: Where) -> Self {
        filter.to_string()
    }
}

/// Render a comparison value; strings with whitespace are quoted
fn render_value(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => "null".to_string(),
        JsonValue::String(s) if s.chars().any(char::is_whitespace) => format!("\"{s}\""),
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Field projection for returned records
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Fetch {
    /// Every field (`fetch=true`)
    #[default]
    All,
    /// Only the named fields
    Fields(Vec<String>),
}

impl Fetch {
    /// Project the given fields
    pub fn fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Fields(fields.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for Fetch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fetch::All => f.write_str("true"),
            Fetch::Fields(fields) => f.write_str(&fields.join(",")),
        }
    }
}

impl From<Vec<String>> for Fetch {
    fn from(fields: Vec<String>) -> Self {
        Fetch::Fields(fields)
    }
}

impl<const N: usize> From<[&str; N]> for Fetch {
    fn from(fields: [&str; N]) -> Self {
        Fetch::fields(fields)
    }
}

impl From<&str> for Fetch {
    fn from(spec: &str) -> Self {
        if spec.trim() == "true" {
            return Fetch::All;
        }
        Fetch::fields(spec.split(',').map(str::trim).filter(|s| !s.is_empty()))
    }
}
