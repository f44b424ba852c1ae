use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Structured OData system query options.
///
/// Rendered in a fixed order (`$select`, `$filter`, `$orderby`, `$top`, `$skip`, `$expand`,
/// `$count`) so equal queries always produce equal cache keys.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ODataQuery {
    pub select: Vec<String>,
    pub filter: Option<String>,
    pub order_by: Option<String>,
    pub top: Option<u32>,
    pub skip: Option<u32>,
    pub expand: Vec<String>,
    pub count: bool,
}

impl ODataQuery {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn select<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select.extend(fields.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    #[must_use]
    pub fn order_by(mut self, order_by: impl Into<String>) -> Self {
        self.order_by = Some(order_by.into());
        self
    }

    #[must_use]
    pub fn top(mut self, top: u32) -> Self {
        self.top = Some(top);
        self
    }

    #[must_use]
    pub fn skip(mut self, skip: u32) -> Self {
        self.skip = Some(skip);
        self
    }

    #[must_use]
    pub fn expand<I, S>(mut self, relations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.expand.extend(relations.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn with_count(mut self) -> Self {
        self.count = true;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.to_query_string().is_empty()
    }

    /// `?$select=a,b&$filter=...`, or an empty string when no option is set.
    pub fn to_query_string(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        if !self.select.is_empty() {
            parts.push(format!("$select={}", escape_value(&self.select.join(","))));
        }
        if let Some(f) = self.filter.as_deref().filter(|f| !f.is_empty()) {
            parts.push(format!("$filter={}", escape_value(f)));
        }
        if let Some(o) = self.order_by.as_deref().filter(|o| !o.is_empty()) {
            parts.push(format!("$orderby={}", escape_value(o)));
        }
        if let Some(top) = self.top {
            parts.push(format!("$top={top}"));
        }
        if let Some(skip) = self.skip {
            parts.push(format!("$skip={skip}"));
        }
        if !self.expand.is_empty() {
            parts.push(format!("$expand={}", escape_value(&self.expand.join(","))));
        }
        if self.count {
            parts.push("$count=true".to_string());
        }
        if parts.is_empty() { String::new() } else { format!("?{}", parts.join("&")) }
    }
}

/// Percent-encodes only the characters that would split or truncate the query string.
/// Spaces and quotes are left readable; the HTTP client encodes them on the wire.
fn escape_value(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '%' => out.push_str("%25"),
            '&' => out.push_str("%26"),
            '#' => out.push_str("%23"),
            '+' => out.push_str("%2B"),
            _ => out.push(ch),
        }
    }
    out
}

/// OData string literal: `O'Brien` becomes `'O''Brien'`.
pub fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// OData `DateTimeOffset` literal in UTC, e.g. `2026-10-19T13:00:00Z`.
pub fn datetime_literal(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}
