use crate::errors::Result;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One page of a collection query.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ListResult<T> {
    pub value: Vec<T>,
    pub count: Option<u64>,
    pub has_more: bool,
    pub next_link: Option<String>,
}

impl<T> Default for ListResult<T> {
    fn default() -> Self {
        Self { value: Vec::new(), count: None, has_more: false, next_link: None }
    }
}

impl<T: DeserializeOwned> ListResult<T> {
    /// Normalize any response shape: a bare array is wrapped, a missing `value` is empty,
    /// `@odata.count` and `@odata.nextLink` are lifted out.
    pub fn from_response(body: Value) -> Result<Self> {
        match body {
            Value::Array(items) => Ok(Self {
                value: decode_items(items)?,
                ..Self::default()
            }),
            Value::Object(mut map) => {
                let items = match map.remove("value") {
                    Some(Value::Array(items)) => items,
                    _ => Vec::new(),
                };
                let count = map.get("@odata.count").and_then(Value::as_u64);
                let next_link = map
                    .get("@odata.nextLink")
                    .and_then(Value::as_str)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string);
                Ok(Self {
                    value: decode_items(items)?,
                    count,
                    has_more: next_link.is_some(),
                    next_link,
                })
            }
            _ => Ok(Self::default()),
        }
    }
}

fn decode_items<T: DeserializeOwned>(items: Vec<Value>) -> Result<Vec<T>> {
    items.into_iter().map(|v| Ok(serde_json::from_value(v)?)).collect()
}
