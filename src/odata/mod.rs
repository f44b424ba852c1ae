//! OData v4 plumbing: query options, resource URLs and response envelopes.

mod envelope;
mod query;

pub use envelope::ListResult;
pub use query::{ODataQuery, datetime_literal, quote};

fn suffix(query: Option<&ODataQuery>) -> String {
    query.map(ODataQuery::to_query_string).unwrap_or_default()
}

/// `{api_root}/{table}{?query}`
pub fn collection_url(api_root: &str, table: &str, query: Option<&ODataQuery>) -> String {
    format!("{api_root}/{table}{}", suffix(query))
}

/// `{api_root}/{table}({id}){?query}`
pub fn entity_url(api_root: &str, table: &str, id: &str, query: Option<&ODataQuery>) -> String {
    format!("{api_root}/{table}({id}){}", suffix(query))
}
