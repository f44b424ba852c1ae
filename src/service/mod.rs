//! The entity-service base every table-specific service is built on.

mod entity;
mod options;

pub use entity::{CachedResult, EntityService, MAX_PAGES};
pub use options::CallOptions;
