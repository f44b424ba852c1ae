//! Data-access layer for the greyhound racing portal: cached, throttled and authenticated
//! access to Dataverse tables, with uniform error normalization.
//!
//! The pieces compose bottom-up. [`cache::Cache`] and [`throttle::Throttle`] are standalone
//! engines; [`auth::AuthService`] owns tokens and the HTTP call; [`service::EntityService`]
//! wires all three per table, and [`domain`] adds table-specific queries on top.

pub mod auth;
pub mod cache;
pub mod config;
pub mod domain;
pub mod error_handler;
pub mod errors;
pub mod odata;
pub mod service;
pub mod throttle;
pub mod utils;

pub use auth::{AuthService, HostSession, HttpTransport, ReqwestTransport, RequestOptions, TokenProvider};
pub use cache::{Cache, CacheConfig, CacheStats};
pub use config::{Environment, PortalConfig, TableNames};
pub use error_handler::{ErrorContext, ErrorHandler, ErrorKind, Severity, StructuredError};
pub use errors::{DataError, Result};
pub use odata::{ListResult, ODataQuery};
pub use service::{CallOptions, EntityService};
pub use throttle::{Throttle, ThrottleConfig, ThrottleStats};
