//! Utility modules: developer tracing, logger setup, numeric helpers.
pub mod devlog;
pub mod logger;
pub mod num;
