//! Error normalization: classify any failure into a typed taxonomy with a severity and a
//! user-facing message, log it, and broadcast it to observers.

mod classify;
mod handler;

pub use classify::{ErrorKind, Severity, classify, severity_for, user_message_for};
pub use handler::{ErrorContext, ErrorHandler, ErrorObserver, ErrorSource, ObserverId, StructuredError};
