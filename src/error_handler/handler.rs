use super::classify::{ErrorKind, Severity, classify, severity_for, user_message_for};
use crate::errors::DataError;
use crate::utils::logger::ERRORS_TARGET;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock};
use uuid::Uuid;

/// Where a failure happened.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ErrorContext {
    pub component: String,
    pub operation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
}

impl ErrorContext {
    pub fn new(component: impl Into<String>, operation: impl Into<String>) -> Self {
        Self { component: component.into(), operation: operation.into(), ..Default::default() }
    }

    #[must_use]
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    #[must_use]
    pub fn with_entity(mut self, id: impl Into<String>) -> Self {
        self.entity_id = Some(id.into());
        self
    }
}

/// Normalized failure record. Created per handled failure and never mutated.
#[derive(Clone, Debug, Serialize)]
pub struct StructuredError {
    pub kind: ErrorKind,
    pub severity: Severity,
    pub raw_message: String,
    pub user_message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    pub correlation_id: String,
    pub timestamp: DateTime<Utc>,
    pub context: ErrorContext,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Anything `handle_error` accepts.
#[derive(Clone, Copy, Debug)]
pub enum ErrorSource<'a> {
    Error(&'a DataError),
    Message(&'a str),
    Http { status: u16, message: &'a str },
}

impl<'a> From<&'a DataError> for ErrorSource<'a> {
    fn from(e: &'a DataError) -> Self {
        Self::Error(e)
    }
}

impl<'a> From<&'a str> for ErrorSource<'a> {
    fn from(s: &'a str) -> Self {
        Self::Message(s)
    }
}

impl<'a> From<&'a String> for ErrorSource<'a> {
    fn from(s: &'a String) -> Self {
        Self::Message(s.as_str())
    }
}

pub type ErrorObserver = Arc<dyn Fn(&StructuredError) + Send + Sync>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// Turns raw failures into [`StructuredError`]s, logs them and notifies observers.
#[derive(Default)]
pub struct ErrorHandler {
    observers: RwLock<Vec<(ObserverId, ErrorObserver)>>,
    next_id: AtomicU64,
}

static GLOBAL: LazyLock<Arc<ErrorHandler>> = LazyLock::new(|| Arc::new(ErrorHandler::new()));

impl ErrorHandler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide handler shared by services that are not given their own.
    #[must_use]
    pub fn global() -> Arc<Self> {
        GLOBAL.clone()
    }

    pub fn subscribe(&self, observer: ErrorObserver) -> ObserverId {
        let id = ObserverId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.observers.write().push((id, observer));
        id
    }

    pub fn unsubscribe(&self, id: ObserverId) -> bool {
        let mut obs = self.observers.write();
        let before = obs.len();
        obs.retain(|(oid, _)| *oid != id);
        obs.len() != before
    }

    /// Normalize, log and broadcast a failure.
    pub fn handle_error<'a>(
        &self,
        error: impl Into<ErrorSource<'a>>,
        context: ErrorContext,
        correlation_id: Option<&str>,
    ) -> StructuredError {
        let structured = normalize(error.into(), context, correlation_id);
        log_structured(&structured);
        self.notify(&structured);
        structured
    }

    /// Build an intentional, typed failure (e.g. a not-found the caller raises itself).
    pub fn create_error(
        kind: ErrorKind,
        message: impl Into<String>,
        details: Option<serde_json::Value>,
        context: Option<&ErrorContext>,
    ) -> DataError {
        let details = match (details, context) {
            (Some(d), None) => Some(d),
            (d, Some(ctx)) => Some(serde_json::json!({
                "details": d,
                "context": serde_json::to_value(ctx).unwrap_or(serde_json::Value::Null),
            })),
            (None, None) => None,
        };
        DataError::Typed { kind, message: message.into(), details }
    }

    fn notify(&self, structured: &StructuredError) {
        let observers: Vec<ErrorObserver> =
            self.observers.read().iter().map(|(_, o)| o.clone()).collect();
        for observer in observers {
            if catch_unwind(AssertUnwindSafe(|| observer(structured))).is_err() {
                log::warn!(
                    target: ERRORS_TARGET,
                    "error observer panicked while handling {}",
                    structured.correlation_id
                );
            }
        }
    }
}

fn normalize(source: ErrorSource<'_>, context: ErrorContext, correlation_id: Option<&str>) -> StructuredError {
    let (kind, status, raw_message, details) = match source {
        ErrorSource::Error(DataError::Service(existing)) => {
            return StructuredError {
                correlation_id: correlation_id
                    .map_or_else(|| existing.correlation_id.clone(), str::to_string),
                context,
                ..(**existing).clone()
            };
        }
        ErrorSource::Error(e) => {
            let status = e.http_status();
            let message = e.to_string();
            let kind = kind_hint(e).unwrap_or_else(|| classify(status, &message));
            let details = match e {
                DataError::Typed { details, .. } => details.clone(),
                _ => None,
            };
            (kind, status, message, details)
        }
        ErrorSource::Message(m) => (classify(None, m), None, m.to_string(), None),
        ErrorSource::Http { status, message } => {
            (classify(Some(status), message), Some(status), message.to_string(), None)
        }
    };
    StructuredError {
        kind,
        severity: severity_for(kind),
        raw_message,
        user_message: user_message_for(kind).to_string(),
        http_status: status,
        correlation_id: correlation_id.map_or_else(|| Uuid::new_v4().to_string(), str::to_string),
        timestamp: Utc::now(),
        context,
        details,
    }
}

/// Variants whose kind is known without looking at status or message.
fn kind_hint(e: &DataError) -> Option<ErrorKind> {
    match e {
        DataError::Typed { kind, .. } => Some(*kind),
        DataError::Http { .. } => None,
        DataError::Network(_) | DataError::Timeout(_) => Some(ErrorKind::Network),
        DataError::Token { .. } => Some(ErrorKind::Authentication),
        DataError::QueueFull { .. } => Some(ErrorKind::RateLimit),
        DataError::Json(_) => Some(ErrorKind::Validation),
        _ => None,
    }
}

fn log_structured(e: &StructuredError) {
    let level = match e.severity {
        Severity::Critical | Severity::High => log::Level::Error,
        Severity::Medium => log::Level::Warn,
        Severity::Low => log::Level::Info,
    };
    log::log!(
        target: ERRORS_TARGET,
        level,
        "[{}] {} in {}::{}{}: {}",
        e.correlation_id,
        e.kind,
        e.context.component,
        e.context.operation,
        e.context.table.as_deref().map(|t| format!(" ({t})")).unwrap_or_default(),
        e.raw_message
    );
}
