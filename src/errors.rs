use crate::error_handler::{ErrorKind, StructuredError};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DataError>;

#[derive(Debug, Error)]
pub enum DataError {
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Failed to acquire access token for {environment}: {message}")]
    Token { environment: String, message: String },

    #[error("Throttle queue is full ({max_queue_size} pending)")]
    QueueFull { max_queue_size: usize },

    #[error("Throttle queue cleared")]
    QueueCleared,

    #[error("Throttle error: {0}")]
    Throttle(String),

    #[error("Serde JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Durable store error: {0}")]
    Store(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{message}")]
    Typed {
        kind: ErrorKind,
        message: String,
        details: Option<serde_json::Value>,
    },

    /// A normalized failure surfaced to callers; displays the user-facing message.
    #[error("{}", .0.user_message)]
    Service(Box<StructuredError>),
}

impl DataError {
    /// HTTP status carried by this error, if any.
    #[must_use]
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::Service(s) => s.http_status,
            _ => None,
        }
    }

    /// Failures worth retrying locally: 429, 503, network and timeout shaped errors.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http { status, .. } => matches!(status, 429 | 503),
            Self::Network(_) | Self::Timeout(_) => true,
            Self::Typed { kind, .. } => matches!(kind, ErrorKind::Network | ErrorKind::RateLimit),
            _ => false,
        }
    }

    /// The normalized record, when this error already went through the error handler.
    #[must_use]
    pub fn structured(&self) -> Option<&StructuredError> {
        match self {
            Self::Service(s) => Some(s),
            _ => None,
        }
    }
}

impl From<std::io::Error> for DataError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

impl From<toml::de::Error> for DataError {
    fn from(e: toml::de::Error) -> Self {
        Self::Config(e.to_string())
    }
}
