use serde::{Deserialize, Serialize};
use std::fmt;

/// Failure taxonomy, independent of the transport that produced the failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Authentication,
    Authorization,
    Network,
    Validation,
    NotFound,
    RateLimit,
    Server,
    Client,
    Unknown,
}

impl ErrorKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Authentication => "authentication",
            Self::Authorization => "authorization",
            Self::Network => "network",
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::RateLimit => "rate_limit",
            Self::Server => "server",
            Self::Client => "client",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// Classify by HTTP status when present, otherwise by message substrings.
#[must_use]
pub fn classify(status: Option<u16>, message: &str) -> ErrorKind {
    if let Some(kind) = status.and_then(classify_status) {
        return kind;
    }
    classify_message(message)
}

fn classify_status(status: u16) -> Option<ErrorKind> {
    let kind = match status {
        401 => ErrorKind::Authentication,
        403 => ErrorKind::Authorization,
        404 | 410 => ErrorKind::NotFound,
        400 | 422 => ErrorKind::Validation,
        408 => ErrorKind::Network,
        429 => ErrorKind::RateLimit,
        500..=599 => ErrorKind::Server,
        402..=499 => ErrorKind::Client,
        _ => return None,
    };
    Some(kind)
}

fn classify_message(message: &str) -> ErrorKind {
    let m = message.to_ascii_lowercase();
    let has = |needles: &[&str]| needles.iter().any(|n| m.contains(n));
    // "forbidden" before "auth" so that "authorization forbidden" is a permission failure
    if has(&["forbidden", "permission", "access denied"]) {
        ErrorKind::Authorization
    } else if has(&["unauthorized", "unauthenticated", "auth", "token"]) {
        ErrorKind::Authentication
    } else if has(&["network", "fetch", "timeout", "timed out", "connection"]) {
        ErrorKind::Network
    } else if has(&["not found", "does not exist"]) {
        ErrorKind::NotFound
    } else if has(&["too many requests", "rate limit", "throttl"]) {
        ErrorKind::RateLimit
    } else if has(&["invalid", "validation", "required"]) {
        ErrorKind::Validation
    } else {
        ErrorKind::Unknown
    }
}

#[must_use]
pub fn severity_for(kind: ErrorKind) -> Severity {
    match kind {
        ErrorKind::Authentication | ErrorKind::Authorization => Severity::High,
        ErrorKind::Server => Severity::Critical,
        ErrorKind::RateLimit | ErrorKind::Network => Severity::Medium,
        ErrorKind::Validation | ErrorKind::NotFound => Severity::Low,
        ErrorKind::Client | ErrorKind::Unknown => Severity::Medium,
    }
}

/// Canned, human-readable message shown to end users.
#[must_use]
pub fn user_message_for(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::Authentication => "Your session has expired. Please sign in again.",
        ErrorKind::Authorization => "You do not have permission to perform this action.",
        ErrorKind::Network => {
            "Unable to reach the server. Please check your connection and try again."
        }
        ErrorKind::Validation => "The request contains invalid data. Please review it and try again.",
        ErrorKind::NotFound => "The requested record could not be found.",
        ErrorKind::RateLimit => "Too many requests. Please wait a moment and try again.",
        ErrorKind::Server => "The server encountered an error. Please try again later.",
        ErrorKind::Client => "The request could not be completed.",
        ErrorKind::Unknown => "An unexpected error occurred. Please try again.",
    }
}
