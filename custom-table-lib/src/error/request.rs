//! Request error types

use serde::Deserialize;
use serde::Serialize;

/// Classification of a failed data request.
///
/// Only the throttling kinds (`RateLimit`, `ConcurrencyLimit`) drive the
/// automatic retry countdown; everything else surfaces a one-shot retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestErrorKind {
    /// Too many requests in a window (HTTP 429 and friends).
    RateLimit,
    /// Too many simultaneous requests.
    ConcurrencyLimit,
    /// The request or gateway timed out.
    Timeout,
    /// Anything else.
    Unknown,
}

impl RequestErrorKind {
    /// Classifies a failure from its HTTP status (if any) and message.
    ///
    /// Message heuristics win over status codes because gateways commonly
    /// report concurrency throttling as a plain 429 or 503.
    pub fn classify(status: Option<u16>, message: &str) -> Self {
        let lower = message.to_lowercase();

        if lower.contains("concurrency")
            || lower.contains("concurrent")
            || lower.contains("too many simultaneous")
        {
            return Self::ConcurrencyLimit;
        }
        if lower.contains("rate limit")
            || lower.contains("rate_limit")
            || lower.contains("ratelimit")
            || lower.contains("too many requests")
            || lower.contains("throttl")
        {
            return Self::RateLimit;
        }
        if lower.contains("timeout") || lower.contains("timed out") {
            return Self::Timeout;
        }

        match status {
            Some(429) => Self::RateLimit,
            Some(408 | 504) => Self::Timeout,
            _ => Self::Unknown,
        }
    }

    /// Returns `true` for kinds that enter the auto-retry countdown.
    pub fn is_throttled(&self) -> bool {
        matches!(self, Self::RateLimit | Self::ConcurrencyLimit)
    }

    /// Returns the snake_case name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RateLimit => "rate_limit",
            Self::ConcurrencyLimit => "concurrency_limit",
            Self::Timeout => "timeout",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for RequestErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed call to the host-supplied request function.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct RequestError {
    /// Classified kind.
    pub kind: RequestErrorKind,
    /// Raw diagnostic message.
    pub message: String,
    /// HTTP status code, if the failure came from an HTTP response.
    pub status: Option<u16>,
}

impl RequestError {
    /// Creates an error from a message, classifying it by content.
    pub fn new(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            kind: RequestErrorKind::classify(None, &message),
            message,
            status: None,
        }
    }

    /// Creates an error from an HTTP status and message.
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            kind: RequestErrorKind::classify(Some(status), &message),
            message,
            status: Some(status),
        }
    }

    /// Creates an error with an explicit kind, skipping classification.
    pub fn with_kind(kind: RequestErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
        }
    }

    /// Short, human-readable text suitable for an error banner.
    ///
    /// The full diagnostic lives in `message` and goes to the trace log.
    pub fn user_message(&self) -> &'static str {
        match self.kind {
            RequestErrorKind::RateLimit => "Too many requests, retrying shortly",
            RequestErrorKind::ConcurrencyLimit => "Server is busy, retrying shortly",
            RequestErrorKind::Timeout => "The request timed out",
            RequestErrorKind::Unknown => "Failed to load data",
        }
    }

    /// Returns `true` if this error drives the auto-retry countdown.
    pub fn is_throttled(&self) -> bool {
        self.kind.is_throttled()
    }
}

impl From<String> for RequestError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for RequestError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}
