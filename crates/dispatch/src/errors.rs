//! Error taxonomy for the dispatch session.
//!
//! Each stage of a request's life has its own error type:
//!
//! | Stage | Stage error | Classified as |
//! |-------|-------------|---------------|
//! | building the wire request | [`RequestError`] | [`SessionTaskError::Request`] |
//! | transport execution (incl. cancellation, timeout) | [`TransportError`] | [`SessionTaskError::Connection`] |
//! | validating response metadata | [`ResponseError`] | [`SessionTaskError::Response`] |
//! | decoding the response body | [`DecodeError`] | [`SessionTaskError::Decoding`] |
//!
//! Classification is the `From` conversion from a stage error into
//! [`SessionTaskError`]; it is total and stateless, so every failed `send`
//! resolves to exactly one variant.

use thiserror::Error;

/// Boxed error used to carry opaque transport-specific causes.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

// ---------------------------------------------------------------------------
// Stage errors
// ---------------------------------------------------------------------------

/// Failure while building a wire request from a descriptor.
#[derive(Debug, Error)]
pub enum RequestError {
    /// The descriptor's base URL is not an absolute URL.
    #[error("Invalid base URL '{url}': {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// The descriptor's path could not be joined onto its base URL, or
    /// would replace it (a first segment such as `v1:search` reads as a
    /// scheme).
    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// Parameters cannot be placed where the method requires them
    /// (e.g. a non-object value destined for the query string).
    #[error("Invalid parameters: {reason}")]
    InvalidParameters { reason: String },

    /// The body parameters could not be serialised.
    #[error("Body encoding failed: {0}")]
    BodyEncoding(#[from] serde_json::Error),

    /// A descriptor's request interceptor rejected the built request.
    #[error("Request rejected by interceptor: {reason}")]
    Intercepted { reason: String },
}

/// Coarse classification of a transport failure.
///
/// This is what callers match on to tell a cancelled request apart from a
/// genuine connection problem; both surface as [`SessionTaskError::Connection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportErrorKind {
    /// The task was cancelled before its completion was handed off.
    Cancelled,
    /// The transport gave up waiting (connect or overall timeout).
    TimedOut,
    /// The connection could not be established (refused, DNS, TLS).
    Connect,
    /// The wire request could not be expressed in the transport's terms.
    InvalidRequest,
    /// Any other transport failure.
    Other,
}

impl TransportErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cancelled => "cancelled",
            Self::TimedOut => "timed out",
            Self::Connect => "connect",
            Self::InvalidRequest => "invalid request",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure reported by a transport adapter through its completion handler.
///
/// The underlying transport error, if any, is preserved as the
/// [`std::error::Error::source`] so callers can inspect it.
#[derive(Debug, Error)]
#[error("Transport error ({kind}): {message}")]
pub struct TransportError {
    kind: TransportErrorKind,
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl TransportError {
    /// Creates a transport error without an underlying cause.
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Creates a transport error wrapping an underlying cause.
    pub fn with_source(
        kind: TransportErrorKind,
        message: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// The error every adapter must deliver for a cancelled task.
    pub fn cancelled() -> Self {
        Self::new(TransportErrorKind::Cancelled, "task was cancelled")
    }

    pub fn kind(&self) -> TransportErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_cancelled(&self) -> bool {
        self.kind == TransportErrorKind::Cancelled
    }

    pub fn is_timeout(&self) -> bool {
        self.kind == TransportErrorKind::TimedOut
    }
}

/// Response metadata rejected by the descriptor's validation step.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResponseError {
    /// The status code is outside the range the descriptor accepts.
    #[error("Unacceptable status code {status}")]
    UnacceptableStatusCode { status: u16 },

    /// The response is well-formed but not what the descriptor expects
    /// (wrong content type, missing header, ...).
    #[error("Unexpected response: {reason}")]
    UnexpectedObject { reason: String },
}

/// Failure while decoding a response body into the descriptor's result type.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("JSON decoding failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Body is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// Decoder-specific failure.
    #[error("Decoding failed: {message}")]
    Custom { message: String },
}

// ---------------------------------------------------------------------------
// Classified session error
// ---------------------------------------------------------------------------

/// Stage of the request lifecycle at which a failure occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Build,
    Transport,
    Validation,
    Decoding,
}

/// The single error value delivered to a `send` callback on failure.
#[derive(Debug, Error)]
pub enum SessionTaskError {
    /// The wire request could not be built; nothing was sent.
    #[error("Request error: {0}")]
    Request(#[from] RequestError),

    /// The transport failed, timed out, or the request was cancelled.
    #[error("Connection error: {0}")]
    Connection(#[from] TransportError),

    /// The response metadata failed the descriptor's validation.
    #[error("Response error: {0}")]
    Response(#[from] ResponseError),

    /// The response body could not be decoded.
    #[error("Decoding error: {0}")]
    Decoding(#[from] DecodeError),
}

impl SessionTaskError {
    /// Stage that produced this error.
    pub fn stage(&self) -> Stage {
        match self {
            Self::Request(_) => Stage::Build,
            Self::Connection(_) => Stage::Transport,
            Self::Response(_) => Stage::Validation,
            Self::Decoding(_) => Stage::Decoding,
        }
    }

    /// The transport error, for [`SessionTaskError::Connection`].
    pub fn transport_error(&self) -> Option<&TransportError> {
        match self {
            Self::Connection(err) => Some(err),
            _ => None,
        }
    }

    /// Returns `true` if the request ended because it was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.transport_error()
            .is_some_and(TransportError::is_cancelled)
    }
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;
