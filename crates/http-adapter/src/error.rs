//! Adapter construction errors and reqwest error classification.

use dispatch::{TransportError, TransportErrorKind};
use thiserror::Error;

/// Errors raised while constructing a [`crate::ReqwestAdapter`].
///
/// Per-request failures never use this type; they reach the session as
/// [`TransportError`] values through the completion handler.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// No tokio runtime was available to drive transport tasks.
    #[error("No tokio runtime is available; create the adapter inside a runtime or pass a handle")]
    NoRuntime,

    /// A configured default header has an invalid name or value.
    #[error("Invalid default header '{name}': {reason}")]
    InvalidDefaultHeader { name: String, reason: String },

    /// reqwest rejected the client configuration.
    #[error("HTTP client could not be built: {0}")]
    ClientBuild(#[source] reqwest::Error),
}

/// Maps a reqwest failure onto the transport error taxonomy, keeping the
/// original error as the source.
pub(crate) fn transport_error(err: reqwest::Error) -> TransportError {
    let kind = if err.is_timeout() {
        TransportErrorKind::TimedOut
    } else if err.is_connect() {
        TransportErrorKind::Connect
    } else if err.is_builder() {
        TransportErrorKind::InvalidRequest
    } else {
        TransportErrorKind::Other
    };
    TransportError::with_source(kind, err.to_string(), err)
}

/// Error for a wire request that cannot be expressed as an HTTP request.
pub(crate) fn invalid_request(
    message: impl Into<String>,
    source: impl std::error::Error + Send + Sync + 'static,
) -> TransportError {
    TransportError::with_source(TransportErrorKind::InvalidRequest, message, source)
}
