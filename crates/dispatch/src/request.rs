//! The request descriptor contract.
//!
//! A descriptor is a caller-defined value that knows how to build a
//! [`WireRequest`] and how to turn a successful response into a typed
//! [`Request::Response`]. Only [`Request::base_url`], [`Request::method`],
//! [`Request::path`] and [`Request::decode`] are required; everything else has
//! a default that covers the common JSON-over-HTTP case.
//!
//! ## Parameter placement
//!
//! [`Request::parameters`] is placed according to the method: `GET`, `HEAD`
//! and `DELETE` encode it into the query string (it must then be a JSON
//! object of scalars), every other method sends it as a JSON body.
//!
//! ## URL resolution
//!
//! [`Request::path`] is always relative to [`Request::base_url`]: leading
//! slashes are ignored and the base keeps its own path and query. A path
//! whose first segment contains `:` is rejected with
//! [`RequestError::InvalidPath`] instead of silently replacing the base.

use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use crate::errors::{DecodeError, RequestError, ResponseError};
use crate::types::{Method, ResponseMetadata, WireRequest};

/// A typed request descriptor.
///
/// The session identifies descriptors by their concrete type, so
/// [`crate::Session::cancel_requests`] cancels every in-flight request built
/// from the same descriptor type.
pub trait Request: Send + Sync + 'static {
    /// Typed result produced by [`Request::decode`].
    type Response: Send + 'static;

    /// Absolute base URL the path is resolved against.
    fn base_url(&self) -> &str;

    fn method(&self) -> Method;

    /// Path appended to [`Request::base_url`]. A leading `/` is ignored so
    /// that any path prefix on the base URL is kept.
    fn path(&self) -> &str;

    /// Parameters placed in the query string or body, see the module docs.
    fn parameters(&self) -> Option<Value> {
        None
    }

    /// Additional header fields.
    fn header_fields(&self) -> Vec<(String, String)> {
        Vec::new()
    }

    /// Query string pairs for this request.
    fn query_parameters(&self) -> Result<Vec<(String, String)>, RequestError> {
        if !self.method().prefers_query_parameters() {
            return Ok(Vec::new());
        }
        match self.parameters() {
            None => Ok(Vec::new()),
            Some(Value::Object(map)) => map
                .into_iter()
                .map(|(key, value)| query_value(&key, value).map(|value| (key, value)))
                .collect(),
            Some(other) => Err(RequestError::InvalidParameters {
                reason: format!("query parameters must be a JSON object, got {other}"),
            }),
        }
    }

    /// Encoded body for this request.
    fn body(&self) -> Result<Option<Vec<u8>>, RequestError> {
        if self.method().prefers_query_parameters() {
            return Ok(None);
        }
        match self.parameters() {
            None => Ok(None),
            Some(value) => Ok(Some(serde_json::to_vec(&value)?)),
        }
    }

    /// Last chance to adjust or reject the built request.
    fn intercept_request(&self, request: WireRequest) -> Result<WireRequest, RequestError> {
        Ok(request)
    }

    /// Builds the wire request. Override only when the defaults above cannot
    /// express the request.
    fn build_request(&self) -> Result<WireRequest, RequestError> {
        build_wire_request(self)
    }

    /// Checks response metadata before the body is decoded.
    ///
    /// The default accepts any 2xx status.
    fn validate_response(&self, metadata: &ResponseMetadata) -> Result<(), ResponseError> {
        if metadata.is_success() {
            Ok(())
        } else {
            Err(ResponseError::UnacceptableStatusCode {
                status: metadata.status,
            })
        }
    }

    /// Decodes a validated response body.
    fn decode(
        &self,
        body: &[u8],
        metadata: &ResponseMetadata,
    ) -> Result<Self::Response, DecodeError>;
}

/// Default wire-request construction shared by every descriptor.
pub fn build_wire_request<R: Request + ?Sized>(request: &R) -> Result<WireRequest, RequestError> {
    let mut url = resolve_url(request.base_url(), request.path())?;

    let query = request.query_parameters()?;
    if !query.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in &query {
            pairs.append_pair(key, value);
        }
    }

    let mut wire = WireRequest::new(request.method(), url);
    let body = request.body()?;
    if body.is_some() {
        wire.set_header("Content-Type", "application/json");
    }
    wire.body = body;
    for (name, value) in request.header_fields() {
        wire.set_header(name, value);
    }

    request.intercept_request(wire)
}

/// Decodes a JSON body into `T`.
pub fn decode_json<T: DeserializeOwned>(body: &[u8]) -> Result<T, DecodeError> {
    Ok(serde_json::from_slice(body)?)
}

/// Decodes a UTF-8 text body.
pub fn decode_text(body: &[u8]) -> Result<String, DecodeError> {
    Ok(std::str::from_utf8(body)?.to_owned())
}

fn resolve_url(base_url: &str, path: &str) -> Result<Url, RequestError> {
    let mut base = Url::parse(base_url).map_err(|source| RequestError::InvalidBaseUrl {
        url: base_url.to_owned(),
        source,
    })?;

    let relative = path.trim_start_matches('/');
    if relative.is_empty() {
        return Ok(base);
    }
    let invalid = |reason: String| RequestError::InvalidPath {
        path: path.to_owned(),
        reason,
    };
    let first_segment = relative.split(['/', '?', '#']).next().unwrap_or_default();
    if first_segment.contains(':') {
        return Err(invalid(format!(
            "first segment '{first_segment}' would be read as a URL scheme"
        )));
    }

    let base_query = base.query().map(str::to_owned);
    base.set_query(None);
    if !base.path().ends_with('/') {
        let with_slash = format!("{}/", base.path());
        base.set_path(&with_slash);
    }
    let mut url = base
        .join(relative)
        .map_err(|source| invalid(source.to_string()))?;

    // The base URL's own query survives the join, ahead of any query the
    // path carries.
    if let Some(base_query) = base_query {
        let merged = match url.query() {
            Some(path_query) if !path_query.is_empty() => format!("{base_query}&{path_query}"),
            _ => base_query,
        };
        url.set_query(Some(&merged));
    }
    Ok(url)
}

fn query_value(key: &str, value: Value) -> Result<String, RequestError> {
    match value {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Ok(String::new()),
        Value::Array(_) | Value::Object(_) => Err(RequestError::InvalidParameters {
            reason: format!("query parameter '{key}' must be a scalar"),
        }),
    }
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
