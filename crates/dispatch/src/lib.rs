//! Typed request dispatch over a pluggable transport.
//!
//! Callers describe a request with a type implementing [`Request`] (target,
//! parameters, response decoding) and submit it through a [`Session`]. The
//! session builds the wire request, hands it to a [`SessionAdapter`], tracks
//! it while in flight, and resolves the caller's callback exactly once with
//! either the decoded value or a classified [`SessionTaskError`].
//!
//! ## Architectural Layer
//!
//! **Domain + port definitions.** This crate has no I/O dependencies.
//! Concrete transports implement [`SessionAdapter`] in their own crates
//! (see `http-adapter`); this crate only defines what a transport must do.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`session`] | The dispatch engine and in-flight bookkeeping |
//! | [`request`] | The request descriptor trait and default request building |
//! | [`adapter`] | Transport adapter and task traits |
//! | [`errors`] | Stage errors and the classified [`SessionTaskError`] |
//! | [`identifiers`] | `RequestId`, `TaskId`, `DescriptorType` |
//! | [`types`] | Wire request/response value types |
//! | `testing` | Stub adapter (feature `test-support`) |

pub mod adapter;
pub mod errors;
pub mod identifiers;
pub mod request;
pub mod session;
pub mod types;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use adapter::{
    CompletionHandler, SessionAdapter, TaskProperties, TransportResult, TransportTask,
};
pub use errors::{
    BoxError, DecodeError, RequestError, ResponseError, SessionTaskError, Stage, TransportError,
    TransportErrorKind,
};
pub use identifiers::{DescriptorType, RequestId, TaskId};
pub use request::{build_wire_request, decode_json, decode_text, Request};
pub use session::{InFlightRequest, Session};
pub use types::{Method, RawResponse, ResponseMetadata, Timestamp, WireRequest};
