//! HTTP transport adapter for the dispatch session.
//!
//! Implements [`dispatch::SessionAdapter`] on top of a shared
//! [`reqwest::Client`]. Each wire request runs as its own tokio task that
//! races the HTTP exchange against a cancellation signal.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** HTTP transport details (client configuration,
//! timeouts, header conversion, reqwest error classification) all live here.
//! The [`dispatch`] crate sees only [`dispatch::SessionAdapter`] and
//! [`dispatch::TransportError`].
//!
//! ## Cancellation
//!
//! [`dispatch::TransportTask::cancel`] always wins if it is called before the
//! completion handler is invoked, even when the response body has already
//! been read; the handler then receives a `Cancelled` transport error.
//!
//! ## Bookkeeping
//!
//! Every active task has an entry in the adapter's task-properties set
//! ([`ReqwestAdapter::task_properties`]). The entry is removed immediately
//! before the completion handler runs, so once a session callback has fired
//! the adapter no longer lists the task.

mod adapter;
mod config;
mod error;

pub use adapter::ReqwestAdapter;
pub use config::HttpAdapterConfig;
pub use error::AdapterError;
