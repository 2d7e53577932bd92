//! Transport adapter port definitions.
//!
//! The session never talks to a transport directly. It hands a built
//! [`WireRequest`] and a [`CompletionHandler`] to a [`SessionAdapter`] and
//! keeps the returned [`TransportTask`] for cancellation.
//!
//! ## Contract
//!
//! An adapter implementation must:
//!
//! - invoke the completion handler **exactly once** per task, whether the
//!   task succeeds, fails, or is cancelled (the handler is `FnOnce`, so a
//!   second call cannot compile; dropping it without calling is the failure
//!   mode to avoid);
//! - deliver [`TransportError::cancelled`] when [`TransportTask::cancel`] was
//!   called before the completion was handed off, even if a response was
//!   already buffered;
//! - remove the task from its own task-properties bookkeeping *before*
//!   invoking the completion handler;
//! - tolerate the handler being invoked synchronously from inside
//!   [`SessionAdapter::create_task`] or from any other thread.

use std::sync::Arc;

use crate::errors::TransportError;
use crate::identifiers::TaskId;
use crate::types::{Method, RawResponse, Timestamp, WireRequest};

/// Outcome of a transport task.
pub type TransportResult = Result<RawResponse, TransportError>;

/// Callback an adapter invokes once when a task finishes.
pub type CompletionHandler = Box<dyn FnOnce(TransportResult) + Send + 'static>;

/// A cancellable, in-flight transport operation.
pub trait TransportTask: Send + Sync {
    /// Adapter-assigned identifier of this task.
    fn id(&self) -> TaskId;

    /// Requests cancellation.
    ///
    /// Returns immediately. The completion handler still fires exactly once,
    /// with a cancellation error unless the task had already completed.
    /// Calling this more than once has no further effect.
    fn cancel(&self);
}

/// Boundary between the session and a concrete transport.
pub trait SessionAdapter: Send + Sync + 'static {
    /// Starts (or schedules) a transport operation for `request` and returns
    /// a handle to it.
    fn create_task(&self, request: WireRequest, completion: CompletionHandler)
        -> Arc<dyn TransportTask>;
}

impl<A: SessionAdapter + ?Sized> SessionAdapter for Arc<A> {
    fn create_task(
        &self,
        request: WireRequest,
        completion: CompletionHandler,
    ) -> Arc<dyn TransportTask> {
        (**self).create_task(request, completion)
    }
}

/// Diagnostic record an adapter keeps for each active task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskProperties {
    pub id: TaskId,
    pub method: Method,
    pub url: String,
    pub created_at: Timestamp,
}

impl TaskProperties {
    pub fn for_request(id: TaskId, request: &WireRequest) -> Self {
        Self {
            id,
            method: request.method,
            url: request.url.to_string(),
            created_at: Timestamp::now(),
        }
    }
}
