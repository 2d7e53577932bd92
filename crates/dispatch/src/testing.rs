//! In-memory stub transport for tests.
//!
//! [`StubAdapter`] answers every task with a canned [`StubResponse`] and never
//! touches the network. The [`DeliveryMode`] controls *when* the completion
//! fires, which is what makes cancellation races reproducible:
//!
//! - [`DeliveryMode::Immediate`] completes synchronously inside `create_task`;
//! - [`DeliveryMode::After`] completes from a background thread after a delay;
//! - [`DeliveryMode::Manual`] holds the completion until the test calls
//!   [`StubAdapter::complete_pending`].
//!
//! Cancelling a task that has not completed yet delivers
//! [`TransportError::cancelled`] in place of the staged response.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::debug;

use crate::adapter::{
    CompletionHandler, SessionAdapter, TaskProperties, TransportResult, TransportTask,
};
use crate::errors::{TransportError, TransportErrorKind};
use crate::identifiers::TaskId;
use crate::types::{RawResponse, ResponseMetadata, WireRequest};

/// Canned outcome returned for every task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StubResponse {
    Success {
        status: u16,
        headers: Vec<(String, String)>,
        body: Vec<u8>,
    },
    Failure {
        kind: TransportErrorKind,
        message: String,
    },
}

impl StubResponse {
    /// A `200 OK` response with `body`.
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self::status(200, body)
    }

    /// A `200 OK` JSON response.
    pub fn json(value: &serde_json::Value) -> Self {
        Self::Success {
            status: 200,
            headers: vec![("Content-Type".into(), "application/json".into())],
            body: value.to_string().into_bytes(),
        }
    }

    pub fn status(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self::Success {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// A transport failure of the given kind.
    pub fn failure(kind: TransportErrorKind) -> Self {
        Self::Failure {
            kind,
            message: format!("stubbed {kind} failure"),
        }
    }

    fn to_result(&self, request: &WireRequest) -> TransportResult {
        match self {
            Self::Success {
                status,
                headers,
                body,
            } => {
                let mut metadata = ResponseMetadata::new(*status, request.url.clone());
                metadata.headers = headers.clone();
                Ok(RawResponse::new(metadata, body.clone()))
            }
            Self::Failure { kind, message } => Err(TransportError::new(*kind, message.clone())),
        }
    }
}

impl Default for StubResponse {
    fn default() -> Self {
        Self::ok(b"{}".to_vec())
    }
}

/// When the stub delivers a task's completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeliveryMode {
    #[default]
    Immediate,
    After(Duration),
    Manual,
}

struct PendingTask {
    properties: TaskProperties,
    outcome: TransportResult,
    completion: CompletionHandler,
}

#[derive(Default)]
struct StubState {
    next_id: AtomicU64,
    response: Mutex<StubResponse>,
    delivery: Mutex<DeliveryMode>,
    // The task-properties set. Whoever removes an entry delivers it.
    tasks: Mutex<HashMap<TaskId, PendingTask>>,
    received: Mutex<Vec<WireRequest>>,
}

impl StubState {
    fn deliver(&self, id: TaskId, cancelled: bool) -> bool {
        let Some(task) = self.tasks.lock().remove(&id) else {
            return false;
        };
        let outcome = if cancelled {
            Err(TransportError::cancelled())
        } else {
            task.outcome
        };
        debug!(task_id = %id, cancelled, "stub task completed");
        (task.completion)(outcome);
        true
    }
}

/// A [`SessionAdapter`] that never performs I/O.
#[derive(Clone, Default)]
pub struct StubAdapter {
    state: Arc<StubState>,
}

impl StubAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a stub that answers every task with `response`.
    pub fn with_response(response: StubResponse) -> Self {
        let adapter = Self::new();
        adapter.set_response(response);
        adapter
    }

    /// Replaces the canned response for tasks created from now on.
    pub fn set_response(&self, response: StubResponse) {
        *self.state.response.lock() = response;
    }

    /// Changes when completions are delivered for tasks created from now on.
    pub fn set_delivery(&self, delivery: DeliveryMode) {
        *self.state.delivery.lock() = delivery;
    }

    /// Delivers every task still held by [`DeliveryMode::Manual`] (or still
    /// sleeping under [`DeliveryMode::After`]). Returns how many were
    /// delivered.
    pub fn complete_pending(&self) -> usize {
        let ids: Vec<TaskId> = self.state.tasks.lock().keys().copied().collect();
        let mut delivered = 0;
        for id in ids {
            if self.state.deliver(id, false) {
                delivered += 1;
            }
        }
        delivered
    }

    /// Snapshot of the active task-properties set.
    pub fn task_properties(&self) -> Vec<TaskProperties> {
        self.state
            .tasks
            .lock()
            .values()
            .map(|task| task.properties.clone())
            .collect()
    }

    pub fn active_task_count(&self) -> usize {
        self.state.tasks.lock().len()
    }

    /// Returns `true` when the task-properties set is empty.
    pub fn is_idle(&self) -> bool {
        self.state.tasks.lock().is_empty()
    }

    /// Every wire request this stub has received, in order.
    pub fn received_requests(&self) -> Vec<WireRequest> {
        self.state.received.lock().clone()
    }
}

impl SessionAdapter for StubAdapter {
    fn create_task(
        &self,
        request: WireRequest,
        completion: CompletionHandler,
    ) -> Arc<dyn TransportTask> {
        let id = TaskId::new(self.state.next_id.fetch_add(1, Ordering::Relaxed));
        let outcome = self.state.response.lock().to_result(&request);
        let delivery = *self.state.delivery.lock();

        self.state.tasks.lock().insert(
            id,
            PendingTask {
                properties: TaskProperties::for_request(id, &request),
                outcome,
                completion,
            },
        );
        self.state.received.lock().push(request);

        match delivery {
            DeliveryMode::Immediate => {
                self.state.deliver(id, false);
            }
            DeliveryMode::After(delay) => {
                let state = Arc::clone(&self.state);
                std::thread::spawn(move || {
                    std::thread::sleep(delay);
                    state.deliver(id, false);
                });
            }
            DeliveryMode::Manual => {}
        }

        Arc::new(StubTask {
            id,
            state: Arc::clone(&self.state),
        })
    }
}

struct StubTask {
    id: TaskId,
    state: Arc<StubState>,
}

impl TransportTask for StubTask {
    fn id(&self) -> TaskId {
        self.id
    }

    fn cancel(&self) {
        self.state.deliver(self.id, true);
    }
}
