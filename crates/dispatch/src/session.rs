//! The session dispatch engine.
//!
//! [`Session`] builds wire requests from descriptors, hands them to a
//! [`SessionAdapter`], and keeps one in-flight record per outstanding `send`
//! until the adapter reports completion. It then validates and decodes the
//! response through the descriptor and resolves the caller's callback.
//!
//! ## Concurrency
//!
//! The in-flight map is the only mutable state and sits behind a single
//! mutex per session. The lock is never held while calling into the adapter
//! or into caller code, so adapters may complete synchronously from inside
//! `create_task` and callbacks may call back into the session.
//!
//! ## Exactly-once delivery
//!
//! A record is removed from the map before its callback runs, and only the
//! code path that removes it may run the callback. A duplicate or late
//! completion for an identity that is no longer present is logged and
//! dropped. Cancellation never removes records itself: it only asks the
//! transport task to cancel, and the resulting completion travels the same
//! path as any other.

use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures::channel::oneshot;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::adapter::{CompletionHandler, SessionAdapter, TransportResult, TransportTask};
use crate::errors::{SessionTaskError, TransportError, TransportErrorKind};
use crate::identifiers::{DescriptorType, RequestId, TaskId};
use crate::request::Request;
use crate::types::Timestamp;

type Delivery = Box<dyn FnOnce(TransportResult) + Send + 'static>;
type RequestMap = Arc<Mutex<HashMap<RequestId, InFlightRecord>>>;

/// Bookkeeping for one outstanding `send`.
struct InFlightRecord {
    descriptor_type: DescriptorType,
    descriptor: Arc<dyn Any + Send + Sync>,
    // `None` until `create_task` has returned.
    task: Option<Arc<dyn TransportTask>>,
    cancel_requested: bool,
    started_at: Timestamp,
    deliver: Delivery,
}

/// Read-only snapshot of an in-flight request.
#[derive(Debug, Clone)]
pub struct InFlightRequest {
    pub id: RequestId,
    pub descriptor_type: DescriptorType,
    /// Adapter task backing the request, once it has been created.
    pub task_id: Option<TaskId>,
    pub cancel_requested: bool,
    pub started_at: Timestamp,
}

/// Dispatches typed requests through a transport adapter.
///
/// Each session owns its own in-flight map; sessions share nothing with one
/// another. Dropping a session does not cancel its outstanding requests:
/// their callbacks still fire when the transport completes.
pub struct Session {
    adapter: Arc<dyn SessionAdapter>,
    requests: RequestMap,
}

impl Session {
    /// Creates a session over `adapter`.
    ///
    /// Pass an `Arc<A>` to keep a handle on the adapter for inspection.
    pub fn new(adapter: impl SessionAdapter) -> Self {
        Self {
            adapter: Arc::new(adapter),
            requests: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Sends `request` and resolves `callback` exactly once with the result.
    ///
    /// Returns the identity of the in-flight request, or `None` if the wire
    /// request could not be built. In that case `callback` has already been
    /// invoked with [`SessionTaskError::Request`] before this returns.
    pub fn send<R, F>(&self, request: R, callback: F) -> Option<RequestId>
    where
        R: Request,
        F: FnOnce(Result<R::Response, SessionTaskError>) + Send + 'static,
    {
        let descriptor_type = DescriptorType::of::<R>();
        let wire = match request.build_request() {
            Ok(wire) => wire,
            Err(err) => {
                debug!(descriptor = %descriptor_type, error = %err, "request could not be built");
                callback(Err(err.into()));
                return None;
            }
        };

        let id = RequestId::new_random();
        let request = Arc::new(request);
        let deliver: Delivery = {
            let request = Arc::clone(&request);
            Box::new(move |outcome| {
                let result = finish(&*request, outcome);
                match &result {
                    Ok(_) => debug!(request_id = %id, "request succeeded"),
                    Err(err) => debug!(
                        request_id = %id,
                        stage = ?err.stage(),
                        error = %err,
                        "request failed"
                    ),
                }
                callback(result);
            })
        };

        self.requests.lock().insert(
            id,
            InFlightRecord {
                descriptor_type,
                descriptor: request,
                task: None,
                cancel_requested: false,
                started_at: Timestamp::now(),
                deliver,
            },
        );

        debug!(
            request_id = %id,
            descriptor = %descriptor_type,
            method = %wire.method,
            url = %wire.url,
            "dispatching request"
        );
        let task = self
            .adapter
            .create_task(wire, completion_handler(&self.requests, id));

        // The completion may already have run (and removed the record) by now.
        let cancel_now = match self.requests.lock().get_mut(&id) {
            Some(record) => {
                record.task = Some(Arc::clone(&task));
                record.cancel_requested
            }
            None => false,
        };
        if cancel_now {
            debug!(request_id = %id, task_id = %task.id(), "applying deferred cancellation");
            task.cancel();
        }

        Some(id)
    }

    /// Sends `request` and waits for its result.
    pub async fn response<R: Request>(&self, request: R) -> Result<R::Response, SessionTaskError> {
        let (tx, rx) = oneshot::channel();
        self.send(request, move |result| {
            // The receiver is gone only if the caller dropped this future.
            let _ = tx.send(result);
        });
        match rx.await {
            Ok(result) => result,
            Err(oneshot::Canceled) => Err(TransportError::new(
                TransportErrorKind::Other,
                "transport dropped the completion handler",
            )
            .into()),
        }
    }

    /// Cancels every in-flight request built from descriptor type `R`.
    ///
    /// Cancellation is asynchronous: each matching callback later fires with
    /// a [`SessionTaskError::Connection`] whose transport error is
    /// cancelled. Returns the number of requests targeted.
    pub fn cancel_requests<R: Request>(&self) -> usize {
        self.cancel_where(|_, record| record.descriptor_type.is::<R>())
    }

    /// Cancels in-flight requests of type `R` whose descriptor satisfies
    /// `predicate`.
    ///
    /// `predicate` runs without the session lock held.
    pub fn cancel_requests_matching<R, P>(&self, predicate: P) -> usize
    where
        R: Request,
        P: Fn(&R) -> bool,
    {
        let candidates: Vec<(RequestId, Arc<dyn Any + Send + Sync>)> = self
            .requests
            .lock()
            .iter()
            .filter(|(_, record)| record.descriptor_type.is::<R>())
            .map(|(id, record)| (*id, Arc::clone(&record.descriptor)))
            .collect();

        let selected: HashSet<RequestId> = candidates
            .into_iter()
            .filter(|(_, descriptor)| descriptor.downcast_ref::<R>().is_some_and(&predicate))
            .map(|(id, _)| id)
            .collect();

        if selected.is_empty() {
            return 0;
        }
        self.cancel_where(|id, _| selected.contains(&id))
    }

    /// Cancels the single request identified by `id`.
    ///
    /// Returns `false` if the request is no longer in flight.
    pub fn cancel_request(&self, id: RequestId) -> bool {
        self.cancel_where(|candidate, _| candidate == id) > 0
    }

    /// Cancels every in-flight request regardless of descriptor type.
    pub fn cancel_all(&self) -> usize {
        self.cancel_where(|_, _| true)
    }

    fn cancel_where(&self, matches: impl Fn(RequestId, &InFlightRecord) -> bool) -> usize {
        let mut targeted = 0;
        let mut tasks = Vec::new();
        {
            let mut requests = self.requests.lock();
            for (id, record) in requests.iter_mut() {
                if !matches(*id, record) {
                    continue;
                }
                targeted += 1;
                record.cancel_requested = true;
                // Records without a task yet are cancelled by `send` once
                // `create_task` returns.
                if let Some(task) = &record.task {
                    tasks.push((*id, Arc::clone(task)));
                }
            }
        }

        for (id, task) in tasks {
            debug!(request_id = %id, task_id = %task.id(), "cancelling request");
            task.cancel();
        }
        targeted
    }

    /// Number of requests currently in flight.
    pub fn in_flight_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Returns `true` when no request is in flight.
    pub fn is_idle(&self) -> bool {
        self.requests.lock().is_empty()
    }

    /// Returns `true` if `id` is still in flight.
    pub fn contains(&self, id: RequestId) -> bool {
        self.requests.lock().contains_key(&id)
    }

    /// Snapshot of the in-flight requests, oldest first.
    pub fn in_flight_requests(&self) -> Vec<InFlightRequest> {
        let mut snapshot: Vec<InFlightRequest> = self
            .requests
            .lock()
            .iter()
            .map(|(id, record)| InFlightRequest {
                id: *id,
                descriptor_type: record.descriptor_type,
                task_id: record.task.as_ref().map(|task| task.id()),
                cancel_requested: record.cancel_requested,
                started_at: record.started_at,
            })
            .collect();
        snapshot.sort_by_key(|request| request.started_at);
        snapshot
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("in_flight", &self.in_flight_count())
            .finish_non_exhaustive()
    }
}

/// Builds the handler the adapter calls when the task for `id` finishes.
fn completion_handler(requests: &RequestMap, id: RequestId) -> CompletionHandler {
    let requests = Arc::clone(requests);
    Box::new(move |outcome| {
        let record = requests.lock().remove(&id);
        match record {
            Some(record) => (record.deliver)(outcome),
            None => warn!(request_id = %id, "completion for a request that is no longer in flight"),
        }
    })
}

/// Classifies a transport outcome through the descriptor's validate and
/// decode steps.
fn finish<R: Request>(
    request: &R,
    outcome: TransportResult,
) -> Result<R::Response, SessionTaskError> {
    let response = outcome?;
    request.validate_response(&response.metadata)?;
    Ok(request.decode(&response.body, &response.metadata)?)
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
