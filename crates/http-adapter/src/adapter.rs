//! The reqwest-backed [`SessionAdapter`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use dispatch::{
    CompletionHandler, Method, RawResponse, ResponseMetadata, SessionAdapter, TaskId,
    TaskProperties, TransportError, TransportErrorKind, TransportResult, TransportTask,
    WireRequest,
};
use parking_lot::Mutex;
use reqwest::header::{HeaderName, HeaderValue};
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tracing::{debug, warn};

use crate::config::HttpAdapterConfig;
use crate::error::{invalid_request, transport_error, AdapterError};

/// Runs each wire request as a tokio task on a shared reqwest client.
///
/// Cloning is cheap; clones share the client and the task-properties set.
#[derive(Clone)]
pub struct ReqwestAdapter {
    inner: Arc<Inner>,
}

struct Inner {
    client: reqwest::Client,
    runtime: Handle,
    next_id: AtomicU64,
    tasks: Mutex<HashMap<TaskId, TaskProperties>>,
}

impl ReqwestAdapter {
    /// Builds an adapter on the tokio runtime the caller is running in.
    pub fn new(config: &HttpAdapterConfig) -> Result<Self, AdapterError> {
        let runtime = Handle::try_current().map_err(|_| AdapterError::NoRuntime)?;
        Self::with_runtime(config, runtime)
    }

    /// Builds an adapter that spawns its tasks on `runtime`.
    pub fn with_runtime(config: &HttpAdapterConfig, runtime: Handle) -> Result<Self, AdapterError> {
        Ok(Self::from_client(config.build_client()?, runtime))
    }

    /// Wraps an already configured client.
    pub fn from_client(client: reqwest::Client, runtime: Handle) -> Self {
        Self {
            inner: Arc::new(Inner {
                client,
                runtime,
                next_id: AtomicU64::new(0),
                tasks: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Snapshot of the active task-properties set.
    pub fn task_properties(&self) -> Vec<TaskProperties> {
        self.inner.tasks.lock().values().cloned().collect()
    }

    pub fn active_task_count(&self) -> usize {
        self.inner.tasks.lock().len()
    }

    /// Returns `true` when no task is active.
    pub fn is_idle(&self) -> bool {
        self.inner.tasks.lock().is_empty()
    }
}

impl std::fmt::Debug for ReqwestAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestAdapter")
            .field("active_tasks", &self.active_task_count())
            .finish_non_exhaustive()
    }
}

impl SessionAdapter for ReqwestAdapter {
    fn create_task(
        &self,
        request: WireRequest,
        completion: CompletionHandler,
    ) -> Arc<dyn TransportTask> {
        let id = TaskId::new(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let signal = Arc::new(CancelSignal::default());

        self.inner
            .tasks
            .lock()
            .insert(id, TaskProperties::for_request(id, &request));
        debug!(task_id = %id, method = %request.method, url = %request.url, "starting http task");

        let pending = PendingCompletion {
            id,
            inner: Arc::clone(&self.inner),
            completion: Some(completion),
        };
        let client = self.inner.client.clone();
        let task_signal = Arc::clone(&signal);
        self.inner.runtime.spawn(async move {
            let outcome = tokio::select! {
                biased;
                () = task_signal.cancelled() => Err(TransportError::cancelled()),
                outcome = execute(&client, request) => outcome,
            };
            pending.complete(settle(outcome, &task_signal));
        });

        Arc::new(HttpTask { id, signal })
    }
}

/// Final say on a finished exchange: a cancel that lands after the body was
/// buffered still wins.
fn settle(outcome: TransportResult, signal: &CancelSignal) -> TransportResult {
    if signal.is_cancelled() {
        Err(TransportError::cancelled())
    } else {
        outcome
    }
}

/// Owns a task's completion handler until it has been invoked.
///
/// If the spawned future is dropped without finishing (runtime shutdown),
/// the handler still fires, with an `Other` transport error.
struct PendingCompletion {
    id: TaskId,
    inner: Arc<Inner>,
    completion: Option<CompletionHandler>,
}

impl PendingCompletion {
    fn complete(mut self, outcome: TransportResult) {
        self.deliver(outcome);
    }

    fn deliver(&mut self, outcome: TransportResult) {
        let Some(completion) = self.completion.take() else {
            return;
        };
        self.inner.tasks.lock().remove(&self.id);
        match &outcome {
            Ok(response) => debug!(
                task_id = %self.id,
                status = response.metadata.status,
                bytes = response.body.len(),
                "http task completed"
            ),
            Err(err) => debug!(task_id = %self.id, kind = %err.kind(), error = %err, "http task failed"),
        }
        completion(outcome);
    }
}

impl Drop for PendingCompletion {
    fn drop(&mut self) {
        if self.completion.is_some() {
            warn!(task_id = %self.id, "http task dropped before completing");
            self.deliver(Err(TransportError::new(
                TransportErrorKind::Other,
                "transport task was dropped before completing",
            )));
        }
    }
}

#[derive(Default)]
struct CancelSignal {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancelSignal {
    fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::SeqCst) {
            // `notify_one` stores a permit if the task is not waiting yet.
            self.notify.notify_one();
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    async fn cancelled(&self) {
        if self.is_cancelled() {
            return;
        }
        self.notify.notified().await;
    }
}

struct HttpTask {
    id: TaskId,
    signal: Arc<CancelSignal>,
}

impl TransportTask for HttpTask {
    fn id(&self) -> TaskId {
        self.id
    }

    fn cancel(&self) {
        debug!(task_id = %self.id, "cancelling http task");
        self.signal.cancel();
    }
}

async fn execute(client: &reqwest::Client, request: WireRequest) -> TransportResult {
    let mut builder = client.request(reqwest_method(request.method), request.url);
    for (name, value) in &request.headers {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| invalid_request(format!("invalid header name '{name}'"), e))?;
        let header_value = HeaderValue::from_str(value)
            .map_err(|e| invalid_request(format!("invalid value for header '{name}'"), e))?;
        builder = builder.header(header_name, header_value);
    }
    if let Some(body) = request.body {
        builder = builder.body(body);
    }

    let response = builder.send().await.map_err(transport_error)?;

    let mut metadata = ResponseMetadata::new(response.status().as_u16(), response.url().clone());
    metadata.headers = response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.as_str().to_owned(), value.to_owned()))
        })
        .collect();
    let body = response.bytes().await.map_err(transport_error)?;

    Ok(RawResponse::new(metadata, body.to_vec()))
}

fn reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
        Method::Head => reqwest::Method::HEAD,
        Method::Options => reqwest::Method::OPTIONS,
    }
}

#[cfg(test)]
#[path = "adapter_tests.rs"]
mod tests;
