//! End-to-end behaviour of `Session` over `ReqwestAdapter`.

mod support;

use std::collections::BTreeMap;
use std::time::Duration;

use dispatch::{ResponseError, Session, SessionTaskError, TransportErrorKind};
use http_adapter::{AdapterError, HttpAdapterConfig, ReqwestAdapter};
use support::{closed_addr, spawn_server, CannedResponse, FakeServer, JsonGet};
use tokio::sync::mpsc;
use tokio::time::timeout;

type Outcome = Result<std::collections::HashMap<String, String>, SessionTaskError>;

fn adapter(config: &HttpAdapterConfig) -> ReqwestAdapter {
    ReqwestAdapter::new(config).expect("adapter")
}

/// Sends through the callback API and waits for the single delivery.
async fn send_and_wait(session: &Session, request: JsonGet) -> Outcome {
    let (tx, mut rx) = mpsc::unbounded_channel();
    session.send(request, move |result| {
        tx.send(result).expect("receiver alive");
    });
    let outcome = timeout(Duration::from_secs(10), rx.recv())
        .await
        .expect("callback within timeout")
        .expect("callback fired");
    assert!(rx.recv().await.is_none(), "callback fired more than once");
    outcome
}

fn assert_drained(session: &Session, adapter: &ReqwestAdapter) {
    assert!(session.is_idle(), "session map not empty");
    assert!(adapter.is_idle(), "adapter task set not empty");
}

#[tokio::test]
async fn success_decodes_body_and_drains_bookkeeping() {
    let server = spawn_server(CannedResponse::ok(r#"{"key":"value"}"#)).await;
    let adapter = adapter(&HttpAdapterConfig::default());
    let session = Session::new(adapter.clone());

    let outcome = send_and_wait(&session, JsonGet::new(&server, "/items")).await;

    let value = outcome.expect("success");
    assert_eq!(value.get("key").map(String::as_str), Some("value"));
    assert_drained(&session, &adapter);
}

#[tokio::test]
async fn timeout_is_a_connection_error() {
    let server =
        spawn_server(CannedResponse::ok("{}").delayed(Duration::from_secs(5))).await;
    let config = HttpAdapterConfig {
        timeout_ms: Some(200),
        ..HttpAdapterConfig::default()
    };
    let adapter = adapter(&config);
    let session = Session::new(adapter.clone());

    let outcome = send_and_wait(&session, JsonGet::new(&server, "/slow")).await;

    match outcome {
        Err(SessionTaskError::Connection(err)) => {
            assert_eq!(err.kind(), TransportErrorKind::TimedOut);
            assert!(std::error::Error::source(&err).is_some());
        }
        other => panic!("expected timeout, got {other:?}"),
    }
    assert_drained(&session, &adapter);
}

#[tokio::test]
async fn cancellation_wins_over_staged_success() {
    let server =
        spawn_server(CannedResponse::ok("{}").delayed(Duration::from_millis(300))).await;
    let adapter = adapter(&HttpAdapterConfig::default());
    let session = Session::new(adapter.clone());

    let (tx, mut rx) = mpsc::unbounded_channel();
    session.send(JsonGet::new(&server, "/items"), move |result| {
        tx.send(result).expect("receiver alive");
    });
    assert_eq!(session.cancel_requests::<JsonGet>(), 1);

    let outcome = timeout(Duration::from_secs(10), rx.recv())
        .await
        .expect("callback within timeout")
        .expect("callback fired");
    match outcome {
        Err(SessionTaskError::Connection(err)) => assert!(err.is_cancelled()),
        other => panic!("expected cancellation, got {other:?}"),
    }
    assert_drained(&session, &adapter);
}

#[tokio::test]
async fn refused_connection_is_a_connect_error() {
    let addr = closed_addr().await;
    let adapter = adapter(&HttpAdapterConfig::default());
    let session = Session::new(adapter.clone());
    let request = JsonGet {
        base_url: format!("http://{addr}"),
        path: "/",
        headers: Vec::new(),
    };

    match send_and_wait(&session, request).await {
        Err(SessionTaskError::Connection(err)) => {
            assert_eq!(err.kind(), TransportErrorKind::Connect);
        }
        other => panic!("expected connect error, got {other:?}"),
    }
    assert_drained(&session, &adapter);
}

#[tokio::test]
async fn unacceptable_status_is_a_response_error() {
    let server = spawn_server(CannedResponse::ok("{}").with_status("404 Not Found")).await;
    let adapter = adapter(&HttpAdapterConfig::default());
    let session = Session::new(adapter.clone());

    match send_and_wait(&session, JsonGet::new(&server, "/missing")).await {
        Err(SessionTaskError::Response(err)) => {
            assert_eq!(err, ResponseError::UnacceptableStatusCode { status: 404 });
        }
        other => panic!("expected response error, got {other:?}"),
    }
    assert_drained(&session, &adapter);
}

#[tokio::test]
async fn malformed_body_is_a_decoding_error() {
    let server = spawn_server(CannedResponse::ok("<html>")).await;
    let adapter = adapter(&HttpAdapterConfig::default());
    let session = Session::new(adapter.clone());

    assert!(matches!(
        send_and_wait(&session, JsonGet::new(&server, "/")).await,
        Err(SessionTaskError::Decoding(_))
    ));
    assert_drained(&session, &adapter);
}

#[tokio::test]
async fn configured_and_descriptor_headers_reach_the_server() {
    let mut server = spawn_server(CannedResponse::ok("{}")).await;
    let config = HttpAdapterConfig {
        user_agent: Some("dispatch-tests".into()),
        default_headers: BTreeMap::from([("X-Default".to_owned(), "yes".to_owned())]),
        ..HttpAdapterConfig::default()
    };
    let adapter = adapter(&config);
    let session = Session::new(adapter.clone());
    let mut request = JsonGet::new(&server, "/items");
    request.headers = vec![("X-Request".into(), "42".into())];

    send_and_wait(&session, request).await.expect("success");

    let head = server.requests.recv().await.expect("request captured");
    let head = head.to_ascii_lowercase();
    assert!(head.starts_with("get /items http/1.1"), "{head}");
    assert!(head.contains("user-agent: dispatch-tests"), "{head}");
    assert!(head.contains("x-default: yes"), "{head}");
    assert!(head.contains("x-request: 42"), "{head}");
}

#[tokio::test]
async fn invalid_request_header_is_a_connection_error() {
    let server = spawn_server(CannedResponse::ok("{}")).await;
    let adapter = adapter(&HttpAdapterConfig::default());
    let session = Session::new(adapter.clone());
    let mut request = JsonGet::new(&server, "/");
    request.headers = vec![("Bad Header".into(), "x".into())];

    match send_and_wait(&session, request).await {
        Err(SessionTaskError::Connection(err)) => {
            assert_eq!(err.kind(), TransportErrorKind::InvalidRequest);
        }
        other => panic!("expected invalid request, got {other:?}"),
    }
    assert_drained(&session, &adapter);
}

#[tokio::test]
async fn concurrent_sends_all_resolve_and_drain() {
    let server =
        spawn_server(CannedResponse::ok(r#"{"n":"1"}"#).delayed(Duration::from_millis(50))).await;
    let adapter = adapter(&HttpAdapterConfig::default());
    let session = Session::new(adapter.clone());

    let results = send_many(&session, &server, 16).await;

    assert_eq!(results.len(), 16);
    assert!(results.iter().all(Result::is_ok));
    assert_drained(&session, &adapter);
}

async fn send_many(session: &Session, server: &FakeServer, count: usize) -> Vec<Outcome> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    for _ in 0..count {
        let tx = tx.clone();
        session.send(JsonGet::new(server, "/n"), move |result| {
            tx.send(result).expect("receiver alive");
        });
    }
    assert_eq!(session.in_flight_count(), count);
    assert_eq!(
        session.in_flight_count(),
        session.in_flight_requests().len()
    );
    drop(tx);

    let mut results = Vec::with_capacity(count);
    while let Some(result) = timeout(Duration::from_secs(10), rx.recv())
        .await
        .expect("deliveries within timeout")
    {
        results.push(result);
    }
    results
}

#[tokio::test]
async fn response_future_api_works_over_http() {
    let server = spawn_server(CannedResponse::ok(r#"{"key":"value"}"#)).await;
    let adapter = adapter(&HttpAdapterConfig::default());
    let session = Session::new(adapter.clone());

    let value = session
        .response(JsonGet::new(&server, "/items"))
        .await
        .expect("success");
    assert_eq!(value["key"], "value");
    assert_drained(&session, &adapter);
}

#[tokio::test]
async fn runtime_shutdown_still_completes_in_flight_requests() {
    let mut server =
        spawn_server(CannedResponse::ok("{}").delayed(Duration::from_secs(5))).await;
    let transport_runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .expect("transport runtime");
    let adapter = ReqwestAdapter::with_runtime(
        &HttpAdapterConfig::default(),
        transport_runtime.handle().clone(),
    )
    .expect("adapter");
    let session = Session::new(adapter.clone());

    let (tx, mut rx) = mpsc::unbounded_channel();
    session.send(JsonGet::new(&server, "/hang"), move |result| {
        tx.send(result).expect("receiver alive");
    });
    // The request head reached the server, so the task is mid-exchange.
    timeout(Duration::from_secs(10), server.requests.recv())
        .await
        .expect("request within timeout")
        .expect("request head");
    assert_eq!(adapter.active_task_count(), 1);

    transport_runtime.shutdown_background();

    let outcome = timeout(Duration::from_secs(10), rx.recv())
        .await
        .expect("callback within timeout")
        .expect("callback fired");
    match outcome {
        Err(SessionTaskError::Connection(err)) => {
            assert_eq!(err.kind(), TransportErrorKind::Other);
        }
        other => panic!("expected a dropped-task error, got {other:?}"),
    }
    assert!(rx.recv().await.is_none(), "callback fired more than once");
    assert_drained(&session, &adapter);
}

#[test]
fn adapter_requires_a_runtime() {
    assert!(matches!(
        ReqwestAdapter::new(&HttpAdapterConfig::default()),
        Err(AdapterError::NoRuntime)
    ));
}
