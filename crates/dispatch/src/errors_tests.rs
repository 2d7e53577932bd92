use std::error::Error as _;

use rstest::rstest;

use super::*;

fn classify(err: impl Into<SessionTaskError>) -> SessionTaskError {
    err.into()
}

#[rstest]
#[case::build(
    classify(RequestError::InvalidParameters { reason: "not an object".into() }),
    Stage::Build
)]
#[case::transport(classify(TransportError::cancelled()), Stage::Transport)]
#[case::validation(
    classify(ResponseError::UnacceptableStatusCode { status: 500 }),
    Stage::Validation
)]
#[case::decoding(
    classify(DecodeError::Custom { message: "bad".into() }),
    Stage::Decoding
)]
fn each_stage_error_maps_to_one_variant(#[case] err: SessionTaskError, #[case] stage: Stage) {
    assert_eq!(err.stage(), stage);
}

#[test]
fn cancellation_is_distinguishable_from_timeout() {
    let cancelled = classify(TransportError::cancelled());
    let timed_out = classify(TransportError::new(
        TransportErrorKind::TimedOut,
        "deadline elapsed",
    ));

    assert!(cancelled.is_cancelled());
    assert!(!timed_out.is_cancelled());
    assert!(timed_out
        .transport_error()
        .is_some_and(TransportError::is_timeout));
}

#[test]
fn non_connection_errors_carry_no_transport_error() {
    let err = classify(ResponseError::UnacceptableStatusCode { status: 404 });
    assert!(err.transport_error().is_none());
    assert!(!err.is_cancelled());
}

#[test]
fn transport_error_preserves_underlying_cause() {
    let cause = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
    let err = TransportError::with_source(TransportErrorKind::Connect, "connect failed", cause);

    let source = err.source().expect("source preserved");
    let io = source
        .downcast_ref::<std::io::Error>()
        .expect("source is the io error");
    assert_eq!(io.kind(), std::io::ErrorKind::ConnectionRefused);
    assert_eq!(err.kind(), TransportErrorKind::Connect);
    assert_eq!(err.message(), "connect failed");
}

#[test]
fn display_includes_stage_and_kind() {
    let err = classify(TransportError::cancelled());
    assert_eq!(
        err.to_string(),
        "Connection error: Transport error (cancelled): task was cancelled"
    );
}
