use clap::Parser;
use serde_json::json;

use super::*;

fn request(extra: &[&str]) -> anyhow::Result<FetchJson> {
    let argv = ["dispatchctl"]
        .into_iter()
        .chain(extra.iter().copied())
        .chain(["https://example.com/search"]);
    FetchJson::from_args(&Args::try_parse_from(argv).expect("valid arguments"))
}

#[test]
fn get_data_lands_in_the_query_string() {
    let wire = request(&["-d", r#"{"q":"rust"}"#])
        .expect("descriptor")
        .build_request()
        .expect("wire request");
    assert_eq!(wire.url.as_str(), "https://example.com/search?q=rust");
    assert_eq!(wire.header("accept"), Some("application/json"));
}

#[test]
fn user_headers_override_accept() {
    let wire = request(&["-H", "Accept: text/csv"])
        .expect("descriptor")
        .build_request()
        .expect("wire request");
    assert_eq!(wire.header("accept"), Some("text/csv"));
}

#[test]
fn invalid_data_is_rejected_before_sending() {
    assert!(request(&["-d", "{oops"]).is_err());
}

#[test]
fn empty_body_decodes_to_null() {
    let descriptor = request(&[]).expect("descriptor");
    let url = descriptor.build_request().expect("wire request").url;
    let metadata = ResponseMetadata::new(204, url);
    assert_eq!(descriptor.decode(b"", &metadata).expect("decodes"), Value::Null);
    assert_eq!(
        descriptor.decode(br#"{"a":1}"#, &metadata).expect("decodes"),
        json!({"a": 1})
    );
}
