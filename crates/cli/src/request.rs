//! The ad-hoc descriptor the CLI sends.

use anyhow::Context;
use dispatch::{decode_json, DecodeError, Method, Request, ResponseMetadata};
use serde_json::Value;

use crate::config::Args;

/// Requests an absolute URL and decodes the body as arbitrary JSON.
///
/// An empty body decodes to `null`.
#[derive(Debug, Clone)]
pub struct FetchJson {
    url: String,
    method: Method,
    parameters: Option<Value>,
    headers: Vec<(String, String)>,
}

impl FetchJson {
    pub fn from_args(args: &Args) -> anyhow::Result<Self> {
        let parameters = args
            .data
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .context("--data is not valid JSON")?;
        Ok(Self {
            url: args.url.clone(),
            method: args.method.into(),
            parameters,
            headers: args.headers.clone(),
        })
    }
}

impl Request for FetchJson {
    type Response = Value;

    fn base_url(&self) -> &str {
        &self.url
    }

    fn method(&self) -> Method {
        self.method
    }

    fn path(&self) -> &str {
        ""
    }

    fn parameters(&self) -> Option<Value> {
        self.parameters.clone()
    }

    fn header_fields(&self) -> Vec<(String, String)> {
        let mut headers = vec![("Accept".to_owned(), "application/json".to_owned())];
        headers.extend(self.headers.iter().cloned());
        headers
    }

    fn decode(&self, body: &[u8], _metadata: &ResponseMetadata) -> Result<Value, DecodeError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        decode_json(body)
    }
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
