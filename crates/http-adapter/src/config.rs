//! Configuration for [`crate::ReqwestAdapter`].
//!
//! Every field is optional; an empty table yields reqwest's defaults. The
//! struct deserialises from the `[http]` table of the CLI config file.

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::Deserialize;

use crate::error::AdapterError;

/// Client-level settings applied to every task the adapter creates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HttpAdapterConfig {
    /// Overall per-request timeout, in milliseconds. Expiry surfaces as a
    /// `TimedOut` transport error.
    pub timeout_ms: Option<u64>,

    /// Connection establishment timeout, in milliseconds.
    pub connect_timeout_ms: Option<u64>,

    /// Value of the `User-Agent` header.
    pub user_agent: Option<String>,

    /// Headers sent with every request unless the request sets them itself.
    pub default_headers: BTreeMap<String, String>,
}

impl HttpAdapterConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_ms.map(Duration::from_millis)
    }

    /// Builds the reqwest client described by this configuration.
    pub fn build_client(&self) -> Result<reqwest::Client, AdapterError> {
        let mut builder = reqwest::Client::builder().default_headers(self.header_map()?);
        if let Some(timeout) = self.timeout() {
            builder = builder.timeout(timeout);
        }
        if let Some(timeout) = self.connect_timeout() {
            builder = builder.connect_timeout(timeout);
        }
        if let Some(user_agent) = &self.user_agent {
            builder = builder.user_agent(user_agent.as_str());
        }
        builder.build().map_err(AdapterError::ClientBuild)
    }

    fn header_map(&self) -> Result<HeaderMap, AdapterError> {
        let mut headers = HeaderMap::with_capacity(self.default_headers.len());
        for (name, value) in &self.default_headers {
            let invalid = |reason: String| AdapterError::InvalidDefaultHeader {
                name: name.clone(),
                reason,
            };
            let header_name =
                HeaderName::from_bytes(name.as_bytes()).map_err(|e| invalid(e.to_string()))?;
            let header_value = HeaderValue::from_str(value).map_err(|e| invalid(e.to_string()))?;
            headers.insert(header_name, header_value);
        }
        Ok(headers)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
