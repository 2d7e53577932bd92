//! CLI configuration: optional TOML file merged with command-line overrides.
//!
//! Precedence, highest first: command-line flags, the `--config` file,
//! built-in defaults.
//!
//! ```toml
//! [http]
//! timeout_ms = 5000
//! user_agent = "dispatchctl"
//!
//! [http.default_headers]
//! Accept = "application/json"
//!
//! [logging]
//! format = "json"
//! filter = "info,dispatch=debug"
//! otlp_endpoint = "http://localhost:4317"
//! ```

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, ValueEnum};
use http_adapter::HttpAdapterConfig;
use serde::Deserialize;

// ---------------------------------------------------------------------------
// Command line
// ---------------------------------------------------------------------------

/// Send one typed request through the dispatch session and print the JSON
/// response on stdout.
#[derive(Debug, Parser)]
#[command(name = "dispatchctl", version)]
pub struct Args {
    /// Absolute URL to request.
    pub url: String,

    /// HTTP method.
    #[arg(short = 'X', long, value_enum, default_value_t = HttpMethod::Get)]
    pub method: HttpMethod,

    /// JSON parameters: query string for GET/HEAD/DELETE, body otherwise.
    #[arg(short = 'd', long)]
    pub data: Option<String>,

    /// Extra request header, as `Name: value`. Repeatable.
    #[arg(short = 'H', long = "header", value_parser = parse_header)]
    pub headers: Vec<(String, String)>,

    /// TOML configuration file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Overall request timeout in milliseconds.
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Log output format.
    #[arg(long, value_enum)]
    pub log_format: Option<LogFormat>,

    /// OTLP gRPC endpoint for trace export.
    #[arg(long)]
    pub otlp_endpoint: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl From<HttpMethod> for dispatch::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => Self::Get,
            HttpMethod::Post => Self::Post,
            HttpMethod::Put => Self::Put,
            HttpMethod::Patch => Self::Patch,
            HttpMethod::Delete => Self::Delete,
            HttpMethod::Head => Self::Head,
            HttpMethod::Options => Self::Options,
        }
    }
}

fn parse_header(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| format!("header '{raw}' must look like 'Name: value'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("header '{raw}' has an empty name"));
    }
    Ok((name.to_owned(), value.trim().to_owned()))
}

// ---------------------------------------------------------------------------
// Configuration file
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
    pub otlp_endpoint: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            filter: "info".to_owned(),
            otlp_endpoint: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CliConfig {
    pub http: HttpAdapterConfig,
    pub logging: LoggingConfig,
}

impl CliConfig {
    /// Loads the configuration file, or the defaults when `path` is `None`.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parsing config file {}", path.display()))
    }

    pub fn parse(text: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Applies command-line overrides on top of the file values.
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(timeout_ms) = args.timeout_ms {
            self.http.timeout_ms = Some(timeout_ms);
        }
        if let Some(format) = args.log_format {
            self.logging.format = format;
        }
        if let Some(endpoint) = &args.otlp_endpoint {
            self.logging.otlp_endpoint = Some(endpoint.clone());
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
