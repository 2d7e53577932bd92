//! `dispatchctl` entry point.
//!
//! This binary is the composition root for the workspace. Responsibilities:
//!
//! 1. **Parse configuration** — load the optional `--config` TOML file and
//!    apply command-line overrides.
//! 2. **Wire observability** — configure `tracing-subscriber` with a pretty or
//!    JSON layer and, when an endpoint is configured, an OpenTelemetry OTLP
//!    exporter. All `tracing` events emitted by every crate in the workspace
//!    flow through this layer.
//! 3. **Construct infrastructure** — create the [`http_adapter::ReqwestAdapter`]
//!    and inject it into a [`dispatch::Session`].
//! 4. **Dispatch** — send one [`request::FetchJson`] descriptor, print the
//!    decoded JSON on stdout, and cancel it through the session on Ctrl-C.

mod config;
mod observability;
mod request;

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use dispatch::Session;
use http_adapter::ReqwestAdapter;
use tracing::{info, warn};

use crate::config::{Args, CliConfig};
use crate::request::FetchJson;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<()> {
    let args = Args::parse();
    let mut config = CliConfig::load(args.config.as_deref())?;
    config.apply_args(&args);

    let telemetry = observability::init(&config.logging)?;
    let outcome = dispatch_once(&args, &config).await;
    telemetry.shutdown();

    let body = outcome?;
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}

async fn dispatch_once(args: &Args, config: &CliConfig) -> anyhow::Result<serde_json::Value> {
    let adapter = ReqwestAdapter::new(&config.http).context("building HTTP adapter")?;
    let session = Session::new(adapter);
    let request = FetchJson::from_args(args)?;

    info!(url = %args.url, method = ?args.method, "sending request");
    let response = session.response(request);
    tokio::pin!(response);

    let outcome = tokio::select! {
        outcome = &mut response => outcome,
        _ = tokio::signal::ctrl_c() => {
            let cancelled = session.cancel_all();
            warn!(cancelled, "interrupted, cancelling in-flight requests");
            response.await
        }
    };

    let body = outcome.context("request failed")?;
    info!("request completed");
    Ok(body)
}
