//! `vistral-watch` -- follow one job's pipeline progress from a terminal.
//!
//! Opens the job's event stream, logs every significant event and the
//! stage strip as the pipeline moves, and exits when the stream ends.
//!
//! # Environment variables
//!
//! | Variable                       | Required | Default                 | Description                   |
//! |--------------------------------|----------|-------------------------|-------------------------------|
//! | `VISTRAL_JOB_ID`               | yes      | --                      | Job whose stream to follow    |
//! | `VISTRAL_API_URL`              | no       | `http://localhost:8000` | Backend API base URL          |
//! | `VISTRAL_CONNECT_TIMEOUT_SECS` | no       | `10`                    | Connect timeout for the stream |
//!
//! Exits 0 when the pipeline completes, 1 on a pipeline or transport
//! error, and 130 when interrupted with Ctrl-C.

use std::process::ExitCode;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vistral_stream::{EventStreamConsumer, StreamClient};
use vistral_watch::config::WatchConfig;
use vistral_watch::watcher::{self, Outcome};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vistral_watch=info,vistral_stream=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = WatchConfig::from_env().unwrap_or_else(|e| {
        tracing::error!(error = %e, "Invalid configuration");
        std::process::exit(1);
    });

    let http = config.stream.build_client().unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to build HTTP client");
        std::process::exit(1);
    });

    let url = config.stream_url();
    tracing::info!(job_id = %config.job_id, url = %url, "Starting vistral-watch");

    let consumer = EventStreamConsumer::connect(StreamClient::new(http, url));
    let outcome = watcher::watch(&consumer, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    })
    .await;

    match &outcome {
        Outcome::Complete => tracing::info!(job_id = %config.job_id, "Pipeline complete"),
        Outcome::Failed(e) => {
            tracing::error!(job_id = %config.job_id, error = %e, "Pipeline failed")
        }
        Outcome::Interrupted => {}
    }

    consumer.closed().await;
    ExitCode::from(outcome.exit_code())
}
