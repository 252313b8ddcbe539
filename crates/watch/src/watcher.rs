//! Follow one consumer until the stream ends or the caller gives up.

use std::future::Future;

use vistral_stream::{EventStreamConsumer, StreamState};

use crate::report::{Report, Reporter};

/// How a watch ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Complete,
    /// Domain error from the pipeline, or `"Connection lost"`.
    Failed(String),
    /// `shutdown` resolved first; the stream was closed.
    Interrupted,
}

impl Outcome {
    /// Process exit status: 0 on completion, 1 on failure, 130 on Ctrl-C.
    pub fn exit_code(&self) -> u8 {
        match self {
            Outcome::Complete => 0,
            Outcome::Failed(_) => 1,
            Outcome::Interrupted => 130,
        }
    }
}

/// Log every new report until the stream terminates or `shutdown`
/// resolves, whichever comes first.
pub async fn watch<F>(consumer: &EventStreamConsumer, shutdown: F) -> Outcome
where
    F: Future<Output = ()>,
{
    let mut rx = consumer.subscribe();
    let mut reporter = Reporter::new();
    tokio::pin!(shutdown);

    loop {
        let state = rx.borrow_and_update().clone();
        for report in reporter.observe(&state) {
            log_report(&report);
        }
        if let Some(outcome) = terminal_outcome(&state) {
            return outcome;
        }

        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("Interrupted, closing event stream");
                consumer.close();
                return Outcome::Interrupted;
            }
            changed = rx.changed() => {
                if changed.is_err() {
                    return Outcome::Failed(vistral_stream::CONNECTION_LOST.to_owned());
                }
            }
        }
    }
}

fn terminal_outcome(state: &StreamState) -> Option<Outcome> {
    if state.is_complete() {
        return Some(Outcome::Complete);
    }
    state.error().map(|e| Outcome::Failed(e.to_owned()))
}

fn log_report(report: &Report) {
    match report {
        Report::Event {
            index,
            step,
            progress,
            message,
        } => tracing::info!(index, step = %step, progress, message = %message, "Pipeline event"),
        Report::Ticker { progress, message } => {
            tracing::debug!(progress, message = %message, "Pipeline progress")
        }
        Report::Stages(strip) => tracing::info!("{strip}"),
    }
}
