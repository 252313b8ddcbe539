//! Accumulated state of one pipeline progress stream.
//!
//! [`StreamState::apply`] is the whole filtering policy: heartbeats are
//! invisible, progress never moves backwards (except on the terminal
//! `error` event), tickers drive the live view without entering the
//! event log, and nothing is applied after a terminal event.

use chrono::Utc;
use serde::Serialize;
use vistral_core::types::Timestamp;
use vistral_core::{Frame, PipelineEvent, PipelineStep};

/// Error shown when the transport drops before a terminal event.
pub const CONNECTION_LOST: &str = "Connection lost";

/// What [`StreamState::apply`] did with a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// Heartbeat, or a frame arriving after the stream terminated.
    Ignored,
    /// Non-terminal ticker: the latest event changed, the log did not.
    Updated,
    /// Appended to the significant-event log.
    Logged,
    /// A terminal event was applied (ticker or not); the channel must close now.
    Terminated,
}

impl Applied {
    /// Whether observers can see a difference.
    pub fn is_visible(self) -> bool {
        self != Applied::Ignored
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StreamState {
    events: Vec<PipelineEvent>,
    latest: Option<PipelineEvent>,
    max_progress: f64,
    is_complete: bool,
    error: Option<String>,
    updated_at: Option<Timestamp>,
    /// Bumped by every [`reset`](StreamState::reset).
    #[serde(skip)]
    generation: u64,
}

impl StreamState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one decoded frame into the state.
    pub fn apply(&mut self, frame: Frame) -> Applied {
        let mut event = match frame {
            Frame::Heartbeat => return Applied::Ignored,
            Frame::Event(event) => event,
        };
        if self.is_terminal() {
            return Applied::Ignored;
        }

        // Tickers take part in the clamp and can raise the running maximum.
        if event.step != PipelineStep::Error {
            event.progress = event.progress.max(self.max_progress);
            self.max_progress = event.progress;
        }

        self.updated_at = Some(Utc::now());
        self.latest = Some(event.clone());

        let step = event.step;
        let message = event.message.clone();
        let ticker = event.ticker;
        // A ticker flag keeps the event out of the log, never out of termination.
        if !ticker {
            self.events.push(event);
        }

        match step {
            PipelineStep::Complete => {
                self.is_complete = true;
                Applied::Terminated
            }
            PipelineStep::Error => {
                self.error = Some(message);
                Applied::Terminated
            }
            _ if ticker => Applied::Updated,
            _ => Applied::Logged,
        }
    }

    /// Record a transport failure. No-op once a terminal event was seen.
    ///
    /// Returns `true` when the error was recorded.
    pub fn fail_transport(&mut self) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.error = Some(CONNECTION_LOST.to_owned());
        true
    }

    /// Drop everything accumulated so far, including the running maximum.
    pub fn reset(&mut self) {
        *self = Self {
            generation: self.generation + 1,
            ..Self::default()
        };
    }

    /// Number of resets so far. Observers that track the log by position
    /// compare it to notice a reset between two snapshots.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Significant events in arrival order.
    pub fn events(&self) -> &[PipelineEvent] {
        &self.events
    }

    /// Latest non-heartbeat event, ticker or not.
    pub fn latest(&self) -> Option<&PipelineEvent> {
        self.latest.as_ref()
    }

    pub fn max_progress(&self) -> f64 {
        self.max_progress
    }

    pub fn is_complete(&self) -> bool {
        self.is_complete
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn updated_at(&self) -> Option<Timestamp> {
        self.updated_at
    }

    /// Completed or failed, for either reason.
    pub fn is_terminal(&self) -> bool {
        self.is_complete || self.error.is_some()
    }

    /// Progress of the latest event, 0 before the first one.
    pub fn progress(&self) -> f64 {
        self.latest.as_ref().map_or(0.0, |ev| ev.progress)
    }

    pub fn current_step(&self) -> Option<PipelineStep> {
        self.latest.as_ref().map(|ev| ev.step)
    }

    pub fn current_message(&self) -> Option<&str> {
        self.latest.as_ref().map(|ev| ev.message.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(step: PipelineStep, progress: f64) -> Frame {
        Frame::Event(PipelineEvent::new(step, progress, format!("{step} {progress}")))
    }

    fn ticker(step: PipelineStep, progress: f64) -> Frame {
        Frame::Event(PipelineEvent::new(step, progress, "tick").as_ticker())
    }

    #[test]
    fn progress_is_monotonic() {
        let mut state = StreamState::new();
        let mut seen = Vec::new();
        for (step, p) in [
            (PipelineStep::Audio, 10.0),
            (PipelineStep::Audio, 20.0),
            (PipelineStep::Transcription, 15.0),
            (PipelineStep::Frames, 25.0),
            (PipelineStep::Vision, 5.0),
            (PipelineStep::Graph, 70.0),
        ] {
            state.apply(event(step, p));
            seen.push(state.progress());
        }
        assert_eq!(seen, vec![10.0, 20.0, 20.0, 25.0, 25.0, 70.0]);
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn heartbeat_changes_nothing() {
        let mut state = StreamState::new();
        state.apply(event(PipelineStep::Audio, 10.0));
        let before = state.clone();

        assert_eq!(state.apply(Frame::Heartbeat), Applied::Ignored);
        assert_eq!(state, before);

        state.apply(event(PipelineStep::Transcription, 40.0));
        assert_eq!(state.events().len(), 2);
    }

    #[test]
    fn ticker_updates_latest_but_not_log() {
        let mut state = StreamState::new();
        state.apply(event(PipelineStep::Vision, 50.0));

        assert_eq!(state.apply(ticker(PipelineStep::Vision, 57.5)), Applied::Updated);
        assert_eq!(state.events().len(), 1);
        assert_eq!(state.progress(), 57.5);
        assert_eq!(state.current_message(), Some("tick"));
    }

    #[test]
    fn ticker_below_maximum_is_clamped_up() {
        let mut state = StreamState::new();
        state.apply(event(PipelineStep::Audio, 30.0));
        state.apply(ticker(PipelineStep::Audio, 12.0));
        assert_eq!(state.progress(), 30.0);
        assert_eq!(state.max_progress(), 30.0);
    }

    #[test]
    fn ticker_above_maximum_raises_it() {
        let mut state = StreamState::new();
        state.apply(event(PipelineStep::Audio, 10.0));
        state.apply(ticker(PipelineStep::Audio, 18.0));
        state.apply(event(PipelineStep::Transcription, 15.0));
        assert_eq!(state.progress(), 18.0);
        assert_eq!(state.events()[1].progress, 18.0);
    }

    #[test]
    fn complete_terminates_and_freezes_state() {
        let mut state = StreamState::new();
        state.apply(event(PipelineStep::Insights, 94.0));
        assert_eq!(state.apply(event(PipelineStep::Complete, 100.0)), Applied::Terminated);
        assert!(state.is_complete());
        assert!(state.error().is_none());

        let frozen = state.clone();
        assert_eq!(state.apply(event(PipelineStep::Audio, 100.0)), Applied::Ignored);
        assert_eq!(state.apply(ticker(PipelineStep::Audio, 100.0)), Applied::Ignored);
        assert_eq!(state, frozen);
    }

    #[test]
    fn ticker_complete_still_terminates() {
        let mut state = StreamState::new();
        state.apply(event(PipelineStep::Insights, 94.0));

        assert_eq!(state.apply(ticker(PipelineStep::Complete, 100.0)), Applied::Terminated);
        assert!(state.is_complete());
        assert!(state.is_terminal());
        assert_eq!(state.events().len(), 1);
        assert_eq!(state.current_step(), Some(PipelineStep::Complete));

        assert_eq!(state.apply(event(PipelineStep::Audio, 100.0)), Applied::Ignored);
        assert_eq!(state.events().len(), 1);
    }

    #[test]
    fn ticker_error_still_terminates() {
        let mut state = StreamState::new();
        state.apply(event(PipelineStep::Frames, 30.0));
        let failed = PipelineEvent::new(PipelineStep::Error, 30.0, "Pipeline error: x").as_ticker();

        assert_eq!(state.apply(Frame::Event(failed)), Applied::Terminated);
        assert_eq!(state.error(), Some("Pipeline error: x"));
        assert!(!state.fail_transport());
        assert_eq!(state.apply(event(PipelineStep::Vision, 50.0)), Applied::Ignored);
    }

    #[test]
    fn error_event_is_not_clamped() {
        let mut state = StreamState::new();
        state.apply(event(PipelineStep::Vision, 60.0));
        let failed = PipelineEvent::new(PipelineStep::Error, 0.0, "Vision model unavailable");

        assert_eq!(state.apply(Frame::Event(failed)), Applied::Terminated);
        assert_eq!(state.error(), Some("Vision model unavailable"));
        assert_eq!(state.progress(), 0.0);
        assert_eq!(state.max_progress(), 60.0);
        assert_eq!(state.events().last().map(|e| e.step), Some(PipelineStep::Error));
    }

    #[test]
    fn transport_failure_sets_generic_error() {
        let mut state = StreamState::new();
        state.apply(event(PipelineStep::Audio, 10.0));
        assert!(state.fail_transport());
        assert_eq!(state.error(), Some(CONNECTION_LOST));
        assert!(state.is_terminal());
    }

    #[test]
    fn transport_failure_after_terminal_is_ignored() {
        let mut state = StreamState::new();
        state.apply(event(PipelineStep::Complete, 100.0));
        assert!(!state.fail_transport());
        assert!(state.error().is_none());
    }

    #[test]
    fn reset_clears_running_maximum() {
        let mut state = StreamState::new();
        state.apply(event(PipelineStep::Graph, 75.0));
        state.apply(event(PipelineStep::Complete, 100.0));

        state.reset();
        assert_eq!(state.generation(), 1);
        assert_eq!(
            state,
            StreamState {
                generation: 1,
                ..StreamState::default()
            }
        );

        state.apply(event(PipelineStep::Audio, 10.0));
        assert_eq!(state.progress(), 10.0);
        assert_eq!(state.events().len(), 1);
    }

    #[test]
    fn data_payload_passes_through() {
        let mut state = StreamState::new();
        let ev = PipelineEvent::new(PipelineStep::Transcription, 44.0, "done")
            .with_data(serde_json::json!({"segments": 42}));
        state.apply(Frame::Event(ev));
        assert_eq!(
            state.latest().and_then(|e| e.data.clone()),
            Some(serde_json::json!({"segments": 42}))
        );
    }
}
