//! Turn successive stream snapshots into log-ready reports.
//!
//! The consumer publishes whole [`StreamState`] snapshots; [`Reporter`]
//! remembers what it already reported and yields only what is new.

use vistral_core::PipelineStep;
use vistral_stream::{stage_strip, Stage, StageStatus, StreamState};

/// Something worth printing about the stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Report {
    /// A significant event entered the log. `index` is 1-based.
    Event {
        index: usize,
        step: PipelineStep,
        progress: f64,
        message: String,
    },
    /// A ticker moved the live progress or message.
    Ticker { progress: f64, message: String },
    /// The current step changed; carries the rendered strip.
    Stages(String),
}

#[derive(Debug, Default)]
pub struct Reporter {
    generation: u64,
    reported_events: usize,
    last_step: Option<PipelineStep>,
    last_ticker: Option<(f64, String)>,
}

impl Reporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports for everything in `state` not seen in earlier snapshots.
    pub fn observe(&mut self, state: &StreamState) -> Vec<Report> {
        let mut reports = Vec::new();

        // The consumer was reset since the last snapshot; start over.
        if state.generation() != self.generation {
            *self = Self {
                generation: state.generation(),
                ..Self::default()
            };
        }

        for (offset, event) in state.events()[self.reported_events..].iter().enumerate() {
            reports.push(Report::Event {
                index: self.reported_events + offset + 1,
                step: event.step,
                progress: event.progress,
                message: event.message.clone(),
            });
        }
        self.reported_events = state.events().len();

        if let Some(latest) = state.latest().filter(|ev| ev.ticker) {
            let ticker = (latest.progress, latest.message.clone());
            if self.last_ticker.as_ref() != Some(&ticker) {
                reports.push(Report::Ticker {
                    progress: ticker.0,
                    message: ticker.1.clone(),
                });
                self.last_ticker = Some(ticker);
            }
        }

        let step = state.current_step();
        if step.is_some() && step != self.last_step {
            reports.push(Report::Stages(render_strip(&stage_strip(state))));
        }
        self.last_step = step;

        reports
    }
}

/// One-line rendering of the stage strip, e.g.
/// `[x] Audio  [>] Transcription  [ ] Frames`.
pub fn render_strip(stages: &[Stage]) -> String {
    stages
        .iter()
        .map(|stage| {
            let mark = match stage.status {
                StageStatus::Done => "[x]",
                StageStatus::Active => "[>]",
                StageStatus::Pending => "[ ]",
            };
            format!("{mark} {}", stage.step.label())
        })
        .collect::<Vec<_>>()
        .join("  ")
}

#[cfg(test)]
mod tests {
    use vistral_core::{Frame, PipelineEvent};

    use super::*;

    fn push(state: &mut StreamState, event: PipelineEvent) {
        state.apply(Frame::Event(event));
    }

    #[test]
    fn strip_rendering() {
        let mut state = StreamState::new();
        push(&mut state, PipelineEvent::new(PipelineStep::Frames, 40.0, ""));
        assert_eq!(
            render_strip(&stage_strip(&state)),
            concat!(
                "[x] Audio  [x] Transcription  [>] Frames  ",
                "[ ] Vision  [ ] Knowledge Graph  [ ] Insights",
            )
        );
    }

    #[test]
    fn events_are_reported_once_with_running_index() {
        let mut state = StreamState::new();
        let mut reporter = Reporter::new();

        push(&mut state, PipelineEvent::new(PipelineStep::Audio, 10.0, "Extracting audio"));
        let first = reporter.observe(&state);
        assert_eq!(
            first[0],
            Report::Event {
                index: 1,
                step: PipelineStep::Audio,
                progress: 10.0,
                message: "Extracting audio".into(),
            }
        );
        assert!(matches!(first[1], Report::Stages(_)));

        assert!(reporter.observe(&state).is_empty());

        push(&mut state, PipelineEvent::new(PipelineStep::Audio, 20.0, "Audio done"));
        let second = reporter.observe(&state);
        assert_eq!(second.len(), 1);
        assert!(matches!(second[0], Report::Event { index: 2, .. }));
    }

    #[test]
    fn tickers_report_only_on_change() {
        let mut state = StreamState::new();
        let mut reporter = Reporter::new();
        push(&mut state, PipelineEvent::new(PipelineStep::Vision, 50.0, "Describing frames"));
        reporter.observe(&state);

        push(&mut state, PipelineEvent::new(PipelineStep::Vision, 52.0, "frame 3/40").as_ticker());
        assert_eq!(
            reporter.observe(&state),
            vec![Report::Ticker {
                progress: 52.0,
                message: "frame 3/40".into(),
            }]
        );
        assert!(reporter.observe(&state).is_empty());
    }

    #[test]
    fn reset_restarts_numbering() {
        let mut state = StreamState::new();
        let mut reporter = Reporter::new();
        push(&mut state, PipelineEvent::new(PipelineStep::Audio, 10.0, ""));
        push(&mut state, PipelineEvent::new(PipelineStep::Transcription, 30.0, ""));
        reporter.observe(&state);

        state.reset();
        assert!(reporter.observe(&state).is_empty());

        push(&mut state, PipelineEvent::new(PipelineStep::Upload, 1.0, ""));
        let reports = reporter.observe(&state);
        assert!(matches!(reports[0], Report::Event { index: 1, .. }));
    }

    #[test]
    fn reset_is_noticed_even_when_the_log_regrew() {
        let mut state = StreamState::new();
        let mut reporter = Reporter::new();
        push(&mut state, PipelineEvent::new(PipelineStep::Audio, 10.0, "old"));
        reporter.observe(&state);

        // Reset and more new events than before, all between two snapshots.
        state.reset();
        push(&mut state, PipelineEvent::new(PipelineStep::Upload, 1.0, "new 1"));
        push(&mut state, PipelineEvent::new(PipelineStep::Audio, 5.0, "new 2"));

        let events: Vec<(usize, String)> = reporter
            .observe(&state)
            .into_iter()
            .filter_map(|r| match r {
                Report::Event { index, message, .. } => Some((index, message)),
                _ => None,
            })
            .collect();
        assert_eq!(events, vec![(1, "new 1".to_owned()), (2, "new 2".to_owned())]);
    }
}
