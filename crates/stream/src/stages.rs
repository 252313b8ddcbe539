//! Per-stage status for the pipeline progress strip.

use serde::Serialize;
use vistral_core::PipelineStep;

use crate::state::StreamState;

/// Stages shown in the progress strip, in order.
///
/// `upload` is never shown; `analysis` is displayed as part of `graph`.
pub const STAGES: [PipelineStep; 6] = [
    PipelineStep::Audio,
    PipelineStep::Transcription,
    PipelineStep::Frames,
    PipelineStep::Vision,
    PipelineStep::Graph,
    PipelineStep::Insights,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    Done,
    Active,
    Pending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Stage {
    pub step: PipelineStep,
    pub status: StageStatus,
}

/// Map a reported step onto the strip.
fn displayed_as(step: PipelineStep) -> PipelineStep {
    match step {
        PipelineStep::Complete => PipelineStep::Insights,
        PipelineStep::Analysis => PipelineStep::Graph,
        other => other,
    }
}

/// Derive the strip from the latest event.
///
/// Everything is done once the stream completed. Before the first event,
/// during `upload`, and after an `error` event no stage is active.
pub fn stage_strip(state: &StreamState) -> Vec<Stage> {
    if state.is_complete() {
        return STAGES
            .iter()
            .map(|&step| Stage {
                step,
                status: StageStatus::Done,
            })
            .collect();
    }

    let active = state
        .current_step()
        .map(displayed_as)
        .and_then(|step| STAGES.iter().position(|&s| s == step));

    STAGES
        .iter()
        .enumerate()
        .map(|(idx, &step)| {
            let status = match active {
                Some(current) if idx < current => StageStatus::Done,
                Some(current) if idx == current => StageStatus::Active,
                _ => StageStatus::Pending,
            };
            Stage { step, status }
        })
        .collect()
}
