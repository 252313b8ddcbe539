//! Pipeline progress event schema.
//!
//! The server pushes one JSON object per stream message with the shape
//! `{"step": "<phase>", "progress": 0-100, "message": "...",
//! "heartbeat"?: bool, "ticker"?: bool, "data"?: any}`. This module
//! decodes those messages into a [`Frame`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// A pipeline phase, or one of the two terminal sentinels.
///
/// Variant order is the order the pipeline runs its phases in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStep {
    Upload,
    Audio,
    Transcription,
    Frames,
    Vision,
    Analysis,
    Graph,
    Insights,
    /// The pipeline finished successfully. Terminal.
    Complete,
    /// The pipeline failed. Terminal; `message` carries the reason.
    Error,
}

impl PipelineStep {
    /// Non-terminal phases in execution order.
    pub const PHASES: [PipelineStep; 8] = [
        PipelineStep::Upload,
        PipelineStep::Audio,
        PipelineStep::Transcription,
        PipelineStep::Frames,
        PipelineStep::Vision,
        PipelineStep::Analysis,
        PipelineStep::Graph,
        PipelineStep::Insights,
    ];

    /// `true` for `complete` and `error`.
    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineStep::Complete | PipelineStep::Error)
    }

    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            PipelineStep::Upload => "upload",
            PipelineStep::Audio => "audio",
            PipelineStep::Transcription => "transcription",
            PipelineStep::Frames => "frames",
            PipelineStep::Vision => "vision",
            PipelineStep::Analysis => "analysis",
            PipelineStep::Graph => "graph",
            PipelineStep::Insights => "insights",
            PipelineStep::Complete => "complete",
            PipelineStep::Error => "error",
        }
    }

    /// Human-readable label for progress views.
    pub fn label(self) -> &'static str {
        match self {
            PipelineStep::Upload => "Upload",
            PipelineStep::Audio => "Audio",
            PipelineStep::Transcription => "Transcription",
            PipelineStep::Frames => "Frames",
            PipelineStep::Vision => "Vision",
            PipelineStep::Analysis => "Analysis",
            PipelineStep::Graph => "Knowledge Graph",
            PipelineStep::Insights => "Insights",
            PipelineStep::Complete => "Complete",
            PipelineStep::Error => "Error",
        }
    }
}

impl fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One progress event from the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineEvent {
    pub step: PipelineStep,
    /// Overall completion percentage (0-100). Only `error` events may omit it.
    #[serde(default)]
    pub progress: f64,
    #[serde(default)]
    pub message: String,
    /// High-frequency progress-only update. Never part of the event log.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub ticker: bool,
    /// Opaque payload, passed through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl PipelineEvent {
    pub fn new(step: PipelineStep, progress: f64, message: impl Into<String>) -> Self {
        Self {
            step,
            progress,
            message: message.into(),
            ticker: false,
            data: None,
        }
    }

    /// Mark this event as a ticker update.
    pub fn as_ticker(mut self) -> Self {
        self.ticker = true;
        self
    }

    /// Attach an opaque payload.
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// A decoded stream message.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Liveness ping. Carries no new information.
    Heartbeat,
    Event(PipelineEvent),
}

/// Decode one stream message.
///
/// Any object with `"heartbeat": true` is a [`Frame::Heartbeat`], whatever
/// else it carries (the server repeats its last real event with the flag
/// set). Everything else must be a well-formed [`PipelineEvent`] with a
/// progress value inside `0..=100`, except `error` events: their progress
/// is optional and pulled into range, so the failure message always gets
/// through.
pub fn parse_frame(text: &str) -> Result<Frame, CoreError> {
    let value: serde_json::Value = serde_json::from_str(text)?;

    if value.get("heartbeat").and_then(serde_json::Value::as_bool) == Some(true) {
        return Ok(Frame::Heartbeat);
    }

    let has_progress = value.get("progress").is_some();
    let mut event: PipelineEvent = serde_json::from_value(value)?;

    if event.step == PipelineStep::Error {
        event.progress = event.progress.clamp(0.0, 100.0);
        return Ok(Frame::Event(event));
    }

    if !has_progress {
        return Err(CoreError::Validation(format!("{} event without progress", event.step)));
    }
    if !(0.0..=100.0).contains(&event.progress) {
        return Err(CoreError::Validation(format!(
            "progress {} outside 0..=100",
            event.progress
        )));
    }
    Ok(Frame::Event(event))
}
