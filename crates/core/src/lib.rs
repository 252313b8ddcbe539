//! Shared types for the Vistral sync layer.
//!
//! Holds the pipeline progress event schema carried on a job's event
//! stream and the small set of aliases used across the workspace.

pub mod error;
pub mod pipeline;
pub mod types;

pub use error::CoreError;
pub use pipeline::{parse_frame, Frame, PipelineEvent, PipelineStep};
