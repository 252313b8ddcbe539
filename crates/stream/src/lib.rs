//! Client side of a job's pipeline progress stream.
//!
//! Opens one server-sent-events channel per job, decodes each message
//! into a [`Frame`](vistral_core::Frame), and folds the frames into a
//! [`StreamState`] that observers read through a `watch` channel.
//! There is deliberately no reconnect: a dropped stream ends in the
//! `"Connection lost"` error and the caller builds a new consumer.

pub mod client;
pub mod config;
pub mod consumer;
pub mod sse;
pub mod stages;
pub mod state;

pub use client::{StreamClient, StreamConnection, StreamError};
pub use config::StreamConfig;
pub use consumer::EventStreamConsumer;
pub use stages::{stage_strip, Stage, StageStatus};
pub use state::{Applied, StreamState, CONNECTION_LOST};
