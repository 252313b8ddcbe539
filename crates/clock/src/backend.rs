//! Media backend capability set.
//!
//! Every playback source the clock can drive implements
//! [`MediaBackend`]. Sources that can announce their own changes also
//! implement [`PushBackend`]; everything else is polled.

use serde::Serialize;
use vistral_core::types::Seconds;

use crate::listeners::{Listener, Subscription};

/// Playback state as reported by a backend.
///
/// Mirrors the hosted player's state codes; a local element only ever
/// reports `Playing` or `Paused`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayState {
    Unstarted,
    Ended,
    Playing,
    Paused,
    Buffering,
    Cued,
}

impl PlayState {
    /// Map the hosted player's numeric state code.
    ///
    /// Unknown codes are treated as `Unstarted`.
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => PlayState::Ended,
            1 => PlayState::Playing,
            2 => PlayState::Paused,
            3 => PlayState::Buffering,
            5 => PlayState::Cued,
            _ => PlayState::Unstarted,
        }
    }

    pub fn is_playing(self) -> bool {
        self == PlayState::Playing
    }
}

/// Which wiring a bound backend uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Push,
    Poll,
}

/// Errors a backend may raise from any query or command.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The player exists but cannot answer yet (still initializing).
    #[error("Backend not ready: {0}")]
    NotReady(String),

    /// The backend does not support this operation.
    #[error("Unsupported operation: {0}")]
    Unsupported(&'static str),

    /// The operation was attempted and failed.
    #[error("Backend operation failed: {0}")]
    Failed(String),
}

/// The capability set shared by every playback source.
///
/// Methods take `&self`: implementations hold whatever interior state
/// they need, because the clock queries them from its poll task while
/// the owner issues commands.
pub trait MediaBackend: Send + Sync {
    fn seek(&self, time: Seconds) -> Result<(), BackendError>;

    fn current_time(&self) -> Result<Seconds, BackendError>;

    /// Total length. May be `0` or non-finite until metadata is known.
    fn duration(&self) -> Result<Seconds, BackendError>;

    fn play_state(&self) -> Result<PlayState, BackendError>;

    fn play(&self) -> Result<(), BackendError>;

    fn pause(&self) -> Result<(), BackendError>;
}

/// A lifecycle notification from a push backend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MediaNotification {
    /// Playback position moved.
    TimeChanged(Seconds),
    /// Metadata (duration) became available.
    MetadataReady(Seconds),
    Started,
    Stopped,
}

/// A backend that announces its own changes.
pub trait PushBackend: MediaBackend {
    /// Register `listener` for every notification until the returned
    /// [`Subscription`] is dropped.
    fn subscribe(&self, listener: Listener) -> Subscription;
}
