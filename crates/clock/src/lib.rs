//! One playback clock over interchangeable media backends.
//!
//! [`MediaClock`] exposes seek/toggle and an observable
//! [`ClockState`] while exactly one backend is bound at a time:
//!
//! - a *push* backend ([`PushBackend`]) notifies the clock of every
//!   change through a listener [`Subscription`];
//! - a *poll* backend (any [`MediaBackend`]) is sampled by a
//!   cancellable [`PollTask`] every 250 ms.
//!
//! Rebinding always tears the previous observation down before the new
//! one starts, so two sources never drive the same state.

pub mod backend;
pub mod clock;
pub mod hosted;
pub mod listeners;
pub mod loader;
pub mod poller;

pub use backend::{
    BackendError, BackendKind, MediaBackend, MediaNotification, PlayState, PushBackend,
};
pub use clock::{ClockState, MediaClock, DEFAULT_POLL_INTERVAL};
pub use listeners::{Listener, ListenerSet, Subscription};
pub use loader::ApiLoader;
pub use poller::PollTask;
