//! The unified playback clock.
//!
//! [`MediaClock`] owns the [`ClockState`] and at most one backend
//! binding. A binding is the backend handle plus whatever keeps its
//! observation alive (a listener [`Subscription`] or a [`PollTask`]);
//! replacing the binding drops the old one first.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use vistral_core::types::Seconds;

use crate::backend::{BackendError, BackendKind, MediaBackend, MediaNotification, PushBackend};
use crate::listeners::Subscription;
use crate::poller::PollTask;

/// Sampling period for poll backends.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Observable playback state.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClockState {
    pub current_time: Seconds,
    /// `None` until a backend reports a usable duration.
    pub duration: Option<Seconds>,
    pub is_playing: bool,
    /// Wiring of the bound backend, `None` when detached.
    pub backend: Option<BackendKind>,
    /// Binding generation. Writers from an older binding are ignored.
    #[serde(skip)]
    epoch: u64,
}

enum Binding {
    Detached,
    Push {
        handle: Arc<dyn PushBackend>,
        _subscription: Subscription,
    },
    Poll {
        handle: Arc<dyn MediaBackend>,
        _task: PollTask,
    },
}

pub struct MediaClock {
    state: Arc<watch::Sender<ClockState>>,
    binding: Binding,
    epoch: u64,
    poll_interval: Duration,
}

impl Default for MediaClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaClock {
    /// A detached clock at zero.
    pub fn new() -> Self {
        Self::with_poll_interval(DEFAULT_POLL_INTERVAL)
    }

    pub fn with_poll_interval(poll_interval: Duration) -> Self {
        let (state, _) = watch::channel(ClockState::default());
        Self {
            state: Arc::new(state),
            binding: Binding::Detached,
            epoch: 0,
            poll_interval,
        }
    }

    /// Bind a push backend, or detach with `None`.
    pub fn bind_push(&mut self, handle: Option<Arc<dyn PushBackend>>) {
        self.unbind();
        let Some(handle) = handle else {
            self.publish_fresh(None);
            return;
        };

        let epoch = self.publish_fresh(Some(BackendKind::Push));
        let state = Arc::clone(&self.state);
        let subscription = handle.subscribe(Arc::new(move |notification: &MediaNotification| {
            state.send_if_modified(|s| s.epoch == epoch && apply_notification(s, notification));
        }));

        tracing::debug!(epoch, "Bound push media backend");
        self.binding = Binding::Push {
            handle,
            _subscription: subscription,
        };
    }

    /// Bind a poll backend, or detach with `None`.
    ///
    /// Must be called from within a Tokio runtime when `handle` is `Some`.
    pub fn bind_poll(&mut self, handle: Option<Arc<dyn MediaBackend>>) {
        self.unbind();
        let Some(handle) = handle else {
            self.publish_fresh(None);
            return;
        };

        let epoch = self.publish_fresh(Some(BackendKind::Poll));
        let state = Arc::clone(&self.state);
        let sampled = Arc::clone(&handle);
        let task = PollTask::spawn(self.poll_interval, move || {
            poll_tick(sampled.as_ref(), &state, epoch);
        });

        tracing::debug!(
            epoch,
            interval_ms = self.poll_interval.as_millis() as u64,
            "Bound poll media backend"
        );
        self.binding = Binding::Poll {
            handle,
            _task: task,
        };
    }

    /// Release whatever is bound and zero the state.
    pub fn detach(&mut self) {
        self.unbind();
        self.publish_fresh(None);
    }

    /// Seek the bound backend. No-op when detached.
    pub fn seek_to(&self, time: Seconds) -> Result<(), BackendError> {
        match &self.binding {
            Binding::Push { handle, .. } => handle.seek(time),
            Binding::Poll { handle, .. } => handle.seek(time),
            Binding::Detached => Ok(()),
        }
    }

    /// Pause if playing, play otherwise. No-op when detached.
    ///
    /// Asks the backend rather than trusting [`ClockState::is_playing`],
    /// which may lag a poll period behind.
    pub fn toggle_play(&self) -> Result<(), BackendError> {
        match &self.binding {
            Binding::Push { handle, .. } => toggle(handle.as_ref()),
            Binding::Poll { handle, .. } => toggle(handle.as_ref()),
            Binding::Detached => Ok(()),
        }
    }

    pub fn state(&self) -> ClockState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ClockState> {
        self.state.subscribe()
    }

    pub fn current_time(&self) -> Seconds {
        self.state.borrow().current_time
    }

    pub fn duration(&self) -> Option<Seconds> {
        self.state.borrow().duration
    }

    pub fn is_playing(&self) -> bool {
        self.state.borrow().is_playing
    }

    pub fn backend(&self) -> Option<BackendKind> {
        self.state.borrow().backend
    }

    /// Drop the current binding, which unsubscribes or cancels its task.
    fn unbind(&mut self) {
        let previous = std::mem::replace(&mut self.binding, Binding::Detached);
        if !matches!(previous, Binding::Detached) {
            tracing::debug!(epoch = self.epoch, "Unbinding media backend");
        }
    }

    /// Start a new generation with zeroed state in a single update.
    fn publish_fresh(&mut self, backend: Option<BackendKind>) -> u64 {
        self.epoch += 1;
        self.state.send_replace(ClockState {
            backend,
            epoch: self.epoch,
            ..ClockState::default()
        });
        self.epoch
    }
}

impl Drop for MediaClock {
    fn drop(&mut self) {
        self.unbind();
    }
}

fn toggle<B: MediaBackend + ?Sized>(handle: &B) -> Result<(), BackendError> {
    if handle.play_state()?.is_playing() {
        handle.pause()
    } else {
        handle.play()
    }
}

/// Durations of `0`, negative or non-finite mean "not known yet".
fn usable_duration(duration: Seconds) -> Option<Seconds> {
    (duration.is_finite() && duration > 0.0).then_some(duration)
}

fn apply_notification(state: &mut ClockState, notification: &MediaNotification) -> bool {
    let before = (state.current_time, state.duration, state.is_playing);
    match *notification {
        MediaNotification::TimeChanged(time) => state.current_time = time,
        MediaNotification::MetadataReady(duration) => {
            if let Some(duration) = usable_duration(duration) {
                state.duration = Some(duration);
            }
        }
        MediaNotification::Started => state.is_playing = true,
        MediaNotification::Stopped => state.is_playing = false,
    }
    before != (state.current_time, state.duration, state.is_playing)
}

struct Sample {
    current_time: Seconds,
    is_playing: bool,
    duration: Seconds,
}

fn sample(handle: &dyn MediaBackend) -> Result<Sample, BackendError> {
    Ok(Sample {
        current_time: handle.current_time()?,
        is_playing: handle.play_state()?.is_playing(),
        duration: handle.duration()?,
    })
}

/// One poll period: all reads succeed and are applied together, or the
/// tick is skipped and the previous state stays.
fn poll_tick(handle: &dyn MediaBackend, state: &watch::Sender<ClockState>, epoch: u64) {
    let sample = match sample(handle) {
        Ok(sample) => sample,
        Err(e) => {
            tracing::trace!(error = %e, "Skipping poll tick");
            return;
        }
    };

    state.send_if_modified(|s| {
        if s.epoch != epoch {
            return false;
        }
        let duration = usable_duration(sample.duration).or(s.duration);
        let changed = s.current_time != sample.current_time
            || s.is_playing != sample.is_playing
            || s.duration != duration;
        s.current_time = sample.current_time;
        s.is_playing = sample.is_playing;
        s.duration = duration;
        changed
    });
}
