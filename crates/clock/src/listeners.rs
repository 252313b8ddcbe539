//! Listener registry for push backends.
//!
//! A push backend embeds a [`ListenerSet`] and forwards its own events
//! through [`ListenerSet::emit`]. Each registration is owned by the
//! returned [`Subscription`]; dropping it unregisters the listener.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use crate::backend::MediaNotification;

/// Callback invoked for every notification.
pub type Listener = Arc<dyn Fn(&MediaNotification) + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: Vec<(u64, Listener)>,
}

/// The set of live listeners of one push backend.
#[derive(Default)]
pub struct ListenerSet {
    registry: Arc<Mutex<Registry>>,
}

impl ListenerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, listener: Listener) -> Subscription {
        let mut registry = lock(&self.registry);
        let id = registry.next_id;
        registry.next_id += 1;
        registry.listeners.push((id, listener));

        Subscription {
            registry: Arc::downgrade(&self.registry),
            id,
        }
    }

    /// Deliver `notification` to every live listener, synchronously.
    ///
    /// Listeners run outside the registry lock, so a listener may drop
    /// its own subscription.
    pub fn emit(&self, notification: MediaNotification) {
        let listeners: Vec<Listener> = lock(&self.registry)
            .listeners
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();

        for listener in listeners {
            listener(&notification);
        }
    }

    pub fn len(&self) -> usize {
        lock(&self.registry).listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Keeps one listener registered. Unregisters on drop.
#[must_use = "dropping a Subscription unregisters its listener"]
pub struct Subscription {
    registry: Weak<Mutex<Registry>>,
    id: u64,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            lock(&registry).listeners.retain(|(id, _)| *id != self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

// A panicking listener must not wedge the registry.
fn lock(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn counter() -> (Arc<AtomicUsize>, Listener) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        let listener: Listener = Arc::new(move |_: &MediaNotification| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        (count, listener)
    }

    #[test]
    fn emit_reaches_every_listener() {
        let set = ListenerSet::new();
        let (a, la) = counter();
        let (b, lb) = counter();
        let _sa = set.add(la);
        let _sb = set.add(lb);

        set.emit(MediaNotification::Started);
        set.emit(MediaNotification::TimeChanged(1.5));

        assert_eq!(a.load(Ordering::SeqCst), 2);
        assert_eq!(b.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn dropping_subscription_unregisters() {
        let set = ListenerSet::new();
        let (count, listener) = counter();
        let sub = set.add(listener);
        assert_eq!(set.len(), 1);

        drop(sub);
        assert!(set.is_empty());

        set.emit(MediaNotification::Stopped);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn subscription_outliving_set_is_harmless() {
        let set = ListenerSet::new();
        let (_, listener) = counter();
        let sub = set.add(listener);
        drop(set);
        drop(sub);
    }

    #[test]
    fn only_the_dropped_listener_is_removed() {
        let set = ListenerSet::new();
        let (a, la) = counter();
        let (b, lb) = counter();
        let sa = set.add(la);
        let _sb = set.add(lb);

        drop(sa);
        set.emit(MediaNotification::Started);

        assert_eq!(a.load(Ordering::SeqCst), 0);
        assert_eq!(b.load(Ordering::SeqCst), 1);
    }
}
