//! Settings snapshot with change listeners.
//!
//! Listeners never see a half-applied update: `set` swaps the whole `Arc`
//! before anyone is notified.

use std::fmt;
use std::sync::Arc;

/// Caller-chosen key that makes subscription idempotent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(pub &'static str);

pub type Listener<T> = Box<dyn Fn(&Arc<T>) + Send + Sync>;

pub struct UpdatableSettings<T> {
    current: Arc<T>,
    auto_update: bool,
    listeners: Vec<(ListenerId, Listener<T>)>,
}

impl<T> UpdatableSettings<T> {
    pub fn new(value: T) -> Self {
        Self {
            current: Arc::new(value),
            auto_update: true,
            listeners: Vec::new(),
        }
    }

    pub fn with_auto_update(mut self, on: bool) -> Self {
        self.auto_update = on;
        self
    }

    pub fn current(&self) -> Arc<T> {
        Arc::clone(&self.current)
    }

    /// Returns `false` when `id` is already registered; the old listener stays.
    pub fn subscribe<F>(&mut self, id: ListenerId, listener: F) -> bool
    where
        F: Fn(&Arc<T>) + Send + Sync + 'static,
    {
        if self.listeners.iter().any(|(k, _)| *k == id) {
            return false;
        }
        self.listeners.push((id, Box::new(listener)));
        true
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(k, _)| *k != id);
        self.listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn set(&mut self, value: T) {
        self.current = Arc::new(value);
        if self.auto_update {
            self.notify_of_updated_values();
        }
    }

    pub fn notify_of_updated_values(&self) {
        log::debug!(
            target: "settings",
            "notifying {} listener(s) of updated values",
            self.listeners.len()
        );
        for (_, l) in &self.listeners {
            l(&self.current);
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for UpdatableSettings<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdatableSettings")
            .field("current", &self.current)
            .field("auto_update", &self.auto_update)
            .field("listeners", &self.listeners.iter().map(|(k, _)| k.0).collect::<Vec<_>>())
            .finish()
    }
}
