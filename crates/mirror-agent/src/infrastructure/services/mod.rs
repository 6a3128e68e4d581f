//! Device service adapters.
//!
//! The real services live in the platform; this module provides the listener
//! bookkeeping every adapter needs and, in [`mock`], in-memory services that
//! tests and the headless binary drive directly.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::application::capabilities::same_listener;

pub mod mock;

/// Registered listeners of one kind, identified by pointer.
pub struct ListenerSet<T: ?Sized> {
    listeners: Mutex<Vec<Arc<T>>>,
}

impl<T: ?Sized> Default for ListenerSet<T> {
    fn default() -> Self {
        Self {
            listeners: Mutex::new(Vec::new()),
        }
    }
}

impl<T: ?Sized> ListenerSet<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `listener` unless the same object is already registered.
    pub fn add(&self, listener: Arc<T>) {
        let mut listeners = self.lock();
        if !listeners.iter().any(|l| same_listener(l, &listener)) {
            listeners.push(listener);
        }
    }

    /// Removes `listener`.  Returns `false` if it was not registered.
    pub fn remove(&self, listener: &Arc<T>) -> bool {
        let mut listeners = self.lock();
        let before = listeners.len();
        listeners.retain(|l| !same_listener(l, listener));
        listeners.len() != before
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Calls `f` for every listener.  The set is copied first so listeners
    /// may add or remove listeners from inside the callback.
    pub fn notify(&self, f: impl Fn(&T)) {
        let snapshot: Vec<Arc<T>> = self.lock().clone();
        for listener in &snapshot {
            f(listener);
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Arc<T>>> {
        self.listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
