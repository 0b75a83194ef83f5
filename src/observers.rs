// SPDX-License-Identifier: GPL-3.0-only

//! Observer registry with unsubscribe tokens
//!
//! Callers must not assume any ordering across observers.

use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Token returned by a subscription, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionToken(u64);

/// A list of registered observers of type `F`
///
/// `F` is usually an unsized closure type such as
/// `dyn Fn(&UiState) + Send + Sync`.
pub struct Subscribers<F: ?Sized> {
    next_id: AtomicU64,
    entries: Mutex<Vec<(u64, Arc<F>)>>,
}

impl<F: ?Sized> Default for Subscribers<F> {
    fn default() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            entries: Mutex::new(Vec::new()),
        }
    }
}

impl<F: ?Sized> Subscribers<F> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer
    pub fn add(&self, observer: Arc<F>) -> SubscriptionToken {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.entries.lock().push((id, observer));
        SubscriptionToken(id)
    }

    /// Remove an observer; returns false if the token was unknown
    pub fn remove(&self, token: SubscriptionToken) -> bool {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|(id, _)| *id != token.0);
        entries.len() != before
    }

    /// Copy of the current observers
    ///
    /// Observers are invoked from the snapshot, outside the lock, so they
    /// may subscribe or unsubscribe while being notified.
    pub fn snapshot(&self) -> Vec<Arc<F>> {
        self.entries
            .lock()
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Callback = dyn Fn(u32) + Send + Sync;

    #[test]
    fn test_add_and_remove() {
        let subscribers: Subscribers<Callback> = Subscribers::new();
        let first = subscribers.add(Arc::new(|_| {}));
        let second = subscribers.add(Arc::new(|_| {}));

        assert_ne!(first, second);
        assert_eq!(subscribers.len(), 2);
        assert!(subscribers.remove(first));
        assert!(!subscribers.remove(first));
        assert_eq!(subscribers.len(), 1);
    }

    #[test]
    fn test_observer_may_unsubscribe_during_notify() {
        let subscribers: Arc<Subscribers<Callback>> = Arc::new(Subscribers::new());
        let registry = Arc::clone(&subscribers);
        let token = Arc::new(Mutex::new(None));
        let token_slot = Arc::clone(&token);

        let id = subscribers.add(Arc::new(move |_| {
            if let Some(token) = *token_slot.lock() {
                registry.remove(token);
            }
        }));
        *token.lock() = Some(id);

        for observer in subscribers.snapshot() {
            observer(1);
        }
        assert!(subscribers.is_empty());
    }
}
