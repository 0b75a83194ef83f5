// SPDX-License-Identifier: GPL-3.0-only

//! Versioned state container
//!
//! One owner writes through [`StateStore::update`]; readers take snapshots
//! or subscribe to whole-state or field-level changes. Listeners run after
//! the write lock has been released.
//!
//! Every write is queued for delivery in version order. Whoever finds the
//! queue idle drains it; writes made meanwhile (from listeners or other
//! threads) are delivered by that drainer once the current notification has
//! reached every listener.

use crate::observers::{SubscriptionToken, Subscribers};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

type StateListener<S> = dyn Fn(&S, &S) + Send + Sync;

struct Versioned<S> {
    version: u64,
    value: S,
}

struct Delivery<S> {
    /// `(new, old)` pairs not yet delivered, oldest first
    queue: VecDeque<(S, S)>,
    draining: bool,
}

/// Shared, versioned state snapshot
pub struct StateStore<S> {
    inner: Mutex<Versioned<S>>,
    delivery: Mutex<Delivery<S>>,
    listeners: Subscribers<StateListener<S>>,
    initial: S,
}

impl<S> StateStore<S>
where
    S: Clone + Send + Sync + 'static,
{
    pub fn new(initial: S) -> Self {
        Self {
            inner: Mutex::new(Versioned {
                version: 0,
                value: initial.clone(),
            }),
            delivery: Mutex::new(Delivery {
                queue: VecDeque::new(),
                draining: false,
            }),
            listeners: Subscribers::new(),
            initial,
        }
    }

    /// Clone of the current state
    pub fn get(&self) -> S {
        self.inner.lock().value.clone()
    }

    /// Read a projection of the current state without cloning it whole
    pub fn with<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&self.inner.lock().value)
    }

    /// Number of writes since creation
    pub fn version(&self) -> u64 {
        self.inner.lock().version
    }

    /// Apply a write and notify listeners with `(new, old)`
    ///
    /// A write made while another notification is being delivered returns
    /// before its own listeners have run; they run right after.
    pub fn update<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        let ret = {
            let mut inner = self.inner.lock();
            let old = inner.value.clone();
            let ret = f(&mut inner.value);
            inner.version += 1;

            // Queued under the write lock so queue order is version order
            let mut delivery = self.delivery.lock();
            delivery.queue.push_back((inner.value.clone(), old));
            if delivery.draining {
                return ret;
            }
            delivery.draining = true;
            ret
        };

        self.drain();
        ret
    }

    fn drain(&self) {
        loop {
            let (new, old) = {
                let mut delivery = self.delivery.lock();
                match delivery.queue.pop_front() {
                    Some(next) => next,
                    None => {
                        delivery.draining = false;
                        return;
                    }
                }
            };

            for listener in self.listeners.snapshot() {
                listener(&new, &old);
            }
        }
    }

    /// Bump the version and notify listeners without changing any field
    pub fn touch(&self) {
        self.update(|_| ());
    }

    /// Restore the initial state
    pub fn reset(&self) {
        let initial = self.initial.clone();
        self.update(move |state| *state = initial);
    }

    /// Subscribe to every write
    pub fn subscribe(
        &self,
        listener: impl Fn(&S, &S) + Send + Sync + 'static,
    ) -> SubscriptionToken {
        self.listeners.add(Arc::new(listener))
    }

    /// Subscribe to changes of one projected field
    ///
    /// The listener receives `(new, old)` and only runs when the projection
    /// actually changed.
    pub fn subscribe_field<T, P, L>(&self, selector: P, listener: L) -> SubscriptionToken
    where
        T: PartialEq + 'static,
        P: Fn(&S) -> T + Send + Sync + 'static,
        L: Fn(&T, &T) + Send + Sync + 'static,
    {
        self.subscribe(move |new, old| {
            let new = selector(new);
            let old = selector(old);
            if new != old {
                listener(&new, &old);
            }
        })
    }

    pub fn unsubscribe(&self, token: SubscriptionToken) -> bool {
        self.listeners.remove(token)
    }

    pub fn clear_subscribers(&self) {
        self.listeners.clear();
    }
}
