// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use super::SubscriptionGuard;
use crate::event_stream::EventStream;
use crate::logging::debug;
use crate::{EventCategory, StreamEvent};
use core::fmt;
use core::hash::Hash;
use core::sync::atomic::{AtomicU64, Ordering};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Opaque handle returned by `subscribe`, used to unsubscribe later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Shared callback handle stored by the registry.
pub type Callback<E> = Arc<dyn Fn(&E) + Send + Sync + 'static>;

struct Listener<E> {
    id: SubscriptionId,
    callback: Callback<E>,
}

pub(crate) struct RegistryState<C, E> {
    next_id: u64,
    listeners: HashMap<C, Vec<Listener<E>>>,
}

impl<C: Copy + Eq + Hash, E> RegistryState<C, E> {
    pub(crate) fn remove(&mut self, category: C, id: SubscriptionId) -> bool {
        let Some(listeners) = self.listeners.get_mut(&category) else {
            return false;
        };
        let before = listeners.len();
        listeners.retain(|listener| listener.id != id);
        let removed = listeners.len() != before;
        if listeners.is_empty() {
            self.listeners.remove(&category);
        }
        removed
    }
}

/// Registry of callbacks grouped by category `C`, receiving events of type `E`.
///
/// See the [module documentation](crate::subscription_registry) for the delivery contract.
/// Cheap to clone; all clones share the same listener table.
pub struct SubscriptionRegistry<C = EventCategory, E = StreamEvent> {
    state: Arc<Mutex<RegistryState<C, E>>>,
    published: Arc<AtomicU64>,
}

impl<C, E> SubscriptionRegistry<C, E>
where
    C: Copy + Eq + Hash + fmt::Debug + Send + 'static,
    E: Send + 'static,
{
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(RegistryState {
                next_id: 0,
                listeners: HashMap::new(),
            })),
            published: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Registers `callback` for `category` and returns its id. Never blocks on publishers.
    pub fn subscribe<F>(&self, category: C, callback: F) -> SubscriptionId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.subscribe_callback(category, Arc::new(callback))
    }

    /// Registers an already shared callback handle.
    pub fn subscribe_callback(&self, category: C, callback: Callback<E>) -> SubscriptionId {
        let mut state = self.state.lock();
        state.next_id += 1;
        let id = SubscriptionId(state.next_id);
        state
            .listeners
            .entry(category)
            .or_default()
            .push(Listener { id, callback });
        debug!("subscribed {} to {:?}", id, category);
        id
    }

    /// Like [`subscribe`](Self::subscribe), but the subscription ends when the guard drops.
    pub fn subscribe_scoped<F>(&self, category: C, callback: F) -> SubscriptionGuard<C, E>
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let id = self.subscribe(category, callback);
        SubscriptionGuard::new(Arc::downgrade(&self.state), category, id)
    }

    /// Removes a subscription. Unknown or already removed ids are ignored.
    ///
    /// Returns `true` if a callback was actually removed.
    pub fn unsubscribe(&self, category: C, id: SubscriptionId) -> bool {
        let removed = self.state.lock().remove(category, id);
        if removed {
            debug!("unsubscribed {} from {:?}", id, category);
        }
        removed
    }

    /// Invokes every callback registered for `category`, in registration order.
    ///
    /// The listener list is copied before the first callback runs and the registry lock is
    /// released while callbacks execute. Returns the number of callbacks invoked.
    pub fn publish(&self, category: C, event: &E) -> usize {
        let snapshot: Vec<Callback<E>> = {
            let state = self.state.lock();
            state
                .listeners
                .get(&category)
                .map(|listeners| {
                    listeners
                        .iter()
                        .map(|listener| Arc::clone(&listener.callback))
                        .collect()
                })
                .unwrap_or_default()
        };

        for callback in &snapshot {
            callback(event);
        }
        self.published.fetch_add(1, Ordering::Relaxed);
        snapshot.len()
    }

    /// Returns a stream receiving every event published to `category` from now on.
    ///
    /// Dropping the stream removes its subscription.
    pub fn events(&self, category: C) -> EventStream<C, E>
    where
        E: Clone,
    {
        let (sender, receiver) = async_channel::unbounded();
        let guard = self.subscribe_scoped(category, move |event: &E| {
            let _ = sender.try_send(event.clone());
        });
        EventStream::new(receiver, guard)
    }

    #[must_use]
    pub fn subscriber_count(&self, category: C) -> usize {
        self.state
            .lock()
            .listeners
            .get(&category)
            .map_or(0, Vec::len)
    }

    /// Total number of publish rounds, across categories.
    #[must_use]
    pub fn publish_count(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    pub fn clear(&self) {
        self.state.lock().listeners.clear();
    }
}

impl<C, E> Default for SubscriptionRegistry<C, E>
where
    C: Copy + Eq + Hash + fmt::Debug + Send + 'static,
    E: Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<C, E> Clone for SubscriptionRegistry<C, E> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            published: Arc::clone(&self.published),
        }
    }
}

impl<C, E> fmt::Debug for SubscriptionRegistry<C, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionRegistry")
            .field("publish_count", &self.published.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
