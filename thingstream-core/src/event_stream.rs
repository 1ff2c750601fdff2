// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Async view over a registry category.
//!
//! An [`EventStream`] is a hot stream: it yields only events published after it was
//! created. It is backed by an unbounded channel, so the publisher is never slowed down
//! by a consumer that polls late.
//!
//! ```
//! use futures::StreamExt;
//! use thingstream_core::{EventCategory, SubscriptionRegistry};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let registry = SubscriptionRegistry::<EventCategory, u32>::new();
//! let mut events = Box::pin(registry.events(EventCategory::Connection));
//!
//! registry.publish(EventCategory::Connection, &1);
//! registry.publish(EventCategory::Connection, &2);
//!
//! assert_eq!(events.next().await, Some(1));
//! assert_eq!(events.next().await, Some(2));
//! # }
//! ```

use crate::subscription_registry::SubscriptionGuard;
use core::hash::Hash;
use core::pin::Pin;
use core::task::{Context, Poll};
use futures::Stream;
use pin_project::pin_project;

/// Stream of events for one category. Unsubscribes when dropped.
#[pin_project]
pub struct EventStream<C: Copy + Eq + Hash, E> {
    #[pin]
    receiver: async_channel::Receiver<E>,
    guard: SubscriptionGuard<C, E>,
}

impl<C: Copy + Eq + Hash, E> EventStream<C, E> {
    pub(crate) const fn new(
        receiver: async_channel::Receiver<E>,
        guard: SubscriptionGuard<C, E>,
    ) -> Self {
        Self { receiver, guard }
    }

    /// Number of events received but not yet polled.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.receiver.len()
    }

    #[must_use]
    pub const fn subscription(&self) -> &SubscriptionGuard<C, E> {
        &self.guard
    }
}

impl<C: Copy + Eq + Hash, E> Stream for EventStream<C, E> {
    type Item = E;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.project().receiver.poll_next(cx)
    }
}
