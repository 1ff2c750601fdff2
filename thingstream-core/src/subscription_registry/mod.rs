// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Callback fan-out keyed by event category.
//!
//! A [`SubscriptionRegistry`] lets many independent consumers register callbacks for an
//! event category and later remove them by id.
//!
//! ## Characteristics
//!
//! - **Synchronous**: `publish` invokes every callback of the category on the caller's
//!   thread, in registration order, before returning.
//! - **Snapshot iteration**: each publish round works on a copy of the listener list, so a
//!   callback may subscribe or unsubscribe (itself or others) without disturbing the round.
//! - **Idempotent removal**: unsubscribing an unknown or already removed id is a no-op.
//! - **Non-owning**: the registry keeps callback handles only. The consumer that registered
//!   a callback decides its lifetime and must unsubscribe when it goes away, or use
//!   [`SubscriptionRegistry::subscribe_scoped`] to tie removal to a guard.
//! - **Fan-out only**: no acknowledgement and no back-pressure. Callbacks must not block.
//!
//! ## Example
//!
//! ```
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//! use thingstream_core::{EventCategory, SubscriptionRegistry};
//!
//! let registry = SubscriptionRegistry::<EventCategory, u32>::new();
//! let seen = Arc::new(AtomicUsize::new(0));
//!
//! let id = registry.subscribe(EventCategory::Stop, {
//!     let seen = seen.clone();
//!     move |_event: &u32| {
//!         seen.fetch_add(1, Ordering::SeqCst);
//!     }
//! });
//!
//! registry.publish(EventCategory::Stop, &7);
//! registry.unsubscribe(EventCategory::Stop, id);
//! registry.unsubscribe(EventCategory::Stop, id);
//! registry.publish(EventCategory::Stop, &8);
//!
//! assert_eq!(seen.load(Ordering::SeqCst), 1);
//! ```

mod guard;
mod implementation;

pub use guard::SubscriptionGuard;
pub use implementation::{Callback, SubscriptionId, SubscriptionRegistry};
