// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use super::implementation::RegistryState;
use super::SubscriptionId;
use core::fmt;
use core::hash::Hash;
use parking_lot::Mutex;
use std::sync::Weak;

/// Unsubscribes its callback when dropped.
///
/// Holds the registry weakly: a guard outliving its registry is harmless.
pub struct SubscriptionGuard<C: Copy + Eq + Hash, E> {
    registry: Weak<Mutex<RegistryState<C, E>>>,
    category: C,
    id: SubscriptionId,
}

impl<C: Copy + Eq + Hash, E> SubscriptionGuard<C, E> {
    pub(crate) const fn new(
        registry: Weak<Mutex<RegistryState<C, E>>>,
        category: C,
        id: SubscriptionId,
    ) -> Self {
        Self {
            registry,
            category,
            id,
        }
    }

    #[must_use]
    pub const fn id(&self) -> SubscriptionId {
        self.id
    }
}

impl<C: Copy + Eq + Hash, E> Drop for SubscriptionGuard<C, E> {
    fn drop(&mut self) {
        if let Some(state) = self.registry.upgrade() {
            state.lock().remove(self.category, self.id);
        }
    }
}

impl<C: Copy + Eq + Hash + fmt::Debug, E> fmt::Debug for SubscriptionGuard<C, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionGuard")
            .field("category", &self.category)
            .field("id", &self.id)
            .finish()
    }
}
