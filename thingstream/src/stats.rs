// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use core::sync::atomic::{AtomicU64, Ordering};
use serde::Serialize;

/// Counters for one Thing stream. Updated by the writer, readable from anywhere.
#[derive(Debug, Default)]
pub struct IngestStats {
    accepted: AtomicU64,
    reordered: AtomicU64,
    dropped_unknown_sensor: AtomicU64,
    dropped_stale: AtomicU64,
    dropped_duplicate: AtomicU64,
    dropped_after_stop: AtomicU64,
    dropped_while_disconnected: AtomicU64,
    decode_errors: AtomicU64,
    reconciled_inserted: AtomicU64,
    reconciliation_conflicts: AtomicU64,
}

/// Plain copy of [`IngestStats`] at one point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestStatsSnapshot {
    /// Live samples stored, including reordered ones.
    pub accepted: u64,
    pub reordered: u64,
    pub dropped_unknown_sensor: u64,
    pub dropped_stale: u64,
    pub dropped_duplicate: u64,
    /// Inbound messages discarded because the session was stopped.
    pub dropped_after_stop: u64,
    /// Inbound messages discarded between a disconnect and the reconnect.
    pub dropped_while_disconnected: u64,
    /// Undecodable payloads plus rejected non-finite triples.
    pub decode_errors: u64,
    pub reconciled_inserted: u64,
    pub reconciliation_conflicts: u64,
}

impl IngestStatsSnapshot {
    #[must_use]
    pub const fn dropped(&self) -> u64 {
        self.dropped_unknown_sensor + self.dropped_stale + self.dropped_duplicate
    }
}

macro_rules! counter {
    ($record:ident, $field:ident) => {
        pub(crate) fn $record(&self, count: u64) {
            if count > 0 {
                self.$field.fetch_add(count, Ordering::Relaxed);
            }
        }
    };
}

impl IngestStats {
    counter!(record_accepted, accepted);
    counter!(record_reordered, reordered);
    counter!(record_unknown_sensor, dropped_unknown_sensor);
    counter!(record_stale, dropped_stale);
    counter!(record_duplicate, dropped_duplicate);
    counter!(record_after_stop, dropped_after_stop);
    counter!(record_while_disconnected, dropped_while_disconnected);
    counter!(record_decode_error, decode_errors);
    counter!(record_reconciled, reconciled_inserted);
    counter!(record_conflicts, reconciliation_conflicts);

    #[must_use]
    pub fn snapshot(&self) -> IngestStatsSnapshot {
        IngestStatsSnapshot {
            accepted: self.accepted.load(Ordering::Relaxed),
            reordered: self.reordered.load(Ordering::Relaxed),
            dropped_unknown_sensor: self.dropped_unknown_sensor.load(Ordering::Relaxed),
            dropped_stale: self.dropped_stale.load(Ordering::Relaxed),
            dropped_duplicate: self.dropped_duplicate.load(Ordering::Relaxed),
            dropped_after_stop: self.dropped_after_stop.load(Ordering::Relaxed),
            dropped_while_disconnected: self.dropped_while_disconnected.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            reconciled_inserted: self.reconciled_inserted.load(Ordering::Relaxed),
            reconciliation_conflicts: self.reconciliation_conflicts.load(Ordering::Relaxed),
        }
    }
}
