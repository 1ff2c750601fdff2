// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! State shared between the facade and the session task of one Thing.
//!
//! Two locks, always taken in this order:
//!
//! 1. `notify` serializes every state transition together with the notification that
//!    announces it. It is reentrant so a callback may call back into the stream.
//! 2. `writer` guards the buffers and the session epoch. It is held only for short,
//!    non-blocking sections and never while callbacks run.
//!
//! Every session carries the epoch it was started with. Stopping bumps the epoch under
//! `writer`, so once `stop` has returned no message of the old session can reach a buffer.

use crate::config::{HistoricalDataPolicy, StreamConfig};
use crate::decode::MessageDecoder;
use crate::ingest_pipeline::IngestPipeline;
use crate::logging::{info, warn};
use crate::reconciliation::{MissingDataRequest, MissingDataResult, ReconciliationEngine, ReconciliationReport};
use crate::stats::IngestStats;
use core::sync::atomic::{AtomicU32, Ordering};
use parking_lot::{Mutex, ReentrantMutex, ReentrantMutexGuard};
use std::collections::BTreeMap;
use std::sync::Arc;
use thingstream_buffer::{BufferReader, BufferSet};
use thingstream_core::{
    AtomicConnectionState, ConnectionEvent, ConnectionState, EventCategory, SensorId, StopEvent,
    SubscriptionRegistry, ThingId, TransportError,
};

pub(crate) type Epoch = u64;

pub(crate) struct WriterState {
    epoch: Epoch,
    accepting: bool,
    connected: bool,
    awaiting_reconnect: bool,
    buffers: BufferSet,
}

pub(crate) struct StreamShared {
    thing_id: ThingId,
    state: AtomicConnectionState,
    notify: ReentrantMutex<()>,
    writer: Mutex<WriterState>,
    readers: BTreeMap<SensorId, BufferReader>,
    registry: SubscriptionRegistry,
    stats: Arc<IngestStats>,
    pipeline: IngestPipeline,
    engine: ReconciliationEngine,
    cycles: AtomicU32,
    historical: HistoricalDataPolicy,
}

impl StreamShared {
    pub(crate) fn new(
        thing_id: ThingId,
        sensors: impl IntoIterator<Item = SensorId>,
        config: &StreamConfig,
        decoder: Arc<dyn MessageDecoder>,
    ) -> Self {
        let buffers = BufferSet::new(sensors, config.retention);
        let readers = buffers
            .iter()
            .map(|buffer| (buffer.sensor_id().clone(), buffer.reader()))
            .collect();
        let stats = Arc::new(IngestStats::default());

        Self {
            thing_id,
            state: AtomicConnectionState::default(),
            notify: ReentrantMutex::new(()),
            writer: Mutex::new(WriterState {
                epoch: 0,
                accepting: false,
                connected: false,
                awaiting_reconnect: false,
                buffers,
            }),
            readers,
            registry: SubscriptionRegistry::new(),
            pipeline: IngestPipeline::new(decoder, config.out_of_order_tolerance_ms, stats.clone()),
            engine: ReconciliationEngine::new(stats.clone()),
            stats,
            cycles: AtomicU32::new(0),
            historical: config.historical,
        }
    }

    pub(crate) const fn thing_id(&self) -> &ThingId {
        &self.thing_id
    }

    pub(crate) fn state(&self) -> ConnectionState {
        self.state.load()
    }

    pub(crate) const fn registry(&self) -> &SubscriptionRegistry {
        &self.registry
    }

    pub(crate) const fn stats(&self) -> &Arc<IngestStats> {
        &self.stats
    }

    pub(crate) const fn readers(&self) -> &BTreeMap<SensorId, BufferReader> {
        &self.readers
    }

    pub(crate) fn cycles(&self) -> u32 {
        self.cycles.load(Ordering::Acquire)
    }

    /// Serializes a transition and its notification against every other transition.
    pub(crate) fn transition_lock(&self) -> ReentrantMutexGuard<'_, ()> {
        self.notify.lock()
    }

    /// Starts a new session epoch and returns it.
    ///
    /// Must be called with the transition lock held. Restarting after a stop opens a gap
    /// at every watermark, since nothing was ingested while stopped, and the restart counts
    /// as a reconnect once it streams.
    pub(crate) fn begin_session(&self) -> Epoch {
        let previous = self.state.load();
        let epoch = {
            let mut writer = self.writer.lock();
            writer.epoch += 1;
            writer.accepting = true;
            writer.connected = false;
            if previous == ConnectionState::Stopped {
                writer.disconnect();
            }
            writer.epoch
        };
        self.state.store(ConnectionState::Connecting);
        info!("thing {} connecting", self.thing_id);
        epoch
    }

    /// Closes the gate for the current session. Returns `false` if it was already closed.
    ///
    /// Must be called with the transition lock held.
    pub(crate) fn end_session(&self) -> bool {
        let mut writer = self.writer.lock();
        if !writer.accepting && self.state.load() == ConnectionState::Stopped {
            return false;
        }
        writer.accepting = false;
        writer.connected = false;
        writer.epoch += 1;
        true
    }

    /// Marks the stream stopped and tells every `Stop` subscriber.
    ///
    /// Must be called with the transition lock held, after [`end_session`](Self::end_session).
    pub(crate) fn announce_stop(&self) {
        self.state.store(ConnectionState::Stopped);
        info!("thing {} stopped", self.thing_id);
        self.registry.publish(
            EventCategory::Stop,
            &StopEvent {
                thing_id: self.thing_id.clone(),
            }
            .into(),
        );
    }

    /// The session is connected. A reconnection after a drop counts one cycle.
    pub(crate) fn on_streaming(&self, epoch: Epoch) {
        let _transition = self.notify.lock();
        {
            let mut writer = self.writer.lock();
            if !writer.is_current(epoch) {
                return;
            }
            writer.connected = true;
            if writer.awaiting_reconnect {
                writer.awaiting_reconnect = false;
                self.cycles.fetch_add(1, Ordering::AcqRel);
            }
        }
        self.state.store(ConnectionState::Streaming);
        info!("thing {} streaming", self.thing_id);
        self.registry.publish(
            EventCategory::Connection,
            &ConnectionEvent::streaming(self.thing_id.clone()).into(),
        );
    }

    /// The session failed. With `opens_gap` set the live feed was lost: buffers with a
    /// watermark open a gap and the next reconnect counts one cycle.
    pub(crate) fn on_errored(&self, epoch: Epoch, error: &TransportError, opens_gap: bool) {
        let _transition = self.notify.lock();
        {
            let mut writer = self.writer.lock();
            if !writer.is_current(epoch) {
                return;
            }
            writer.connected = false;
            if opens_gap {
                writer.disconnect();
            }
        }
        self.fail(error);
    }

    /// Errors the current session regardless of epoch. Used when no session could start.
    pub(crate) fn fail(&self, error: &TransportError) {
        let _transition = self.notify.lock();
        self.state.store(ConnectionState::Errored);
        warn!("thing {} errored: {}", self.thing_id, error);
        self.registry.publish(
            EventCategory::Connection,
            &ConnectionEvent::errored(self.thing_id.clone(), error.to_string()).into(),
        );
    }

    /// Decodes and applies one inbound payload of session `epoch`.
    ///
    /// Only a connected session ingests. A message arriving between `Disconnected` and
    /// `Reconnected` is dropped so the open gap stays open. A payload that is dropped
    /// counts once, whether it would have decoded or not. Returns `false` when the session
    /// is no longer current.
    pub(crate) fn apply_message(&self, epoch: Epoch, payload: &[u8]) -> bool {
        let decoded = self.pipeline.try_decode(payload);

        let mut writer = self.writer.lock();
        if !writer.is_current(epoch) {
            self.stats.record_after_stop(1);
            return false;
        }
        if !writer.connected {
            self.stats.record_while_disconnected(1);
            return true;
        }
        match decoded {
            Ok(samples) => {
                self.pipeline.route(&mut writer.buffers, &samples);
            }
            Err(err) => self.pipeline.reject(&err),
        }
        true
    }

    pub(crate) fn missing_data_request(&self) -> MissingDataRequest {
        let writer = self.writer.lock();
        self.engine.missing_data_request(&self.thing_id, &writer.buffers)
    }

    /// Reconciles a fetched batch. Resets the reconnect cycle count.
    pub(crate) fn push_missing_data(&self, result: MissingDataResult) -> ReconciliationReport {
        let mut writer = self.writer.lock();
        let report = self.engine.reconcile(&mut writer.buffers, result);
        self.cycles.store(0, Ordering::Release);
        report
    }

    pub(crate) fn worth_getting_historical_data(&self) -> bool {
        if self.cycles() < self.historical.min_reconnect_cycles {
            return false;
        }
        !self.historical.require_open_gaps
            || self.readers.values().any(|reader| reader.load().gaps.has_open())
    }

    /// Closes the gate without notifying anyone.
    pub(crate) fn shutdown(&self) {
        let _transition = self.notify.lock();
        let mut writer = self.writer.lock();
        writer.accepting = false;
        writer.connected = false;
        writer.epoch += 1;
    }
}

impl WriterState {
    const fn is_current(&self, epoch: Epoch) -> bool {
        self.accepting && self.epoch == epoch
    }

    /// The live feed was lost. Counted as a cycle once it comes back, gap or no gap.
    fn disconnect(&mut self) {
        self.awaiting_reconnect = true;
        if self.buffers.mark_disconnected() > 0 {
            self.buffers.publish();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::JsonDecoder;

    fn shared() -> StreamShared {
        StreamShared::new(
            ThingId::new("car-7"),
            [SensorId::new("speed")],
            &StreamConfig::default(),
            Arc::new(JsonDecoder),
        )
    }

    const FRAME: &[u8] = br#"{"ts": 10, "values": {"speed": 1.0}}"#;

    #[test]
    fn test_message_of_ended_session_is_rejected() {
        let shared = shared();
        let epoch = {
            let _transition = shared.transition_lock();
            shared.begin_session()
        };

        shared.on_streaming(epoch);

        assert!(shared.apply_message(epoch, FRAME));
        {
            let _transition = shared.transition_lock();
            assert!(shared.end_session());
        }

        assert!(!shared.apply_message(epoch, FRAME));
        assert_eq!(shared.stats().snapshot().dropped_after_stop, 1);
        assert_eq!(shared.readers()["speed"].load().len(), 1);
    }

    #[test]
    fn test_undecodable_message_of_ended_session_counts_once() {
        let shared = shared();
        let epoch = {
            let _transition = shared.transition_lock();
            shared.begin_session()
        };
        shared.on_streaming(epoch);
        {
            let _transition = shared.transition_lock();
            assert!(shared.end_session());
        }

        assert!(!shared.apply_message(epoch, b"not json"));

        let stats = shared.stats().snapshot();
        assert_eq!(stats.dropped_after_stop, 1);
        assert_eq!(stats.decode_errors, 0);
    }

    #[test]
    fn test_message_before_streaming_is_not_ingested() {
        let shared = shared();
        let epoch = {
            let _transition = shared.transition_lock();
            shared.begin_session()
        };

        assert!(shared.apply_message(epoch, FRAME));

        assert_eq!(shared.stats().snapshot().dropped_while_disconnected, 1);
        assert!(shared.readers()["speed"].load().is_empty());
    }

    #[test]
    fn test_stale_epoch_cannot_announce_streaming() {
        let shared = shared();
        let first = {
            let _transition = shared.transition_lock();
            shared.begin_session()
        };
        let second = {
            let _transition = shared.transition_lock();
            shared.begin_session()
        };

        shared.on_streaming(first);
        assert_eq!(shared.state(), ConnectionState::Connecting);

        shared.on_streaming(second);
        assert_eq!(shared.state(), ConnectionState::Streaming);
    }
}
