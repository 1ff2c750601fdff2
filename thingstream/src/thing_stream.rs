// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::config::StreamConfig;
use crate::connection_supervisor::ConnectionSupervisor;
use crate::decode::{JsonDecoder, MessageDecoder};
use crate::historical::HistoricalDataSource;
use crate::reconciliation::{MissingDataRequest, MissingDataResult, ReconciliationReport};
use crate::shared::StreamShared;
use crate::stats::IngestStatsSnapshot;
use crate::transport::Transport;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thingstream_buffer::{BufferReader, BufferSnapshot};
use thingstream_core::{
    ConnectionState, EventCategory, EventStream, Reading, Result, SensorId, StreamError,
    StreamEvent, SubscriptionId, ThingId,
};

/// A Thing together with the sensors it is known to carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThingProfile {
    pub thing_id: ThingId,
    pub sensors: Vec<SensorId>,
}

impl ThingProfile {
    pub fn new<S>(thing_id: impl Into<ThingId>, sensors: impl IntoIterator<Item = S>) -> Self
    where
        S: Into<SensorId>,
    {
        Self {
            thing_id: thing_id.into(),
            sensors: sensors.into_iter().map(Into::into).collect(),
        }
    }
}

/// The live stream of one Thing: connection, per-sensor buffers and notifications.
///
/// Consumers read buffers through snapshots that never block ingestion, and register for
/// `Connection` and `Stop` events. Dropping the stream tears the session down at once
/// without publishing a `Stop` event.
///
/// # Example
///
/// ```no_run
/// use thingstream::{StreamConfig, ThingProfile, ThingStream, Transport};
/// use thingstream_core::StreamEvent;
/// # fn example(transport: impl Transport) {
///
/// let profile = ThingProfile::new("car-7", ["speed", "rpm"]);
/// let stream = ThingStream::new(profile, transport, StreamConfig::default());
///
/// let id = stream.subscribe_to_connection(|event: &StreamEvent| {
///     println!("connection changed: {event:?}");
/// });
/// stream.connect();
/// // ...
/// if let Some(snapshot) = stream.snapshot("speed") {
///     println!("{} readings", snapshot.len());
/// }
/// stream.unsubscribe_from_connection(id);
/// stream.stop();
/// # }
/// ```
pub struct ThingStream {
    shared: Arc<StreamShared>,
    supervisor: ConnectionSupervisor,
}

impl ThingStream {
    pub fn new(profile: ThingProfile, transport: impl Transport, config: StreamConfig) -> Self {
        Self::with_decoder(profile, transport, config, JsonDecoder)
    }

    pub fn with_decoder(
        profile: ThingProfile,
        transport: impl Transport,
        config: StreamConfig,
        decoder: impl MessageDecoder,
    ) -> Self {
        let shared = Arc::new(StreamShared::new(
            profile.thing_id,
            profile.sensors,
            &config,
            Arc::new(decoder),
        ));
        let supervisor = ConnectionSupervisor::new(Arc::clone(&shared), Arc::new(transport));
        Self { shared, supervisor }
    }

    #[must_use]
    pub fn thing_id(&self) -> &ThingId {
        self.shared.thing_id()
    }

    #[must_use]
    pub const fn supervisor(&self) -> &ConnectionSupervisor {
        &self.supervisor
    }

    /// See [`ConnectionSupervisor::connect`].
    pub fn connect(&self) {
        self.supervisor.connect();
    }

    /// See [`ConnectionSupervisor::stop`].
    pub fn stop(&self) {
        self.supervisor.stop();
    }

    #[must_use]
    pub fn is_streaming(&self) -> bool {
        self.supervisor.is_streaming()
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.supervisor.state()
    }

    #[must_use]
    pub fn worth_getting_historical_data(&self) -> bool {
        self.supervisor.worth_getting_historical_data()
    }

    pub fn subscribe_to_connection<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&StreamEvent) + Send + Sync + 'static,
    {
        self.shared
            .registry()
            .subscribe(EventCategory::Connection, callback)
    }

    pub fn unsubscribe_from_connection(&self, id: SubscriptionId) {
        self.shared
            .registry()
            .unsubscribe(EventCategory::Connection, id);
    }

    pub fn subscribe_to_stop<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&StreamEvent) + Send + Sync + 'static,
    {
        self.shared.registry().subscribe(EventCategory::Stop, callback)
    }

    pub fn unsubscribe_from_stop(&self, id: SubscriptionId) {
        self.shared.registry().unsubscribe(EventCategory::Stop, id);
    }

    /// Connection events as an async stream, starting now.
    #[must_use]
    pub fn connection_events(&self) -> EventStream<EventCategory, StreamEvent> {
        self.shared.registry().events(EventCategory::Connection)
    }

    /// Stop events as an async stream, starting now.
    #[must_use]
    pub fn stop_events(&self) -> EventStream<EventCategory, StreamEvent> {
        self.shared.registry().events(EventCategory::Stop)
    }

    /// Every gap currently recorded, ready to hand to a historical fetch.
    #[must_use]
    pub fn missing_data_request(&self) -> MissingDataRequest {
        self.shared.missing_data_request()
    }

    /// Merges a fetched batch into the buffers.
    ///
    /// Readers see the result on their next snapshot. No event is published.
    pub fn push_missing_data(&self, result: MissingDataResult) -> ReconciliationReport {
        self.shared.push_missing_data(result)
    }

    /// Fetches whatever the buffers are missing from `source` and merges it.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::Fetch`] when the source fails. Nothing is retried.
    pub async fn backfill<H>(&self, source: &H) -> Result<ReconciliationReport>
    where
        H: HistoricalDataSource + ?Sized,
    {
        let request = self.missing_data_request();
        if request.is_empty() {
            return Ok(ReconciliationReport::default());
        }
        let result = source
            .fetch(&request)
            .await
            .map_err(StreamError::fetch_error)?;
        Ok(self.push_missing_data(result))
    }

    /// Latest published snapshot of one sensor.
    #[must_use]
    pub fn snapshot(&self, sensor_id: &str) -> Option<Arc<BufferSnapshot>> {
        self.shared.readers().get(sensor_id).map(BufferReader::load)
    }

    /// Snapshots of a sensor subset, in the order asked. Unknown sensors are skipped.
    #[must_use]
    pub fn snapshots<S: AsRef<str>>(&self, sensor_ids: &[S]) -> Vec<Arc<BufferSnapshot>> {
        sensor_ids
            .iter()
            .filter_map(|sensor_id| self.snapshot(sensor_id.as_ref()))
            .collect()
    }

    #[must_use]
    pub fn latest(&self, sensor_id: &str) -> Option<Reading> {
        self.shared.readers().get(sensor_id).and_then(BufferReader::latest)
    }

    /// A long-lived read handle, for consumers polling one sensor at frame rate.
    #[must_use]
    pub fn reader(&self, sensor_id: &str) -> Option<BufferReader> {
        self.shared.readers().get(sensor_id).cloned()
    }

    pub fn sensor_ids(&self) -> impl Iterator<Item = &SensorId> {
        self.shared.readers().keys()
    }

    #[must_use]
    pub fn stats(&self) -> IngestStatsSnapshot {
        self.shared.stats().snapshot()
    }
}

impl Drop for ThingStream {
    fn drop(&mut self) {
        self.supervisor.shutdown();
        self.shared.registry().clear();
    }
}

impl core::fmt::Debug for ThingStream {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ThingStream")
            .field("thing_id", self.shared.thing_id())
            .field("state", &self.shared.state())
            .field("sensors", &self.shared.readers().len())
            .finish_non_exhaustive()
    }
}
