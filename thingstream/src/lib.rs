// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Live telemetry streams for data-acquisition Things.
//!
//! A [`ThingStream`] keeps one live connection to a Thing, ingests the samples its
//! transport delivers into per-sensor buffers, tells subscribers about connection and
//! stop events, and merges historical batches back into the buffers to fill the gaps a
//! disconnection left behind.
//!
//! ```text
//! transport ─▶ ConnectionSupervisor ─▶ IngestPipeline ─▶ SampleBuffer ─▶ snapshots
//!                    │                                        ▲
//!                    └─▶ SubscriptionRegistry                 │
//!                                      historical fetch ─▶ ReconciliationEngine
//! ```
//!
//! Writing to the buffers of a Thing is serialized: the session task ingests and
//! reconciliation runs under the same writer lock. Readers load immutable snapshots and
//! never wait for either.

#![allow(clippy::multiple_crate_versions, clippy::doc_markdown)]
pub mod config;
pub mod connection_supervisor;
pub mod decode;
pub mod historical;
pub mod ingest_pipeline;
mod logging;
pub mod reconciliation;
mod session;
mod shared;
pub mod stats;
pub mod thing_stream;
pub mod transport;

pub use self::config::{HistoricalDataPolicy, StreamConfig};
pub use self::connection_supervisor::ConnectionSupervisor;
pub use self::decode::{JsonDecoder, MessageDecoder, WireSample};
pub use self::historical::HistoricalDataSource;
pub use self::ingest_pipeline::{IngestPipeline, IngestSummary};
pub use self::reconciliation::{
    Conflict, MissingDataRequest, MissingDataResult, MissingRange, ReconciliationEngine,
    ReconciliationReport,
};
pub use self::stats::{IngestStats, IngestStatsSnapshot};
pub use self::thing_stream::{ThingProfile, ThingStream};
pub use self::transport::{RawMessage, Transport, TransportEvent, TransportEvents};

pub use thingstream_buffer::{BufferReader, BufferSnapshot, RetentionPolicy};
pub use thingstream_core::{
    ConnectionEvent, ConnectionState, EventCategory, Reading, Sample, SensorId, StopEvent,
    StreamError, StreamEvent, SubscriptionId, ThingId, TimeRange, TransportError,
};
