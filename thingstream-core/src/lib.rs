// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Core vocabulary of the thingstream workspace.
//!
//! This crate holds everything that the buffer layer and the stream manager share:
//!
//! - identifiers for Things and their sensors ([`ThingId`], [`SensorId`])
//! - immutable samples and per-sensor readings ([`Sample`], [`Reading`])
//! - half-open time ranges and the sorted gap set used for missing-data tracking
//! - the connection state machine values ([`ConnectionState`])
//! - stream events and the [`SubscriptionRegistry`] that fans them out
//! - the error taxonomy ([`StreamError`] and friends)

#![allow(clippy::multiple_crate_versions, clippy::doc_markdown)]
pub mod connection_state;
pub mod error;
pub mod event_stream;
pub mod gap;
pub mod has_timestamp;
pub mod ids;
mod logging;
pub mod sample;
pub mod stream_event;
pub mod subscription_registry;

pub use self::connection_state::{AtomicConnectionState, ConnectionState};
pub use self::error::{IngestDecodeError, Result, StreamError, TransportError};
pub use self::event_stream::EventStream;
pub use self::gap::{GapSet, TimeRange};
pub use self::has_timestamp::HasTimestamp;
pub use self::ids::{SensorId, ThingId};
pub use self::sample::{Reading, Sample, TimestampMillis};
pub use self::stream_event::{ConnectionEvent, EventCategory, StopEvent, StreamEvent};
pub use self::subscription_registry::{SubscriptionGuard, SubscriptionId, SubscriptionRegistry};
