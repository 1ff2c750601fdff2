// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Error types for live Thing streams.
//!
//! None of these errors is fatal to the hosting process. Transport errors surface as the
//! `Errored` connection state plus a notification, decode errors are dropped and counted,
//! and reconciliation conflicts are resolved in favour of live data and logged. Only
//! configuration parsing and the optional backfill helper hand a [`StreamError`] back to
//! the caller.
//!
//! # Examples
//!
//! ```
//! use thingstream_core::{StreamError, TransportError, ThingId};
//!
//! let err: StreamError = TransportError::ConnectFailed {
//!     thing_id: ThingId::new("car-7"),
//!     reason: "handshake refused".to_string(),
//! }
//! .into();
//! assert!(err.is_recoverable());
//! ```

use crate::{SensorId, ThingId, TimestampMillis};

/// The connection could not be established or was lost.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("could not connect to thing {thing_id}: {reason}")]
    ConnectFailed { thing_id: ThingId, reason: String },

    #[error("connection to thing {thing_id} lost: {reason}")]
    ConnectionLost { thing_id: ThingId, reason: String },

    #[error("no async runtime available to drive the connection")]
    NoRuntime,

    #[error("transport closed the event stream of thing {thing_id}")]
    Closed { thing_id: ThingId },
}

/// An inbound message, or one triple of it, could not be turned into a sample.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IngestDecodeError {
    #[error("malformed inbound message: {reason}")]
    Malformed { reason: String },

    #[error("inbound message carries no samples")]
    Empty,

    #[error("non-finite value {value} for sensor {sensor_id} at {timestamp}")]
    NonFinite {
        sensor_id: String,
        timestamp: TimestampMillis,
        value: f64,
    },
}

impl IngestDecodeError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed {
            reason: reason.into(),
        }
    }
}

/// Root error type of the workspace.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    IngestDecode(#[from] IngestDecodeError),

    /// Live and fetched data disagree on the value at the same `(sensor, timestamp)` key.
    #[error(
        "reconciliation conflict for sensor {sensor_id} at {timestamp}: kept live {live}, discarded fetched {fetched}"
    )]
    ReconciliationConflict {
        sensor_id: SensorId,
        timestamp: TimestampMillis,
        live: f64,
        fetched: f64,
    },

    #[error("configuration error: {context}")]
    Config { context: String },

    /// The external historical-data fetch failed. Retrying is the caller's call.
    #[error("historical data fetch failed: {0}")]
    Fetch(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl StreamError {
    pub fn config_error(context: impl Into<String>) -> Self {
        Self::Config {
            context: context.into(),
        }
    }

    pub fn fetch_error(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Fetch(Box::new(error))
    }

    /// Whether reconnecting or re-requesting data can make the condition go away.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::Fetch(_) | Self::ReconciliationConflict { .. }
        )
    }
}

/// Specialized Result type for thingstream operations.
pub type Result<T> = std::result::Result<T, StreamError>;
