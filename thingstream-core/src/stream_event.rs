// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::{ConnectionState, ThingId};

/// Event categories consumers can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventCategory {
    Connection,
    Stop,
}

/// Published when a connection attempt resolves or the connection changes health.
///
/// Success and failure share this one event; consumers tell them apart by `state`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionEvent {
    pub thing_id: ThingId,
    pub state: ConnectionState,
    /// Transport error text when `state` is [`ConnectionState::Errored`].
    pub error: Option<String>,
}

impl ConnectionEvent {
    #[must_use]
    pub const fn streaming(thing_id: ThingId) -> Self {
        Self {
            thing_id,
            state: ConnectionState::Streaming,
            error: None,
        }
    }

    pub fn errored(thing_id: ThingId, error: impl Into<String>) -> Self {
        Self {
            thing_id,
            state: ConnectionState::Errored,
            error: Some(error.into()),
        }
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.state.is_streaming()
    }
}

/// Published once a stop has taken effect: no ingestion happens after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopEvent {
    pub thing_id: ThingId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Connection(ConnectionEvent),
    Stop(StopEvent),
}

impl StreamEvent {
    #[must_use]
    pub const fn category(&self) -> EventCategory {
        match self {
            Self::Connection(_) => EventCategory::Connection,
            Self::Stop(_) => EventCategory::Stop,
        }
    }

    #[must_use]
    pub const fn thing_id(&self) -> &ThingId {
        match self {
            Self::Connection(event) => &event.thing_id,
            Self::Stop(event) => &event.thing_id,
        }
    }
}

impl From<ConnectionEvent> for StreamEvent {
    fn from(event: ConnectionEvent) -> Self {
        Self::Connection(event)
    }
}

impl From<StopEvent> for StreamEvent {
    fn from(event: StopEvent) -> Self {
        Self::Stop(event)
    }
}
