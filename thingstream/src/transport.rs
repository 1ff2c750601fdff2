// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! The seam to the live link of a Thing.
//!
//! Retry and backoff belong to the transport. The stream only reacts to the events it is
//! handed: it never reopens a connection on its own.

use async_trait::async_trait;
use core::pin::Pin;
use futures::Stream;
use thingstream_core::{ThingId, TransportError};

/// Opaque inbound payload as delivered by the transport.
pub type RawMessage = Vec<u8>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Message(RawMessage),
    /// The link dropped. The transport may report [`TransportEvent::Reconnected`] later.
    Disconnected { reason: String },
    /// The link is back after a [`TransportEvent::Disconnected`].
    Reconnected,
}

/// Events of one open connection. The stream ending means the connection is gone for good.
pub type TransportEvents = Pin<Box<dyn Stream<Item = TransportEvent> + Send>>;

#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Opens the live link for `thing_id`.
    async fn open(&self, thing_id: &ThingId) -> Result<TransportEvents, TransportError>;
}
