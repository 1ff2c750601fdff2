// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use core::fmt;
use core::sync::atomic::{AtomicU8, Ordering};
use serde::{Deserialize, Serialize};

/// Lifecycle of the live connection to one Thing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum ConnectionState {
    /// Created, never connected.
    #[default]
    Idle = 0,
    /// `connect` was requested and the transport has not answered yet.
    Connecting = 1,
    /// Live samples are flowing.
    Streaming = 2,
    /// Stopped by the consumer. No further live ingestion for this session.
    Stopped = 3,
    /// The transport failed to connect or lost the connection.
    Errored = 4,
}

impl ConnectionState {
    #[must_use]
    pub const fn is_streaming(self) -> bool {
        matches!(self, Self::Streaming)
    }

    /// A session is active while it is connecting or streaming.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Connecting | Self::Streaming)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Streaming => "streaming",
            Self::Stopped => "stopped",
            Self::Errored => "errored",
        }
    }

    const fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Connecting,
            2 => Self::Streaming,
            3 => Self::Stopped,
            4 => Self::Errored,
            _ => Self::Idle,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lock-free cell holding a [`ConnectionState`], so state queries never block.
#[derive(Debug, Default)]
pub struct AtomicConnectionState(AtomicU8);

impl AtomicConnectionState {
    #[must_use]
    pub const fn new(state: ConnectionState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    pub fn load(&self) -> ConnectionState {
        ConnectionState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub fn store(&self, state: ConnectionState) {
        self.0.store(state as u8, Ordering::Release);
    }

    /// Stores `state` and returns the previous one.
    pub fn swap(&self, state: ConnectionState) -> ConnectionState {
        ConnectionState::from_u8(self.0.swap(state as u8, Ordering::AcqRel))
    }
}
