// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Lifecycle of the single live connection of one Thing.
//!
//! ```text
//! Idle ──connect──▶ Connecting ──open ok──▶ Streaming ◀──reconnected──┐
//!                       │                       │                     │
//!                       └──open err──▶ Errored ◀┴──disconnected───────┘
//! any ──stop──▶ Stopped
//! ```
//!
//! `connect` is accepted from `Idle`, `Errored` and `Stopped` and ignored otherwise.
//! Transport failures never escape as errors: they become the `Errored` state plus a
//! `Connection` notification carrying the error text.

use crate::session::Session;
use crate::shared::StreamShared;
use crate::transport::Transport;
use parking_lot::Mutex;
use std::sync::Arc;
use thingstream_core::{ConnectionState, TransportError};

pub struct ConnectionSupervisor {
    shared: Arc<StreamShared>,
    transport: Arc<dyn Transport>,
    session: Mutex<Option<Session>>,
}

impl ConnectionSupervisor {
    pub(crate) fn new(shared: Arc<StreamShared>, transport: Arc<dyn Transport>) -> Self {
        Self {
            shared,
            transport,
            session: Mutex::new(None),
        }
    }

    /// Starts a session on the ambient tokio runtime.
    ///
    /// Without a runtime the stream turns `Errored` and subscribers are told why.
    pub fn connect(&self) {
        let _transition = self.shared.transition_lock();
        if self.shared.state().is_active() {
            return;
        }

        let mut session = self.session.lock();
        if let Some(previous) = session.take() {
            previous.cancel();
        }
        let epoch = self.shared.begin_session();

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                *session = Some(Session::spawn(
                    &runtime,
                    Arc::clone(&self.shared),
                    Arc::clone(&self.transport),
                    epoch,
                ));
            }
            Err(_) => {
                drop(session);
                self.shared.fail(&TransportError::NoRuntime);
            }
        }
    }

    /// Stops the stream and notifies `Stop` subscribers.
    ///
    /// Once this returns, and already while `Stop` callbacks run, no inbound message reaches
    /// a buffer. Stopping an already stopped stream does nothing.
    pub fn stop(&self) {
        let _transition = self.shared.transition_lock();
        if !self.shared.end_session() {
            return;
        }
        if let Some(session) = self.session.lock().take() {
            session.cancel();
        }
        self.shared.announce_stop();
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    #[must_use]
    pub fn is_streaming(&self) -> bool {
        self.shared.state().is_streaming()
    }

    /// Whether a session task is still running.
    #[must_use]
    pub fn has_session(&self) -> bool {
        self.session
            .lock()
            .as_ref()
            .is_some_and(|session| !session.is_finished())
    }

    /// Whether enough disconnect/reconnect cycles happened since the last reconciliation
    /// for a historical fetch to be able to find anything.
    #[must_use]
    pub fn worth_getting_historical_data(&self) -> bool {
        self.shared.worth_getting_historical_data()
    }

    #[must_use]
    pub fn reconnect_cycles(&self) -> u32 {
        self.shared.cycles()
    }

    /// Tears the session down without notifying anyone.
    pub(crate) fn shutdown(&self) {
        self.shared.shutdown();
        if let Some(session) = self.session.lock().take() {
            session.cancel();
        }
    }
}

impl core::fmt::Debug for ConnectionSupervisor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ConnectionSupervisor")
            .field("thing_id", self.shared.thing_id())
            .field("state", &self.shared.state())
            .finish_non_exhaustive()
    }
}
