// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use thingstream::{RawMessage, Transport, TransportEvent, TransportEvents};
use thingstream_core::{ThingId, TransportError};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

#[derive(Default)]
struct MockState {
    sender: Option<mpsc::UnboundedSender<TransportEvent>>,
    fail_next: Option<String>,
    open_delay: Option<Duration>,
    opens: usize,
    last_thing: Option<ThingId>,
}

/// In-memory transport driven from the test through a [`MockController`].
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

/// Test-side handle of a [`MockTransport`].
#[derive(Clone)]
pub struct MockController {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    #[must_use]
    pub fn pair() -> (Self, MockController) {
        let state = Arc::new(Mutex::new(MockState::default()));
        (
            Self {
                state: state.clone(),
            },
            MockController { state },
        )
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn open(&self, thing_id: &ThingId) -> Result<TransportEvents, TransportError> {
        let delay = {
            let mut state = self.state.lock();
            state.opens += 1;
            state.last_thing = Some(thing_id.clone());
            state.open_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock();
        if let Some(reason) = state.fail_next.take() {
            return Err(TransportError::ConnectFailed {
                thing_id: thing_id.clone(),
                reason,
            });
        }
        let (sender, receiver) = mpsc::unbounded_channel();
        state.sender = Some(sender);
        Ok(Box::pin(UnboundedReceiverStream::new(receiver)))
    }
}

impl MockController {
    /// Makes the next `open` fail with `reason`.
    pub fn fail_next_open(&self, reason: impl Into<String>) {
        self.state.lock().fail_next = Some(reason.into());
    }

    /// Delays every subsequent `open` by `delay`.
    pub fn delay_open(&self, delay: Duration) {
        self.state.lock().open_delay = Some(delay);
    }

    #[must_use]
    pub fn open_count(&self) -> usize {
        self.state.lock().opens
    }

    #[must_use]
    pub fn last_thing(&self) -> Option<ThingId> {
        self.state.lock().last_thing.clone()
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state
            .lock()
            .sender
            .as_ref()
            .is_some_and(|sender| !sender.is_closed())
    }

    /// Delivers an event on the current connection. Returns `false` if nothing is open.
    pub fn send(&self, event: TransportEvent) -> bool {
        self.state
            .lock()
            .sender
            .as_ref()
            .is_some_and(|sender| sender.send(event).is_ok())
    }

    pub fn send_message(&self, payload: impl Into<RawMessage>) -> bool {
        self.send(TransportEvent::Message(payload.into()))
    }

    pub fn send_json(&self, frame: &serde_json::Value) -> bool {
        self.send_message(frame.to_string().into_bytes())
    }

    pub fn disconnect(&self, reason: impl Into<String>) -> bool {
        self.send(TransportEvent::Disconnected {
            reason: reason.into(),
        })
    }

    pub fn reconnect(&self) -> bool {
        self.send(TransportEvent::Reconnected)
    }

    /// Ends the event stream of the current connection.
    pub fn close(&self) {
        self.state.lock().sender = None;
    }
}
