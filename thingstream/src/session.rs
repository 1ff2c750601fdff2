// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::logging::debug;
use crate::shared::{Epoch, StreamShared};
use crate::transport::{Transport, TransportEvent};
use futures::StreamExt;
use std::sync::Arc;
use thingstream_core::TransportError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Handle on a running session task.
pub(crate) struct Session {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl Session {
    pub(crate) fn spawn(
        runtime: &tokio::runtime::Handle,
        shared: Arc<StreamShared>,
        transport: Arc<dyn Transport>,
        epoch: Epoch,
    ) -> Self {
        let token = CancellationToken::new();
        let handle = runtime.spawn(run(shared, transport, epoch, token.clone()));
        Self { token, handle }
    }

    /// Cancels the task. Never waits for it.
    pub(crate) fn cancel(self) {
        self.token.cancel();
        self.handle.abort();
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Drives one connection from `open` until cancellation or the end of its event stream.
async fn run(
    shared: Arc<StreamShared>,
    transport: Arc<dyn Transport>,
    epoch: Epoch,
    token: CancellationToken,
) {
    let opened = tokio::select! {
        biased;
        () = token.cancelled() => return,
        opened = transport.open(shared.thing_id()) => opened,
    };

    let mut events = match opened {
        Ok(events) => {
            shared.on_streaming(epoch);
            events
        }
        Err(err) => {
            shared.on_errored(epoch, &err, false);
            return;
        }
    };

    loop {
        let event = tokio::select! {
            biased;
            () = token.cancelled() => break,
            event = events.next() => event,
        };

        match event {
            Some(TransportEvent::Message(payload)) => {
                if !shared.apply_message(epoch, &payload) {
                    break;
                }
            }
            Some(TransportEvent::Disconnected { reason }) => {
                let err = TransportError::ConnectionLost {
                    thing_id: shared.thing_id().clone(),
                    reason,
                };
                shared.on_errored(epoch, &err, true);
            }
            Some(TransportEvent::Reconnected) => shared.on_streaming(epoch),
            None => {
                let err = TransportError::Closed {
                    thing_id: shared.thing_id().clone(),
                };
                shared.on_errored(epoch, &err, true);
                break;
            }
        }
    }

    debug!("session {} of thing {} finished", epoch, shared.thing_id());
}
