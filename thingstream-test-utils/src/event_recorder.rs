// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use parking_lot::Mutex;
use std::sync::Arc;
use thingstream_core::{ConnectionState, StreamEvent};

/// Collects events handed to subscription callbacks.
#[derive(Clone, Default)]
pub struct EventRecorder {
    events: Arc<Mutex<Vec<StreamEvent>>>,
}

impl EventRecorder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A callback recording into this recorder.
    pub fn callback(&self) -> impl Fn(&StreamEvent) + Send + Sync + 'static {
        let events = self.events.clone();
        move |event| events.lock().push(event.clone())
    }

    #[must_use]
    pub fn events(&self) -> Vec<StreamEvent> {
        self.events.lock().clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Connection states in the order they were reported.
    #[must_use]
    pub fn states(&self) -> Vec<ConnectionState> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                StreamEvent::Connection(connection) => Some(connection.state),
                StreamEvent::Stop(_) => None,
            })
            .collect()
    }

    #[must_use]
    pub fn stop_count(&self) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|event| matches!(event, StreamEvent::Stop(_)))
            .count()
    }
}
