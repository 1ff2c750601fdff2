// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

#![allow(clippy::multiple_crate_versions)]
pub mod event_recorder;
pub mod fixtures;
pub mod helpers;
pub mod mock_transport;

pub use event_recorder::EventRecorder;
pub use mock_transport::{MockController, MockTransport};
