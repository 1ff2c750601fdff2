// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Per-sensor sample storage for live Thing streams.
//!
//! A [`SampleBuffer`] keeps the readings of one sensor sorted ascending by timestamp with
//! no duplicate timestamps, tracks the live watermark and the gaps where data is believed
//! missing, and publishes immutable [`BufferSnapshot`]s that readers load without ever
//! blocking the writer.
//!
//! Historical batches are folded in with a live-wins merge ([`LiveWinsMerge`]): when the
//! buffer already holds a reading at a timestamp, the fetched value is discarded.

#![allow(clippy::multiple_crate_versions, clippy::doc_markdown)]
pub mod buffer_set;
mod logging;
pub mod ordered_merge;
pub mod retention;
pub mod sample_buffer;
pub mod snapshot;

pub use self::buffer_set::BufferSet;
pub use self::ordered_merge::{LiveWinsMerge, MergeStep};
pub use self::retention::RetentionPolicy;
pub use self::sample_buffer::{IngestOutcome, MergeConflict, MergeReport, SampleBuffer};
pub use self::snapshot::{BufferReader, BufferSnapshot};
