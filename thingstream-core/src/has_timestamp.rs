// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

/// A trait for types that carry a timestamp used for ordering and de-duplication.
///
/// Buffers and the ordered merge only ever need to read the timestamp of an item,
/// so this is the single requirement they place on the items they hold.
///
/// # Examples
///
/// ```
/// use thingstream_core::HasTimestamp;
///
/// #[derive(Clone, Debug)]
/// struct Frame {
///     at: u64,
///     payload: Vec<u8>,
/// }
///
/// impl HasTimestamp for Frame {
///     type Timestamp = u64;
///
///     fn timestamp(&self) -> u64 {
///         self.at
///     }
/// }
/// ```
pub trait HasTimestamp {
    /// The type representing the timestamp
    type Timestamp: Ord + Copy + Send + Sync + core::fmt::Debug;

    /// Returns the timestamp of this item.
    fn timestamp(&self) -> Self::Timestamp;
}
