// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Half-open time ranges and the sorted set of gaps a buffer believes are missing.

use crate::TimestampMillis;
use core::fmt;
use serde::{Deserialize, Serialize};

/// A half-open interval `[start, end)` of timestamps. `end == None` means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: TimestampMillis,
    pub end: Option<TimestampMillis>,
}

/// `true` when a range ending at `end` finishes at or before `point`.
fn ends_by(end: Option<TimestampMillis>, point: TimestampMillis) -> bool {
    end.is_some_and(|end| end <= point)
}

impl TimeRange {
    /// `[start, ∞)`
    #[must_use]
    pub const fn open(start: TimestampMillis) -> Self {
        Self { start, end: None }
    }

    /// `[start, end)`
    #[must_use]
    pub const fn bounded(start: TimestampMillis, end: TimestampMillis) -> Self {
        Self {
            start,
            end: Some(end),
        }
    }

    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.end.is_none()
    }

    /// A bounded range whose end does not exceed its start holds no timestamps.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        ends_by(self.end, self.start)
    }

    #[must_use]
    pub fn contains(&self, timestamp: TimestampMillis) -> bool {
        timestamp >= self.start && self.end.is_none_or(|end| timestamp < end)
    }

    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        !(self.is_empty()
            || other.is_empty()
            || ends_by(self.end, other.start)
            || ends_by(other.end, self.start))
    }

    /// Returns `true` when `self` lies entirely inside `other`.
    #[must_use]
    pub fn is_within(&self, other: &Self) -> bool {
        let end_within = match (self.end, other.end) {
            (_, None) => true,
            (None, Some(_)) => false,
            (Some(mine), Some(theirs)) => mine <= theirs,
        };
        self.start >= other.start && end_within
    }

    /// Removes `cover` from this range, returning what remains on either side of it.
    #[must_use]
    pub fn subtract(&self, cover: &Self) -> (Option<Self>, Option<Self>) {
        if !self.overlaps(cover) {
            return (Some(*self), None);
        }

        let left = (self.start < cover.start).then(|| Self::bounded(self.start, cover.start));
        let right = cover.end.and_then(|cover_end| {
            self.end
                .is_none_or(|end| cover_end < end)
                .then_some(Self {
                    start: cover_end,
                    end: self.end,
                })
        });

        (left, right)
    }

    /// Length in milliseconds, or `None` for an unbounded range.
    #[must_use]
    pub fn duration(&self) -> Option<u64> {
        self.end.map(|end| end.saturating_sub(self.start))
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.end {
            Some(end) => write!(f, "[{}, {})", self.start, end),
            None => write!(f, "[{}, ∞)", self.start),
        }
    }
}

/// Sorted, non-overlapping, non-empty collection of gap intervals.
///
/// At most one gap is open-ended, and when present it is always the last one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GapSet {
    ranges: Vec<TimeRange>,
}

impl GapSet {
    #[must_use]
    pub const fn new() -> Self {
        Self { ranges: Vec::new() }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TimeRange> {
        self.ranges.iter()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[TimeRange] {
        &self.ranges
    }

    /// The open-ended gap, if the buffer is currently waiting for data to resume.
    #[must_use]
    pub fn open_gap(&self) -> Option<&TimeRange> {
        self.ranges.last().filter(|range| range.is_open())
    }

    #[must_use]
    pub fn has_open(&self) -> bool {
        self.open_gap().is_some()
    }

    #[must_use]
    pub fn contains(&self, timestamp: TimestampMillis) -> bool {
        self.ranges.iter().any(|range| range.contains(timestamp))
    }

    /// Opens `[start, ∞)` unless an open gap already exists.
    pub fn open_at(&mut self, start: TimestampMillis) -> bool {
        if self.has_open() {
            return false;
        }
        self.insert(TimeRange::open(start))
    }

    /// Bounds the open gap at `end`. A gap that would become empty is dropped.
    pub fn close_open(&mut self, end: TimestampMillis) -> bool {
        match self.ranges.last_mut() {
            Some(last) if last.is_open() => {
                if end <= last.start {
                    self.ranges.pop();
                } else {
                    last.end = Some(end);
                }
                true
            }
            _ => false,
        }
    }

    /// Adds a range, merging it with any gap it overlaps or touches.
    pub fn insert(&mut self, range: TimeRange) -> bool {
        if range.is_empty() {
            return false;
        }
        let before = self.ranges.clone();
        self.ranges.push(range);
        self.normalize();
        before != self.ranges
    }

    /// Removes `cover` from every gap: fully covered gaps disappear, partially covered
    /// gaps are narrowed, and a cover strictly inside a gap splits it in two.
    pub fn subtract(&mut self, cover: &TimeRange) -> bool {
        if cover.is_empty() || !self.ranges.iter().any(|gap| gap.overlaps(cover)) {
            return false;
        }

        let mut next = Vec::with_capacity(self.ranges.len() + 1);
        for gap in &self.ranges {
            let (left, right) = gap.subtract(cover);
            next.extend(left);
            next.extend(right);
        }
        self.ranges = next;
        true
    }

    /// Drops everything strictly before `horizon`.
    pub fn trim_before(&mut self, horizon: TimestampMillis) -> bool {
        horizon > 0 && self.subtract(&TimeRange::bounded(0, horizon))
    }

    pub fn clear(&mut self) {
        self.ranges.clear();
    }

    fn normalize(&mut self) {
        self.ranges.retain(|range| !range.is_empty());
        self.ranges.sort_by_key(|range| range.start);

        let mut merged: Vec<TimeRange> = Vec::with_capacity(self.ranges.len());
        for range in self.ranges.drain(..) {
            match merged.last_mut() {
                Some(last) if last.end.is_none_or(|end| end >= range.start) => {
                    last.end = match (last.end, range.end) {
                        (Some(a), Some(b)) => Some(a.max(b)),
                        _ => None,
                    };
                }
                _ => merged.push(range),
            }
        }
        self.ranges = merged;
    }
}

impl<'a> IntoIterator for &'a GapSet {
    type Item = &'a TimeRange;
    type IntoIter = core::slice::Iter<'a, TimeRange>;

    fn into_iter(self) -> Self::IntoIter {
        self.ranges.iter()
    }
}
