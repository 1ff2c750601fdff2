// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use core::cmp::Ordering;
use core::iter::Peekable;
use thingstream_core::{HasTimestamp, Reading};

/// One step of a [`LiveWinsMerge`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MergeStep {
    /// Already held by the buffer.
    Held(Reading),
    /// New from the fetched side.
    Inserted(Reading),
    /// Both sides hold the timestamp. The held reading is kept.
    Collision { held: Reading, fetched: Reading },
}

impl MergeStep {
    /// The reading that ends up in the merged sequence.
    #[must_use]
    pub const fn reading(&self) -> Reading {
        match self {
            Self::Held(reading) | Self::Inserted(reading) => *reading,
            Self::Collision { held, .. } => *held,
        }
    }

    /// A collision whose values disagree.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Collision { held, fetched } if held.value != fetched.value)
    }
}

/// Merges two timestamp-sorted, duplicate-free reading sequences, smallest timestamp first.
///
/// Equal timestamps are emitted once as a [`MergeStep::Collision`] carrying both readings.
/// The output is sorted and duplicate-free whenever both inputs are.
pub struct LiveWinsMerge<H, F>
where
    H: Iterator<Item = Reading>,
    F: Iterator<Item = Reading>,
{
    held: Peekable<H>,
    fetched: Peekable<F>,
}

impl<H, F> LiveWinsMerge<H, F>
where
    H: Iterator<Item = Reading>,
    F: Iterator<Item = Reading>,
{
    pub fn new(
        held: impl IntoIterator<IntoIter = H>,
        fetched: impl IntoIterator<IntoIter = F>,
    ) -> Self {
        Self {
            held: held.into_iter().peekable(),
            fetched: fetched.into_iter().peekable(),
        }
    }
}

impl<H, F> Iterator for LiveWinsMerge<H, F>
where
    H: Iterator<Item = Reading>,
    F: Iterator<Item = Reading>,
{
    type Item = MergeStep;

    fn next(&mut self) -> Option<Self::Item> {
        let held_ts = self.held.peek().map(HasTimestamp::timestamp);
        let fetched_ts = self.fetched.peek().map(HasTimestamp::timestamp);

        match (held_ts, fetched_ts) {
            (Some(held), Some(fetched)) => match held.cmp(&fetched) {
                Ordering::Less => self.held.next().map(MergeStep::Held),
                Ordering::Greater => self.fetched.next().map(MergeStep::Inserted),
                Ordering::Equal => {
                    let held = self.held.next()?;
                    let fetched = self.fetched.next()?;
                    Some(MergeStep::Collision { held, fetched })
                }
            },
            (Some(_), None) => self.held.next().map(MergeStep::Held),
            (None, Some(_)) => self.fetched.next().map(MergeStep::Inserted),
            (None, None) => None,
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let (held_low, held_high) = self.held.size_hint();
        let (fetched_low, fetched_high) = self.fetched.size_hint();
        let high = held_high.zip(fetched_high).map(|(a, b)| a + b);
        (held_low.max(fetched_low), high)
    }
}
