// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use serde::{Deserialize, Serialize};
use thingstream_core::TimestampMillis;

/// Bounds how much history a buffer keeps.
///
/// Age is measured against the buffer watermark, not the wall clock, so a replayed or
/// paused stream keeps its window intact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionPolicy {
    pub max_samples: Option<usize>,
    pub max_age_ms: Option<u64>,
}

impl RetentionPolicy {
    pub const DEFAULT_MAX_SAMPLES: usize = 10_000;

    /// Keeps everything for the lifetime of the buffer.
    #[must_use]
    pub const fn unbounded() -> Self {
        Self {
            max_samples: None,
            max_age_ms: None,
        }
    }

    #[must_use]
    pub const fn with_max_samples(mut self, max_samples: Option<usize>) -> Self {
        self.max_samples = max_samples;
        self
    }

    #[must_use]
    pub const fn with_max_age_ms(mut self, max_age_ms: Option<u64>) -> Self {
        self.max_age_ms = max_age_ms;
        self
    }

    /// Oldest timestamp still retained given the current watermark.
    #[must_use]
    pub fn horizon(&self, watermark: Option<TimestampMillis>) -> Option<TimestampMillis> {
        let age = self.max_age_ms?;
        watermark.map(|watermark| watermark.saturating_sub(age))
    }
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            max_samples: Some(Self::DEFAULT_MAX_SAMPLES),
            max_age_ms: None,
        }
    }
}
