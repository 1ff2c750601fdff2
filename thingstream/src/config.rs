// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use serde::{Deserialize, Serialize};
use thingstream_buffer::RetentionPolicy;
use thingstream_core::{Result, StreamError};

/// When a historical fetch is considered worth issuing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoricalDataPolicy {
    /// Disconnect/reconnect cycles observed since the last reconciliation.
    pub min_reconnect_cycles: u32,
    /// Additionally require at least one buffer to still record an open gap.
    pub require_open_gaps: bool,
}

impl Default for HistoricalDataPolicy {
    fn default() -> Self {
        Self {
            min_reconnect_cycles: 1,
            require_open_gaps: false,
        }
    }
}

/// Configuration of one Thing stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StreamConfig {
    /// How far behind the watermark a live sample may arrive and still be inserted.
    pub out_of_order_tolerance_ms: u64,
    pub retention: RetentionPolicy,
    pub historical: HistoricalDataPolicy,
}

impl StreamConfig {
    pub const DEFAULT_TOLERANCE_MS: u64 = 250;

    /// Parses a TOML document. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::Config`] if the document does not parse or describes an
    /// unusable retention policy.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(source).map_err(|err| StreamError::config_error(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns [`StreamError::Config`] for a retention policy that keeps nothing.
    pub fn validate(&self) -> Result<()> {
        if self.retention.max_samples == Some(0) {
            return Err(StreamError::config_error(
                "retention.max_samples must be greater than zero",
            ));
        }
        if self.retention.max_age_ms == Some(0) {
            return Err(StreamError::config_error(
                "retention.max_age_ms must be greater than zero",
            ));
        }
        Ok(())
    }

    #[must_use]
    pub const fn with_tolerance_ms(mut self, tolerance_ms: u64) -> Self {
        self.out_of_order_tolerance_ms = tolerance_ms;
        self
    }

    #[must_use]
    pub const fn with_retention(mut self, retention: RetentionPolicy) -> Self {
        self.retention = retention;
        self
    }

    #[must_use]
    pub const fn with_historical(mut self, historical: HistoricalDataPolicy) -> Self {
        self.historical = historical;
        self
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            out_of_order_tolerance_ms: Self::DEFAULT_TOLERANCE_MS,
            retention: RetentionPolicy::default(),
            historical: HistoricalDataPolicy::default(),
        }
    }
}
