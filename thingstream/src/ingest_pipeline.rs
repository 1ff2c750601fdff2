// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::decode::{MessageDecoder, WireSample};
use crate::logging::{debug, warn};
use crate::stats::IngestStats;
use std::sync::Arc;
use thingstream_buffer::{BufferSet, IngestOutcome};
use thingstream_core::IngestDecodeError;

/// Totals for one routed message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestSummary {
    pub accepted: usize,
    pub dropped: usize,
}

/// Decodes inbound payloads and routes their triples into the Thing's buffers.
///
/// Decoding needs no access to the buffers, so callers can decode first and hold the
/// writer side only while routing.
pub struct IngestPipeline {
    decoder: Arc<dyn MessageDecoder>,
    tolerance_ms: u64,
    stats: Arc<IngestStats>,
}

impl IngestPipeline {
    pub fn new(decoder: Arc<dyn MessageDecoder>, tolerance_ms: u64, stats: Arc<IngestStats>) -> Self {
        Self {
            decoder,
            tolerance_ms,
            stats,
        }
    }

    #[must_use]
    pub const fn tolerance_ms(&self) -> u64 {
        self.tolerance_ms
    }

    /// Decodes a payload. A failure is logged and counted, never propagated further.
    pub fn decode<'a>(&self, payload: &'a [u8]) -> Option<Vec<WireSample<'a>>> {
        self.try_decode(payload)
            .map_err(|err| self.reject(&err))
            .ok()
    }

    /// Decodes a payload without counting anything.
    ///
    /// # Errors
    ///
    /// Returns the decoder's [`IngestDecodeError`].
    pub fn try_decode<'a>(
        &self,
        payload: &'a [u8],
    ) -> Result<Vec<WireSample<'a>>, IngestDecodeError> {
        self.decoder.decode(payload)
    }

    /// Logs and counts a payload that failed to decode.
    pub fn reject(&self, err: &IngestDecodeError) {
        match err {
            IngestDecodeError::Empty => debug!("ignoring inbound message without samples"),
            err => warn!("dropping undecodable inbound message: {}", err),
        }
        self.stats.record_decode_error(1);
    }

    /// Routes decoded triples into `buffers` and publishes the buffers that changed.
    pub fn route(&self, buffers: &mut BufferSet, samples: &[WireSample<'_>]) -> IngestSummary {
        let mut summary = IngestSummary::default();
        let (mut reordered, mut stale, mut duplicate, mut unknown, mut non_finite) =
            (0, 0, 0, 0, 0);

        for sample in samples {
            if !sample.value.is_finite() {
                let err = IngestDecodeError::NonFinite {
                    sensor_id: sample.sensor_id.to_string(),
                    timestamp: sample.timestamp,
                    value: sample.value,
                };
                debug!("dropping sample: {}", err);
                non_finite += 1;
                summary.dropped += 1;
                continue;
            }

            let Some(buffer) = buffers.get_mut(&sample.sensor_id) else {
                debug!("dropping sample for unknown sensor {}", sample.sensor_id);
                unknown += 1;
                summary.dropped += 1;
                continue;
            };

            match buffer.ingest(sample.reading(), self.tolerance_ms) {
                IngestOutcome::Appended => summary.accepted += 1,
                IngestOutcome::Reordered => {
                    reordered += 1;
                    summary.accepted += 1;
                }
                IngestOutcome::Stale => {
                    debug!(
                        "dropping stale sample {}@{} behind watermark {:?}",
                        sample.sensor_id,
                        sample.timestamp,
                        buffer.watermark()
                    );
                    stale += 1;
                    summary.dropped += 1;
                }
                IngestOutcome::Duplicate => {
                    debug!("dropping duplicate sample {}@{}", sample.sensor_id, sample.timestamp);
                    duplicate += 1;
                    summary.dropped += 1;
                }
            }
        }

        if summary.accepted > 0 {
            buffers.publish();
        }

        self.stats.record_accepted(summary.accepted as u64);
        self.stats.record_reordered(reordered);
        self.stats.record_stale(stale);
        self.stats.record_duplicate(duplicate);
        self.stats.record_unknown_sensor(unknown);
        self.stats.record_decode_error(non_finite);
        summary
    }

    /// Decodes and routes in one go.
    pub fn ingest_message(&self, buffers: &mut BufferSet, payload: &[u8]) -> IngestSummary {
        self.decode(payload)
            .map(|samples| self.route(buffers, &samples))
            .unwrap_or_default()
    }
}
