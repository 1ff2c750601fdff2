// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use criterion::{BenchmarkId, Criterion, Throughput};
use std::hint::black_box;
use std::sync::Arc;
use thingstream::{IngestPipeline, IngestStats, JsonDecoder, RetentionPolicy};
use thingstream_buffer::BufferSet;
use thingstream_core::SensorId;

fn sensors(count: usize) -> Vec<SensorId> {
    (0..count).map(|i| SensorId::new(format!("sensor{i}"))).collect()
}

/// One `{"ts", "values"}` row per timestamp, every sensor present.
fn row_frames(frames: u64, sensors: &[SensorId]) -> Vec<Vec<u8>> {
    (0..frames)
        .map(|i| {
            let values: Vec<String> = sensors
                .iter()
                .map(|sensor| format!("\"{sensor}\": {}.5", i % 100))
                .collect();
            format!("{{\"ts\": {}, \"values\": {{{}}}}}", i * 10, values.join(", ")).into_bytes()
        })
        .collect()
}

pub fn bench_ingest_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("ingest_pipeline");
    let frames = 1_000u64;

    for &sensor_count in &[1usize, 8, 32] {
        let sensors = sensors(sensor_count);
        let payloads = row_frames(frames, &sensors);
        group.throughput(Throughput::Elements(frames * sensor_count as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("s{sensor_count}")),
            &payloads,
            |bencher, payloads| {
                bencher.iter(|| {
                    let pipeline = IngestPipeline::new(
                        Arc::new(JsonDecoder),
                        250,
                        Arc::new(IngestStats::default()),
                    );
                    let mut buffers = BufferSet::new(sensors.clone(), RetentionPolicy::default());
                    for payload in payloads {
                        black_box(pipeline.ingest_message(&mut buffers, payload));
                    }
                });
            },
        );
    }

    group.finish();
}
