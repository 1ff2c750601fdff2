// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use std::sync::Arc;
use thingstream::{
    IngestStats, MissingDataResult, MissingRange, ReconciliationEngine, RetentionPolicy, Sample,
    TimeRange,
};
use thingstream_buffer::BufferSet;
use thingstream_core::{Reading, SensorId};
use thingstream_test_utils::fixtures::{samples, sensor_a, sensor_b, thing_alpha};

fn engine() -> (ReconciliationEngine, Arc<IngestStats>) {
    let stats = Arc::new(IngestStats::default());
    (ReconciliationEngine::new(stats.clone()), stats)
}

/// Live data 10, 20, a drop, then 50 on sensorA. sensorB saw 10 and the same drop.
fn gapped_buffers() -> BufferSet {
    let mut buffers = BufferSet::new([sensor_a(), sensor_b()], RetentionPolicy::default());
    let a = buffers.get_mut("sensorA").unwrap();
    a.ingest(Reading::new(10, 1.0), 0);
    a.ingest(Reading::new(20, 2.0), 0);
    buffers.get_mut("sensorB").unwrap().ingest(Reading::new(10, 0.1), 0);
    buffers.mark_disconnected();
    buffers
        .get_mut("sensorA")
        .unwrap()
        .ingest(Reading::new(50, 5.0), 0);
    buffers.publish();
    buffers
}

fn timestamps(buffers: &BufferSet, sensor_id: &str) -> Vec<u64> {
    buffers
        .get(sensor_id)
        .unwrap()
        .iter()
        .map(|reading| reading.timestamp)
        .collect()
}

#[test]
fn test_request_lists_every_gap_in_sensor_order() {
    let (engine, _stats) = engine();
    let buffers = gapped_buffers();

    let request = engine.missing_data_request(&thing_alpha(), &buffers);

    assert_eq!(request.thing_id, thing_alpha());
    assert_eq!(
        request.ranges,
        vec![
            MissingRange::new("sensorA", 20, Some(50)),
            MissingRange::new("sensorB", 10, None),
        ]
    );
    assert_eq!(request.for_sensor("sensorB").count(), 1);
}

#[test]
fn test_mixed_batch_is_partitioned_by_sensor() {
    // Arrange
    let (engine, stats) = engine();
    let mut buffers = gapped_buffers();
    let mut batch = samples("sensorA", &[(35, 3.5), (25, 2.5)]);
    batch.extend(samples("sensorB", &[(30, 0.3), (15, 0.15)]));
    batch.push(Sample::new("torque", 30, 1.0));

    // Act
    let report = engine.reconcile(&mut buffers, MissingDataResult::new(batch));

    // Assert
    assert_eq!(timestamps(&buffers, "sensorA"), vec![10, 20, 25, 35, 50]);
    assert_eq!(timestamps(&buffers, "sensorB"), vec![10, 15, 30]);
    assert_eq!(report.inserted, 4);
    assert_eq!(report.unknown_sensor, 1);
    assert_eq!(report.gaps_changed, 2);
    assert!(buffers.get("sensorA").unwrap().gaps().is_empty());
    assert_eq!(
        buffers.get("sensorB").unwrap().gaps().as_slice(),
        &[TimeRange::open(31)]
    );
    assert_eq!(stats.snapshot().reconciled_inserted, 4);
}

#[test]
fn test_partial_explicit_coverage_narrows_gap() {
    // Arrange
    let (engine, _stats) = engine();
    let mut buffers = BufferSet::new([sensor_a()], RetentionPolicy::default());
    let a = buffers.get_mut("sensorA").unwrap();
    a.ingest(Reading::new(100, 1.0), 0);
    a.mark_disconnected();
    a.ingest(Reading::new(500, 5.0), 0);
    let result = MissingDataResult::new(samples("sensorA", &[(120, 1.2), (280, 2.8)]))
        .with_covered(vec![MissingRange::new("sensorA", 100, Some(300))]);

    // Act
    engine.reconcile(&mut buffers, result);

    // Assert
    assert_eq!(
        buffers.get("sensorA").unwrap().gaps().as_slice(),
        &[TimeRange::bounded(300, 500)]
    );
}

#[test]
fn test_live_reading_survives_conflicting_fetch() {
    let (engine, stats) = engine();
    let mut buffers = gapped_buffers();

    let report = engine.reconcile(
        &mut buffers,
        MissingDataResult::new(samples("sensorA", &[(20, -2.0)])),
    );

    let kept = buffers.get("sensorA").unwrap().iter().nth(1).copied();
    assert_eq!(kept, Some(Reading::new(20, 2.0)));
    assert_eq!(report.conflicts.len(), 1);
    assert_eq!(report.conflicts[0].sensor_id, SensorId::new("sensorA"));
    assert_eq!(report.conflicts[0].fetched, -2.0);
    assert_eq!(stats.snapshot().reconciliation_conflicts, 1);
    assert_eq!(
        buffers.get("sensorA").unwrap().gaps().as_slice(),
        &[TimeRange::bounded(20, 50)],
        "a reading already held says nothing about the gap"
    );
}

#[test]
fn test_reconciling_twice_equals_reconciling_once() {
    // Arrange
    let (engine, _stats) = engine();
    let mut once = gapped_buffers();
    let mut twice = gapped_buffers();
    let result = MissingDataResult::new(samples("sensorA", &[(25, 2.5), (20, 7.0), (60, 6.0)]));

    // Act
    engine.reconcile(&mut once, result.clone());
    engine.reconcile(&mut twice, result.clone());
    let second = engine.reconcile(&mut twice, result);

    // Assert
    assert!(!second.changed());
    for sensor_id in ["sensorA", "sensorB"] {
        assert_eq!(
            once.get(sensor_id).unwrap().snapshot(),
            twice.get(sensor_id).unwrap().snapshot()
        );
    }
}

#[test]
fn test_non_finite_fetched_values_are_skipped() {
    let (engine, _stats) = engine();
    let mut buffers = gapped_buffers();

    let report = engine.reconcile(
        &mut buffers,
        MissingDataResult::new(samples("sensorA", &[(30, f64::INFINITY)])),
    );

    assert_eq!(report.non_finite, 1);
    assert_eq!(timestamps(&buffers, "sensorA"), vec![10, 20, 50]);
}

#[test]
fn test_result_round_trips_through_json() -> anyhow::Result<()> {
    let json = r#"{"samples": [{"sensor_id": "sensorA", "timestamp": 25, "value": 2.5}]}"#;

    let result: MissingDataResult = serde_json::from_str(json)?;

    assert_eq!(result.samples, vec![Sample::new("sensorA", 25, 2.5)]);
    assert!(result.covered.is_empty());
    Ok(())
}
