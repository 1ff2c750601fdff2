// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use futures::StreamExt;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use thingstream::{
    ConnectionState, MissingDataResult, StreamConfig, StreamEvent, ThingStream, TimeRange,
};
use thingstream_test_utils::fixtures::{profile, sample_frame, thing_alpha};
use thingstream_test_utils::helpers::{wait_for_readings, wait_for_state, wait_until};
use thingstream_test_utils::{EventRecorder, MockTransport};

const TIMEOUT_MS: u64 = 1_000;

fn stream() -> (ThingStream, thingstream_test_utils::MockController) {
    let (transport, controller) = MockTransport::pair();
    (
        ThingStream::new(profile(), transport, StreamConfig::default()),
        controller,
    )
}

#[tokio::test]
async fn test_connect_streams_and_notifies() -> anyhow::Result<()> {
    // Arrange
    let (stream, controller) = stream();
    let recorder = EventRecorder::new();
    stream.subscribe_to_connection(recorder.callback());

    // Act
    stream.connect();
    wait_for_state(&stream, ConnectionState::Streaming, TIMEOUT_MS).await;

    // Assert
    assert!(stream.is_streaming());
    assert_eq!(recorder.states(), vec![ConnectionState::Streaming]);
    assert_eq!(controller.open_count(), 1);
    assert_eq!(controller.last_thing(), Some(thing_alpha()));
    Ok(())
}

#[tokio::test]
async fn test_failed_open_reports_errored_through_same_channel() -> anyhow::Result<()> {
    // Arrange
    let (stream, controller) = stream();
    let recorder = EventRecorder::new();
    stream.subscribe_to_connection(recorder.callback());
    controller.fail_next_open("handshake refused");

    // Act
    stream.connect();
    wait_for_state(&stream, ConnectionState::Errored, TIMEOUT_MS).await;

    // Assert
    let events = recorder.events();
    let Some(StreamEvent::Connection(event)) = events.first() else {
        panic!("expected a connection event, got {events:?}");
    };
    assert!(!event.is_success());
    assert!(event
        .error
        .as_deref()
        .is_some_and(|error| error.contains("handshake refused")));
    assert!(!stream.is_streaming());
    Ok(())
}

#[tokio::test]
async fn test_connect_after_error_starts_new_session() -> anyhow::Result<()> {
    let (stream, controller) = stream();
    controller.fail_next_open("busy");
    stream.connect();
    wait_for_state(&stream, ConnectionState::Errored, TIMEOUT_MS).await;

    stream.connect();
    wait_for_state(&stream, ConnectionState::Streaming, TIMEOUT_MS).await;

    assert_eq!(controller.open_count(), 2);
    Ok(())
}

#[tokio::test]
async fn test_connect_while_connecting_is_noop() -> anyhow::Result<()> {
    let (stream, controller) = stream();
    controller.delay_open(Duration::from_millis(50));

    stream.connect();
    stream.connect();
    assert_eq!(stream.state(), ConnectionState::Connecting);
    wait_for_state(&stream, ConnectionState::Streaming, TIMEOUT_MS).await;
    stream.connect();

    assert_eq!(controller.open_count(), 1);
    Ok(())
}

#[tokio::test]
async fn test_stop_notifies_once() -> anyhow::Result<()> {
    // Arrange
    let (stream, _controller) = stream();
    let recorder = EventRecorder::new();
    stream.subscribe_to_stop(recorder.callback());
    stream.connect();
    wait_for_state(&stream, ConnectionState::Streaming, TIMEOUT_MS).await;

    // Act
    stream.stop();
    stream.stop();

    // Assert
    assert_eq!(stream.state(), ConnectionState::Stopped);
    assert_eq!(recorder.stop_count(), 1);
    Ok(())
}

#[tokio::test]
async fn test_stop_from_idle_still_notifies() -> anyhow::Result<()> {
    let (stream, controller) = stream();
    let recorder = EventRecorder::new();
    stream.subscribe_to_stop(recorder.callback());

    stream.stop();

    assert_eq!(stream.state(), ConnectionState::Stopped);
    assert_eq!(recorder.stop_count(), 1);
    assert_eq!(controller.open_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_messages_after_stop_are_never_applied() -> anyhow::Result<()> {
    // Arrange
    let (stream, controller) = stream();
    stream.connect();
    wait_for_state(&stream, ConnectionState::Streaming, TIMEOUT_MS).await;
    controller.send_json(&sample_frame(&[("sensorA", 10, 1.0)]));
    wait_for_readings(&stream, "sensorA", 1, TIMEOUT_MS).await;

    // Act
    stream.stop();
    controller.send_json(&sample_frame(&[("sensorA", 20, 2.0)]));
    tokio::time::sleep(Duration::from_millis(30)).await;

    // Assert
    assert_eq!(stream.snapshot("sensorA").unwrap().len(), 1);
    assert_eq!(stream.stats().accepted, 1);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_buffer_is_frozen_once_stop_callbacks_run() -> anyhow::Result<()> {
    // Arrange
    let (stream, controller) = stream();
    stream.connect();
    wait_for_state(&stream, ConnectionState::Streaming, TIMEOUT_MS).await;

    let reader = stream.reader("sensorA").unwrap();
    let seen_at_stop = Arc::new(Mutex::new(None));
    stream.subscribe_to_stop({
        let reader = reader.clone();
        let seen_at_stop = seen_at_stop.clone();
        move |_| *seen_at_stop.lock() = Some(reader.load().len())
    });

    let flood = std::thread::spawn({
        let controller = controller.clone();
        move || {
            for ts in 1..=5_000u64 {
                let frame = sample_frame(&[("sensorA", ts, ts as f64)]);
                if !controller.send_json(&frame) {
                    break;
                }
            }
        }
    });
    wait_for_readings(&stream, "sensorA", 10, TIMEOUT_MS).await;

    // Act
    stream.stop();
    flood.join().unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    // Assert
    let seen = seen_at_stop.lock().expect("stop callback ran");
    assert_eq!(reader.load().len(), seen);
    Ok(())
}

#[tokio::test]
async fn test_disconnect_opens_gap_and_reconnect_counts_cycle() -> anyhow::Result<()> {
    // Arrange
    let (stream, controller) = stream();
    stream.connect();
    wait_for_state(&stream, ConnectionState::Streaming, TIMEOUT_MS).await;
    controller.send_json(&sample_frame(&[("sensorA", 100, 1.0)]));
    wait_for_readings(&stream, "sensorA", 1, TIMEOUT_MS).await;

    // Act
    let worth_before = stream.worth_getting_historical_data();
    controller.disconnect("antenna");
    wait_for_state(&stream, ConnectionState::Errored, TIMEOUT_MS).await;
    let worth_while_down = stream.worth_getting_historical_data();
    controller.reconnect();
    wait_for_state(&stream, ConnectionState::Streaming, TIMEOUT_MS).await;

    // Assert
    assert!(!worth_before);
    assert!(!worth_while_down);
    assert!(stream.worth_getting_historical_data());
    assert_eq!(stream.supervisor().reconnect_cycles(), 1);
    assert_eq!(
        stream.snapshot("sensorA").unwrap().gaps.as_slice(),
        &[TimeRange::open(100)]
    );
    assert!(stream.snapshot("sensorB").unwrap().gaps.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_cycle_counts_again_while_gap_is_still_open() -> anyhow::Result<()> {
    // Arrange
    let (stream, controller) = stream();
    stream.connect();
    wait_for_state(&stream, ConnectionState::Streaming, TIMEOUT_MS).await;
    controller.send_json(&sample_frame(&[("sensorA", 10, 1.0), ("sensorA", 20, 2.0)]));
    wait_for_readings(&stream, "sensorA", 2, TIMEOUT_MS).await;
    controller.disconnect("antenna");
    wait_for_state(&stream, ConnectionState::Errored, TIMEOUT_MS).await;
    controller.reconnect();
    wait_for_state(&stream, ConnectionState::Streaming, TIMEOUT_MS).await;
    let worth_first = stream.worth_getting_historical_data();
    stream.push_missing_data(MissingDataResult::new(Vec::new()));
    let worth_after_reconcile = stream.worth_getting_historical_data();

    // Act
    controller.disconnect("antenna");
    wait_for_state(&stream, ConnectionState::Errored, TIMEOUT_MS).await;
    controller.reconnect();
    wait_for_state(&stream, ConnectionState::Streaming, TIMEOUT_MS).await;

    // Assert
    assert!(worth_first);
    assert!(!worth_after_reconcile);
    assert_eq!(
        stream.snapshot("sensorA").unwrap().gaps.as_slice(),
        &[TimeRange::open(20)]
    );
    assert!(stream.worth_getting_historical_data());
    assert_eq!(stream.supervisor().reconnect_cycles(), 1);
    Ok(())
}

#[tokio::test]
async fn test_cycle_before_any_data_counts() -> anyhow::Result<()> {
    let (stream, controller) = stream();
    stream.connect();
    wait_for_state(&stream, ConnectionState::Streaming, TIMEOUT_MS).await;

    controller.disconnect("antenna");
    wait_for_state(&stream, ConnectionState::Errored, TIMEOUT_MS).await;
    controller.reconnect();
    wait_for_state(&stream, ConnectionState::Streaming, TIMEOUT_MS).await;

    assert!(stream.snapshot("sensorA").unwrap().gaps.is_empty());
    assert_eq!(stream.supervisor().reconnect_cycles(), 1);
    assert!(stream.worth_getting_historical_data());
    Ok(())
}

#[tokio::test]
async fn test_messages_while_disconnected_are_dropped() -> anyhow::Result<()> {
    // Arrange
    let (stream, controller) = stream();
    stream.connect();
    wait_for_state(&stream, ConnectionState::Streaming, TIMEOUT_MS).await;
    controller.send_json(&sample_frame(&[("sensorA", 10, 1.0), ("sensorA", 20, 2.0)]));
    wait_for_readings(&stream, "sensorA", 2, TIMEOUT_MS).await;
    controller.disconnect("antenna");
    wait_for_state(&stream, ConnectionState::Errored, TIMEOUT_MS).await;

    // Act
    controller.send_json(&sample_frame(&[("sensorA", 30, 3.0)]));
    wait_until(|| stream.stats().dropped_while_disconnected == 1, TIMEOUT_MS).await;

    // Assert
    let snapshot = stream.snapshot("sensorA").unwrap();
    assert_eq!(stream.state(), ConnectionState::Errored);
    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot.watermark, Some(20));
    assert_eq!(snapshot.gaps.as_slice(), &[TimeRange::open(20)]);
    assert_eq!(stream.stats().accepted, 2);
    Ok(())
}

#[tokio::test]
async fn test_closed_transport_errors_stream_and_ends_session() -> anyhow::Result<()> {
    let (stream, controller) = stream();
    stream.connect();
    wait_for_state(&stream, ConnectionState::Streaming, TIMEOUT_MS).await;
    controller.send_json(&sample_frame(&[("sensorB", 7, 0.7)]));
    wait_for_readings(&stream, "sensorB", 1, TIMEOUT_MS).await;

    controller.close();
    wait_for_state(&stream, ConnectionState::Errored, TIMEOUT_MS).await;
    wait_until(|| !stream.supervisor().has_session(), TIMEOUT_MS).await;

    assert_eq!(
        stream.snapshot("sensorB").unwrap().gaps.as_slice(),
        &[TimeRange::open(7)]
    );
    Ok(())
}

#[tokio::test]
async fn test_restart_after_stop_records_gap() -> anyhow::Result<()> {
    let (stream, controller) = stream();
    stream.connect();
    wait_for_state(&stream, ConnectionState::Streaming, TIMEOUT_MS).await;
    controller.send_json(&sample_frame(&[("sensorA", 10, 1.0)]));
    wait_for_readings(&stream, "sensorA", 1, TIMEOUT_MS).await;
    stream.stop();

    stream.connect();
    wait_for_state(&stream, ConnectionState::Streaming, TIMEOUT_MS).await;

    assert_eq!(controller.open_count(), 2);
    assert_eq!(
        stream.snapshot("sensorA").unwrap().gaps.as_slice(),
        &[TimeRange::open(10)]
    );
    assert!(stream.worth_getting_historical_data());
    Ok(())
}

#[tokio::test]
async fn test_unsubscribed_callbacks_are_not_called() -> anyhow::Result<()> {
    // Arrange
    let (stream, _controller) = stream();
    let kept = EventRecorder::new();
    let removed = EventRecorder::new();
    stream.subscribe_to_connection(kept.callback());
    let id = stream.subscribe_to_connection(removed.callback());

    // Act
    stream.unsubscribe_from_connection(id);
    stream.unsubscribe_from_connection(id);
    stream.unsubscribe_from_stop(id);
    stream.connect();
    wait_for_state(&stream, ConnectionState::Streaming, TIMEOUT_MS).await;

    // Assert
    assert_eq!(kept.len(), 1);
    assert!(removed.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_connection_events_stream() -> anyhow::Result<()> {
    let (stream, controller) = stream();
    let mut events = Box::pin(stream.connection_events());

    stream.connect();
    let first = events.next().await;
    wait_for_state(&stream, ConnectionState::Streaming, TIMEOUT_MS).await;
    controller.disconnect("gone");
    let second = events.next().await;

    assert!(matches!(
        first,
        Some(StreamEvent::Connection(ref event)) if event.state == ConnectionState::Streaming
    ));
    assert!(matches!(
        second,
        Some(StreamEvent::Connection(ref event)) if event.state == ConnectionState::Errored
    ));
    Ok(())
}

#[tokio::test]
async fn test_stop_callback_may_call_back_into_stream() -> anyhow::Result<()> {
    let (stream, _controller) = stream();
    let stream = Arc::new(stream);
    let observed = Arc::new(Mutex::new(None));
    stream.subscribe_to_stop({
        let stream = Arc::downgrade(&stream);
        let observed = observed.clone();
        move |_| {
            if let Some(stream) = stream.upgrade() {
                *observed.lock() = Some((stream.state(), stream.is_streaming()));
                stream.stop();
            }
        }
    });

    stream.stop();

    assert_eq!(*observed.lock(), Some((ConnectionState::Stopped, false)));
    Ok(())
}

#[test]
fn test_connect_without_runtime_errors() {
    let (stream, controller) = stream();
    let recorder = EventRecorder::new();
    stream.subscribe_to_connection(recorder.callback());

    stream.connect();

    assert_eq!(stream.state(), ConnectionState::Errored);
    assert_eq!(recorder.states(), vec![ConnectionState::Errored]);
    assert_eq!(controller.open_count(), 0);
}

#[tokio::test]
async fn test_drop_tears_down_without_stop_event() -> anyhow::Result<()> {
    // Arrange
    let (stream, controller) = stream();
    let recorder = EventRecorder::new();
    stream.subscribe_to_stop(recorder.callback());
    stream.connect();
    wait_for_state(&stream, ConnectionState::Streaming, TIMEOUT_MS).await;
    let reader = stream.reader("sensorA").unwrap();

    // Act
    drop(stream);
    wait_until(|| !controller.is_open(), TIMEOUT_MS).await;
    controller.send_json(&sample_frame(&[("sensorA", 10, 1.0)]));

    // Assert
    assert_eq!(recorder.stop_count(), 0);
    assert!(reader.load().is_empty());
    Ok(())
}
