// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use futures::{Stream, StreamExt};
use std::time::Duration;
use thingstream::ThingStream;
use thingstream_core::ConnectionState;
use tokio::time::{sleep, timeout, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(2);

pub async fn assert_no_element_emitted<S, T>(stream: &mut S, timeout_ms: u64)
where
    S: Stream<Item = T> + Unpin,
{
    tokio::select! {
        _item = stream.next() => {
            panic!("Unexpected element emitted, expected no output.");
        }
        () = sleep(Duration::from_millis(timeout_ms)) => {}
    }
}

/// Polls `condition` until it holds. Panics after `timeout_ms`.
pub async fn wait_until<F>(condition: F, timeout_ms: u64)
where
    F: Fn() -> bool,
{
    let deadline = Instant::now() + Duration::from_millis(timeout_ms);
    while !condition() {
        assert!(
            Instant::now() < deadline,
            "condition not met within {timeout_ms}ms"
        );
        sleep(POLL_INTERVAL).await;
    }
}

pub async fn wait_for_state(stream: &ThingStream, expected: ConnectionState, timeout_ms: u64) {
    let reached = timeout(Duration::from_millis(timeout_ms), async {
        while stream.state() != expected {
            sleep(POLL_INTERVAL).await;
        }
    })
    .await;
    assert!(
        reached.is_ok(),
        "stream stayed {} instead of reaching {}",
        stream.state(),
        expected
    );
}

/// Waits until `sensor_id` holds `count` readings.
pub async fn wait_for_readings(stream: &ThingStream, sensor_id: &str, count: usize, timeout_ms: u64) {
    wait_until(
        || stream.snapshot(sensor_id).is_some_and(|snapshot| snapshot.len() >= count),
        timeout_ms,
    )
    .await;
}
