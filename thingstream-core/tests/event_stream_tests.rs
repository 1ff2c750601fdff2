// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use futures::StreamExt;
use thingstream_core::{
    ConnectionEvent, ConnectionState, EventCategory, StopEvent, StreamEvent, SubscriptionRegistry,
    ThingId,
};

#[tokio::test]
async fn test_event_stream_receives_only_later_events() -> anyhow::Result<()> {
    // Arrange
    let registry: SubscriptionRegistry = SubscriptionRegistry::new();
    let thing = ThingId::new("car-7");
    registry.publish(
        EventCategory::Connection,
        &ConnectionEvent::streaming(thing.clone()).into(),
    );

    // Act
    let mut stream = Box::pin(registry.events(EventCategory::Connection));
    registry.publish(
        EventCategory::Connection,
        &ConnectionEvent::errored(thing.clone(), "link down").into(),
    );

    // Assert
    let Some(StreamEvent::Connection(event)) = stream.next().await else {
        panic!("expected a connection event");
    };
    assert_eq!(event.state, ConnectionState::Errored);
    assert_eq!(event.error.as_deref(), Some("link down"));
    assert!(!event.is_success());
    assert_eq!(stream.pending(), 0);
    Ok(())
}

#[tokio::test]
async fn test_dropping_event_stream_unsubscribes() -> anyhow::Result<()> {
    let registry: SubscriptionRegistry = SubscriptionRegistry::new();

    let stream = registry.events(EventCategory::Stop);
    assert_eq!(registry.subscriber_count(EventCategory::Stop), 1);
    drop(stream);

    assert_eq!(registry.subscriber_count(EventCategory::Stop), 0);
    Ok(())
}

#[tokio::test]
async fn test_event_stream_ends_when_registry_is_gone() -> anyhow::Result<()> {
    let registry: SubscriptionRegistry = SubscriptionRegistry::new();
    let mut stream = Box::pin(registry.events(EventCategory::Stop));
    registry.publish(
        EventCategory::Stop,
        &StopEvent {
            thing_id: ThingId::new("car-7"),
        }
        .into(),
    );

    drop(registry);

    assert!(matches!(stream.next().await, Some(StreamEvent::Stop(_))));
    assert_eq!(stream.next().await, None);
    Ok(())
}
