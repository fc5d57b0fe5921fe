//! Fan-out properties of the conversation bus.

use std::sync::Arc;

use convoy::bus::{ConversationBus, WILDCARD};
use convoy::types::EventEnvelope;
use pretty_assertions::assert_eq;

fn bus() -> Arc<ConversationBus> {
    Arc::new(ConversationBus::new(64))
}

#[tokio::test]
async fn sink_receives_exactly_the_envelopes_published_while_subscribed() {
    let bus = bus();

    bus.publish(&EventEnvelope::message("conv-1", "before"));

    let mut sub = bus.subscribe("conv-1");
    bus.publish(&EventEnvelope::message("conv-1", "during-1"));
    bus.publish(&EventEnvelope::message("conv-1", "during-2"));

    bus.unsubscribe("conv-1", sub.sink_id());
    bus.publish(&EventEnvelope::message("conv-1", "after"));

    assert_eq!(sub.recv().await.unwrap().content, "during-1");
    assert_eq!(sub.recv().await.unwrap().content, "during-2");
    assert!(sub.recv().await.is_none());
}

#[tokio::test]
async fn every_subscriber_of_a_conversation_sees_publish_order() {
    let bus = bus();
    let mut first = bus.subscribe("conv-1");
    let mut second = bus.subscribe("conv-1");

    for i in 0..20 {
        bus.publish(&EventEnvelope::message("conv-1", format!("m{i}")));
    }

    for i in 0..20 {
        assert_eq!(first.recv().await.unwrap().content, format!("m{i}"));
        assert_eq!(second.recv().await.unwrap().content, format!("m{i}"));
    }
}

#[tokio::test]
async fn churn_does_not_corrupt_other_conversations() {
    let bus = bus();
    let mut steady = bus.subscribe("steady");

    // subscribe/unsubscribe churn on other conversations, concurrent with
    // publishes to the steady one
    let publisher = {
        let bus = Arc::clone(&bus);
        tokio::spawn(async move {
            for i in 0..100 {
                bus.publish(&EventEnvelope::message("steady", format!("m{i}")));
                tokio::task::yield_now().await;
            }
        })
    };
    let churner = {
        let bus = Arc::clone(&bus);
        tokio::spawn(async move {
            for i in 0..100 {
                let conversation = format!("churn-{}", i % 7);
                let sub = bus.subscribe(&conversation);
                bus.publish(&EventEnvelope::message(&conversation, "noise"));
                drop(sub);
                tokio::task::yield_now().await;
            }
        })
    };

    publisher.await.unwrap();
    churner.await.unwrap();

    for i in 0..100 {
        assert_eq!(steady.recv().await.unwrap().content, format!("m{i}"));
    }
    // all churn groups were pruned on drop
    assert_eq!(bus.group_count(), 1);
}

#[tokio::test]
async fn wildcard_sink_sees_all_conversations_in_publish_order() {
    let bus = bus();
    let mut all = bus.subscribe(WILDCARD);
    let mut only_a = bus.subscribe("conv-a");

    bus.publish(&EventEnvelope::message("conv-a", "a1"));
    bus.publish(&EventEnvelope::message("conv-b", "b1"));
    bus.publish(&EventEnvelope::message("conv-a", "a2"));

    assert_eq!(all.recv().await.unwrap().content, "a1");
    assert_eq!(all.recv().await.unwrap().content, "b1");
    assert_eq!(all.recv().await.unwrap().content, "a2");

    assert_eq!(only_a.recv().await.unwrap().content, "a1");
    assert_eq!(only_a.recv().await.unwrap().content, "a2");
    assert!(only_a.try_recv().is_none());
}

#[tokio::test]
async fn metadata_round_trips_through_the_bus_unchanged() {
    let bus = bus();
    let mut sub = bus.subscribe("conv-1");

    let published = EventEnvelope::message("conv-1", "payload")
        .with_meta("iteration", 3)
        .with_meta("tool", "search");
    bus.publish(&published);

    let received = sub.recv().await.unwrap();
    assert_eq!(received, published);
    assert_eq!(received.metadata["iteration"], 3);
    assert_eq!(received.metadata["tool"], "search");
}

#[tokio::test]
async fn unsubscribing_a_never_registered_sink_is_harmless() {
    let bus = bus();
    let mut sub = bus.subscribe("conv-1");

    bus.unsubscribe("conv-1", uuid::Uuid::new_v4());
    bus.unsubscribe("other", uuid::Uuid::new_v4());

    bus.publish(&EventEnvelope::message("conv-1", "still here"));
    assert_eq!(sub.recv().await.unwrap().content, "still here");
}
