//! Integration tests for channel registration across threads

use hpp_locator_interface::memory::{InMemoryBroker, MEMORY_KIND};
use hpp_locator_interface::{ChannelRegistry, ClientChannel, NamingContext, TransportRegistry};
use std::sync::Arc;
use std::thread;

#[test]
fn test_concurrent_acquire_opens_one_channel() {
    let broker = InMemoryBroker::new();
    let transport = broker.transport();
    let registry = Arc::new(ChannelRegistry::new());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let registry = registry.clone();
            let transport = transport.clone();
            thread::spawn(move || registry.acquire(&transport).map(|_| ()))
        })
        .collect();

    for handle in handles {
        handle.join().unwrap().unwrap();
    }

    assert_eq!(transport.channels_opened(), 1);
    assert_eq!(registry.lease_count(MEMORY_KIND), 8);

    for _ in 0..8 {
        assert!(registry.release(MEMORY_KIND));
    }
    assert!(registry.registered(MEMORY_KIND).is_none());
}

#[test]
fn test_reregistration_opens_fresh_channel() {
    let broker = InMemoryBroker::new();
    let transport = broker.transport();
    let registry = ChannelRegistry::new();

    let first = registry.acquire(&transport).unwrap();
    registry.release(MEMORY_KIND);
    let second = registry.acquire(&transport).unwrap();

    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(transport.channels_opened(), 2);
}

#[tokio::test]
async fn test_registered_channel_resolves_names() {
    let broker = InMemoryBroker::new();
    let object = broker.activate("planner", "IDL:hpp/corbaserver/manipulation/Problem:1.0", "problem");
    let name = "hpp.corbaserver/manipulation.problem".parse().unwrap();
    broker.bind("planner", 2809, name, object.clone()).unwrap();

    let registry = ChannelRegistry::new();
    let channel = registry.acquire(&broker.transport()).unwrap();
    assert_eq!(channel.kind(), MEMORY_KIND);

    let root = channel.root_context("planner", 2809).await.unwrap();
    let resolved = root
        .resolve(&"hpp.corbaserver/manipulation.problem".parse().unwrap())
        .await
        .unwrap();
    assert_eq!(resolved, object);
}
