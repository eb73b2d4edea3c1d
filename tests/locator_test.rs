//! Integration tests for the Locator against an in-memory broker

use hpp_locator::{
    BindError, Capability, Locator, LocatorConfig, LocatorError, LocatorState, RemoteInterface,
};
use hpp_locator_interface::memory::{InMemoryBroker, MEMORY_KIND};
use hpp_locator_interface::{
    ChannelRegistry, NameComponent, NamingError, ObjectRef, TransportRegistry,
};
use std::sync::Arc;

const PORT: u16 = 2809;

/// Activate and bind all three objects on `host` under `suffix`
fn serve(broker: &InMemoryBroker, host: &str, port: u16, suffix: &str) {
    for capability in Capability::ALL {
        let key = format!("{}{}", capability.kind(), suffix);
        let object = broker.activate(host, capability.repository_id(), &key);
        broker
            .bind(host, port, capability.compound_name(suffix), object)
            .unwrap();
    }
}

fn locator(broker: &Arc<InMemoryBroker>) -> (Locator, Arc<ChannelRegistry>) {
    let registry = Arc::new(ChannelRegistry::new());
    let locator = Locator::with_transport(broker.transport(), registry.clone());
    (locator, registry)
}

fn bound_objects(locator: &Locator) -> Vec<Option<ObjectRef>> {
    Capability::ALL
        .iter()
        .map(|c| locator.remote(*c).map(|r| r.object().clone()))
        .collect()
}

#[tokio::test]
async fn test_connect_to_host_matches_canonical_connect() {
    let broker = InMemoryBroker::new();
    serve(&broker, "planner", PORT, "");

    let (mut short, _) = locator(&broker);
    short.connect_to("planner").await.unwrap();

    let (mut with_port, _) = locator(&broker);
    with_port.connect_to_port("planner", 2809).await.unwrap();

    let (mut canonical, _) = locator(&broker);
    canonical
        .connect(&LocatorConfig::new("planner").with_port(2809).with_namespace_suffix(""))
        .await
        .unwrap();

    assert_eq!(bound_objects(&short), bound_objects(&canonical));
    assert_eq!(bound_objects(&with_port), bound_objects(&canonical));
    assert!(bound_objects(&short).iter().all(Option::is_some));
}

#[tokio::test]
async fn test_connected_proxies_answer_ping() {
    let broker = InMemoryBroker::new();
    serve(&broker, "planner", PORT, "");
    let (mut locator, _) = locator(&broker);

    locator.connect_to("planner").await.unwrap();

    assert_eq!(locator.state(), LocatorState::Connected);
    assert!(locator.robot().unwrap().ping().await.unwrap());
    assert!(locator.problem().unwrap().ping().await.unwrap());
    assert!(locator.graph().unwrap().ping().await.unwrap());
}

#[tokio::test]
async fn test_unreachable_name_service_binds_nothing() {
    let broker = InMemoryBroker::new();
    serve(&broker, "planner", PORT, "");
    let (mut locator, registry) = locator(&broker);

    let result = locator.connect_to("elsewhere").await;

    assert!(matches!(
        result,
        Err(LocatorError::NameServiceUnreachable { ref host, port: 2809, .. }) if host == "elsewhere"
    ));
    assert_eq!(locator.state(), LocatorState::Failed);
    assert!(locator.robot().is_none());
    assert!(locator.problem().is_none());
    assert!(locator.graph().is_none());
    assert_eq!(registry.lease_count(MEMORY_KIND), 0);
}

#[tokio::test]
async fn test_missing_graph_fails_only_graph() {
    let broker = InMemoryBroker::new();
    serve(&broker, "planner", PORT, "");
    broker.unbind("planner", PORT, &Capability::Graph.compound_name(""));
    let (mut locator, registry) = locator(&broker);

    let err = locator.connect_to("planner").await.unwrap_err();

    assert_eq!(err.failed_capabilities(), vec![Capability::Graph]);
    let failure = err.failure_for(Capability::Graph).unwrap();
    assert_eq!(failure.name, Capability::Graph.compound_name(""));
    assert!(matches!(
        failure.reason,
        BindError::Naming(NamingError::NotFound(_))
    ));

    assert_eq!(locator.state(), LocatorState::Failed);
    assert!(locator.robot().is_some());
    assert!(locator.problem().is_some());
    assert!(locator.graph().is_none());
    // Surviving proxies keep the channel registered
    assert_eq!(registry.lease_count(MEMORY_KIND), 1);
}

#[tokio::test]
async fn test_nothing_bound_releases_channel() {
    let broker = InMemoryBroker::new();
    broker.add_name_service("planner", PORT);
    let (mut locator, registry) = locator(&broker);

    let err = locator.connect_to("planner").await.unwrap_err();

    assert_eq!(err.failed_capabilities(), Capability::ALL.to_vec());
    assert!(err.is_fatal());
    assert!(registry.registered(MEMORY_KIND).is_none());
}

#[tokio::test]
async fn test_namespace_suffix_selects_root() {
    let broker = InMemoryBroker::new();
    serve(&broker, "planner", PORT, "");
    serve(&broker, "planner", PORT, "-test");
    let (mut locator, _) = locator(&broker);

    locator
        .connect(&LocatorConfig::new("planner").with_namespace_suffix("-test"))
        .await
        .unwrap();

    let graph = locator.graph().unwrap();
    assert_eq!(graph.object().object_key, "graph-test");

    let root = Capability::Graph.compound_name("-test");
    assert_eq!(root.first(), Some(&NameComponent::new("hpp-test", "corbaserver")));
}

#[tokio::test]
async fn test_reconnect_replaces_all_proxies() {
    let broker = InMemoryBroker::new();
    serve(&broker, "host-a", PORT, "");
    serve(&broker, "host-b", PORT, "");
    let (mut locator, registry) = locator(&broker);

    locator.connect_to("host-a").await.unwrap();
    let first = bound_objects(&locator);

    locator.connect_to("host-b").await.unwrap();
    let second = bound_objects(&locator);

    for (a, b) in first.iter().zip(&second) {
        let (a, b) = (a.as_ref().unwrap(), b.as_ref().unwrap());
        assert_eq!(a.endpoint, "memory://host-a");
        assert_eq!(b.endpoint, "memory://host-b");
    }
    assert_eq!(registry.lease_count(MEMORY_KIND), 1);
}

#[tokio::test]
async fn test_failed_reconnect_clears_previous_proxies() {
    let broker = InMemoryBroker::new();
    serve(&broker, "planner", PORT, "");
    let (mut locator, _) = locator(&broker);

    locator.connect_to("planner").await.unwrap();
    assert!(locator.connect_to("nowhere").await.is_err());

    assert!(bound_objects(&locator).iter().all(Option::is_none));
}

#[tokio::test]
async fn test_wrong_type_is_a_resolution_failure() {
    let broker = InMemoryBroker::new();
    serve(&broker, "planner", PORT, "");
    let impostor = broker.activate("planner", Capability::Problem.repository_id(), "impostor");
    broker
        .bind("planner", PORT, Capability::Robot.compound_name(""), impostor)
        .unwrap();
    let (mut locator, _) = locator(&broker);

    let err = locator.connect_to("planner").await.unwrap_err();

    let failure = err.failure_for(Capability::Robot).unwrap();
    assert_eq!(
        failure.reason,
        BindError::WrongCapability {
            expected: Capability::Robot.repository_id(),
            actual: Capability::Problem.repository_id().to_string(),
        }
    );
    assert!(locator.robot().is_none());
    assert!(locator.graph().is_some());
}

#[tokio::test]
async fn test_untyped_reference_checked_remotely() {
    let broker = InMemoryBroker::new();
    serve(&broker, "planner", PORT, "");
    let graph = broker.activate("planner", Capability::Graph.repository_id(), "untyped-graph");
    let untyped = ObjectRef::untyped(graph.endpoint.clone(), graph.object_key.clone());
    broker
        .bind("planner", PORT, Capability::Graph.compound_name(""), untyped.clone())
        .unwrap();
    let (mut locator, _) = locator(&broker);

    locator.connect_to("planner").await.unwrap();

    let proxy = locator.graph().unwrap();
    assert_eq!(proxy.object(), &untyped);
    assert_eq!(proxy.repository_id(), Capability::Graph.repository_id());
    assert!(broker
        .invocations()
        .iter()
        .any(|call| call.operation == "_is_a" && call.target == untyped));
}

#[tokio::test]
async fn test_transport_failure_is_unavailable() {
    let broker = InMemoryBroker::new();
    serve(&broker, "planner", PORT, "");
    let registry = Arc::new(ChannelRegistry::new());
    let mut locator =
        Locator::with_transport(broker.failing_transport("no network stack"), registry.clone());

    let err = locator.connect_to("planner").await.unwrap_err();

    assert!(matches!(err, LocatorError::TransportUnavailable(_)));
    assert_eq!(err.exit_code(), 2);
    assert!(locator.robot().is_none());
    assert!(registry.kinds().is_empty());
}

#[tokio::test]
async fn test_locators_share_one_registered_channel() {
    let broker = InMemoryBroker::new();
    serve(&broker, "planner", PORT, "");
    let transport = broker.transport();
    let registry = Arc::new(ChannelRegistry::new());

    let mut first = Locator::with_transport(transport.clone(), registry.clone());
    let mut second = Locator::with_transport(transport.clone(), registry.clone());
    first.connect_to("planner").await.unwrap();
    second.connect_to("planner").await.unwrap();

    assert_eq!(transport.channels_opened(), 1);
    assert_eq!(registry.lease_count(MEMORY_KIND), 2);
    assert!(Arc::ptr_eq(
        first.channel().unwrap(),
        second.channel().unwrap()
    ));

    first.disconnect();
    assert_eq!(registry.lease_count(MEMORY_KIND), 1);
    assert!(second.robot().unwrap().ping().await.unwrap());

    drop(second);
    assert!(registry.registered(MEMORY_KIND).is_none());
}

#[tokio::test]
async fn test_typed_calls_after_connect() {
    let broker = InMemoryBroker::new();
    serve(&broker, "planner", PORT, "");
    let (mut locator, _) = locator(&broker);
    locator.connect_to("planner").await.unwrap();

    let robot = locator.robot().unwrap();
    let echoed: Vec<String> = robot.invoke("echo", ("ur5", "box")).await.unwrap();
    assert_eq!(echoed, vec!["ur5".to_string(), "box".to_string()]);

    // Plain activations carry no servant
    let err = robot.create("ur5").await.unwrap_err();
    assert!(matches!(
        LocatorError::from(err),
        LocatorError::Invocation(_)
    ));
}
