/*!
 * Locator: bootstrap client for the manipulation service
 *
 * `connect` runs three steps in order: acquire a registered client channel,
 * obtain the root naming context of the naming service, then resolve and
 * check the robot, problem and graph objects. Every remote call is awaited
 * on the caller's task.
 */

use hpp_locator_connect::{GrpcTransport, GRPC_KIND};
use hpp_locator_interface::{
    ChannelRegistry, ClientChannel, NamingContext, NamingError, Transport, TransportRegistry,
};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::capability::Capability;
use crate::config::{LocatorConfig, TransportConfig, DEFAULT_NAME_SERVICE_PORT};
use crate::error::{LocatorError, ResolutionFailure, Result};
use crate::proxy::{
    narrow, BindError, GraphProxy, ProblemProxy, RemoteInterface, RemoteObject, RobotProxy,
};

/// Lifecycle of a `Locator`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocatorState {
    /// No connect attempted yet, or disconnected
    Unconnected,
    /// A connect call is in progress
    Connecting,
    /// All three proxies are bound
    Connected,
    /// The last connect failed; some proxies may still be bound
    Failed,
}

/// One registration lease on a client channel.
///
/// The lease is returned to the registry when dropped.
pub struct ChannelLease {
    registry: Arc<dyn TransportRegistry>,
    kind: String,
    channel: Arc<dyn ClientChannel>,
}

impl ChannelLease {
    /// Acquire the registered channel for `transport`, registering one if needed
    pub fn acquire(
        registry: Arc<dyn TransportRegistry>,
        transport: &dyn Transport,
    ) -> Result<Self> {
        let channel = registry.acquire(transport)?;
        Ok(Self {
            registry,
            kind: transport.kind().to_string(),
            channel,
        })
    }

    pub fn channel(&self) -> &Arc<dyn ClientChannel> {
        &self.channel
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }
}

impl Drop for ChannelLease {
    fn drop(&mut self) {
        debug!("Returning {} channel lease", self.kind);
        self.registry.release(&self.kind);
    }
}

impl fmt::Debug for ChannelLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelLease")
            .field("kind", &self.kind)
            .field("channel", &self.channel)
            .finish()
    }
}

/// Where a locator gets the transport for each connect
enum TransportSource {
    /// gRPC, built from the timeouts of each `LocatorConfig`
    Grpc,
    /// A caller-supplied transport, used as is
    Fixed(Arc<dyn Transport>),
}

/// Bootstrap client binding typed proxies to the manipulation service
///
/// # Example
///
/// ```rust,no_run
/// use hpp_locator::Locator;
///
/// # async fn example() -> Result<(), hpp_locator::LocatorError> {
/// let mut locator = Locator::new();
/// locator.connect_to("localhost").await?;
///
/// if let Some(robot) = locator.robot() {
///     robot.create("ur5").await?;
/// }
/// # Ok(())
/// # }
/// ```
pub struct Locator {
    transport: TransportSource,
    registry: Arc<dyn TransportRegistry>,
    state: LocatorState,
    config: Option<LocatorConfig>,
    lease: Option<ChannelLease>,
    robot: Option<RobotProxy>,
    problem: Option<ProblemProxy>,
    graph: Option<GraphProxy>,
}

impl Locator {
    /// Unconnected locator over gRPC and the process-wide registry
    pub fn new() -> Self {
        Self::with_registry(ChannelRegistry::global())
    }

    /// Unconnected locator over gRPC and `registry`.
    ///
    /// Each connect opens the gRPC transport with the timeouts of its
    /// `LocatorConfig::transport`.
    pub fn with_registry(registry: Arc<dyn TransportRegistry>) -> Self {
        Self::from_source(TransportSource::Grpc, registry)
    }

    /// Unconnected locator over any transport and registry.
    ///
    /// The transport is used as given; `LocatorConfig::transport` does not
    /// apply to it.
    pub fn with_transport(
        transport: impl Transport,
        registry: Arc<dyn TransportRegistry>,
    ) -> Self {
        Self::from_source(TransportSource::Fixed(Arc::new(transport)), registry)
    }

    fn from_source(transport: TransportSource, registry: Arc<dyn TransportRegistry>) -> Self {
        Self {
            transport,
            registry,
            state: LocatorState::Unconnected,
            config: None,
            lease: None,
            robot: None,
            problem: None,
            graph: None,
        }
    }

    /// Connect to the naming service on `host` at the default port, root namespace
    pub async fn connect_to(&mut self, host: &str) -> Result<()> {
        self.connect_to_port(host, DEFAULT_NAME_SERVICE_PORT).await
    }

    /// Connect to the naming service at `host:port`, root namespace
    pub async fn connect_to_port(&mut self, host: &str, port: u16) -> Result<()> {
        self.connect(&LocatorConfig::new(host).with_port(port))
            .await
    }

    /// Open the channel, reach the naming service and bind all three proxies.
    ///
    /// Any proxies and channel lease from an earlier call are dropped first.
    ///
    /// # Errors
    ///
    /// - `TransportUnavailable` if no channel could be registered
    /// - `NameServiceUnreachable` if the naming service did not answer
    /// - `NameResolutionFailed` listing every capability that could not be
    ///   bound; the others stay bound
    pub async fn connect(&mut self, config: &LocatorConfig) -> Result<()> {
        self.reset();

        if let Err(err) = config.validate() {
            self.state = LocatorState::Failed;
            return Err(err);
        }

        info!(
            "Connecting to name service at {}:{} (namespace hpp{})",
            config.host, config.port, config.namespace_suffix
        );
        self.state = LocatorState::Connecting;
        self.config = Some(config.clone());

        match self.establish(config).await {
            Ok(()) => {
                self.state = LocatorState::Connected;
                info!("Bound robot, problem and graph from {}", config.host);
                Ok(())
            }
            Err(err) => {
                self.state = LocatorState::Failed;
                warn!("Connect to {}:{} failed: {}", config.host, config.port, err);
                Err(err)
            }
        }
    }

    /// The transport to open the channel with for `config`
    fn transport_for(&self, config: &LocatorConfig) -> Arc<dyn Transport> {
        match &self.transport {
            TransportSource::Grpc => {
                Arc::new(GrpcTransport::new(config.transport.grpc_settings()))
            }
            TransportSource::Fixed(transport) => {
                if config.transport != TransportConfig::default() {
                    warn!(
                        "Transport timeouts ignored by the {} transport",
                        transport.kind()
                    );
                }
                transport.clone()
            }
        }
    }

    async fn establish(&mut self, config: &LocatorConfig) -> Result<()> {
        let transport = self.transport_for(config);
        let lease = ChannelLease::acquire(self.registry.clone(), transport.as_ref())?;
        debug!("Using {} channel", lease.kind());

        let root = lease
            .channel()
            .root_context(&config.host, config.port)
            .await
            .map_err(|err| name_service_unreachable(config, err))?;

        let channel = lease.channel().clone();
        self.lease = Some(lease);

        let suffix = config.namespace_suffix.as_str();
        let mut failures = Vec::new();

        match Self::bind::<RobotProxy>(root.as_ref(), &channel, suffix).await {
            Ok(proxy) => self.robot = Some(proxy),
            Err(failure) => failures.push(failure),
        }
        match Self::bind::<ProblemProxy>(root.as_ref(), &channel, suffix).await {
            Ok(proxy) => self.problem = Some(proxy),
            Err(failure) => failures.push(failure),
        }
        match Self::bind::<GraphProxy>(root.as_ref(), &channel, suffix).await {
            Ok(proxy) => self.graph = Some(proxy),
            Err(failure) => failures.push(failure),
        }

        if failures.is_empty() {
            return Ok(());
        }

        // Nothing bound: nothing left to carry calls for
        if failures.len() == Capability::ALL.len() {
            self.lease = None;
        }

        Err(LocatorError::NameResolutionFailed { failures })
    }

    /// Resolve the name of `T`'s capability and cast the result to `T`
    async fn bind<T: RemoteInterface>(
        root: &dyn NamingContext,
        channel: &Arc<dyn ClientChannel>,
        namespace_suffix: &str,
    ) -> std::result::Result<T, ResolutionFailure> {
        let capability = T::CAPABILITY;
        let name = capability.compound_name(namespace_suffix);
        debug!("Resolving {} at {}", capability, name);

        let object = match root.resolve(&name).await {
            Ok(object) => object,
            Err(err) => {
                warn!("Cannot resolve {}: {}", name, err);
                return Err(ResolutionFailure::new(
                    capability,
                    name,
                    BindError::Naming(err),
                ));
            }
        };

        debug!("{} resolved to {}", name, object);
        narrow::<T>(object, channel.clone()).await.map_err(|reason| {
            warn!("Cannot bind {} as {}: {}", name, capability, reason);
            ResolutionFailure::new(capability, name, reason)
        })
    }

    /// Drop all proxies and the channel lease
    pub fn disconnect(&mut self) {
        if self.state != LocatorState::Unconnected {
            info!("Disconnecting locator");
        }
        self.reset();
        self.config = None;
        self.state = LocatorState::Unconnected;
    }

    fn reset(&mut self) {
        self.robot = None;
        self.problem = None;
        self.graph = None;
        self.lease = None;
    }

    pub fn robot(&self) -> Option<&RobotProxy> {
        self.robot.as_ref()
    }

    pub fn problem(&self) -> Option<&ProblemProxy> {
        self.problem.as_ref()
    }

    pub fn graph(&self) -> Option<&GraphProxy> {
        self.graph.as_ref()
    }

    /// The untyped handle bound for `capability`, if any
    pub fn remote(&self, capability: Capability) -> Option<&RemoteObject> {
        match capability {
            Capability::Robot => self.robot.as_ref().map(|proxy| proxy.remote()),
            Capability::Problem => self.problem.as_ref().map(|proxy| proxy.remote()),
            Capability::Graph => self.graph.as_ref().map(|proxy| proxy.remote()),
        }
    }

    pub fn is_bound(&self, capability: Capability) -> bool {
        self.remote(capability).is_some()
    }

    pub fn state(&self) -> LocatorState {
        self.state
    }

    /// Parameters of the last connect, until `disconnect`
    pub fn config(&self) -> Option<&LocatorConfig> {
        self.config.as_ref()
    }

    /// The registered channel this locator holds a lease on
    pub fn channel(&self) -> Option<&Arc<dyn ClientChannel>> {
        self.lease.as_ref().map(ChannelLease::channel)
    }
}

impl TransportSource {
    fn kind(&self) -> &str {
        match self {
            TransportSource::Grpc => GRPC_KIND,
            TransportSource::Fixed(transport) => transport.kind(),
        }
    }
}

impl Default for Locator {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Locator")
            .field("transport", &self.transport.kind())
            .field("state", &self.state)
            .field("config", &self.config)
            .field("robot", &self.robot.is_some())
            .field("problem", &self.problem.is_some())
            .field("graph", &self.graph.is_some())
            .finish()
    }
}

fn name_service_unreachable(config: &LocatorConfig, err: NamingError) -> LocatorError {
    let reason = match err {
        NamingError::Unreachable { reason, .. } => reason,
        other => other.to_string(),
    };
    LocatorError::NameServiceUnreachable {
        host: config.host.clone(),
        port: config.port,
        reason,
    }
}
