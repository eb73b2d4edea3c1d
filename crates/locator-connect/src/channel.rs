//! GrpcChannel: ClientChannel implementation that talks to the broker via gRPC

use async_trait::async_trait;
use hpp_locator_interface::{
    ClientChannel, CompoundName, InvokeError, NamingContext, NamingError, ObjectRef, Transport,
    TransportError,
};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tonic::Code;
use tracing::{debug, warn};

use crate::pool::ConnectionPool;
use crate::proto::{InvokeRequest, NamingContextClient, ObjectServiceClient, ResolveRequest};

/// Channel kind under which gRPC channels are registered
pub const GRPC_KIND: &str = "grpc";

/// Liveness check bound when no request timeout is configured
pub const DEFAULT_LIVENESS_TIMEOUT: Duration = Duration::from_secs(5);

/// Timeouts applied to every connection a gRPC channel opens
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GrpcSettings {
    pub connect_timeout: Option<Duration>,
    pub request_timeout: Option<Duration>,
}

/// Transport opening `GrpcChannel`s
#[derive(Debug, Clone, Default)]
pub struct GrpcTransport {
    settings: GrpcSettings,
}

impl GrpcTransport {
    pub fn new(settings: GrpcSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &GrpcSettings {
        &self.settings
    }
}

impl Transport for GrpcTransport {
    fn kind(&self) -> &str {
        GRPC_KIND
    }

    fn open_channel(&self) -> Result<Arc<dyn ClientChannel>, TransportError> {
        Ok(Arc::new(GrpcChannel::new(self.settings.clone())))
    }

    fn profile(&self) -> String {
        format!(
            "connect_timeout={:?}, request_timeout={:?}",
            self.settings.connect_timeout, self.settings.request_timeout
        )
    }
}

/// A client channel carrying naming lookups and invocations over gRPC.
///
/// Opening the channel dials nothing; connections to the naming service and
/// to object servers are made on first use and cached in the channel's pool.
#[derive(Debug, Clone)]
pub struct GrpcChannel {
    pool: ConnectionPool,

    /// Bound on the name service liveness check
    liveness_timeout: Duration,
}

impl GrpcChannel {
    pub fn new(settings: GrpcSettings) -> Self {
        Self {
            pool: ConnectionPool::new(settings.connect_timeout, settings.request_timeout),
            liveness_timeout: settings.request_timeout.unwrap_or(DEFAULT_LIVENESS_TIMEOUT),
        }
    }
}

/// URI of the gRPC server at `host:port`
pub fn endpoint_uri(host: &str, port: u16) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("http://[{}]:{}", host, port)
    } else {
        format!("http://{}:{}", host, port)
    }
}

/// Object endpoints may be advertised without a scheme
fn normalize_endpoint(endpoint: &str) -> String {
    if endpoint.contains("://") {
        endpoint.to_string()
    } else {
        format!("http://{}", endpoint)
    }
}

/// Whether `status` came from the name service rather than from the wire
fn name_service_answered(status: &tonic::Status) -> bool {
    !matches!(
        status.code(),
        Code::Unavailable | Code::DeadlineExceeded | Code::Cancelled | Code::Unknown
    )
}

fn naming_error(name: &CompoundName, status: tonic::Status) -> NamingError {
    match status.code() {
        Code::NotFound => NamingError::NotFound(name.clone()),
        Code::InvalidArgument => NamingError::InvalidName(status.message().to_string()),
        _ => NamingError::Broker(status.to_string()),
    }
}

fn invoke_error(target: &ObjectRef, operation: &str, status: tonic::Status) -> InvokeError {
    match status.code() {
        Code::NotFound => InvokeError::ObjectNotExist(target.to_string()),
        Code::Unimplemented => InvokeError::BadOperation {
            object: target.to_string(),
            operation: operation.to_string(),
        },
        Code::Unavailable | Code::DeadlineExceeded => {
            InvokeError::Transport(status.message().to_string())
        }
        _ => InvokeError::Remote(status.message().to_string()),
    }
}

#[async_trait]
impl ClientChannel for GrpcChannel {
    fn kind(&self) -> &str {
        GRPC_KIND
    }

    async fn root_context(
        &self,
        host: &str,
        port: u16,
    ) -> Result<Arc<dyn NamingContext>, NamingError> {
        let address = endpoint_uri(host, port);
        debug!("Contacting name service at {}", address);

        let unreachable = |reason: String| NamingError::Unreachable {
            host: host.to_string(),
            port,
            reason,
        };

        let channel = self
            .pool
            .get(&address)
            .await
            .map_err(|e| unreachable(e.to_string()))?;
        let mut client = NamingContextClient::new(channel);

        // A live name service answers the empty name, if only to reject it
        let check = client.resolve(ResolveRequest::default());
        let failure = match tokio::time::timeout(self.liveness_timeout, check).await {
            Ok(Ok(_)) => None,
            Ok(Err(status)) if name_service_answered(&status) => None,
            Ok(Err(status)) => Some(status.message().to_string()),
            Err(_) => Some(format!("no answer within {:?}", self.liveness_timeout)),
        };

        if let Some(reason) = failure {
            warn!("Name service at {} did not answer: {}", address, reason);
            self.pool.disconnect(&address).await;
            return Err(unreachable(reason));
        }

        Ok(Arc::new(GrpcNamingContext { client, address }))
    }

    async fn invoke(
        &self,
        target: &ObjectRef,
        operation: &str,
        args: Value,
    ) -> Result<Value, InvokeError> {
        let address = normalize_endpoint(&target.endpoint);
        let channel = self.pool.get(&address).await?;

        let request = InvokeRequest {
            object_key: target.object_key.clone(),
            operation: operation.to_string(),
            payload: serde_json::to_vec(&args)?,
        };

        debug!("Invoking {} on {}", operation, target);

        let response = ObjectServiceClient::new(channel)
            .invoke(request)
            .await
            .map_err(|status| {
                warn!("Invocation of {} on {} failed: {}", operation, target, status);
                invoke_error(target, operation, status)
            })?;

        let payload = response.into_inner().payload;
        if payload.is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_slice(&payload)?)
    }
}

/// Root naming context of a name service reached over gRPC
#[derive(Debug, Clone)]
pub struct GrpcNamingContext {
    client: NamingContextClient,

    /// Address of the name service; home of references without an endpoint
    address: String,
}

#[async_trait]
impl NamingContext for GrpcNamingContext {
    async fn resolve(&self, name: &CompoundName) -> Result<ObjectRef, NamingError> {
        debug!("Resolving {} at {}", name, self.address);

        let response = self
            .client
            .clone()
            .resolve(ResolveRequest::from(name))
            .await
            .map_err(|status| naming_error(name, status))?;

        let reference = response.into_inner().object.ok_or_else(|| {
            NamingError::Broker(format!("name service returned no reference for {}", name))
        })?;

        Ok(reference.into_object_ref(&self.address))
    }
}
