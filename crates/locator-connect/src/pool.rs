//! ConnectionPool: one cached gRPC connection per server address

use crate::error::ConnectError;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tonic::transport::{Channel, Endpoint};
use tracing::{debug, info};

/// Cache of established gRPC connections, keyed by address URI.
///
/// Connections are lazy: nothing is dialled until `get()` first asks for an
/// address. The naming service and every object server the locator talks to
/// end up sharing this pool through their `GrpcChannel`.
///
/// # Example
///
/// ```rust,no_run
/// use hpp_locator_connect::ConnectionPool;
/// use std::time::Duration;
///
/// # async fn example() -> anyhow::Result<()> {
/// let pool = ConnectionPool::new(Some(Duration::from_secs(5)), None);
///
/// let channel = pool.get("http://10.0.0.5:2809").await?;
/// pool.disconnect("http://10.0.0.5:2809").await;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ConnectionPool {
    /// Active connections (address -> channel)
    connections: Arc<RwLock<HashMap<String, Channel>>>,

    /// Bound on establishing a connection
    connect_timeout: Option<Duration>,

    /// Bound on each request sent over a pooled connection
    request_timeout: Option<Duration>,
}

impl ConnectionPool {
    pub fn new(connect_timeout: Option<Duration>, request_timeout: Option<Duration>) -> Self {
        Self {
            connections: Arc::new(RwLock::new(HashMap::new())),
            connect_timeout,
            request_timeout,
        }
    }

    /// Get a connection to `address`, dialling it if not cached
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - `address` is not a valid URI
    /// - The server cannot be reached within the connect timeout
    pub async fn get(&self, address: &str) -> Result<Channel, ConnectError> {
        {
            let connections = self.connections.read().await;
            if let Some(channel) = connections.get(address) {
                debug!("Reusing existing connection to {}", address);
                return Ok(channel.clone());
            }
        }

        info!("Establishing new connection to {}", address);
        self.connect(address).await
    }

    async fn connect(&self, address: &str) -> Result<Channel, ConnectError> {
        let mut endpoint = Endpoint::from_shared(address.to_string()).map_err(|e| {
            ConnectError::InvalidEndpoint {
                address: address.to_string(),
                reason: e.to_string(),
            }
        })?;

        if let Some(timeout) = self.connect_timeout {
            endpoint = endpoint.connect_timeout(timeout);
        }
        if let Some(timeout) = self.request_timeout {
            endpoint = endpoint.timeout(timeout);
        }

        let channel = endpoint
            .connect()
            .await
            .map_err(|e| ConnectError::ConnectionFailed {
                address: address.to_string(),
                reason: e.to_string(),
            })?;

        // Another task may have connected meanwhile; keep whichever landed first
        let mut connections = self.connections.write().await;
        let channel = connections
            .entry(address.to_string())
            .or_insert(channel)
            .clone();

        info!("Connected to {}", address);
        Ok(channel)
    }

    /// Drop the cached connection to `address`; the next `get()` redials
    pub async fn disconnect(&self, address: &str) {
        let mut connections = self.connections.write().await;
        if connections.remove(address).is_some() {
            info!("Dropped connection to {}", address);
        }
    }
}

impl Default for ConnectionPool {
    fn default() -> Self {
        Self::new(None, None)
    }
}
