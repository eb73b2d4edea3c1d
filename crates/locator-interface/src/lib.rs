//! HPP Locator Interface: Transport and Naming Abstractions
//!
//! This crate defines the seams between the manipulation bootstrap client and
//! whatever object broker actually carries its calls.
//!
//! # Architecture
//!
//! - **Transport**: opens a client channel of one kind (gRPC, in-memory, ...)
//! - **ClientChannel**: reaches a naming service and forwards invocations to remote objects
//! - **NamingContext**: resolves compound names into generic object references
//! - **TransportRegistry**: process-wide, reference-counted registration of channels
//!
//! # Example
//!
//! ```rust,no_run
//! use hpp_locator_interface::{
//!     ChannelRegistry, ClientChannel, CompoundName, NamingContext, Transport, TransportRegistry,
//! };
//!
//! async fn lookup(transport: &dyn Transport) -> anyhow::Result<()> {
//!     let registry = ChannelRegistry::global();
//!     let channel = registry.acquire(transport)?;
//!
//!     let root = channel.root_context("localhost", 2809).await?;
//!     let name: CompoundName = "hpp.corbaserver/manipulation.robot".parse()?;
//!     let object = root.resolve(&name).await?;
//!     println!("resolved {}", object);
//!
//!     registry.release(transport.kind());
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

pub mod memory;
pub mod registry;

pub use registry::{ChannelRegistry, TransportRegistry};

/// Operation name asking an object whether it implements a repository id
pub const OP_IS_A: &str = "_is_a";

/// Operation name asking whether an object reference is dangling
pub const OP_NON_EXISTENT: &str = "_non_existent";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Failed to open {kind} channel: {reason}")]
    OpenFailed { kind: String, reason: String },

    #[error("Channel registry error: {0}")]
    Registry(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NamingError {
    #[error("Name service at {host}:{port} is unreachable: {reason}")]
    Unreachable {
        host: String,
        port: u16,
        reason: String,
    },

    #[error("Name not found: {0}")]
    NotFound(CompoundName),

    #[error("Invalid name: {0}")]
    InvalidName(String),

    #[error("Naming context error: {0}")]
    Broker(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvokeError {
    #[error("Object does not exist: {0}")]
    ObjectNotExist(String),

    #[error("Operation {operation} not supported by {object}")]
    BadOperation { object: String, operation: String },

    #[error("Remote error: {0}")]
    Remote(String),

    #[error("Payload encoding error: {0}")]
    Encoding(String),

    #[error("Transport error: {0}")]
    Transport(String),
}

impl From<serde_json::Error> for InvokeError {
    fn from(err: serde_json::Error) -> Self {
        InvokeError::Encoding(err.to_string())
    }
}

/// One `(id, kind)` step of a compound name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NameComponent {
    pub id: String,
    pub kind: String,
}

impl NameComponent {
    pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
        }
    }
}

impl fmt::Display for NameComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.kind.is_empty() {
            write!(f, "{}", self.id)
        } else {
            write!(f, "{}.{}", self.id, self.kind)
        }
    }
}

/// An ordered sequence of name components addressing a nested naming entry.
///
/// The stringified form joins components with `/` and writes each one as
/// `id.kind` (or just `id` when the kind is empty), e.g.
/// `hpp.corbaserver/manipulation.robot`. No escaping is supported, so ids
/// must not contain `/`, and the last `.` of a segment separates the kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CompoundName(Vec<NameComponent>);

impl CompoundName {
    pub fn new(components: Vec<NameComponent>) -> Self {
        Self(components)
    }

    /// Extend this name by one component
    pub fn child(mut self, component: NameComponent) -> Self {
        self.0.push(component);
        self
    }

    pub fn components(&self) -> &[NameComponent] {
        &self.0
    }

    pub fn first(&self) -> Option<&NameComponent> {
        self.0.first()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<NameComponent>> for CompoundName {
    fn from(components: Vec<NameComponent>) -> Self {
        Self(components)
    }
}

impl fmt::Display for CompoundName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, component) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "/")?;
            }
            write!(f, "{}", component)?;
        }
        Ok(())
    }
}

impl FromStr for CompoundName {
    type Err = NamingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(NamingError::InvalidName("empty name".to_string()));
        }

        let components = s
            .split('/')
            .map(|segment| {
                if segment.is_empty() {
                    return Err(NamingError::InvalidName(format!(
                        "empty component in '{}'",
                        s
                    )));
                }
                Ok(match segment.rsplit_once('.') {
                    Some((id, kind)) => NameComponent::new(id, kind),
                    None => NameComponent::new(segment, ""),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self(components))
    }
}

/// A generic reference to an object hosted by the broker.
///
/// This is what a naming context hands back before any capability check.
/// `type_id` is the repository id the broker advertised for the object; an
/// empty `type_id` means the broker did not say, and the object itself has to
/// be asked.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectRef {
    /// Repository id, e.g. `IDL:hpp/corbaserver/manipulation/Robot:1.0`
    pub type_id: String,

    /// Address of the server hosting the object
    pub endpoint: String,

    /// Key identifying the object within its server
    pub object_key: String,
}

impl ObjectRef {
    pub fn new(
        type_id: impl Into<String>,
        endpoint: impl Into<String>,
        object_key: impl Into<String>,
    ) -> Self {
        Self {
            type_id: type_id.into(),
            endpoint: endpoint.into(),
            object_key: object_key.into(),
        }
    }

    /// A reference whose interface was not advertised by the broker
    pub fn untyped(endpoint: impl Into<String>, object_key: impl Into<String>) -> Self {
        Self::new("", endpoint, object_key)
    }

    pub fn is_typed(&self) -> bool {
        !self.type_id.is_empty()
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let type_id = if self.is_typed() {
            self.type_id.as_str()
        } else {
            "<untyped>"
        };
        write!(f, "{} @ {}/{}", type_id, self.endpoint, self.object_key)
    }
}

/// Opens client channels of one kind.
///
/// Implementations are usually cheap factories; the expensive work (network
/// connections) happens lazily inside the channel.
pub trait Transport: Send + Sync + 'static {
    /// Channel kind produced by this transport, used as the registry key
    fn kind(&self) -> &str;

    /// Create a new, unregistered client channel
    fn open_channel(&self) -> Result<Arc<dyn ClientChannel>, TransportError>;

    /// Settings the opened channels carry. A registered channel is only
    /// handed to transports whose profile matches the one that opened it.
    fn profile(&self) -> String {
        String::new()
    }
}

/// The client side of a broker connection.
///
/// A channel is shared process-wide once registered: every proxy bound
/// through it forwards its calls here.
#[async_trait]
pub trait ClientChannel: Send + Sync + fmt::Debug + 'static {
    fn kind(&self) -> &str;

    /// Contact the naming service at `host:port` and return its root context
    ///
    /// # Errors
    ///
    /// Returns `NamingError::Unreachable` if the naming service cannot be
    /// reached or does not answer.
    async fn root_context(
        &self,
        host: &str,
        port: u16,
    ) -> Result<Arc<dyn NamingContext>, NamingError>;

    /// Forward one operation to a remote object.
    ///
    /// Arguments and reply are JSON values; the channel is responsible for
    /// carrying them to the server that hosts `target`.
    async fn invoke(
        &self,
        target: &ObjectRef,
        operation: &str,
        args: Value,
    ) -> Result<Value, InvokeError>;
}

/// A naming context handle obtained from a name service
#[async_trait]
pub trait NamingContext: Send + Sync + fmt::Debug {
    /// Resolve a compound name relative to this context
    ///
    /// # Errors
    ///
    /// Returns `NamingError::NotFound` if no object is bound under `name`.
    async fn resolve(&self, name: &CompoundName) -> Result<ObjectRef, NamingError>;
}

/// Object-level operations every remote object answers, built on `invoke`
#[async_trait]
pub trait ClientChannelExt: ClientChannel {
    /// Ask `target` whether it implements `repository_id`
    async fn is_a(&self, target: &ObjectRef, repository_id: &str) -> Result<bool, InvokeError> {
        let reply = self
            .invoke(target, OP_IS_A, Value::String(repository_id.to_string()))
            .await?;
        reply.as_bool().ok_or_else(|| {
            InvokeError::Encoding(format!("{} returned a non-boolean: {}", OP_IS_A, reply))
        })
    }

    /// Ask whether `target` no longer exists on its server
    async fn non_existent(&self, target: &ObjectRef) -> Result<bool, InvokeError> {
        let reply = self.invoke(target, OP_NON_EXISTENT, Value::Null).await?;
        reply.as_bool().ok_or_else(|| {
            InvokeError::Encoding(format!(
                "{} returned a non-boolean: {}",
                OP_NON_EXISTENT, reply
            ))
        })
    }
}

impl<T: ClientChannel + ?Sized> ClientChannelExt for T {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compound_name_display() {
        let name = CompoundName::new(vec![NameComponent::new("hpp", "corbaserver")])
            .child(NameComponent::new("manipulation", "robot"));
        assert_eq!(name.to_string(), "hpp.corbaserver/manipulation.robot");
        assert_eq!(name.len(), 2);
    }

    #[test]
    fn test_compound_name_parse() {
        let name: CompoundName = "hpp-test.corbaserver/manipulation.graph".parse().unwrap();
        assert_eq!(
            name.components(),
            &[
                NameComponent::new("hpp-test", "corbaserver"),
                NameComponent::new("manipulation", "graph"),
            ]
        );

        let bare: CompoundName = "NameService".parse().unwrap();
        assert_eq!(bare.first(), Some(&NameComponent::new("NameService", "")));
        assert_eq!(bare.to_string(), "NameService");
    }

    #[test]
    fn test_compound_name_parse_rejects_empty_segments() {
        assert!(matches!(
            "".parse::<CompoundName>(),
            Err(NamingError::InvalidName(_))
        ));
        assert!(matches!(
            "hpp.corbaserver//manipulation.robot".parse::<CompoundName>(),
            Err(NamingError::InvalidName(_))
        ));
    }

    #[test]
    fn test_object_ref_typing() {
        let typed = ObjectRef::new("IDL:Foo:1.0", "memory://a", "foo");
        assert!(typed.is_typed());
        assert_eq!(typed.to_string(), "IDL:Foo:1.0 @ memory://a/foo");

        let untyped = ObjectRef::untyped("memory://a", "foo");
        assert!(!untyped.is_typed());
        assert!(untyped.to_string().starts_with("<untyped>"));
    }

    #[test]
    fn test_invoke_error_from_json() {
        let err = serde_json::from_str::<bool>("not json").unwrap_err();
        assert!(matches!(InvokeError::from(err), InvokeError::Encoding(_)));
    }
}
