//! In-memory broker for tests and local experiments
//!
//! `InMemoryBroker` stands in for a whole deployment: any number of naming
//! services (keyed by host and port) and the objects they point to. Its
//! transport opens channels that never touch the network.
//!
//! # Example
//!
//! ```rust
//! use hpp_locator_interface::memory::InMemoryBroker;
//!
//! let broker = InMemoryBroker::new();
//! let robot = broker.activate("planner", "IDL:hpp/corbaserver/manipulation/Robot:1.0", "robot");
//! broker
//!     .bind("planner", 2809, "hpp.corbaserver/manipulation.robot".parse().unwrap(), robot)
//!     .unwrap();
//!
//! let transport = broker.transport();
//! ```

use crate::{
    ClientChannel, CompoundName, InvokeError, NamingContext, NamingError, ObjectRef, Transport,
    TransportError, OP_IS_A, OP_NON_EXISTENT,
};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

/// Channel kind of the in-memory transport
pub const MEMORY_KIND: &str = "memory";

/// Operation every in-memory object answers by returning its arguments
pub const OP_ECHO: &str = "echo";

/// Handler for operations an object does not answer by itself
pub type Servant = Arc<dyn Fn(&str, Value) -> Result<Value, InvokeError> + Send + Sync>;

/// One call recorded by the broker
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub target: ObjectRef,
    pub operation: String,
    pub args: Value,
}

struct Activation {
    type_id: String,
    servant: Option<Servant>,
}

#[derive(Default)]
struct BrokerState {
    /// Naming services by address, each mapping names to references
    naming: HashMap<(String, u16), HashMap<CompoundName, ObjectRef>>,

    /// Live objects by (endpoint, object key)
    objects: HashMap<(String, String), Activation>,
}

/// A fake deployment of naming services and remote objects
#[derive(Default)]
pub struct InMemoryBroker {
    state: RwLock<BrokerState>,
    invocations: Mutex<Vec<Invocation>>,
}

impl fmt::Debug for InMemoryBroker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("InMemoryBroker")
            .field("naming_services", &state.naming.len())
            .field("objects", &state.objects.len())
            .finish_non_exhaustive()
    }
}

impl InMemoryBroker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make a naming service answer at `host:port`, with no bindings yet
    pub fn add_name_service(&self, host: &str, port: u16) {
        self.write()
            .naming
            .entry((host.to_string(), port))
            .or_default();
    }

    /// Bind `object` under `name` in the naming service at `host:port`,
    /// creating that naming service if needed.
    ///
    /// # Errors
    ///
    /// Returns `NamingError::InvalidName` for an empty name.
    pub fn bind(
        &self,
        host: &str,
        port: u16,
        name: CompoundName,
        object: ObjectRef,
    ) -> Result<(), NamingError> {
        if name.is_empty() {
            return Err(NamingError::InvalidName("cannot bind an empty name".into()));
        }
        self.write()
            .naming
            .entry((host.to_string(), port))
            .or_default()
            .insert(name, object);
        Ok(())
    }

    /// Remove a binding; returns whether it existed
    pub fn unbind(&self, host: &str, port: u16, name: &CompoundName) -> bool {
        self.write()
            .naming
            .get_mut(&(host.to_string(), port))
            .and_then(|bindings| bindings.remove(name))
            .is_some()
    }

    /// Create a live object hosted by `host`, answering only the built-in
    /// operations (`_is_a`, `_non_existent`, `echo`).
    pub fn activate(&self, host: &str, type_id: &str, object_key: &str) -> ObjectRef {
        self.activate_with(host, type_id, object_key, None)
    }

    /// Create a live object whose other operations are answered by `servant`
    pub fn activate_with(
        &self,
        host: &str,
        type_id: &str,
        object_key: &str,
        servant: Option<Servant>,
    ) -> ObjectRef {
        let object = ObjectRef::new(type_id, format!("memory://{}", host), object_key);
        self.write().objects.insert(
            (object.endpoint.clone(), object.object_key.clone()),
            Activation {
                type_id: type_id.to_string(),
                servant,
            },
        );
        object
    }

    /// Destroy a live object; references to it become dangling
    pub fn deactivate(&self, object: &ObjectRef) -> bool {
        self.write()
            .objects
            .remove(&(object.endpoint.clone(), object.object_key.clone()))
            .is_some()
    }

    /// Every invocation dispatched so far, oldest first
    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// A transport whose channels talk to this broker
    pub fn transport(self: &Arc<Self>) -> InMemoryTransport {
        InMemoryTransport {
            broker: self.clone(),
            opened: Arc::new(AtomicUsize::new(0)),
            failure: None,
        }
    }

    /// A transport that refuses to open channels
    pub fn failing_transport(self: &Arc<Self>, reason: &str) -> InMemoryTransport {
        InMemoryTransport {
            failure: Some(reason.to_string()),
            ..self.transport()
        }
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, BrokerState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, BrokerState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn lookup(&self, host: &str, port: u16, name: &CompoundName) -> Result<ObjectRef, NamingError> {
        let state = self.read();
        let bindings = state
            .naming
            .get(&(host.to_string(), port))
            .ok_or_else(|| NamingError::Broker(format!("name service {}:{} is gone", host, port)))?;
        bindings
            .get(name)
            .cloned()
            .ok_or_else(|| NamingError::NotFound(name.clone()))
    }

    fn dispatch(&self, target: &ObjectRef, operation: &str, args: Value) -> Result<Value, InvokeError> {
        self.invocations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Invocation {
                target: target.clone(),
                operation: operation.to_string(),
                args: args.clone(),
            });

        let (type_id, servant) = {
            let state = self.read();
            let activation = state
                .objects
                .get(&(target.endpoint.clone(), target.object_key.clone()));
            match activation {
                Some(a) => (a.type_id.clone(), a.servant.clone()),
                // A dangling reference answers _non_existent and nothing else
                None if operation == OP_NON_EXISTENT => return Ok(Value::Bool(true)),
                None => return Err(InvokeError::ObjectNotExist(target.to_string())),
            }
        };

        match operation {
            OP_NON_EXISTENT => Ok(Value::Bool(false)),
            OP_IS_A => Ok(Value::Bool(args.as_str() == Some(type_id.as_str()))),
            OP_ECHO => Ok(args),
            _ => match servant {
                Some(servant) => servant(operation, args),
                None => Err(InvokeError::BadOperation {
                    object: target.to_string(),
                    operation: operation.to_string(),
                }),
            },
        }
    }
}

/// Transport producing channels bound to one `InMemoryBroker`
#[derive(Debug, Clone)]
pub struct InMemoryTransport {
    broker: Arc<InMemoryBroker>,
    opened: Arc<AtomicUsize>,
    failure: Option<String>,
}

impl InMemoryTransport {
    /// How many channels this transport has opened
    pub fn channels_opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

impl Transport for InMemoryTransport {
    fn kind(&self) -> &str {
        MEMORY_KIND
    }

    fn open_channel(&self) -> Result<Arc<dyn ClientChannel>, TransportError> {
        if let Some(reason) = &self.failure {
            return Err(TransportError::OpenFailed {
                kind: MEMORY_KIND.to_string(),
                reason: reason.clone(),
            });
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(InMemoryChannel {
            broker: self.broker.clone(),
        }))
    }
}

#[derive(Debug)]
pub struct InMemoryChannel {
    broker: Arc<InMemoryBroker>,
}

#[async_trait]
impl ClientChannel for InMemoryChannel {
    fn kind(&self) -> &str {
        MEMORY_KIND
    }

    async fn root_context(
        &self,
        host: &str,
        port: u16,
    ) -> Result<Arc<dyn NamingContext>, NamingError> {
        let reachable = self
            .broker
            .read()
            .naming
            .contains_key(&(host.to_string(), port));

        if !reachable {
            return Err(NamingError::Unreachable {
                host: host.to_string(),
                port,
                reason: "no name service listening".to_string(),
            });
        }

        Ok(Arc::new(InMemoryNamingContext {
            broker: self.broker.clone(),
            host: host.to_string(),
            port,
        }))
    }

    async fn invoke(
        &self,
        target: &ObjectRef,
        operation: &str,
        args: Value,
    ) -> Result<Value, InvokeError> {
        self.broker.dispatch(target, operation, args)
    }
}

#[derive(Debug)]
pub struct InMemoryNamingContext {
    broker: Arc<InMemoryBroker>,
    host: String,
    port: u16,
}

#[async_trait]
impl NamingContext for InMemoryNamingContext {
    async fn resolve(&self, name: &CompoundName) -> Result<ObjectRef, NamingError> {
        self.broker.lookup(&self.host, self.port, name)
    }
}
