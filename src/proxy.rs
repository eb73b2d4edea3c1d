/*!
 * Typed proxies for the manipulation service's remote objects
 *
 * A proxy is only ever produced by `narrow`, the checked capability cast:
 * an object reference becomes a `RobotProxy` only if it really is a robot.
 */

use hpp_locator_interface::{ClientChannel, ClientChannelExt, InvokeError, NamingError, ObjectRef};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use crate::capability::Capability;

/// Why an object reference could not become a proxy
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindError {
    /// The name did not resolve
    Naming(NamingError),

    /// The object implements another interface
    WrongCapability {
        expected: &'static str,
        actual: String,
    },

    /// The object could not be asked what it implements
    Narrow(InvokeError),
}

impl fmt::Display for BindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindError::Naming(err) => write!(f, "{}", err),
            BindError::WrongCapability { expected, actual } => {
                write!(f, "expected {}, found {}", expected, actual)
            }
            BindError::Narrow(err) => write!(f, "capability check failed: {}", err),
        }
    }
}

impl std::error::Error for BindError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BindError::Naming(err) => Some(err),
            BindError::Narrow(err) => Some(err),
            BindError::WrongCapability { .. } => None,
        }
    }
}

/// A remote object together with the channel its calls travel over
#[derive(Debug, Clone)]
pub struct RemoteObject {
    object: ObjectRef,
    channel: Arc<dyn ClientChannel>,
}

impl RemoteObject {
    pub fn object(&self) -> &ObjectRef {
        &self.object
    }

    pub fn channel(&self) -> &Arc<dyn ClientChannel> {
        &self.channel
    }

    /// Call `operation` with positional `args` (serialized as JSON) and decode
    /// the reply
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// # use hpp_locator::proxy::RemoteObject;
    /// # async fn example(robot: &RemoteObject) -> Result<(), hpp_locator_interface::InvokeError> {
    /// let size: i64 = robot.invoke("getConfigSize", ()).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn invoke<A, R>(&self, operation: &str, args: A) -> Result<R, InvokeError>
    where
        A: Serialize,
        R: DeserializeOwned,
    {
        let args = serde_json::to_value(args)?;
        let reply = self.channel.invoke(&self.object, operation, args).await?;
        Ok(serde_json::from_value(reply)?)
    }

    /// Round trip to the hosting server; `Ok(true)` if the object is alive
    pub async fn ping(&self) -> Result<bool, InvokeError> {
        Ok(!self.channel.non_existent(&self.object).await?)
    }
}

/// A typed handle on one capability of the manipulation service
pub trait RemoteInterface: Sized + Send + Sync {
    const CAPABILITY: Capability;

    fn from_remote(remote: RemoteObject) -> Self;

    fn remote(&self) -> &RemoteObject;

    /// Repository id this proxy was checked against
    fn repository_id(&self) -> &'static str {
        Self::CAPABILITY.repository_id()
    }
}

/// Checked capability cast.
///
/// A typed reference must carry exactly the capability's repository id. An
/// untyped reference is accepted only if the object itself answers `_is_a`
/// with `true`.
pub async fn narrow<T: RemoteInterface>(
    object: ObjectRef,
    channel: Arc<dyn ClientChannel>,
) -> Result<T, BindError> {
    let expected = T::CAPABILITY.repository_id();

    if object.is_typed() {
        if object.type_id != expected {
            return Err(BindError::WrongCapability {
                expected,
                actual: object.type_id,
            });
        }
    } else if !channel
        .is_a(&object, expected)
        .await
        .map_err(BindError::Narrow)?
    {
        return Err(BindError::WrongCapability {
            expected,
            actual: object.to_string(),
        });
    }

    Ok(T::from_remote(RemoteObject { object, channel }))
}

macro_rules! remote_interface {
    ($(#[$meta:meta])* $name:ident => $capability:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        pub struct $name {
            remote: RemoteObject,
        }

        impl RemoteInterface for $name {
            const CAPABILITY: Capability = $capability;

            fn from_remote(remote: RemoteObject) -> Self {
                Self { remote }
            }

            fn remote(&self) -> &RemoteObject {
                &self.remote
            }
        }

        impl Deref for $name {
            type Target = RemoteObject;

            fn deref(&self) -> &RemoteObject {
                &self.remote
            }
        }
    };
}

remote_interface!(
    /// Proxy for `hpp::corbaserver::manipulation::Robot`
    RobotProxy => Capability::Robot
);
remote_interface!(
    /// Proxy for `hpp::corbaserver::manipulation::Problem`
    ProblemProxy => Capability::Problem
);
remote_interface!(
    /// Proxy for `hpp::corbaserver::manipulation::Graph`
    GraphProxy => Capability::Graph
);

/// Root joint placement: translation (x, y, z) then quaternion (x, y, z, w)
pub type Transform = [f64; 7];

impl RobotProxy {
    /// Start a new composite robot
    pub async fn create(&self, name: &str) -> Result<(), InvokeError> {
        self.invoke("create", (name,)).await
    }

    pub async fn finished_robot(&self, name: &str) -> Result<(), InvokeError> {
        self.invoke("finishedRobot", (name,)).await
    }

    pub async fn get_root_joint_position(&self, robot_name: &str) -> Result<Transform, InvokeError> {
        self.invoke("getRootJointPosition", (robot_name,)).await
    }

    pub async fn set_root_joint_position(
        &self,
        robot_name: &str,
        position: Transform,
    ) -> Result<(), InvokeError> {
        self.invoke("setRootJointPosition", (robot_name, position))
            .await
    }
}

impl ProblemProxy {
    /// Switch to (or create) the problem named `name`; `true` if it existed
    pub async fn select_problem(&self, name: &str) -> Result<bool, InvokeError> {
        self.invoke("selectProblem", (name,)).await
    }

    pub async fn reset_problem(&self) -> Result<(), InvokeError> {
        self.invoke("resetProblem", ()).await
    }

    /// Names of the available elements of type `what` (e.g. "gripper")
    pub async fn get_available(&self, what: &str) -> Result<Vec<String>, InvokeError> {
        self.invoke("getAvailable", (what,)).await
    }
}

impl GraphProxy {
    /// Create the constraint graph; returns its id
    pub async fn create_graph(&self, name: &str) -> Result<i64, InvokeError> {
        self.invoke("createGraph", (name,)).await
    }

    pub async fn create_sub_graph(&self, name: &str) -> Result<i64, InvokeError> {
        self.invoke("createSubGraph", (name,)).await
    }

    /// Add a node of the given `priority` to sub-graph `sub_graph_id`; returns the node id
    pub async fn create_node(
        &self,
        sub_graph_id: i64,
        name: &str,
        waypoint: bool,
        priority: i64,
    ) -> Result<i64, InvokeError> {
        self.invoke("createNode", (sub_graph_id, name, waypoint, priority))
            .await
    }
}
