/*!
 * HPP Locator - bootstrap client for the manipulation service
 *
 * Connects to a naming service and binds typed proxies for the three
 * manipulation capabilities:
 * - Robot: assembling the composite robot
 * - Problem: selecting and configuring planning problems
 * - Graph: building the constraint graph
 *
 * The broker is reached through a registered client channel (gRPC by
 * default, see `hpp-locator-connect`).
 */

pub mod capability;
pub mod config;
pub mod error;
pub mod locator;
pub mod logging;
pub mod proxy;

// Re-export commonly used types
pub use capability::Capability;
pub use config::{LocatorConfig, DEFAULT_NAME_SERVICE_PORT};
pub use error::{LocatorError, ResolutionFailure, Result};
pub use locator::{ChannelLease, Locator, LocatorState};
pub use proxy::{BindError, GraphProxy, ProblemProxy, RemoteInterface, RemoteObject, RobotProxy};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
