/*!
 * Error types for the HPP locator
 */

use hpp_locator_interface::{CompoundName, InvokeError, TransportError};
use std::fmt;
use std::io;

use crate::capability::Capability;
use crate::proxy::BindError;

pub type Result<T> = std::result::Result<T, LocatorError>;

/// Exit code constants for structured process exit
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_PARTIAL: i32 = 1;
pub const EXIT_FATAL: i32 = 2;

/// One capability that could not be bound during `connect`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionFailure {
    pub capability: Capability,

    /// The compound name that was looked up
    pub name: CompoundName,

    pub reason: BindError,
}

impl ResolutionFailure {
    pub fn new(capability: Capability, name: CompoundName, reason: BindError) -> Self {
        Self {
            capability,
            name,
            reason,
        }
    }
}

impl fmt::Display for ResolutionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.capability, self.name, self.reason)
    }
}

#[derive(Debug)]
pub enum LocatorError {
    /// The client channel could not be created or registered
    TransportUnavailable(TransportError),

    /// The naming service did not answer
    NameServiceUnreachable {
        host: String,
        port: u16,
        reason: String,
    },

    /// One or more capabilities could not be bound
    NameResolutionFailed { failures: Vec<ResolutionFailure> },

    /// A call on a bound proxy failed
    Invocation(InvokeError),

    /// Configuration error
    Config(String),

    /// I/O error
    Io(io::Error),
}

impl LocatorError {
    /// Get the process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            // Some proxies may still be usable
            LocatorError::NameResolutionFailed { failures } if failures.len() < Capability::ALL.len() => {
                EXIT_PARTIAL
            }
            LocatorError::Invocation(_) => EXIT_PARTIAL,
            _ => EXIT_FATAL,
        }
    }

    /// Check if this error left the locator without any proxy
    pub fn is_fatal(&self) -> bool {
        match self {
            LocatorError::TransportUnavailable(_) => true,
            LocatorError::NameServiceUnreachable { .. } => true,
            LocatorError::Config(_) => true,
            LocatorError::Io(_) => true,
            LocatorError::NameResolutionFailed { failures } => {
                failures.len() == Capability::ALL.len()
            }
            LocatorError::Invocation(_) => false,
        }
    }

    /// Capabilities that failed to bind, in binding order
    pub fn failed_capabilities(&self) -> Vec<Capability> {
        match self {
            LocatorError::NameResolutionFailed { failures } => {
                failures.iter().map(|f| f.capability).collect()
            }
            _ => Vec::new(),
        }
    }

    /// The failure recorded for `capability`, if it failed to bind
    pub fn failure_for(&self, capability: Capability) -> Option<&ResolutionFailure> {
        match self {
            LocatorError::NameResolutionFailed { failures } => {
                failures.iter().find(|f| f.capability == capability)
            }
            _ => None,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> ErrorCategory {
        match self {
            LocatorError::TransportUnavailable(_) => ErrorCategory::Transport,
            LocatorError::NameServiceUnreachable { .. } => ErrorCategory::Network,
            LocatorError::NameResolutionFailed { .. } => ErrorCategory::Naming,
            LocatorError::Invocation(_) => ErrorCategory::Remote,
            LocatorError::Config(_) => ErrorCategory::Configuration,
            LocatorError::Io(_) => ErrorCategory::IoError,
        }
    }
}

/// Error category for classification and reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Channel creation or registration
    Transport,
    /// Naming service reachability
    Network,
    /// Name lookups and capability checks
    Naming,
    /// Calls on bound proxies
    Remote,
    /// Configuration errors
    Configuration,
    /// I/O operation errors
    IoError,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Transport => write!(f, "transport"),
            ErrorCategory::Network => write!(f, "network"),
            ErrorCategory::Naming => write!(f, "naming"),
            ErrorCategory::Remote => write!(f, "remote"),
            ErrorCategory::Configuration => write!(f, "configuration"),
            ErrorCategory::IoError => write!(f, "io"),
        }
    }
}

impl fmt::Display for LocatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocatorError::TransportUnavailable(err) => {
                write!(f, "Transport unavailable: {}", err)
            }
            LocatorError::NameServiceUnreachable { host, port, reason } => {
                write!(
                    f,
                    "Name service at {}:{} unreachable: {}",
                    host, port, reason
                )
            }
            LocatorError::NameResolutionFailed { failures } => {
                write!(f, "Name resolution failed for ")?;
                for (i, failure) in failures.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{}", failure)?;
                }
                Ok(())
            }
            LocatorError::Invocation(err) => {
                write!(f, "Remote call failed: {}", err)
            }
            LocatorError::Config(msg) => {
                write!(f, "Configuration error: {}", msg)
            }
            LocatorError::Io(err) => {
                write!(f, "I/O error: {}", err)
            }
        }
    }
}

impl std::error::Error for LocatorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LocatorError::TransportUnavailable(err) => Some(err),
            LocatorError::Invocation(err) => Some(err),
            LocatorError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for LocatorError {
    fn from(err: io::Error) -> Self {
        LocatorError::Io(err)
    }
}

impl From<TransportError> for LocatorError {
    fn from(err: TransportError) -> Self {
        LocatorError::TransportUnavailable(err)
    }
}

impl From<InvokeError> for LocatorError {
    fn from(err: InvokeError) -> Self {
        LocatorError::Invocation(err)
    }
}

impl From<toml::de::Error> for LocatorError {
    fn from(err: toml::de::Error) -> Self {
        LocatorError::Config(format!("Invalid configuration file: {}", err))
    }
}

impl From<toml::ser::Error> for LocatorError {
    fn from(err: toml::ser::Error) -> Self {
        LocatorError::Config(format!("Cannot serialize configuration: {}", err))
    }
}
