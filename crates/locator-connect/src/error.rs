//! Error types for the hpp-locator-connect crate

use hpp_locator_interface::InvokeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConnectError {
    #[error("Invalid endpoint {address}: {reason}")]
    InvalidEndpoint { address: String, reason: String },

    #[error("Connection to {address} failed: {reason}")]
    ConnectionFailed { address: String, reason: String },
}

impl From<ConnectError> for InvokeError {
    fn from(err: ConnectError) -> Self {
        InvokeError::Transport(err.to_string())
    }
}
