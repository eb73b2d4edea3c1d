//! HPP Locator Connect: gRPC binding of the locator transport
//!
//! This crate carries the locator's two kinds of remote traffic over gRPC:
//! naming lookups against the broker's naming service, and operation
//! invocations on the objects those lookups return.
//!
//! # Architecture
//!
//! - **GrpcTransport**: opens `GrpcChannel`s, registered under the `grpc` kind
//! - **GrpcChannel**: pools one tonic connection per server address
//! - **GrpcNamingContext**: resolves compound names via `hpp.broker.v1.NamingContext`
//! - **proto**: wire messages and client stubs for `hpp.broker.v1`
//!
//! # Example
//!
//! ```rust,no_run
//! use hpp_locator_connect::GrpcTransport;
//! use hpp_locator_interface::{ClientChannel, CompoundName, NamingContext, Transport};
//!
//! async fn example() -> anyhow::Result<()> {
//!     let channel = GrpcTransport::default().open_channel()?;
//!     let root = channel.root_context("10.0.0.5", 2809).await?;
//!
//!     let name: CompoundName = "hpp.corbaserver/manipulation.robot".parse()?;
//!     let robot = root.resolve(&name).await?;
//!     println!("robot lives at {}", robot.endpoint);
//!     Ok(())
//! }
//! ```

pub mod channel;
pub mod error;
pub mod pool;
pub mod proto;

pub use channel::{
    GrpcChannel, GrpcNamingContext, GrpcSettings, GrpcTransport, DEFAULT_LIVENESS_TIMEOUT, GRPC_KIND,
};
pub use error::ConnectError;
pub use pool::ConnectionPool;
