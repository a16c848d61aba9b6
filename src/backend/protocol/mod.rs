//! Protocol Module
//!
//! The WebSocket RPC transport: one connection per client, JSON envelopes
//! in both directions, and a registry that lets any part of the server push
//! to a connection or to every connection of a user.
//!
//! # Components
//!
//! - **`context`** - per-connection and per-request metadata
//! - **`connection`** - client metadata captured at upgrade time
//! - **`push_writer`** - serialized writes to one socket plus its identity
//! - **`registry`** - live writers indexed by id and by user
//! - **`encoding`** - response/error framing for one request
//! - **`endpoint`** - handler shape shared by endpoints and middleware
//! - **`router`** - connection lifecycle and dispatch

pub mod connection;
pub mod context;
pub mod encoding;
pub mod endpoint;
pub mod push_writer;
pub mod registry;
pub mod router;

pub use connection::Connection;
pub use context::RequestContext;
pub use encoding::encode;
pub use endpoint::{endpoint, Endpoint, EndpointFuture, Reply, RpcRequest};
pub use push_writer::{ChannelSink, FrameSink, Identity, PushWriter, WebSocketSink};
pub use registry::ConnectionRegistry;
pub use router::{client_ip, ConnectParams, Router};
