//! Backend Module
//!
//! All server-side code of the engine: the WebSocket RPC transport, push
//! delivery, the store seam and the HTTP surface.
//!
//! This module is only compiled when the `ssr` feature is enabled.
//!
//! # Architecture
//!
//! - **`protocol`** - connections, writers, registry, encoder and router
//! - **`middleware`** - RPC guards and HTTP middleware
//! - **`push`** - pusher, fan-out and pub/sub buses
//! - **`store`** - read access to sessions, users and settings
//! - **`routes`** - HTTP route configuration
//! - **`server`** - engine construction and lifecycle
//! - **`error`** - backend error type
//!
//! # Module Structure
//!
//! ```text
//! backend/
//! ├── mod.rs          - Module exports and documentation
//! ├── protocol/       - WebSocket RPC transport
//! ├── middleware/     - Endpoint and HTTP middleware
//! ├── push/           - Server-originated messages
//! ├── store/          - Store trait and implementations
//! ├── routes/         - Route configuration
//! ├── server/         - Engine and state
//! └── error/          - Error types
//! ```
//!
//! # Thread Safety
//!
//! - The registry keeps both indexes under one `RwLock` and hands out
//!   snapshots
//! - Each writer serializes its frames behind its own mutex
//! - Request tasks run concurrently; one connection's responses may arrive
//!   out of order
//!
//! # Error Handling
//!
//! Every backend function returns `BackendError`. Endpoint errors become
//! error frames; HTTP handlers turn it into a JSON response.

/// WebSocket RPC transport
pub mod protocol;

/// Endpoint and HTTP middleware
pub mod middleware;

/// Push delivery and fan-out
pub mod push;

/// Store seam
pub mod store;

/// Route configuration
pub mod routes;

/// Engine setup and lifecycle
pub mod server;

/// Backend error types
pub mod error;

pub use error::{BackendError, ErrorKind};
pub use protocol::{ConnectionRegistry, PushWriter, Router};
pub use push::Pusher;
pub use server::{Engine, RpcService};
pub use store::{MemoryStore, PgStore, Store};
