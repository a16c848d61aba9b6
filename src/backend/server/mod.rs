//! Server Module
//!
//! Assembles the engine: state, RPC table, HTTP listener and shutdown.
//!
//! # Architecture
//!
//! - **`state`** - `AppState` and its `FromRef` implementations
//! - **`service`** - `RpcService` trait and the guarded RPC table
//! - **`init`** - `Engine` builder, open and close
//!
//! # Module Structure
//!
//! ```text
//! server/
//! ├── mod.rs          - Module exports and documentation
//! ├── state.rs        - AppState and FromRef implementations
//! ├── service.rs      - Domain service seam and RPC registration
//! └── init.rs         - Engine construction and lifecycle
//! ```
//!
//! # Lifecycle
//!
//! 1. **Build**: validate configuration, pick the store, open the bus
//! 2. **Open**: bind the listener and serve in the background
//! 3. **Close**: cancel read loops, then drain within the shutdown timeout

/// Application state management
pub mod state;

/// RPC service seam
pub mod service;

/// Engine initialization
pub mod init;

pub use init::{Engine, EngineBuilder};
pub use service::{register_rpcs, RpcService, UnimplementedService};
pub use state::AppState;
