//! Backend Error Module
//!
//! This module defines error types specific to the backend server.
//! The same error value is used for two audiences: its `message()` is what a
//! WebSocket client sees in the envelope `error` field, and its
//! `IntoResponse` impl is what an HTTP client sees.
//!
//! # Architecture
//!
//! - **`types`** - Error type definitions and constructors
//! - **`conversion`** - Error conversion implementations (IntoResponse, From)
//!
//! # Module Structure
//!
//! ```text
//! error/
//! ├── mod.rs        - Module exports and documentation
//! ├── types.rs      - Error type definitions
//! └── conversion.rs - Error conversion implementations
//! ```
//!
//! # Error Kinds
//!
//! - `Protocol` - malformed envelope, missing context values, unknown RPC
//! - `Auth` - require-user / require-admin denied the request
//! - `Session` - unknown or unparsable session on connect
//! - `Maintenance` - maintenance gate closed the connection
//! - `Handler` - domain error returned by an endpoint
//! - `Transport` - socket failure
//! - `Store`, `Bus` - store and bus failures
//!
//! # Example
//!
//! ```rust
//! use deck_engine::backend::error::BackendError;
//!
//! let err = BackendError::rpc_not_found("unknown");
//! assert_eq!(err.message(), "RPC unknown not found");
//! ```

/// Error type definitions
pub mod types;

/// Error conversion implementations
pub mod conversion;

// Re-export commonly used types
pub use types::{BackendError, ErrorKind};
