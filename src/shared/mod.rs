//! Shared Module
//!
//! This module contains types and data structures that are shared between
//! the server and the client transport. These types are used for
//! serialization and communication over the deck WebSocket protocol.
//!
//! # Overview
//!
//! The shared module provides platform-agnostic types that can be used
//! in both server and client code. Nothing in here touches a socket.

/// Envelope codec
pub mod envelope;

/// RPC and push names
pub mod rpc_names;

/// Session, user and settings records
pub mod model;

/// Shared error types
pub mod error;

/// Engine and client configuration
pub mod config;

/// Re-export commonly used types for convenience
pub use envelope::Envelope;
pub use error::SharedError;
pub use model::{Session, Settings, User};
pub use config::{ClientConfig, ConfigError, EngineConfig};
