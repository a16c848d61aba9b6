//! Deck Engine - Main Library
//!
//! Deck Engine is the real-time core of the deck social feed backend: a
//! bidirectional WebSocket RPC transport with request dispatch, per-user
//! push delivery and cross-process fan-out.
//!
//! # Overview
//!
//! This library provides:
//! - The JSON envelope codec shared by server and client
//! - A connection registry indexing live writers by id and by user
//! - An RPC router with composable middleware (auth, admin, rate limiting)
//! - A pusher for server-originated messages and a pub/sub fan-out
//! - A maintenance gate and graceful shutdown
//! - A client transport that correlates responses by `ack`
//!
//! # Module Structure
//!
//! - **`shared`** - Types shared between the server and the client
//!   - Envelope, RPC names, session model
//!   - Configuration
//!   - Error types
//!
//! - **`client`** - WebSocket client transport (tokio-tungstenite)
//!
//! - **`backend`** - Server-side code (only compiled with `ssr` feature)
//!   - Axum HTTP server with the WebSocket upgrade endpoints
//!   - Protocol: connection registry, push writers, router
//!   - Push delivery and fan-out
//!   - Store interface
//!
//! # Feature Flags
//!
//! - **`ssr`** - Server-side code (enabled by default)
//!   - Includes Axum server, database, Redis, metrics
//!   - Required for server builds
//!
//! # Usage
//!
//! ## Server-Side
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use deck_engine::backend::server::Engine;
//! use deck_engine::backend::store::MemoryStore;
//! use deck_engine::shared::EngineConfig;
//!
//! # async fn example() -> Result<(), deck_engine::backend::BackendError> {
//! let mut engine = Engine::builder(EngineConfig::default())
//!     .store(Arc::new(MemoryStore::new()))
//!     .build()
//!     .await?;
//! let addr = engine.open().await?;
//! println!("listening on {}", addr);
//! engine.close().await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Client
//!
//! ```rust,no_run
//! use deck_engine::client::Client;
//! use deck_engine::shared::ClientConfig;
//!
//! # async fn example() -> Result<(), deck_engine::client::ClientError> {
//! let client = Client::connect(ClientConfig::new("ws://localhost:9000/api/")).await?;
//! let pong: String = client.call("ping?", &()).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Thread Safety
//!
//! - **Registry**: one lock around both indexes; reads copy out snapshots
//! - **Writers**: every frame goes through the writer's own mutex
//! - **Client**: sends are serialized; a single task reads
//!
//! # Error Handling
//!
//! - `shared::error::SharedError` for codec failures
//! - `backend::error::BackendError` for everything on the server side
//! - `client::ClientError` for the client transport

/// Shared types and data structures
pub mod shared;

/// Client transport
pub mod client;

/// Backend server-side code
#[cfg(feature = "ssr")]
pub mod backend;
